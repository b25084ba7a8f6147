mod common;

use common::{course_row, Fixture, SlowRepository};
use std::sync::Arc;
use std::time::Duration;
use stepwise::catalog::{self, CatalogStores, CourseLocationRevision, V1_0_0, V2_0_0};
use stepwise::database::Page;
use stepwise::jobs::ReviserJob;
use stepwise::{Job, RunOptions, Version};

fn slow_courses(fixture: &Fixture) -> CatalogStores {
    CatalogStores {
        courses: Arc::new(SlowRepository::new(
            fixture.courses.clone(),
            Duration::from_millis(30),
        )),
        ..fixture.stores()
    }
}

#[tokio::test]
async fn test_concurrent_pages_create_one_record_per_key() {
    let fixture = Fixture::new();
    fixture
        .source
        .set_table("course", vec![course_row(1, "Chemistry", "Lab 2")]);
    let stores = slow_courses(&fixture);
    let job = ReviserJob::new(
        V2_0_0,
        2,
        V1_0_0,
        CourseLocationRevision,
        stores.source.clone(),
        stores.courses.clone(),
    );

    let page = Page::new(0, 10).unwrap();
    let options = RunOptions::default();
    let (first, second) = tokio::join!(
        job.migrate(page, &V2_0_0, &options),
        job.migrate(page, &V2_0_0, &options)
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.created + second.created, 1);
    assert_eq!(first.unchanged + second.unchanged, 1);
    let courses = fixture.courses.records().await;
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].location.as_deref(), Some("Lab 2"));
}

#[tokio::test]
async fn test_jobs_of_one_entity_share_key_locks() {
    let fixture = Fixture::new();
    fixture
        .source
        .set_table("course", vec![course_row(1, "Chemistry", "Lab 2")]);
    let registry = catalog::registry(&slow_courses(&fixture)).unwrap();
    let job = |version: Version| {
        registry
            .jobs()
            .iter()
            .find(|job| job.descriptor().entity == "course" && job.descriptor().version == version)
            .cloned()
            .unwrap()
    };
    let (creator, reviser) = (job(V1_0_0), job(V2_0_0));

    let page = Page::new(0, 10).unwrap();
    let options = RunOptions::default();
    let (created, revised) = tokio::join!(
        creator.migrate(page, &V1_0_0, &options),
        reviser.migrate(page, &V2_0_0, &options)
    );
    let (created, revised) = (created.unwrap(), revised.unwrap());

    // Whichever job locks the key first, the other one finds its record
    assert_eq!(created.created + revised.created, 1);
    assert_eq!(fixture.courses.len().await, 1);
}
