//! The application's migration jobs
//!
//! | version | order | entity  | kind    | writes                                  |
//! |---------|-------|---------|---------|-----------------------------------------|
//! | 1.0.0   | 1     | user    | creator | first_name, last_name, city, job, email |
//! | 1.0.0   | 2     | course  | creator | name                                    |
//! | 1.0.0   | 3     | contact | creator | first_name, last_name, keyed on both    |
//! | 1.1.0   | 0     | user    | reviser | phone_number, keyed on email            |
//! | 2.0.0   | 2     | course  | reviser | location, keyed on name                 |
//!
//! Creators skip rows whose key is already present: users by email, courses
//! by name, contacts by first and last name. Both revisers roll back to 1.0.0.

pub mod contacts;
pub mod courses;
pub mod users;

pub use contacts::{Contact, ContactImport, LegacyContact};
pub use courses::{Course, CourseImport, CourseLocationRevision, LegacyCourse};
pub use users::{LegacyUser, User, UserImport, UserPhoneRevision};

use crate::database::source::SourceReader;
use crate::database::target::TargetRepository;
use crate::error::Result;
use crate::jobs::{CreatorJob, KeyLocks, ReviserJob};
use crate::runner::{JobRegistry, RegistryBuilder};
use crate::version::Version;
use std::sync::Arc;

pub const V1_0_0: Version = Version::new(1, 0, 0);
pub const V1_1_0: Version = Version::new(1, 1, 0);
pub const V2_0_0: Version = Version::new(2, 0, 0);

/// Store handles the catalog jobs run against
#[derive(Clone)]
pub struct CatalogStores {
    pub source: Arc<dyn SourceReader>,
    pub users: Arc<dyn TargetRepository<User>>,
    pub courses: Arc<dyn TargetRepository<Course>>,
    pub contacts: Arc<dyn TargetRepository<Contact>>,
}

/// Add every catalog job to `builder`
///
/// Jobs writing the same entity kind share one set of key locks.
pub fn register(builder: &mut RegistryBuilder, stores: &CatalogStores) {
    let user_locks = KeyLocks::new();
    let course_locks = KeyLocks::new();
    builder
        .register(CreatorJob::new(
            V1_0_0,
            1,
            UserImport,
            stores.source.clone(),
            stores.users.clone(),
        )
        .with_locks(user_locks.clone()))
        .register(CreatorJob::new(
            V1_0_0,
            2,
            CourseImport,
            stores.source.clone(),
            stores.courses.clone(),
        )
        .with_locks(course_locks.clone()))
        .register(CreatorJob::new(
            V1_0_0,
            3,
            ContactImport,
            stores.source.clone(),
            stores.contacts.clone(),
        ))
        .register(ReviserJob::new(
            V1_1_0,
            0,
            V1_0_0,
            UserPhoneRevision,
            stores.source.clone(),
            stores.users.clone(),
        )
        .with_locks(user_locks))
        .register(ReviserJob::new(
            V2_0_0,
            2,
            V1_0_0,
            CourseLocationRevision,
            stores.source.clone(),
            stores.courses.clone(),
        )
        .with_locks(course_locks));
}

/// Validated registry of the catalog jobs
pub fn registry(stores: &CatalogStores) -> Result<JobRegistry> {
    let mut builder = JobRegistry::builder();
    register(&mut builder, stores);
    builder.build()
}
