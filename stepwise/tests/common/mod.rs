#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use stepwise::catalog::{self, CatalogStores, Contact, Course, User};
use stepwise::database::adapters::{MemoryRepository, MemorySource};
use stepwise::database::{BusinessKey, Entity, Row, TargetRepository};
use stepwise::{JobRegistry, Result, Runner, Version};

/// In-memory stores wired to the catalog jobs
pub struct Fixture {
    pub source: Arc<MemorySource>,
    pub users: Arc<MemoryRepository<User>>,
    pub courses: Arc<MemoryRepository<Course>>,
    pub contacts: Arc<MemoryRepository<Contact>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_users(MemoryRepository::new())
    }

    pub fn with_users(users: MemoryRepository<User>) -> Self {
        Self {
            source: Arc::new(MemorySource::new()),
            users: Arc::new(users),
            courses: Arc::new(MemoryRepository::new()),
            contacts: Arc::new(MemoryRepository::new()),
        }
    }

    pub fn stores(&self) -> CatalogStores {
        CatalogStores {
            source: self.source.clone(),
            users: self.users.clone(),
            courses: self.courses.clone(),
            contacts: self.contacts.clone(),
        }
    }

    pub fn registry(&self) -> JobRegistry {
        catalog::registry(&self.stores()).unwrap()
    }

    pub fn runner(&self) -> Runner {
        Runner::new(self.registry())
    }
}

/// Repository whose writes take `delay` before reaching the inner store
pub struct SlowRepository<E: Entity> {
    pub inner: Arc<MemoryRepository<E>>,
    pub delay: Duration,
}

impl<E: Entity> SlowRepository<E> {
    pub fn new(inner: Arc<MemoryRepository<E>>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<E: Entity> TargetRepository<E> for SlowRepository<E> {
    async fn find_by_key(&self, key: &BusinessKey) -> Result<Option<E>> {
        self.inner.find_by_key(key).await
    }

    async fn save(&self, record: E) -> Result<E> {
        tokio::time::sleep(self.delay).await;
        self.inner.save(record).await
    }

    async fn delete_by_version(&self, version: &Version) -> Result<u64> {
        self.inner.delete_by_version(version).await
    }

    async fn revert_fields(&self, fields: &[&str], from: &Version, to: &Version) -> Result<u64> {
        self.inner.revert_fields(fields, from, to).await
    }

    async fn count_by_version(&self) -> Result<BTreeMap<Version, u64>> {
        self.inner.count_by_version().await
    }
}

pub fn user_row(id: i64, phone: Option<&str>, email: &str) -> Row {
    Row::new()
        .with("id", id)
        .with("login", format!("user{}", id))
        .with("birth", None::<String>)
        .with("phone_number", phone)
        .with("first_name", format!("First{}", id))
        .with("last_name", format!("Last{}", id))
        .with("city", format!("City{}", id))
        .with("job", "Engineer")
        .with("email", email)
}

pub fn users(count: i64) -> Vec<Row> {
    (1..=count)
        .map(|id| user_row(id, None, &format!("user{}@example.com", id)))
        .collect()
}

pub fn course_row(id: i64, name: &str, location: &str) -> Row {
    Row::new()
        .with("id", id)
        .with("name", name)
        .with("date", "2019-09-02")
        .with("time", "09:30:00")
        .with("teacher", "Dr. Who")
        .with("location", location)
}

pub fn contact_row(id: i64, first_name: &str, last_name: &str) -> Row {
    Row::new()
        .with("id", id)
        .with("first_name", first_name)
        .with("company", "Acme")
        .with("last_name", last_name)
}
