//! Subcommand implementations

pub mod migrate;
pub mod plan;
pub mod rollback;
pub mod status;

use anyhow::{Context, Result};
use std::sync::Arc;
use stepwise::catalog::{self, CatalogStores, Contact, Course, User};
use stepwise::database::adapters::{
    connect_pool, MemoryRepository, MemorySource, MySqlSource, PostgresRepository,
};
use stepwise::{MigratorConfig, Runner};

/// Target repositories sharing one pool
pub struct TargetStores {
    pub users: Arc<PostgresRepository<User>>,
    pub courses: Arc<PostgresRepository<Course>>,
    pub contacts: Arc<PostgresRepository<Contact>>,
}

pub async fn connect_target(config: &MigratorConfig) -> Result<TargetStores> {
    let pool = Arc::new(
        connect_pool(&config.target)
            .await
            .context("Cannot open the target store")?,
    );
    Ok(TargetStores {
        users: Arc::new(PostgresRepository::new(pool.clone())),
        courses: Arc::new(PostgresRepository::new(pool.clone())),
        contacts: Arc::new(PostgresRepository::new(pool)),
    })
}

/// Connect both stores and wire them to the catalog
pub async fn connect(config: &MigratorConfig) -> Result<CatalogStores> {
    let source = MySqlSource::connect(&config.source.connection)
        .await
        .context("Cannot open the source store")?
        .with_tables(config.source.tables.clone());
    let target = connect_target(config).await?;

    Ok(CatalogStores {
        source: Arc::new(source),
        users: target.users,
        courses: target.courses,
        contacts: target.contacts,
    })
}

/// Runner over the catalog, backed by the configured stores
pub async fn runner(config: &MigratorConfig) -> Result<Runner> {
    let stores = connect(config).await?;
    Ok(Runner::new(catalog::registry(&stores)?))
}

/// Catalog stores that are never read, for commands that only inspect the registry
pub fn detached_stores() -> CatalogStores {
    CatalogStores {
        source: Arc::new(MemorySource::new()),
        users: Arc::new(MemoryRepository::<User>::new()),
        courses: Arc::new(MemoryRepository::<Course>::new()),
        contacts: Arc::new(MemoryRepository::<Contact>::new()),
    }
}
