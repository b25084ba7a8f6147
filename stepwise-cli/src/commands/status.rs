use super::connect_target;
use anyhow::Result;
use std::collections::BTreeMap;
use stepwise::catalog::{Contact, Course, User};
use stepwise::database::{Entity, TargetRepository};
use stepwise::{MigratorConfig, Version};

/// Print how many target rows each version tag holds, per entity
pub async fn run(config: &MigratorConfig) -> Result<()> {
    let target = connect_target(config).await?;

    print_counts(User::KIND, target.users.count_by_version().await?);
    print_counts(Course::KIND, target.courses.count_by_version().await?);
    print_counts(Contact::KIND, target.contacts.count_by_version().await?);
    Ok(())
}

fn print_counts(entity: &str, counts: BTreeMap<Version, u64>) {
    if counts.is_empty() {
        println!("{:<8} empty", entity);
        return;
    }
    for (version, rows) in counts {
        println!("{:<8} {:<8} {:>8}", entity, version.to_string(), rows);
    }
}
