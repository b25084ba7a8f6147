use super::runner;
use anyhow::Result;
use stepwise::{MigratorConfig, Version};

pub async fn run(config: &MigratorConfig, to: Version) -> Result<()> {
    let runner = runner(config).await?;
    if config.environment.is_production() {
        log::warn!("Rolling back production data to {}", to);
    }

    let report = runner.rollback(&to).await?;
    for step in &report.steps {
        println!("  {:<28} {:>6} rows", step.job.to_string(), step.affected);
    }
    println!("Rolled back to {}: {} rows affected", to, report.affected());
    Ok(())
}
