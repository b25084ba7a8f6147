use super::runner;
use anyhow::{bail, Result};
use stepwise::{MigratorConfig, Version};

/// Run the catalog forward, up to `to` when given
pub async fn run(
    config: &MigratorConfig,
    to: Option<Version>,
    page_size: Option<u64>,
) -> Result<()> {
    let mut options = config.run_options();
    if let Some(size) = page_size {
        if size == 0 {
            bail!("--page-size must be greater than zero");
        }
        options = options.with_page_size(size);
    }

    let runner = runner(config).await?;
    match &to {
        Some(version) => println!("Migrating to {}", version),
        None => println!("Migrating to the latest version"),
    }

    let report = runner.migrate(to.as_ref(), &options).await?;
    for job in &report.jobs {
        println!(
            "  {:<28} {:>6} rows {:>4} pages  created {:>6}  revised {:>6}  skipped {:>4}",
            job.job.to_string(),
            job.size,
            job.pages,
            job.rows.created,
            job.rows.revised,
            job.rows.skipped
        );
    }

    let totals = report.totals();
    match report.reached() {
        Some(version) => println!(
            "Done at {}: {} read, {} written, {} skipped",
            version,
            totals.read,
            totals.written(),
            totals.skipped
        ),
        None => println!("Nothing to migrate"),
    }
    Ok(())
}
