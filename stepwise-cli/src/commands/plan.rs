use super::detached_stores;
use anyhow::{bail, Result};
use stepwise::catalog;
use stepwise::{Runner, Version};

/// Print the jobs a forward run would execute
pub fn run(to: Option<Version>, format: &str) -> Result<()> {
    let runner = Runner::new(catalog::registry(&detached_stores())?);
    let plan = runner.plan(to.as_ref());

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&plan)?),
        "table" => {
            if plan.is_empty() {
                println!("No jobs to run.");
                return Ok(());
            }
            println!(
                "{:<8} {:<6} {:<8} {:<8} {}",
                "VERSION", "ORDER", "ENTITY", "KIND", "REVERTS TO"
            );
            for job in &plan {
                let reverts_to = job
                    .reverts_to
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<8} {:<6} {:<8} {:<8} {}",
                    job.version.to_string(),
                    job.order,
                    job.entity,
                    job.kind.as_str(),
                    reverts_to
                );
            }
        }
        other => bail!("Unsupported format '{}'. Use table or json", other),
    }
    Ok(())
}
