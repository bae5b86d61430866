//! Deployment and data source commands.

use anyhow::{Context, Result};
use devtime_core::remote::DeployOutcome;
use std::path::Path;

use super::Project;

/// Report the backend's view of the deployed services; invalid ones are not
/// an error.
pub fn print_outcome(outcome: &DeployOutcome) {
    println!("Deployed {} service(s)", outcome.services.len());
    for service in outcome.invalid_services() {
        println!(
            "  ! {} is invalid: {}",
            service.uri,
            service.reason.as_deref().unwrap_or("no reason given")
        );
    }
}

pub async fn deploy(project: &Project, path: &Path) -> Result<()> {
    let entry = project.entry(path).await?;
    let outcome = project
        .coordinator
        .deploy(&entry)
        .await
        .with_context(|| format!("Failed to deploy {}", path.display()))?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn undeploy(project: &Project, path: &Path) -> Result<()> {
    let entry = project.entry(path).await?;
    project
        .coordinator
        .undeploy(&entry)
        .await
        .with_context(|| format!("Failed to undeploy {}", path.display()))?;
    println!("Undeployed {}", path.display());
    Ok(())
}

pub async fn redeploy(project: &Project, path: &Path) -> Result<()> {
    let entry = project.entry(path).await?;
    let outcome = project
        .coordinator
        .redeploy(&entry)
        .await
        .with_context(|| format!("Failed to redeploy {}", path.display()))?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn test_data_source(project: &Project, path: &Path) -> Result<()> {
    let entry = project.entry(path).await?;
    project.coordinator.test_data_source(&entry).await?;
    println!("Data source connection succeeded");
    Ok(())
}

pub async fn deploy_data_source(project: &Project, path: &Path) -> Result<()> {
    let entry = project.entry(path).await?;
    project.coordinator.deploy_data_source(&entry).await?;
    println!("Data source deployed");
    Ok(())
}

pub async fn store_password(project: &Project, path: &Path, password: &str) -> Result<()> {
    let entry = project.entry(path).await?;
    project.coordinator.store_password(&entry, password).await?;
    println!("Password saved; it is vaulted on the next successful test or deploy");
    Ok(())
}
