//! Local tree commands.

use anyhow::{Context, Result};
use devtime_core::Entry;
use devtime_core::descriptor::ServiceType;
use std::path::Path;

use super::Project;

/// Print the tree depth first, children in display order.
pub async fn tree(project: &Project, path: Option<&Path>) -> Result<()> {
    let tree = project.coordinator.tree();
    let start = match path {
        Some(path) => vec![(project.entry(path).await?, 0)],
        None => tree
            .children(None)
            .await?
            .into_iter()
            .rev()
            .map(|e| (e, 0))
            .collect(),
    };

    let mut pending = start;
    while let Some((entry, depth)) = pending.pop() {
        print_entry(&entry, depth);
        if entry.is_dir() {
            let children = tree.children(Some(&entry)).await?;
            pending.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
    }
    Ok(())
}

fn print_entry(entry: &Entry, depth: usize) {
    let suffix = if entry.is_dir() { "/" } else { "" };
    println!(
        "{}{}{}  [{}]",
        "  ".repeat(depth),
        entry.name,
        suffix,
        entry.entry_type
    );
}

pub async fn create_app(project: &Project, name: &str) -> Result<()> {
    let app = project.coordinator.create_application(name).await?;
    println!("Created application {}", app.path.display());
    Ok(())
}

pub async fn create_module(project: &Project, app: &Path, name: &str) -> Result<()> {
    let app = project.entry(app).await?;
    let module = project.coordinator.create_module(&app, name).await?;
    println!("Created module {}", module.path.display());
    Ok(())
}

pub async fn create_service(project: &Project, module: &Path, name: &str, kind: &str) -> Result<()> {
    let service_type: ServiceType = kind.parse()?;
    let module = project.entry(module).await?;
    let service = project
        .coordinator
        .create_service(&module, name, service_type)
        .await?;
    println!("Created {} service {}", service_type, service.path.display());
    Ok(())
}

pub async fn delete(project: &Project, path: &Path) -> Result<()> {
    let entry = project.entry(path).await?;
    project.coordinator.delete(&entry).await?;
    println!("Deleted {}", entry.path.display());
    Ok(())
}

pub async fn rename(project: &Project, path: &Path, name: &str) -> Result<()> {
    let entry = project.entry(path).await?;
    let outcome = project
        .coordinator
        .rename(&entry, name)
        .await
        .with_context(|| format!("Failed to rename {}", entry.path.display()))?;

    println!("Renamed {} to {}", outcome.from, outcome.to);
    if outcome.secret_migrated {
        println!("Data source password moved to the new identity");
    }
    super::deploy::print_outcome(&outcome.deploy);
    Ok(())
}
