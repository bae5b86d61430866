//! Deployment mirror commands.

use anyhow::{Context, Result};
use devtime_core::{Item, ResourceLevel};

use super::Project;

pub async fn show(project: &Project) -> Result<()> {
    let mirror = project.synchronizer.mirror();

    let mut pending: Vec<(Item, usize)> = mirror
        .children(None)
        .await?
        .into_iter()
        .rev()
        .map(|i| (i, 0))
        .collect();
    while let Some((item, depth)) = pending.pop() {
        print_item(&item, depth);
        if !item.item_type.is_service() {
            let children = mirror.children(Some(&item)).await?;
            pending.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
    }

    let data_sources = mirror.data_sources().await?;
    if !data_sources.is_empty() {
        println!("data sources:");
        for item in &data_sources {
            print_item(item, 1);
        }
    }
    Ok(())
}

fn print_item(item: &Item, depth: usize) {
    let indent = "  ".repeat(depth);
    match (&item.state, item.is_valid()) {
        (_, true) => println!("{}{}  {}", indent, item.name, item.remote_uri),
        (state, false) => println!(
            "{}{}  {}  [{}: {}]",
            indent,
            item.name,
            item.remote_uri,
            state.as_deref().unwrap_or("unknown"),
            item.reason.as_deref().unwrap_or("")
        ),
    }
}

pub async fn refresh_apps(project: &Project, deep: bool) -> Result<()> {
    let apps = if deep {
        project.synchronizer.refresh_all().await?
    } else {
        project.synchronizer.refresh_app_list().await?
    };
    println!("Mirrored {} application(s)", apps.len());
    Ok(())
}

pub async fn refresh_app(project: &Project, name: &str) -> Result<()> {
    let uri = project.application_uri(name);
    project
        .synchronizer
        .refresh_application(&uri)
        .await
        .with_context(|| format!("Failed to refresh {}", uri))?;
    println!("Mirrored {}", uri);
    Ok(())
}

pub async fn refresh_data_sources(project: &Project) -> Result<()> {
    let names = project.synchronizer.refresh_data_source_list().await?;
    println!("Mirrored {} data source(s)", names.len());
    Ok(())
}

pub async fn refresh_service(project: &Project, service: &str) -> Result<()> {
    let uri = project.resource_uri(service)?;
    let item = project
        .synchronizer
        .refresh_service(&uri)
        .await
        .with_context(|| format!("Failed to refresh {}", uri))?;
    print_item(&item, 0);
    Ok(())
}

pub async fn refresh_data_source(project: &Project, name: &str) -> Result<()> {
    let path = project.synchronizer.refresh_data_source(name).await?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub async fn show_data_source(project: &Project, name: &str) -> Result<()> {
    let uri = project.application_uri(name);
    match project.synchronizer.application_data_source(&uri).await? {
        Some(data_source) => println!(
            "{}  {} {}@{}:{}/{}",
            uri,
            data_source.db_type,
            data_source.username,
            data_source.host,
            data_source.port,
            data_source.database
        ),
        None => println!("{} has no deployed data source", uri),
    }
    Ok(())
}

pub async fn tests(project: &Project, service: &str) -> Result<()> {
    let uri = project.resource_uri(service)?;
    if uri.level() != ResourceLevel::Service {
        anyhow::bail!("{} is not a service identity", service);
    }
    let item = project
        .synchronizer
        .mirror()
        .find(&uri)
        .await
        .with_context(|| format!("{} is not mirrored; run `devtime refresh app` first", uri))?;
    let path = project.synchronizer.reload_tests(&item).await?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub async fn clean_app(project: &Project, name: &str) -> Result<()> {
    let uri = project.application_uri(name);
    project.synchronizer.clean_application(&uri).await?;
    println!("Cleaned {}", uri);
    Ok(())
}

pub async fn clean_data_source(project: &Project, name: &str) -> Result<()> {
    project.synchronizer.clean_data_source(name).await?;
    println!("Cleaned data source {}", name);
    Ok(())
}

pub async fn clean_workspace(project: &Project) -> Result<()> {
    project.synchronizer.clean_workspace().await?;
    println!("Cleaned workspace");
    Ok(())
}
