//! devtime CLI tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Project;

#[derive(Parser)]
#[command(name = "devtime")]
#[command(about = "Local project model of a low-code service builder", long_about = None)]
struct Cli {
    /// Workspace root, the folder holding devtime.kdl
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Deployment API URL, overriding the settings file
    #[arg(long, env = "DEVTIME_ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer token, overriding the stored session token
    #[arg(long, env = "DEVTIME_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the session token for this workspace
    Login {
        /// Authentication token
        #[arg(long)]
        token: String,
    },
    /// Print the local resource tree
    Tree {
        /// Start below this path instead of the workspace root
        path: Option<PathBuf>,
    },
    /// Print the deployment mirror
    Mirror,
    /// Create an application, module or service
    Create {
        #[command(subcommand)]
        command: CreateCommands,
    },
    /// Delete a local resource
    Delete {
        /// Path relative to the workspace root
        path: PathBuf,
    },
    /// Rename an application, module or service and redeploy it
    Rename {
        /// Path relative to the workspace root
        path: PathBuf,
        /// New name
        name: String,
    },
    /// Deploy the application, module or service at a path
    Deploy {
        /// Path relative to the workspace root
        path: PathBuf,
    },
    /// Undeploy the application, module or service at a path
    Undeploy {
        /// Path relative to the workspace root
        path: PathBuf,
    },
    /// Undeploy then deploy the application, module or service at a path
    Redeploy {
        /// Path relative to the workspace root
        path: PathBuf,
    },
    /// Refresh the deployment mirror from the backend
    Refresh {
        #[command(subcommand)]
        command: RefreshCommands,
    },
    /// Write the request script of a deployed service's tests
    Tests {
        /// Service identity, e.g. shop/orders/list
        service: String,
    },
    /// Test or deploy an application's data source
    Datasource {
        #[command(subcommand)]
        command: DataSourceCommands,
    },
    /// Remove deployed resources from the backend
    Clean {
        #[command(subcommand)]
        command: CleanCommands,
    },
}

#[derive(Subcommand)]
enum CreateCommands {
    /// Create an application
    App {
        /// Application name
        name: String,
    },
    /// Create a module in an application
    Module {
        /// Path of the application, relative to the workspace root
        app: PathBuf,
        /// Module name
        name: String,
    },
    /// Create a service in a module
    Service {
        /// Path of the module, relative to the workspace root
        module: PathBuf,
        /// Service name
        name: String,
        /// Service kind: query, sql or crud
        #[arg(long = "type", default_value = "query")]
        kind: String,
    },
}

#[derive(Subcommand)]
enum RefreshCommands {
    /// Replace the application list
    Apps {
        /// Also fetch every application's modules and services
        #[arg(long)]
        deep: bool,
    },
    /// Replace one application's modules and services
    App {
        /// Application name
        name: String,
    },
    /// Rewrite one mirrored service with its current remote state
    Service {
        /// Service identity, e.g. shop/orders/list
        service: String,
    },
    /// Replace the data source list
    Datasources,
    /// Rewrite one mirrored data source
    Datasource {
        /// Data source name
        name: String,
    },
}

#[derive(Subcommand)]
enum DataSourceCommands {
    /// Show the data source the backend holds for an application
    Show {
        /// Application name
        name: String,
    },
    /// Check the connection of an application's data source
    Test {
        /// Any path inside the application
        path: PathBuf,
    },
    /// Deploy an application's data source
    Deploy {
        /// Any path inside the application
        path: PathBuf,
    },
    /// Re-enter a data source password
    Password {
        /// Any path inside the application
        path: PathBuf,
        /// The password
        #[arg(long, env = "DEVTIME_DATASOURCE_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum CleanCommands {
    /// Remove an application from the backend
    App {
        /// Application name
        name: String,
    },
    /// Remove a data source from the backend
    Datasource {
        /// Data source name
        name: String,
    },
    /// Remove everything deployed in the workspace
    Workspace,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let project = Project::open(&cli.root, cli.endpoint.as_deref(), cli.token).await?;

    match cli.command {
        Commands::Login { token } => {
            commands::login(&project, &token).await?;
        }
        Commands::Tree { path } => {
            commands::project::tree(&project, path.as_deref()).await?;
        }
        Commands::Mirror => {
            commands::mirror::show(&project).await?;
        }
        Commands::Create { command } => match command {
            CreateCommands::App { name } => {
                commands::project::create_app(&project, &name).await?;
            }
            CreateCommands::Module { app, name } => {
                commands::project::create_module(&project, &app, &name).await?;
            }
            CreateCommands::Service { module, name, kind } => {
                commands::project::create_service(&project, &module, &name, &kind).await?;
            }
        },
        Commands::Delete { path } => {
            commands::project::delete(&project, &path).await?;
        }
        Commands::Rename { path, name } => {
            commands::project::rename(&project, &path, &name).await?;
        }
        Commands::Deploy { path } => {
            commands::deploy::deploy(&project, &path).await?;
        }
        Commands::Undeploy { path } => {
            commands::deploy::undeploy(&project, &path).await?;
        }
        Commands::Redeploy { path } => {
            commands::deploy::redeploy(&project, &path).await?;
        }
        Commands::Refresh { command } => match command {
            RefreshCommands::Apps { deep } => {
                commands::mirror::refresh_apps(&project, deep).await?;
            }
            RefreshCommands::App { name } => {
                commands::mirror::refresh_app(&project, &name).await?;
            }
            RefreshCommands::Service { service } => {
                commands::mirror::refresh_service(&project, &service).await?;
            }
            RefreshCommands::Datasources => {
                commands::mirror::refresh_data_sources(&project).await?;
            }
            RefreshCommands::Datasource { name } => {
                commands::mirror::refresh_data_source(&project, &name).await?;
            }
        },
        Commands::Tests { service } => {
            commands::mirror::tests(&project, &service).await?;
        }
        Commands::Datasource { command } => match command {
            DataSourceCommands::Show { name } => {
                commands::mirror::show_data_source(&project, &name).await?;
            }
            DataSourceCommands::Test { path } => {
                commands::deploy::test_data_source(&project, &path).await?;
            }
            DataSourceCommands::Deploy { path } => {
                commands::deploy::deploy_data_source(&project, &path).await?;
            }
            DataSourceCommands::Password { path, password } => {
                commands::deploy::store_password(&project, &path, &password).await?;
            }
        },
        Commands::Clean { command } => match command {
            CleanCommands::App { name } => {
                commands::mirror::clean_app(&project, &name).await?;
            }
            CleanCommands::Datasource { name } => {
                commands::mirror::clean_data_source(&project, &name).await?;
            }
            CleanCommands::Workspace => {
                commands::mirror::clean_workspace(&project).await?;
            }
        },
    }

    project.close().await
}
