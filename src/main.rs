use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "elbindex")]
#[command(
    about = "Index compressed load balancer access logs into a search backend",
    long_about = None
)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one object-store notification and exit
    Run {
        /// Notification JSON file, or - for stdin
        #[arg(long, default_value = "-")]
        event: PathBuf,
    },
    /// Accept notifications over HTTP
    Serve,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elbindex=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = elbindex::config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Commands::Run { event } => {
            elbindex::cli::run::run(config_path, event).await?;
        }
        Commands::Serve => {
            elbindex::cli::run::serve(config_path).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { stdout } => {
                elbindex::cli::config::init(stdout)?;
            }
            ConfigAction::Validate => {
                elbindex::cli::config::validate(config_path)?;
            }
        },
    }

    Ok(())
}
