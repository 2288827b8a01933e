use aws_config::{BehaviorVersion, Region};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todo_tracker::api::{self, AppState};
use todo_tracker::config::AppConfig;

#[derive(Parser)]
#[command(name = "todo-tracker")]
#[command(about = "Task tracking service with CSV exports")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Keep everything in process instead of talking to AWS
        #[arg(long)]
        in_memory: bool,
    },
    /// Print the current feature flags as JSON
    Flags,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "todo_tracker=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn build_state(config: &AppConfig, in_memory: bool) -> AppState {
    if in_memory {
        tracing::warn!("Running with in-memory adapters; data is lost on exit");
        return AppState::in_memory(config);
    }

    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await;
    AppState::from_aws(&sdk_config, config)
}

async fn serve(config: AppConfig, host: &str, port: u16, in_memory: bool) -> anyhow::Result<()> {
    let state = build_state(&config, in_memory).await;
    let app = api::create_router(state);

    tracing::info!(
        table = %config.table_name,
        bucket = %config.bucket_name,
        environment = config.environment.as_str(),
        "Starting todo-tracker"
    );

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!("todo-tracker listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = AppConfig::from_env()?;

    match cli.command {
        Some(Commands::Serve {
            host,
            port,
            in_memory,
        }) => serve(config, &host, port, in_memory).await?,
        Some(Commands::Flags) => {
            let state = build_state(&config, false).await;
            let flags = state.flags.fetch_all().await;
            println!("{}", serde_json::to_string_pretty(&flags)?);
        }
        None => serve(config, "127.0.0.1", 3000, false).await?,
    }

    Ok(())
}
