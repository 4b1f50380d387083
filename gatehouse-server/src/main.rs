use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse_server::{
    AppState, create_app,
    infra::{
        config::Config,
        startup::{ProdStartupHooks, StartupHooks, connect_database, shutdown_signal},
    },
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "gatehouse-server")]
#[command(about = "Authentication and role-based access control service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    config: Config,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenvy::dotenv().is_ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if env_loaded {
        info!("loaded .env file");
    }

    match cli.command {
        Some(Command::Db(DbCommand::Migrate)) => {
            connect_database(&cli.config).await?;
            info!("database migrations applied successfully");
            Ok(())
        }
        None => run_server(cli.config).await,
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    info!(?config, "starting gatehouse-server");
    let addr = config.listen_addr()?;

    let pool = connect_database(&config).await?;
    let state = AppState::from_config(&config, pool)
        .context("invalid security configuration")?;

    ProdStartupHooks {
        bootstrap_admin_email: config.bootstrap_admin_email.clone(),
    }
    .run(&state)
    .await?;

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}
