// src/main.rs

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

use switchboard::config::CONFIG;
use switchboard::storage::{UserStore, migration};
use switchboard::{AppState, api_router};

#[derive(Parser)]
#[command(name = "switchboard", about = "Multi-provider chat orchestration backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create the default dev user and session token
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("switchboard=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    let options = SqliteConnectOptions::from_str(&CONFIG.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(CONFIG.sqlite_max_connections)
        .connect_with(options)
        .await?;

    migration::run(&pool).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Seed => seed(pool).await,
        Command::Serve => serve(pool).await,
    }
}

async fn serve(pool: sqlx::SqlitePool) -> Result<()> {
    let state = AppState::from_pool(pool);
    let app = api_router(state);

    let bind_address = CONFIG.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("listening on http://{bind_address}");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Idempotent dev seed: a default user plus a long-lived session token so
/// the API is usable without a separate identity provider.
async fn seed(pool: sqlx::SqlitePool) -> Result<()> {
    let users = UserStore::new(pool);

    users
        .upsert_user("default-user", "user@switchboard.dev", Some("User"))
        .await?;
    users
        .create_session(
            &CONFIG.seed_session_token,
            "default-user",
            Utc::now() + ChronoDuration::days(30),
        )
        .await?;

    info!("seeded default user");
    println!("session token: {}", CONFIG.seed_session_token);
    Ok(())
}
