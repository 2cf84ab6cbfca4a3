//! Autoschema server
//!
//! Reflects the tables of a SQLite database and serves the generated
//! GraphQL API at /graphql.

mod config;
mod server;

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Context;
use autoschema::{ModelRegistry, SchemaBuilder};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, LogFormat};
use crate::server::AppState;

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "autoschema=debug,autoschema_server=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!("Starting autoschema server");

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .with_context(|| format!("Invalid DATABASE_URL {}", config.database_url))?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;
    tracing::info!(url = %config.database_url, "Database connected");

    let registry = ModelRegistry::reflect(&pool)
        .await
        .context("Failed to reflect database tables")?;
    tracing::info!(models = registry.len(), "Reflected database tables");

    let schema = SchemaBuilder::new(registry)
        .options(config.schema.clone())
        .build(&pool)
        .await
        .context("Failed to build GraphQL schema")?;

    let app = server::router(AppState { schema, pool });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let host = config.host.as_deref().unwrap_or("localhost");
    tracing::info!("Listening on {}", addr);
    tracing::info!("GraphiQL: http://{}:{}/graphql", host, config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
