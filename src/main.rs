// Personal Vault - Server
// Serves the JSON API and the embedded dashboard.

use anyhow::{Context, Result};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

use personal_vault::{api, db, AppState, GoldPriceClient};

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_PRICE_URL: &str = "https://data-asg.goldprice.org";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_path = env::var("VAULT_DB").unwrap_or_else(|_| db::DEFAULT_DB_PATH.to_string());
    let addr = env::var("VAULT_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let price_url =
        env::var("VAULT_GOLD_PRICE_URL").unwrap_or_else(|_| DEFAULT_PRICE_URL.to_string());

    // A storage failure at startup is fatal; there is nothing to serve
    // without the vault file.
    let conn = db::open_database(&db_path)?;
    info!("database ready at {db_path}");

    let state = AppState::new(conn, GoldPriceClient::new(price_url));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("vault server listening on http://{addr}");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
