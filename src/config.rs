use anyhow::{Context, Result};
use chrono::Duration as TokenTtl;
use moka::future::Cache;
use sea_orm::Database;
use std::time::Duration;

use crate::auth::token::TokenService;
use crate::schemas::AppState;
use crate::services::mail::{MailClient, MailConfig};
use crate::services::media::{MediaClient, MediaHostConfig};

/// Default lifetime of an issued token, in seconds.
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Initialize application configuration and state
pub async fn initialize_app_state() -> Result<AppState> {
    // Load configuration
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://way2pg.db".to_string());

    initialize_app_state_with_url(&database_url).await
}

/// Initialize application state against an explicit database URL
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    // Connect to database
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    // Cache for the public listings page; short-lived, also invalidated
    // on every listing/approval mutation
    let cache = Cache::builder()
        .max_capacity(1000)
        .time_to_live(Duration::from_secs(60))
        .build();

    let secret = std::env::var("TOKEN_SECRET")
        .context("TOKEN_SECRET must be set to a server-held signing secret")?;
    let ttl_secs = std::env::var("TOKEN_TTL_SECS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
    let tokens = TokenService::new(&secret, TokenTtl::seconds(ttl_secs));

    let media = MediaClient::new(MediaHostConfig::from_env());
    let mailer = MailClient::new(MailConfig::from_env());

    Ok(AppState {
        db,
        cache,
        tokens,
        media,
        mailer,
    })
}

/// Get bind address from environment or use default
pub fn get_bind_address() -> String {
    std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}
