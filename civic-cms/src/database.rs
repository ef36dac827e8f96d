//! PostgreSQL connection pool management

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::{config::DatabaseConfig, error::Result};

/// Create a PostgreSQL connection pool, retrying with exponential backoff
/// up to `max_retries` times
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                tracing::info!(
                    attempts = attempt + 1,
                    max_connections = config.max_connections,
                    min_connections = config.min_connections,
                    "Database connection pool created"
                );
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    tracing::error!(
                        url = %sanitize_connection_url(&config.url),
                        "Failed to connect to database after {} attempts: {}",
                        config.max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.pow(attempt.saturating_sub(1));
                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn try_create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| {
            crate::error::Error::Internal(format!(
                "Failed to connect to database at '{}' ({}): {}",
                sanitize_connection_url(&config.url),
                categorize_db_error(&e),
                e
            ))
        })
}

/// Mask the password of a connection URL for logging
fn sanitize_connection_url(url: &str) -> String {
    if let (Some(scheme_end), Some(at_pos)) = (url.find("://"), url.rfind('@')) {
        let credentials = &url[scheme_end + 3..at_pos];
        if let Some(colon_pos) = credentials.find(':') {
            return format!(
                "{}{}:***{}",
                &url[..scheme_end + 3],
                &credentials[..colon_pos],
                &url[at_pos..]
            );
        }
    }
    url.to_string()
}

fn categorize_db_error(err: &sqlx::Error) -> &'static str {
    use sqlx::Error;
    match err {
        Error::Configuration(_) => "configuration error",
        Error::Database(_) => "database error",
        Error::Io(_) => "network I/O error, check connectivity",
        Error::Tls(_) => "TLS error, check certificate configuration",
        Error::PoolTimedOut => "connection pool timeout",
        Error::PoolClosed => "connection pool closed",
        _ => "connection error",
    }
}
