use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use crate::common::{RetryConfig, retry, retry_with_backoff};

/// Connect to Redis and return a [`ConnectionManager`].
///
/// The ConnectionManager automatically handles connection failures and
/// reconnections. The initial connection is verified with a PING.
///
/// # Example
/// ```ignore
/// use redis::AsyncCommands;
///
/// let mut conn = database::redis::connect("redis://127.0.0.1:6379").await?;
/// conn.set::<_, _, ()>("key", "value").await?;
/// ```
pub async fn connect(url: &str) -> redis::RedisResult<ConnectionManager> {
    info!("Attempting to connect to Redis at {}", url);

    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!("Successfully connected to Redis");
    Ok(manager)
}

/// Connect to Redis with automatic retry on failure.
pub async fn connect_with_retry(
    url: &str,
    retry_config: Option<RetryConfig>,
) -> redis::RedisResult<ConnectionManager> {
    let url_owned = url.to_string();

    match retry_config {
        Some(config) => retry_with_backoff(|| connect(&url_owned), config).await,
        None => retry(|| connect(&url_owned)).await,
    }
}
