use mongodb::{Client, options::ClientOptions};
use std::time::Duration;
use tracing::{debug, info};

use super::{MongoConfig, MongoError};

/// Build a MongoDB client using a MongoConfig
///
/// The driver connects lazily: this validates and resolves the URI but does
/// not talk to the server. Use [`super::ping`] to verify reachability.
///
/// Fails with [`MongoError::ConnectionFailed`] when the connection string
/// cannot be parsed or its hosts cannot be resolved.
///
/// # Example
/// ```ignore
/// use database::mongodb::{MongoConfig, connect_from_config};
///
/// let config = MongoConfig::new("mongodb://localhost:27017").with_app_name("provisioner");
/// let client = connect_from_config(&config).await?;
/// ```
pub async fn connect_from_config(config: &MongoConfig) -> Result<Client, MongoError> {
    info!("Attempting to connect to MongoDB at {}", config.redacted_url());

    let mut options = ClientOptions::parse(&config.url)
        .await
        .map_err(|e| MongoError::ConnectionFailed(format!("invalid connection string: {}", e)))?;

    options.max_pool_size = Some(config.max_pool_size);
    options.min_pool_size = Some(0);
    options.connect_timeout = Some(Duration::from_secs(config.connect_timeout_secs));
    options.server_selection_timeout =
        Some(Duration::from_secs(config.server_selection_timeout_secs));

    if let Some(ref app_name) = config.app_name {
        options.app_name = Some(app_name.clone());
    }

    let client = Client::with_options(options)
        .map_err(|e| MongoError::ConnectionFailed(e.to_string()))?;

    debug!("MongoDB client created");
    Ok(client)
}

/// Close all connections held by the client
///
/// Waits for in-flight operations on the client to finish first.
pub async fn disconnect(client: Client) {
    client.shutdown().await;
    info!("MongoDB connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_invalid_uri() {
        let result = connect_from_config(&MongoConfig::new("not-a-mongodb-uri")).await;
        assert!(matches!(result, Err(MongoError::ConnectionFailed(ref m)) if m.contains("invalid connection string")));
    }

    #[tokio::test]
    async fn test_connect_is_lazy() {
        // Nothing listens on port 1; building the client must still succeed
        let config = MongoConfig::new("mongodb://127.0.0.1:1").with_timeouts(1, 1);
        let client = connect_from_config(&config).await;
        assert!(client.is_ok());
        disconnect(client.unwrap()).await;
    }

    #[tokio::test]
    #[ignore] // Requires actual MongoDB
    async fn test_connect() {
        let mongo_url = std::env::var("MONGODB_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let result = connect_from_config(&MongoConfig::new(mongo_url)).await;
        assert!(result.is_ok());
    }
}
