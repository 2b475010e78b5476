//! MongoDB test infrastructure
//!
//! Provides a `TestMongo` helper that creates a MongoDB container for testing.

use mongodb::Client;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::mongo::Mongo;

/// Test MongoDB wrapper that ensures proper cleanup
///
/// The container runs without access control, so every administrative
/// command (createUser, updateUser, create/drop collection) is allowed.
/// It is stopped and removed when this struct is dropped.
///
/// # Example
///
/// ```no_run
/// use test_utils::TestMongo;
///
/// # async fn example() {
/// let mongo = TestMongo::new().await;
/// let names = mongo.client().list_database_names().await.unwrap();
/// assert!(names.contains(&"admin".to_string()));
/// # }
/// ```
pub struct TestMongo {
    #[allow(dead_code)]
    container: ContainerAsync<Mongo>,
    client: Client,
    pub connection_string: String,
}

impl TestMongo {
    /// Create a new test MongoDB instance
    ///
    /// Uses the MongoDB 7.0 image by default.
    pub async fn new() -> Self {
        let mongo_image = Mongo::default().with_tag("7.0");

        let container = mongo_image
            .start()
            .await
            .expect("Failed to start MongoDB container");

        let host_port = container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get MongoDB port");

        let connection_string = format!("mongodb://127.0.0.1:{}", host_port);

        let client = Client::with_uri_str(&connection_string)
            .await
            .expect("Failed to create MongoDB client");

        tracing::info!(port = host_port, "Test MongoDB ready (mongo 7.0)");

        Self {
            container,
            client,
            connection_string,
        }
    }

    /// Get a cloned client (clones share the same connection pool)
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Get the connection string for manual client creation
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

// Container is automatically cleaned up when TestMongo is dropped
impl Drop for TestMongo {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test MongoDB container");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{Document, doc};

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_mongo_ping() {
        let mongo = TestMongo::new().await;
        let response = mongo
            .client()
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .unwrap();
        assert!(response.contains_key("ok"));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_mongo_insert_and_count() {
        let mongo = TestMongo::new().await;
        let collection = mongo.client().database("scratch").collection::<Document>("items");

        collection.insert_one(doc! { "name": "a" }).await.unwrap();
        let count = collection.count_documents(doc! {}).await.unwrap();
        assert_eq!(count, 1);
    }
}
