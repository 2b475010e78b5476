use mongodb::{Client, bson::doc};

use super::MongoError;

/// Send `{ ping: 1 }` to the `admin` database
///
/// This is the liveness probe: the first call that actually reaches the
/// server, so an unreachable host fails here with
/// [`MongoError::ConnectionFailed`] after the server-selection timeout.
pub async fn ping(client: &Client) -> Result<(), MongoError> {
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await?;
    Ok(())
}
