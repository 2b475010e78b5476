use async_trait::async_trait;

use crate::error::ProvisionResult;
use crate::models::{UserRecord, UserSpec};

/// Administrative interface of the database server
///
/// One implementation owns one live connection. Everything the provisioner
/// does to the server goes through this trait, so the workflow can be
/// exercised against mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServerAdmin: Send + Sync {
    /// Liveness probe
    async fn health_check(&self) -> ProvisionResult<()>;

    /// Create a collection; fails with `AlreadyExists` if the namespace is taken
    async fn create_collection(&self, database: &str, collection: &str) -> ProvisionResult<()>;

    /// Drop a collection; a missing collection is not an error
    async fn drop_collection(&self, database: &str, collection: &str) -> ProvisionResult<()>;

    /// Names of the databases the server currently lists
    async fn list_databases(&self) -> ProvisionResult<Vec<String>>;

    /// The user named exactly `username` in `auth_database`, if any
    async fn find_user(
        &self,
        auth_database: &str,
        username: &str,
    ) -> ProvisionResult<Option<UserRecord>>;

    async fn create_user(&self, auth_database: &str, spec: &UserSpec) -> ProvisionResult<()>;

    async fn update_user(&self, auth_database: &str, spec: &UserSpec) -> ProvisionResult<()>;

    /// Release the connection. Never fails; problems are logged.
    async fn disconnect(&self);
}
