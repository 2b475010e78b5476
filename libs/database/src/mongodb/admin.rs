//! Administrative commands: collections, database listing and user management
//!
//! Thin typed wrappers over `run_command`. Each returns [`MongoError`] with
//! the driver failure already classified.

use mongodb::{
    Client,
    bson::{Bson, Document, doc, from_document},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument};

use super::MongoError;

/// Authentication database used by users backed by an external identity
/// provider (LDAP, x.509, Kerberos)
pub const EXTERNAL_AUTH_DATABASE: &str = "$external";

/// A role granted on one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: String,
    pub db: String,
}

impl RoleGrant {
    pub fn new(role: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            db: db.into(),
        }
    }

    fn to_document(&self) -> Document {
        doc! { "role": self.role.as_str(), "db": self.db.as_str() }
    }
}

impl fmt::Display for RoleGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.role, self.db)
    }
}

/// A user record as returned by `usersInfo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user: String,
    pub db: String,
    #[serde(default)]
    pub roles: Vec<RoleGrant>,
    /// Credential mechanisms, e.g. `SCRAM-SHA-256`; empty for external users
    #[serde(default)]
    pub mechanisms: Vec<String>,
}

impl UserInfo {
    /// Whether this account stores a password on the server
    pub fn has_server_credentials(&self) -> bool {
        self.db != EXTERNAL_AUTH_DATABASE && !self.mechanisms.is_empty()
    }

    pub fn has_role(&self, grant: &RoleGrant) -> bool {
        self.roles.iter().any(|r| r == grant)
    }
}

/// Arguments for `createUser` / `updateUser`
#[derive(Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub username: String,
    /// `None` leaves the stored password untouched (update only)
    pub password: Option<String>,
    pub roles: Vec<RoleGrant>,
}

impl fmt::Debug for UserSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSpec")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("roles", &self.roles)
            .finish()
    }
}

impl UserSpec {
    fn command(&self, name: &str) -> Document {
        let roles: Vec<Document> = self.roles.iter().map(RoleGrant::to_document).collect();
        let mut command = Document::new();
        command.insert(name, self.username.as_str());
        if let Some(ref password) = self.password {
            command.insert("pwd", password.as_str());
        }
        command.insert("roles", roles);
        command
    }
}

/// Create a collection in `database`
///
/// Fails with [`MongoError::AlreadyExists`] when the namespace is taken.
#[instrument(skip(client))]
pub async fn create_collection(
    client: &Client,
    database: &str,
    collection: &str,
) -> Result<(), MongoError> {
    client
        .database(database)
        .create_collection(collection)
        .await?;
    debug!("Collection created");
    Ok(())
}

/// Drop a collection; dropping a missing collection is not an error
#[instrument(skip(client))]
pub async fn drop_collection(
    client: &Client,
    database: &str,
    collection: &str,
) -> Result<(), MongoError> {
    match client
        .database(database)
        .collection::<Document>(collection)
        .drop()
        .await
        .map_err(MongoError::from)
    {
        Ok(()) | Err(MongoError::NotFound(_)) => {
            debug!("Collection dropped");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Names of the databases the server currently reports
pub async fn list_database_names(client: &Client) -> Result<Vec<String>, MongoError> {
    Ok(client.list_database_names().await?)
}

/// Look up users named exactly `username` in `auth_database`
#[instrument(skip(client))]
pub async fn users_info(
    client: &Client,
    auth_database: &str,
    username: &str,
) -> Result<Vec<UserInfo>, MongoError> {
    let response = client
        .database(auth_database)
        .run_command(doc! { "usersInfo": 1, "filter": { "user": username } })
        .await?;

    let users = parse_users_info(response)?;
    Ok(users.into_iter().filter(|u| u.user == username).collect())
}

fn parse_users_info(response: Document) -> Result<Vec<UserInfo>, MongoError> {
    let users = response
        .get_array("users")
        .map_err(|e| MongoError::InvalidResponse(format!("usersInfo: {}", e)))?;

    users
        .iter()
        .map(|entry| match entry {
            Bson::Document(user) => from_document::<UserInfo>(user.clone())
                .map_err(|e| MongoError::InvalidResponse(format!("usersInfo entry: {}", e))),
            other => Err(MongoError::InvalidResponse(format!(
                "usersInfo entry is not a document: {}",
                other
            ))),
        })
        .collect()
}

/// Run `createUser` against `auth_database`
#[instrument(skip(client), fields(username = %spec.username))]
pub async fn create_user(
    client: &Client,
    auth_database: &str,
    spec: &UserSpec,
) -> Result<(), MongoError> {
    client
        .database(auth_database)
        .run_command(spec.command("createUser"))
        .await?;
    Ok(())
}

/// Run `updateUser` against `auth_database`
///
/// Replaces the role list; changes the password only when `spec.password`
/// is set.
#[instrument(skip(client), fields(username = %spec.username))]
pub async fn update_user(
    client: &Client,
    auth_database: &str,
    spec: &UserSpec,
) -> Result<(), MongoError> {
    client
        .database(auth_database)
        .run_command(spec.command("updateUser"))
        .await?;
    Ok(())
}
