use chrono::{DateTime, Utc};
use core_config::{ConfigError, FromEnv};
use serde::Serialize;
use std::fmt;
use strum::Display;
use validator::Validate;

use crate::error::{ErrorCategory, ProvisionError, ProvisionResult};

use database::mongodb::admin::EXTERNAL_AUTH_DATABASE;
pub use database::mongodb::{RoleGrant, UserInfo as UserRecord, UserSpec};

pub const DEFAULT_ROLE: &str = "readWrite";
pub const DEFAULT_AUTH_DATABASE: &str = "admin";
pub const DEFAULT_MARKER_COLLECTION: &str = "_provisioner_marker";

/// Characters MongoDB rejects in database names (any platform)
const FORBIDDEN_DATABASE_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$', '\0'];

fn validate_database_name(name: &str) -> Result<(), validator::ValidationError> {
    if name.contains(FORBIDDEN_DATABASE_CHARS) {
        return Err(validator::ValidationError::new("invalid_database_name"));
    }
    Ok(())
}

/// Like a database name, but `$external` is allowed for users backed by an
/// external identity provider
fn validate_auth_database_name(name: &str) -> Result<(), validator::ValidationError> {
    if name == EXTERNAL_AUTH_DATABASE {
        return Ok(());
    }
    validate_database_name(name)
}

fn validate_collection_name(name: &str) -> Result<(), validator::ValidationError> {
    if name.starts_with("system.") || name.contains('$') || name.contains('\0') {
        return Err(validator::ValidationError::new("invalid_collection_name"));
    }
    Ok(())
}

/// What to provision: the target database and the user that gets access to it
#[derive(Clone, Validate)]
pub struct ProvisionTarget {
    /// Database the role is scoped to
    #[validate(length(min = 1, max = 63), custom(function = "validate_database_name"))]
    pub database: String,
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
    /// Role granted on `database`
    #[validate(length(min = 1))]
    pub role: String,
    /// Database the user record lives in
    #[validate(
        length(min = 1, max = 63),
        custom(function = "validate_auth_database_name")
    )]
    pub auth_database: String,
    /// Throwaway collection used to touch `database` into existence
    #[validate(length(min = 1, max = 120), custom(function = "validate_collection_name"))]
    pub marker_collection: String,
}

impl ProvisionTarget {
    pub fn new(
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            username: username.into(),
            password: password.into(),
            role: DEFAULT_ROLE.to_string(),
            auth_database: DEFAULT_AUTH_DATABASE.to_string(),
            marker_collection: DEFAULT_MARKER_COLLECTION.to_string(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_auth_database(mut self, auth_database: impl Into<String>) -> Self {
        self.auth_database = auth_database.into();
        self
    }

    pub fn with_marker_collection(mut self, collection: impl Into<String>) -> Self {
        self.marker_collection = collection.into();
        self
    }

    /// The single role grant this target asks for
    pub fn role_grant(&self) -> RoleGrant {
        RoleGrant::new(&self.role, &self.database)
    }

    /// The user authenticates against an external identity provider and
    /// cannot hold a password on the server
    pub fn uses_external_auth(&self) -> bool {
        self.auth_database == EXTERNAL_AUTH_DATABASE
    }

    /// Arguments for createUser/updateUser; `with_password` is false for
    /// accounts whose credentials live outside the server
    pub fn user_spec(&self, with_password: bool) -> UserSpec {
        UserSpec {
            username: self.username.clone(),
            password: with_password.then(|| self.password.clone()),
            roles: vec![self.role_grant()],
        }
    }

    /// Build a target from a key/value source using the `PROVISION_*` names
    ///
    /// `lookup` returns `None` for unset keys. Lets callers layer CLI flags
    /// over the environment without touching process state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required =
            |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            database: required("PROVISION_DATABASE")?,
            username: required("PROVISION_USERNAME")?,
            password: required("PROVISION_PASSWORD")?,
            role: or_default("PROVISION_ROLE", DEFAULT_ROLE),
            auth_database: or_default("PROVISION_AUTH_DATABASE", DEFAULT_AUTH_DATABASE),
            marker_collection: or_default(
                "PROVISION_MARKER_COLLECTION",
                DEFAULT_MARKER_COLLECTION,
            ),
        })
    }

    /// Validate names before anything is sent to the server
    pub fn ensure_valid(&self) -> ProvisionResult<()> {
        self.validate()
            .map_err(|e| ProvisionError::Validation(e.to_string()))
    }
}

impl fmt::Debug for ProvisionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionTarget")
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("role", &self.role)
            .field("auth_database", &self.auth_database)
            .field("marker_collection", &self.marker_collection)
            .finish()
    }
}

/// Load ProvisionTarget from environment variables
///
/// - `PROVISION_DATABASE` (required)
/// - `PROVISION_USERNAME` (required)
/// - `PROVISION_PASSWORD` (required)
/// - `PROVISION_ROLE` (default: `readWrite`)
/// - `PROVISION_AUTH_DATABASE` (default: `admin`)
/// - `PROVISION_MARKER_COLLECTION` (default: `_provisioner_marker`)
impl FromEnv for ProvisionTarget {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Points of the provisioning state machine, in the order they are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProvisionStage {
    Start,
    Connected,
    DatabaseEnsured,
    UserChecked,
    UserCreated,
    UserUpdated,
    UserUpdateFailed,
    Disconnected,
}

/// The operation a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProvisionStep {
    Connect,
    HealthCheck,
    EnsureDatabase,
    FindUser,
    CreateUser,
    UpdateUser,
}

/// What happened to the user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum UserOutcome {
    Created,
    Updated { password_applied: bool },
    UpdateFailed,
}

/// A failed step, kept for the final report
#[derive(Debug, Clone, Serialize)]
pub struct StepFailure {
    pub step: ProvisionStep,
    pub category: ErrorCategory,
    pub message: String,
    pub hint: String,
    /// The run stopped at this step
    pub fatal: bool,
}

impl StepFailure {
    pub fn new(step: ProvisionStep, error: &ProvisionError, fatal: bool) -> Self {
        Self {
            step,
            category: error.category(),
            message: error.to_string(),
            hint: error.hint().to_string(),
            fatal,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }
}

/// Summary of one provisioning run
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub database: String,
    pub username: String,
    pub role: RoleGrant,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub stages: Vec<ProvisionStage>,
    pub user_outcome: Option<UserOutcome>,
    pub failures: Vec<StepFailure>,
}

impl ProvisionReport {
    pub fn new(target: &ProvisionTarget) -> Self {
        Self {
            database: target.database.clone(),
            username: target.username.clone(),
            role: target.role_grant(),
            started_at: Utc::now(),
            duration_ms: 0,
            stages: vec![ProvisionStage::Start],
            user_outcome: None,
            failures: Vec::new(),
        }
    }

    pub fn enter(&mut self, stage: ProvisionStage) {
        self.stages.push(stage);
    }

    pub fn record_failure(&mut self, failure: StepFailure) {
        self.failures.push(failure);
    }

    pub fn finish(mut self) -> Self {
        self.duration_ms = (Utc::now() - self.started_at).num_milliseconds().max(0) as u64;
        self
    }

    pub fn reached(&self, stage: ProvisionStage) -> bool {
        self.stages.contains(&stage)
    }

    pub fn final_stage(&self) -> ProvisionStage {
        self.stages.last().copied().unwrap_or(ProvisionStage::Start)
    }

    /// Every step succeeded
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn has_fatal_failure(&self) -> bool {
        self.failures.iter().any(|f| f.fatal)
    }

    pub fn failure_for(&self, step: ProvisionStep) -> Option<&StepFailure> {
        self.failures.iter().find(|f| f.step == step)
    }
}

/// Read-only view of the server state for a target
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionStatus {
    pub database: String,
    pub username: String,
    /// The server currently lists the database (it has at least one collection)
    pub database_listed: bool,
    pub user: Option<UserRecord>,
    /// The user holds the configured role on the target database
    pub has_role: bool,
}

impl ProvisionStatus {
    pub fn is_provisioned(&self) -> bool {
        self.user.is_some() && self.has_role
    }
}
