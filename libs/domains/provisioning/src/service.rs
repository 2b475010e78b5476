use database::mongodb::MongoConfig;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ProvisionError, ProvisionResult};
use crate::models::{
    ProvisionReport, ProvisionStage, ProvisionStatus, ProvisionStep, ProvisionTarget,
    StepFailure, UserOutcome, UserRecord,
};
use crate::mongodb::MongoServerAdmin;
use crate::repository::ServerAdmin;

const MANUAL_CORRECTION_HINT: &str = "The existing user was left unchanged. Update it manually \
     (db.updateUser / db.changeUserPassword) or drop it and run again.";

/// Ensures a database exists and that a user has the configured role on it
///
/// Owns the server connection for the duration of a run. [`Provisioner::run`]
/// and [`Provisioner::status`] consume the provisioner and always release the
/// connection before returning.
pub struct Provisioner<A: ServerAdmin> {
    admin: A,
    target: ProvisionTarget,
}

impl Provisioner<MongoServerAdmin> {
    /// Connect to the server described by `config`
    pub async fn connect(config: &MongoConfig, target: ProvisionTarget) -> ProvisionResult<Self> {
        let admin = MongoServerAdmin::connect(config).await?;
        Ok(Self::new(admin, target))
    }
}

impl<A: ServerAdmin> Provisioner<A> {
    pub fn new(admin: A, target: ProvisionTarget) -> Self {
        Self { admin, target }
    }

    pub fn target(&self) -> &ProvisionTarget {
        &self.target
    }

    /// Liveness probe against the server
    pub async fn health_check(&self) -> ProvisionResult<()> {
        self.admin.health_check().await
    }

    /// Touch the target database into existence
    ///
    /// MongoDB creates databases implicitly, so this creates the marker
    /// collection and drops it again. A marker that already exists (left
    /// behind by an interrupted run) counts as success and is dropped too,
    /// so repeated calls leave no collection behind.
    #[instrument(skip(self), fields(database = %self.target.database))]
    pub async fn ensure_database_exists(&self) -> ProvisionResult<()> {
        let database = &self.target.database;
        let marker = &self.target.marker_collection;

        match self.admin.create_collection(database, marker).await {
            Ok(()) => debug!("Marker collection '{}' created", marker),
            Err(ProvisionError::AlreadyExists(_)) => {
                info!("Marker collection '{}' already present", marker)
            }
            Err(e) => return Err(e),
        }

        self.admin.drop_collection(database, marker).await?;
        info!("Database '{}' ensured", database);
        Ok(())
    }

    /// Look up the target user (exact username match)
    pub async fn lookup_user(&self) -> ProvisionResult<Option<UserRecord>> {
        self.admin
            .find_user(&self.target.auth_database, &self.target.username)
            .await
    }

    /// Whether the target user exists
    pub async fn find_user(&self) -> ProvisionResult<bool> {
        Ok(self.lookup_user().await?.is_some())
    }

    /// Create the target user with its role, and its password unless the
    /// user authenticates externally
    #[instrument(skip(self), fields(username = %self.target.username))]
    pub async fn create_user(&self) -> ProvisionResult<()> {
        let spec = self.target.user_spec(!self.target.uses_external_auth());
        self.admin
            .create_user(&self.target.auth_database, &spec)
            .await?;
        info!(
            "User '{}' created with role {}",
            self.target.username,
            self.target.role_grant()
        );
        Ok(())
    }

    /// Overwrite the role list (and password, when `with_password`) of the
    /// existing target user
    #[instrument(skip(self), fields(username = %self.target.username))]
    pub async fn update_user(&self, with_password: bool) -> ProvisionResult<()> {
        let spec = self.target.user_spec(with_password);
        self.admin
            .update_user(&self.target.auth_database, &spec)
            .await?;
        info!(
            "User '{}' updated with role {}",
            self.target.username,
            self.target.role_grant()
        );
        Ok(())
    }

    /// Run the whole workflow and release the connection
    ///
    /// Never returns an error: every failure is recorded in the report.
    pub async fn run(self) -> ProvisionReport {
        let mut report = ProvisionReport::new(&self.target);
        report.enter(ProvisionStage::Connected);

        self.run_steps(&mut report).await;

        self.admin.disconnect().await;
        report.enter(ProvisionStage::Disconnected);

        report.finish()
    }

    async fn run_steps(&self, report: &mut ProvisionReport) {
        if let Err(e) = self.health_check().await {
            error!("MongoDB health check failed: {}", e);
            report.record_failure(StepFailure::new(ProvisionStep::HealthCheck, &e, true));
            return;
        }
        info!("MongoDB connection successful");

        match self.ensure_database_exists().await {
            Ok(()) => report.enter(ProvisionStage::DatabaseEnsured),
            Err(e) => {
                warn!("Could not ensure database '{}': {}", self.target.database, e);
                report.record_failure(StepFailure::new(ProvisionStep::EnsureDatabase, &e, false));
            }
        }

        let existing = match self.lookup_user().await {
            Ok(existing) => existing,
            Err(e) => {
                error!("Could not look up user '{}': {}", self.target.username, e);
                report.record_failure(StepFailure::new(ProvisionStep::FindUser, &e, true));
                return;
            }
        };
        report.enter(ProvisionStage::UserChecked);

        match existing {
            None => self.create_missing_user(report).await,
            Some(record) => self.update_existing_user(&record, report).await,
        }
    }

    async fn create_missing_user(&self, report: &mut ProvisionReport) {
        info!(
            "Creating user '{}' for database '{}'",
            self.target.username, self.target.database
        );

        match self.create_user().await {
            Ok(()) => {
                report.user_outcome = Some(UserOutcome::Created);
                report.enter(ProvisionStage::UserCreated);
            }
            Err(e @ ProvisionError::AlreadyExists(_)) => {
                warn!("User '{}' appeared after lookup: {}", self.target.username, e);
                report.record_failure(
                    StepFailure::new(ProvisionStep::CreateUser, &e, false)
                        .with_hint("The user was created concurrently; run again to update it."),
                );
            }
            Err(e) => {
                error!("Failed to create user '{}': {}", self.target.username, e);
                report.record_failure(StepFailure::new(ProvisionStep::CreateUser, &e, true));
            }
        }
    }

    async fn update_existing_user(&self, record: &UserRecord, report: &mut ProvisionReport) {
        info!(
            "User '{}' already exists; updating password and roles",
            self.target.username
        );

        let password_supported = record.has_server_credentials();
        if !password_supported {
            warn!(
                "User '{}' authenticates via '{}'; only roles will be updated",
                record.user, record.db
            );
            let err = ProvisionError::Operation(format!(
                "user '{}' has no server-side credentials (auth database '{}')",
                record.user, record.db
            ));
            report.record_failure(
                StepFailure::new(ProvisionStep::UpdateUser, &err, false).with_hint(
                    "Change this account's credential in the external identity provider.",
                ),
            );
        }

        match self.update_user(password_supported).await {
            Ok(()) => {
                report.user_outcome = Some(UserOutcome::Updated {
                    password_applied: password_supported,
                });
                report.enter(ProvisionStage::UserUpdated);
            }
            Err(e) => {
                error!("Failed to update user '{}': {}", self.target.username, e);
                let failure = StepFailure::new(ProvisionStep::UpdateUser, &e, false);
                let failure = match e {
                    ProvisionError::Permission(_) => failure,
                    _ => failure.with_hint(MANUAL_CORRECTION_HINT),
                };
                report.record_failure(failure);
                report.user_outcome = Some(UserOutcome::UpdateFailed);
                report.enter(ProvisionStage::UserUpdateFailed);
            }
        }
    }

    /// Inspect the server without changing anything, then release the connection
    pub async fn status(self) -> ProvisionResult<ProvisionStatus> {
        let result = self.collect_status().await;
        self.admin.disconnect().await;
        result
    }

    async fn collect_status(&self) -> ProvisionResult<ProvisionStatus> {
        self.health_check().await?;

        let databases = self.admin.list_databases().await?;
        let user = self.lookup_user().await?;
        let has_role = user
            .as_ref()
            .is_some_and(|u| u.has_role(&self.target.role_grant()));

        Ok(ProvisionStatus {
            database: self.target.database.clone(),
            username: self.target.username.clone(),
            database_listed: databases.iter().any(|d| d == &self.target.database),
            user,
            has_role,
        })
    }
}

/// Connect, provision and disconnect
///
/// A connection failure still yields a report: the trail is
/// `start -> disconnected` with a fatal `connect` failure.
pub async fn provision(config: &MongoConfig, target: ProvisionTarget) -> ProvisionReport {
    if let Err(e) = target.ensure_valid() {
        return failed_before_connect(&target, ProvisionStep::Connect, e);
    }

    match Provisioner::connect(config, target.clone()).await {
        Ok(provisioner) => provisioner.run().await,
        Err(e) => {
            error!("Could not connect to MongoDB: {}", e);
            failed_before_connect(&target, ProvisionStep::Connect, e)
        }
    }
}

/// Connect, report the current state, and disconnect
pub async fn inspect(
    config: &MongoConfig,
    target: ProvisionTarget,
) -> ProvisionResult<ProvisionStatus> {
    target.ensure_valid()?;
    Provisioner::connect(config, target).await?.status().await
}

fn failed_before_connect(
    target: &ProvisionTarget,
    step: ProvisionStep,
    error: ProvisionError,
) -> ProvisionReport {
    let mut report = ProvisionReport::new(target);
    report.record_failure(StepFailure::new(step, &error, true));
    report.enter(ProvisionStage::Disconnected);
    report.finish()
}
