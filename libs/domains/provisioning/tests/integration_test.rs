//! Integration tests for the Provisioning domain
//!
//! These run the workflow against a real MongoDB via testcontainers to ensure:
//! - Users are created with the configured role
//! - Re-runs update instead of duplicating
//! - Ensuring a database leaves no marker collection behind
//!
//! Container tests need a Docker daemon and are ignored by default:
//! `cargo test -p domain_provisioning -- --ignored`

use database::mongodb::{MongoConfig, admin};
use domain_provisioning::*;
use test_utils::{TestDataBuilder, TestMongo, assertions::*};

fn config_for(mongo: &TestMongo) -> MongoConfig {
    MongoConfig::new(mongo.connection_string()).with_timeouts(5, 5)
}

fn target_for(builder: &TestDataBuilder) -> ProvisionTarget {
    ProvisionTarget::new(
        builder.database("app"),
        builder.username("app"),
        builder.password(),
    )
}

// ============================================================================
// Unreachable server
// ============================================================================

#[tokio::test]
async fn test_unreachable_server_reports_connection_failure() {
    // Nothing listens on port 1
    let config = MongoConfig::new("mongodb://127.0.0.1:1").with_timeouts(1, 1);
    let builder = TestDataBuilder::from_test_name("unreachable");

    let report = provision(&config, target_for(&builder)).await;

    assert!(!report.is_success());
    let failure = assert_some(
        report.failure_for(ProvisionStep::HealthCheck),
        "health check failure",
    );
    assert_eq!(failure.category, ErrorCategory::Connection);
    assert!(failure.message.contains("Could not connect"));
    assert_eq!(report.final_stage(), ProvisionStage::Disconnected);
    assert!(report.user_outcome.is_none());
}

#[tokio::test]
async fn test_unreachable_server_status_is_connection_error() {
    let config = MongoConfig::new("mongodb://127.0.0.1:1").with_timeouts(1, 1);
    let builder = TestDataBuilder::from_test_name("unreachable_status");

    let result = inspect(&config, target_for(&builder)).await;
    assert!(matches!(result, Err(ProvisionError::Connection(_))));
}

// ============================================================================
// Provisioning against a live server
// ============================================================================

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_fresh_server_creates_user_with_role() {
    let mongo = TestMongo::new().await;
    let builder = TestDataBuilder::from_test_name("fresh_server");
    let target = target_for(&builder);

    let report = provision(&config_for(&mongo), target.clone()).await;

    assert!(report.is_success(), "failures: {:?}", report.failures);
    assert_eq!(report.user_outcome, Some(UserOutcome::Created));

    let users = admin::users_info(&mongo.client(), "admin", &target.username)
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
    assert!(users[0].has_role(&RoleGrant::new("readWrite", &target.database)));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_second_run_updates_without_duplicating() {
    let mongo = TestMongo::new().await;
    let builder = TestDataBuilder::from_test_name("second_run");
    let target = target_for(&builder);
    let config = config_for(&mongo);

    let first = provision(&config, target.clone()).await;
    assert_eq!(first.user_outcome, Some(UserOutcome::Created));

    let second = provision(&config, target.clone()).await;
    assert!(second.is_success(), "failures: {:?}", second.failures);
    assert_eq!(
        second.user_outcome,
        Some(UserOutcome::Updated {
            password_applied: true
        })
    );

    let users = admin::users_info(&mongo.client(), "admin", &target.username)
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_rerun_restores_role() {
    let mongo = TestMongo::new().await;
    let builder = TestDataBuilder::from_test_name("restore_role");
    let target = target_for(&builder);
    let config = config_for(&mongo);

    provision(&config, target.clone().with_role("read")).await;
    let report = provision(&config, target.clone()).await;
    assert!(report.is_success(), "failures: {:?}", report.failures);

    let status = inspect(&config, target).await.unwrap();
    assert!(status.is_provisioned());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_ensure_database_leaves_no_marker() {
    let mongo = TestMongo::new().await;
    let builder = TestDataBuilder::from_test_name("no_marker");
    let target = target_for(&builder);
    let database = target.database.clone();
    let marker = target.marker_collection.clone();

    let provisioner = Provisioner::new(MongoServerAdmin::from_client(mongo.client()), target);
    for _ in 0..3 {
        provisioner.ensure_database_exists().await.unwrap();
    }

    let collections = mongo
        .client()
        .database(&database)
        .list_collection_names()
        .await
        .unwrap();
    assert!(!collections.contains(&marker));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_existing_marker_is_cleaned_up() {
    let mongo = TestMongo::new().await;
    let builder = TestDataBuilder::from_test_name("stale_marker");
    let target = target_for(&builder);
    let database = target.database.clone();
    let marker = target.marker_collection.clone();

    // Simulate an interrupted run that left the marker behind
    admin::create_collection(&mongo.client(), &database, &marker)
        .await
        .unwrap();

    let provisioner = Provisioner::new(MongoServerAdmin::from_client(mongo.client()), target);
    provisioner.ensure_database_exists().await.unwrap();

    let collections = mongo
        .client()
        .database(&database)
        .list_collection_names()
        .await
        .unwrap();
    assert!(!collections.contains(&marker));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_invalid_role_is_operation_error() {
    let mongo = TestMongo::new().await;
    let builder = TestDataBuilder::from_test_name("invalid_role");
    let target = target_for(&builder).with_role("noSuchRole");

    let report = provision(&config_for(&mongo), target).await;

    let failure = assert_some(
        report.failure_for(ProvisionStep::CreateUser),
        "create failure",
    );
    assert_eq!(failure.category, ErrorCategory::Operation);
    assert_eq!(report.final_stage(), ProvisionStage::Disconnected);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_status_after_provisioning() {
    let mongo = TestMongo::new().await;
    let builder = TestDataBuilder::from_test_name("status");
    let target = target_for(&builder);
    let config = config_for(&mongo);

    let before = inspect(&config, target.clone()).await.unwrap();
    assert!(before.user.is_none());
    assert!(!before.is_provisioned());

    provision(&config, target.clone()).await;

    let after = inspect(&config, target).await.unwrap();
    let user = assert_some(after.user.clone(), "provisioned user");
    assert_eq!(user.db, "admin");
    assert!(after.has_role);

    let databases = mongo.client().list_database_names().await.unwrap();
    assert_contains_name(&databases, "admin", "server databases");
}
