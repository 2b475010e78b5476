//! Shared test utilities
//!
//! This crate provides reusable test infrastructure:
//! - `TestMongo`: MongoDB container with automatic cleanup (feature: "mongo")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{TestMongo, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn my_mongo_test() {
//!     let mongo = TestMongo::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_test");
//!
//!     let database = builder.database("main");
//!     let username = builder.username("app");
//! }
//! ```

#[cfg(feature = "mongo")]
mod mongo;

#[cfg(feature = "mongo")]
pub use mongo::TestMongo;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data, while keeping
/// names from different tests apart when they share a server.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_create_user");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Generate a unique name for testing
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(12345);
    /// assert_eq!(builder.name("user", "main"), "test-user-12345-main");
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// A database name (MongoDB database names must stay under 64 bytes)
    pub fn database(&self, suffix: &str) -> String {
        format!("db_{:x}_{}", self.seed, suffix)
    }

    /// A username unique to this builder
    pub fn username(&self, suffix: &str) -> String {
        self.name("user", suffix)
    }

    /// A deterministic password
    pub fn password(&self) -> String {
        format!("pw-{:x}", self.seed.rotate_left(17))
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that a collection of names contains `expected`
    pub fn assert_contains_name(names: &[String], expected: &str, context: &str) {
        assert!(
            names.iter().any(|n| n == expected),
            "{}: expected {:?} to contain '{}'",
            context,
            names,
            expected
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.username("a"), builder2.username("a"));
        assert_eq!(builder1.password(), builder2.password());
    }

    #[test]
    fn test_data_builder_from_name() {
        let builder1 = TestDataBuilder::from_test_name("my_test");
        let builder2 = TestDataBuilder::from_test_name("my_test");

        assert_eq!(builder1.database("x"), builder2.database("x"));
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        assert_ne!(builder1.database("x"), builder2.database("x"));
    }

    #[test]
    fn test_database_name_fits_mongodb_limit() {
        let builder = TestDataBuilder::new(u64::MAX);
        assert!(builder.database("provisioning").len() < 64);
    }

    #[test]
    #[should_panic(expected = "expected Some")]
    fn test_assert_some_panics_on_none() {
        assertions::assert_some(None::<u8>, "lookup");
    }
}
