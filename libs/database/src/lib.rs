//! Database library providing MongoDB connectors and administrative helpers
//!
//! # Features
//!
//! - `mongodb` (default) - MongoDB support
//! - `config` - Configuration support with `core_config::FromEnv`
//! - `all` - All features
//!
//! # Examples
//!
//! ```ignore
//! use database::mongodb;
//!
//! let config = mongodb::MongoConfig::new("mongodb://localhost:27017");
//! let client = mongodb::connect_from_config(&config).await?;
//! mongodb::ping(&client).await?;
//!
//! let users = mongodb::admin::users_info(&client, "admin", "app_user").await?;
//! mongodb::disconnect(client).await;
//! ```

#[cfg(feature = "mongodb")]
pub mod mongodb;
