//! MongoDB database connector and utilities
//!
//! Provides connection management, the liveness ping and the administrative
//! commands used to provision databases and users.

pub mod admin;
mod config;
mod connector;
mod error;
mod health;

pub use admin::{RoleGrant, UserInfo, UserSpec};
pub use config::MongoConfig;
pub use connector::{connect_from_config, disconnect};
pub use error::{MongoError, codes};
pub use health::ping;

// Re-export MongoDB types for convenience
pub use mongodb::Client;
