//! Configuration for the provisioner
//!
//! Everything comes from the environment; command-line flags override
//! individual values. The password is only ever read from the environment.

use clap::Args;
use core_config::{Environment, FromEnv};
use database::mongodb::MongoConfig;
use domain_provisioning::ProvisionTarget;
use eyre::{Result, WrapErr};

/// Flags that take precedence over environment variables
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// MongoDB connection string (overrides MONGODB_URL)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Database to provision (overrides PROVISION_DATABASE)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// User to create or update (overrides PROVISION_USERNAME)
    #[arg(short, long, global = true)]
    pub username: Option<String>,

    /// Role granted on the database (overrides PROVISION_ROLE)
    #[arg(long, global = true)]
    pub role: Option<String>,

    /// Database the user authenticates against (overrides PROVISION_AUTH_DATABASE)
    #[arg(long, global = true)]
    pub auth_database: Option<String>,
}

impl Overrides {
    /// The flag value standing in for an environment key, if one was given
    fn get(&self, key: &str) -> Option<String> {
        match key {
            "PROVISION_DATABASE" => self.database.clone(),
            "PROVISION_USERNAME" => self.username.clone(),
            "PROVISION_ROLE" => self.role.clone(),
            "PROVISION_AUTH_DATABASE" => self.auth_database.clone(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub mongodb: MongoConfig,
    pub target: ProvisionTarget,
}

impl Config {
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let mut mongodb = MongoConfig::from_env().wrap_err("Invalid MongoDB configuration")?;
        if let Some(url) = &overrides.url {
            mongodb.url = url.clone();
        }

        let target = ProvisionTarget::from_lookup(|key| {
            overrides.get(key).or_else(|| std::env::var(key).ok())
        })
        .wrap_err("Invalid provisioning target")?;

        Ok(Self {
            environment: Environment::from_env(),
            mongodb,
            target,
        })
    }
}
