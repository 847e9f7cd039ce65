//! # PostGIS Database Container
//!
//! The database the application under test connects to. It is only reachable
//! from inside the run's private network, under its container name.

use std::collections::HashMap;
use std::time::Duration;
use testcontainers::core::wait::LogWaitStrategy;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ContainerRequest, GenericImage, ImageExt};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::resources::DatabaseConnection;

const INIT_COMPLETE_MESSAGE: &str = "PostgreSQL init process complete";
const READY_MESSAGE: &str = "database system is ready to accept connections";
/// The temporary server that runs the init scripts logs the ready line first;
/// the server that stays up logs it second.
const READY_MESSAGE_OCCURRENCES: usize = 2;

#[derive(Debug, Clone)]
pub struct PostgisDatabase {
    image: String,
    tag: String,
    port: u16,
    startup_timeout: Duration,
    env_vars: HashMap<String, String>,
}

impl Default for PostgisDatabase {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

impl PostgisDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        let mut env_vars = HashMap::new();
        env_vars.insert("POSTGRES_DB".to_string(), config.name.clone());
        env_vars.insert("POSTGRES_USER".to_string(), config.user.clone());
        env_vars.insert("POSTGRES_PASSWORD".to_string(), config.password.clone());

        Self {
            image: config.image.clone(),
            tag: config.tag.clone(),
            port: config.port,
            startup_timeout: config.startup_timeout(),
            env_vars,
        }
    }

    pub fn with_db_name(mut self, db_name: &str) -> Self {
        self.env_vars.insert("POSTGRES_DB".to_string(), db_name.to_string());
        self
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.env_vars.insert("POSTGRES_USER".to_string(), user.to_string());
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.env_vars.insert("POSTGRES_PASSWORD".to_string(), password.to_string());
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Connection settings as seen from another container on the same network
    pub fn connection(&self, host: &str) -> DatabaseConnection {
        let get = |key: &str| self.env_vars.get(key).cloned().unwrap_or_default();

        DatabaseConnection {
            host: host.to_string(),
            port: self.port,
            name: get("POSTGRES_DB"),
            user: get("POSTGRES_USER"),
            password: get("POSTGRES_PASSWORD"),
        }
    }

    /// Container request joined to `network` and resolvable there as `container_name`
    pub fn request(&self, network: &str, container_name: &str) -> ContainerRequest<GenericImage> {
        let base_request = GenericImage::new(&self.image, &self.tag)
            .with_exposed_port(ContainerPort::Tcp(self.port))
            .with_wait_for(WaitFor::message_on_stdout(INIT_COMPLETE_MESSAGE))
            .with_wait_for(WaitFor::log(
                LogWaitStrategy::stderr(READY_MESSAGE).with_times(READY_MESSAGE_OCCURRENCES),
            ))
            .with_network(network)
            .with_container_name(container_name)
            .with_startup_timeout(self.startup_timeout);

        self.env_vars.iter().fold(
            base_request,
            |req: ContainerRequest<GenericImage>, (key, value)| req.with_env_var(key, value),
        )
    }

    /// Start the database and wait until it accepts connections
    pub async fn start(
        &self,
        network: &str,
        container_name: &str,
    ) -> HarnessResult<ContainerAsync<GenericImage>> {
        let service = format!("database {}:{}", self.image, self.tag);
        info!(
            service = %service,
            network = %network,
            host = %container_name,
            "Starting database container"
        );

        let container = self
            .request(network, container_name)
            .start()
            .await
            .map_err(|e| HarnessError::provisioning(&service, e))?;

        info!(service = %service, container_id = %container.id(), "Database container ready");
        Ok(container)
    }
}
