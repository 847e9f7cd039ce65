//! # DHIS2 Application Container
//!
//! The application under test. It blocks its own startup until the database
//! port accepts connections (the image's `WAIT_FOR_DB_CONTAINER` hook) and is
//! considered ready once its root URL answers with the configured status.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use testcontainers::core::wait::HttpWaitStrategy;
use testcontainers::core::{AccessMode, ContainerPort, Mount, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ContainerRequest, GenericImage, ImageExt};
use tracing::info;

use crate::config::ApplicationConfig;
use crate::error::{HarnessError, HarnessResult};

pub const WAIT_FOR_DB_ENV: &str = "WAIT_FOR_DB_CONTAINER";

#[derive(Debug, Clone)]
pub struct Dhis2Service {
    image: String,
    tag: String,
    port: u16,
    readiness_path: String,
    readiness_status: u16,
    startup_timeout: Duration,
    config_file: Option<PathBuf>,
    config_mount_path: String,
    env_vars: HashMap<String, String>,
}

impl Default for Dhis2Service {
    fn default() -> Self {
        Self::from_config(&ApplicationConfig::default())
    }
}

impl Dhis2Service {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ApplicationConfig) -> Self {
        Self {
            image: config.image.clone(),
            tag: config.tag.clone(),
            port: config.port,
            readiness_path: config.readiness_path.clone(),
            readiness_status: config.readiness_status,
            startup_timeout: config.startup_timeout(),
            config_file: None,
            config_mount_path: config.config_mount_path.clone(),
            env_vars: HashMap::new(),
        }
    }

    /// Bind-mount a host `dhis.conf` read-write at the configured mount path
    pub fn with_config_file(mut self, host_path: &Path) -> Self {
        self.config_file = Some(host_path.to_path_buf());
        self
    }

    /// Hold application startup until `host:port` accepts connections;
    /// a `timeout_seconds` of 0 waits indefinitely
    pub fn waiting_for_database(mut self, host: &str, port: u16, timeout_seconds: u64) -> Self {
        self.env_vars.insert(
            WAIT_FOR_DB_ENV.to_string(),
            format!("{host}:{port} -t {timeout_seconds}"),
        );
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn readiness_probe(&self) -> WaitFor {
        WaitFor::http(
            HttpWaitStrategy::new(self.readiness_path.clone())
                .with_port(ContainerPort::Tcp(self.port))
                .with_expected_status_code(self.readiness_status),
        )
    }

    pub fn request(&self, network: &str, container_name: &str) -> ContainerRequest<GenericImage> {
        let mut base_request = GenericImage::new(&self.image, &self.tag)
            .with_exposed_port(ContainerPort::Tcp(self.port))
            .with_wait_for(self.readiness_probe())
            .with_network(network)
            .with_container_name(container_name)
            .with_startup_timeout(self.startup_timeout);

        if let Some(config_file) = &self.config_file {
            base_request = base_request.with_mount(
                Mount::bind_mount(
                    config_file.to_string_lossy().into_owned(),
                    self.config_mount_path.clone(),
                )
                .with_access_mode(AccessMode::ReadWrite),
            );
        }

        self.env_vars.iter().fold(
            base_request,
            |req: ContainerRequest<GenericImage>, (key, value)| req.with_env_var(key, value),
        )
    }

    /// Start the application and wait for its readiness probe
    pub async fn start(
        &self,
        network: &str,
        container_name: &str,
    ) -> HarnessResult<ContainerAsync<GenericImage>> {
        let service = format!("application {}:{}", self.image, self.tag);
        info!(
            service = %service,
            network = %network,
            timeout_secs = self.startup_timeout.as_secs(),
            "Starting application container"
        );

        let container = self
            .request(network, container_name)
            .start()
            .await
            .map_err(|e| HarnessError::provisioning(&service, e))?;

        info!(service = %service, container_id = %container.id(), "Application container ready");
        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dhis2_service_defaults() {
        let service = Dhis2Service::new();

        assert_eq!(service.image, "dhis2/core");
        assert_eq!(service.tag, "2.37.2");
        assert_eq!(service.port(), 8080);
        assert_eq!(service.readiness_path, "/");
        assert_eq!(service.readiness_status, 200);
        assert!(service.config_file.is_none());
    }

    #[test]
    fn test_waiting_for_database_sets_wait_hook() {
        let service = Dhis2Service::new().waiting_for_database("db-1a2b3c4d", 5432, 0);

        assert_eq!(
            service.env_vars.get(WAIT_FOR_DB_ENV),
            Some(&"db-1a2b3c4d:5432 -t 0".to_string())
        );
    }

    #[test]
    fn test_request_env_is_only_the_database_wait_hook() {
        let request = Dhis2Service::new()
            .waiting_for_database("db-1a2b3c4d", 5432, 0)
            .request("dhis2-harness-net", "dhis2-1a2b3c4d");

        let env: Vec<(String, String)> = request
            .env_vars()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        assert_eq!(
            env,
            vec![(WAIT_FOR_DB_ENV.to_string(), "db-1a2b3c4d:5432 -t 0".to_string())]
        );
    }

    #[test]
    fn test_request_mounts_config_file() {
        let request = Dhis2Service::new()
            .with_config_file(Path::new("/tmp/dhis2-harness-x/dhis.conf"))
            .request("dhis2-harness-net", "dhis2-1a2b3c4d");

        assert_eq!(request.mounts().count(), 1);
        assert_eq!(request.network().as_deref(), Some("dhis2-harness-net"));
    }

    #[test]
    fn test_request_without_config_has_no_mounts() {
        let request = Dhis2Service::new().request("net", "app");
        assert_eq!(request.mounts().count(), 0);
    }
}
