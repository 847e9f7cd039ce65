//! # Regression Test Environment
//!
//! Owns both containers of a run, the private network they share and the
//! rendered `dhis.conf`. Dropping the environment releases all of it, on the
//! success path and on every early return or panic alike.

use testcontainers::core::ContainerPort;
use testcontainers::{ContainerAsync, GenericImage};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{dhis2_container::Dhis2Service, postgres_container::PostgisDatabase};
use crate::client::Dhis2ApiClient;
use crate::config::{ApiConfig, HarnessConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::resources::{render_app_config, RenderedAppConfig};

const LOG_TAIL_LINES: usize = 200;

/// Host-side address of a container port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEndpoint {
    pub host: String,
    pub port: u16,
}

impl ContainerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolve where `internal_port` of `container` is published on the host
    pub async fn resolve(
        container: &ContainerAsync<GenericImage>,
        internal_port: u16,
    ) -> HarnessResult<Self> {
        let host = container
            .get_host()
            .await
            .map_err(|e| HarnessError::provisioning("application endpoint", e))?;
        let port = container
            .get_host_port_ipv4(ContainerPort::Tcp(internal_port))
            .await
            .map_err(|e| HarnessError::provisioning("application endpoint", e))?;

        Ok(Self::new(host.to_string(), port))
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for ContainerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Names shared by the containers of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunNames {
    pub run_id: String,
    pub network: String,
    pub database_host: String,
    pub application_name: String,
}

impl RunNames {
    pub fn generate(database_alias: &str) -> Self {
        let run_id = Uuid::new_v4().simple().to_string()[..12].to_string();
        Self::for_run(&run_id, database_alias)
    }

    pub fn for_run(run_id: &str, database_alias: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            network: format!("dhis2-harness-{run_id}"),
            database_host: format!("{database_alias}-{run_id}"),
            application_name: format!("dhis2-{run_id}"),
        }
    }
}

/// A running PostGIS + DHIS2 pair
pub struct Dhis2TestEnvironment {
    // Field order is drop order: application before database before config.
    application: Option<ContainerAsync<GenericImage>>,
    database: Option<ContainerAsync<GenericImage>>,
    app_config: RenderedAppConfig,
    endpoint: ContainerEndpoint,
    names: RunNames,
}

impl Dhis2TestEnvironment {
    /// Start the database, then the application wired to it, and resolve the
    /// application's external endpoint
    pub async fn start(config: &HarnessConfig) -> HarnessResult<Self> {
        let names = RunNames::generate(&config.database.network_alias);

        info!(
            run_id = %names.run_id,
            network = %names.network,
            database = %config.database.image_ref(),
            application = %config.application.image_ref(),
            "Starting DHIS2 test environment..."
        );

        let database_service = PostgisDatabase::from_config(&config.database);
        let template = config
            .scenario
            .resource_dir()
            .join(&config.application.config_template);
        let app_config =
            render_app_config(&template, &database_service.connection(&names.database_host))?;

        let database = Self::start_database(&database_service, &names).await?;
        let application = Self::start_application(config, &app_config, &names).await?;
        let endpoint = ContainerEndpoint::resolve(&application, config.application.port).await?;

        info!(
            run_id = %names.run_id,
            endpoint = %endpoint,
            "DHIS2 test environment ready"
        );

        Ok(Self {
            application: Some(application),
            database: Some(database),
            app_config,
            endpoint,
            names,
        })
    }

    /// Launch the database on the run's network under its alias
    async fn start_database(
        database: &PostgisDatabase,
        names: &RunNames,
    ) -> HarnessResult<ContainerAsync<GenericImage>> {
        database.start(&names.network, &names.database_host).await
    }

    /// Launch the application on the same network with the rendered config
    /// mounted, holding its startup until the database port is open
    async fn start_application(
        config: &HarnessConfig,
        app_config: &RenderedAppConfig,
        names: &RunNames,
    ) -> HarnessResult<ContainerAsync<GenericImage>> {
        Dhis2Service::from_config(&config.application)
            .with_config_file(app_config.path())
            .waiting_for_database(
                &names.database_host,
                config.database.port,
                config.application.database_wait_timeout_seconds,
            )
            .start(&names.network, &names.application_name)
            .await
    }

    pub fn endpoint(&self) -> &ContainerEndpoint {
        &self.endpoint
    }

    /// API client for the application, authenticated with `api`
    pub fn api_client(&self, api: &ApiConfig) -> HarnessResult<Dhis2ApiClient> {
        Dhis2ApiClient::new(&self.endpoint.base_url(), api)
    }

    /// Tail of the application's stdout and stderr, for failure reports
    pub async fn application_logs(&self) -> String {
        let Some(application) = &self.application else {
            return String::from("<application container already removed>");
        };

        let stdout = match application.stdout_to_vec().await {
            Ok(bytes) => tail(&String::from_utf8_lossy(&bytes), LOG_TAIL_LINES),
            Err(e) => format!("<failed to read stdout: {e}>"),
        };
        let stderr = match application.stderr_to_vec().await {
            Ok(bytes) => tail(&String::from_utf8_lossy(&bytes), LOG_TAIL_LINES),
            Err(e) => format!("<failed to read stderr: {e}>"),
        };

        format!("STDOUT:\n{stdout}\n\nSTDERR:\n{stderr}")
    }

    /// Remove the application, then the database
    pub async fn shutdown(mut self) -> HarnessResult<()> {
        if let Some(application) = self.application.take() {
            application
                .rm()
                .await
                .map_err(|e| HarnessError::provisioning("application teardown", e))?;
        }
        if let Some(database) = self.database.take() {
            database
                .rm()
                .await
                .map_err(|e| HarnessError::provisioning("database teardown", e))?;
        }

        info!(run_id = %self.names.run_id, "DHIS2 test environment shut down");
        Ok(())
    }
}

impl Drop for Dhis2TestEnvironment {
    fn drop(&mut self) {
        if self.application.is_some() || self.database.is_some() {
            warn!(
                run_id = %self.names.run_id,
                "Releasing DHIS2 test environment without explicit shutdown"
            );
        }
        debug!(
            config_dir = %self.app_config.dir().display(),
            "Removing rendered application config"
        );
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
