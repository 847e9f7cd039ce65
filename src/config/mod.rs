//! # Harness Configuration
//!
//! All knobs of a harness run in one `serde` structure. Defaults reproduce the
//! DHIS2-12595 regression environment exactly (PostGIS 12 + DHIS2 2.37.2, the
//! `admin`/`district` account, the MLAG00 fixture); every value can be
//! overridden from a TOML file or `DHIS2_TEST_*` environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dhis2_harness::config::HarnessConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarnessConfig::load()?;
//! println!("DHIS2 image: {}", config.application.image_ref());
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::AtomicMode;
use crate::error::{HarnessError, HarnessResult};

pub use loader::{ENV_CONFIG_FILE, ENV_PREFIX};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub database: DatabaseConfig,
    pub application: ApplicationConfig,
    pub api: ApiConfig,
    pub scenario: ScenarioConfig,
}

/// PostGIS database container settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub image: String,
    pub tag: String,
    pub name: String,
    pub user: String,
    pub password: String,
    /// Base of the network alias the application uses to reach the database
    pub network_alias: String,
    pub port: u16,
    pub startup_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            image: "postgis/postgis".to_string(),
            tag: "12-3.2-alpine".to_string(),
            name: "dhis2".to_string(),
            user: "dhis".to_string(),
            password: "dhis".to_string(),
            network_alias: "db".to_string(),
            port: 5432,
            startup_timeout_seconds: 120,
        }
    }
}

impl DatabaseConfig {
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_seconds)
    }
}

/// DHIS2 application container settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub image: String,
    pub tag: String,
    pub port: u16,
    /// `dhis.conf` template, relative to the scenario resource directory
    pub config_template: String,
    pub config_mount_path: String,
    pub readiness_path: String,
    pub readiness_status: u16,
    pub startup_timeout_seconds: u64,
    /// Passed to the image's wait-for-db script as `-t`; 0 waits forever
    pub database_wait_timeout_seconds: u64,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            image: "dhis2/core".to_string(),
            tag: "2.37.2".to_string(),
            port: 8080,
            config_template: "dhis.conf".to_string(),
            config_mount_path: "/DHIS2_home/dhis.conf".to_string(),
            readiness_path: "/".to_string(),
            readiness_status: 200,
            startup_timeout_seconds: 600,
            database_wait_timeout_seconds: 0,
        }
    }
}

impl ApplicationConfig {
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_seconds)
    }
}

/// REST API credentials and client behaviour
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub username: String,
    pub password: String,
    /// User the bootstrap org unit is assigned to
    pub user_id: String,
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "district".to_string(),
            user_id: "M5zQapPyTZI".to_string(),
            timeout_ms: 300_000,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Reference data and fixture for the regression scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Directory holding bundled resources, relative to the crate root
    pub resource_dir: String,
    pub fixture: String,
    pub atomic_mode: AtomicMode,
    pub org_unit_name: String,
    pub org_unit_short_name: String,
    pub level_name: String,
    pub level: u32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            resource_dir: "resources".to_string(),
            fixture: "MLAG00_1.2.1_DHIS2.37.json".to_string(),
            atomic_mode: AtomicMode::None,
            org_unit_name: "Acme".to_string(),
            org_unit_short_name: "Acme".to_string(),
            level_name: "Level 1".to_string(),
            level: 1,
        }
    }
}

impl ScenarioConfig {
    /// Absolute resource directory; relative paths resolve against the crate root
    pub fn resource_dir(&self) -> PathBuf {
        let dir = Path::new(&self.resource_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            Path::new(env!("CARGO_MANIFEST_DIR")).join(dir)
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> HarnessResult<()> {
        let required = [
            ("database.image", &self.database.image),
            ("database.tag", &self.database.tag),
            ("database.name", &self.database.name),
            ("database.user", &self.database.user),
            ("database.network_alias", &self.database.network_alias),
            ("application.image", &self.application.image),
            ("application.tag", &self.application.tag),
            ("application.config_template", &self.application.config_template),
            ("api.username", &self.api.username),
            ("api.password", &self.api.password),
            ("api.user_id", &self.api.user_id),
            ("scenario.fixture", &self.scenario.fixture),
        ];

        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(HarnessError::config_error(format!("{key} must not be empty")));
            }
        }

        if self.database.port == 0 || self.application.port == 0 {
            return Err(HarnessError::config_error("container ports must be non-zero"));
        }

        if self.scenario.level == 0 {
            return Err(HarnessError::config_error(
                "scenario.level must be 1 or greater",
            ));
        }

        Ok(())
    }
}
