//! Configuration Loader
//!
//! Layered loading (highest precedence first):
//! 1. Environment variables, `DHIS2_TEST_<SECTION>__<KEY>` (e.g. `DHIS2_TEST_API__PASSWORD`)
//! 2. TOML file named by `DHIS2_TEST_CONFIG`, else `./dhis2-harness.toml` if present
//! 3. Built-in defaults

use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "DHIS2_TEST";

/// Environment variable naming an explicit config file
pub const ENV_CONFIG_FILE: &str = "DHIS2_TEST_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "dhis2-harness.toml";

impl HarnessConfig {
    /// Load configuration from the default file location and `DHIS2_TEST_*` variables
    pub fn load() -> HarnessResult<Self> {
        let explicit = std::env::var(ENV_CONFIG_FILE).ok().map(PathBuf::from);
        if let Some(path) = &explicit {
            if !path.is_file() {
                return Err(HarnessError::config_error(format!(
                    "{ENV_CONFIG_FILE} points at {} which is not a file",
                    path.display()
                )));
            }
        }

        let file = explicit.or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        });

        Self::load_from(file.as_deref(), ENV_PREFIX)
    }

    /// Load configuration from an optional TOML file with overrides from
    /// variables carrying `env_prefix`
    pub fn load_from(file: Option<&Path>, env_prefix: &str) -> HarnessResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            debug!(path = %path.display(), "Loading harness config file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: HarnessConfig = settings.try_deserialize()?;
        config.validate()?;

        debug!(
            database = %config.database.image_ref(),
            application = %config.application.image_ref(),
            fixture = %config.scenario.fixture,
            "Harness configuration loaded"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AtomicMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_without_sources_yields_defaults() {
        let config = HarnessConfig::load_from(None, "DHIS2_HARNESS_UNSET_PREFIX").unwrap();
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[application]
tag = "2.38.1"

[scenario]
atomic_mode = "ALL"
level_name = "Country"
"#
        )
        .unwrap();

        let config =
            HarnessConfig::load_from(Some(file.path()), "DHIS2_HARNESS_FILE_TEST").unwrap();

        assert_eq!(config.application.tag, "2.38.1");
        assert_eq!(config.application.image, "dhis2/core");
        assert_eq!(config.scenario.atomic_mode, AtomicMode::All);
        assert_eq!(config.scenario.level_name, "Country");
        assert_eq!(config.scenario.level, 1);
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nusername = \"from-file\"\npassword = \"from-file\"").unwrap();

        std::env::set_var("DHIS2_HARNESS_ENV_TEST_API__PASSWORD", "from-env");
        std::env::set_var("DHIS2_HARNESS_ENV_TEST_DATABASE__PORT", "15432");

        let config =
            HarnessConfig::load_from(Some(file.path()), "DHIS2_HARNESS_ENV_TEST").unwrap();

        std::env::remove_var("DHIS2_HARNESS_ENV_TEST_API__PASSWORD");
        std::env::remove_var("DHIS2_HARNESS_ENV_TEST_DATABASE__PORT");

        assert_eq!(config.api.username, "from-file");
        assert_eq!(config.api.password, "from-env");
        assert_eq!(config.database.port, 15432);
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[scenario]\nlevel = 0").unwrap();

        let result = HarnessConfig::load_from(Some(file.path()), "DHIS2_HARNESS_INVALID_TEST");
        assert!(matches!(result, Err(HarnessError::Configuration(_))));
    }
}
