//! # Bundled Resources
//!
//! Fixture payloads and the DHIS2 configuration template ship in the crate's
//! `resources/` directory. Fixtures are opaque: they are read, checked to be
//! text, and submitted verbatim.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};

/// An import payload loaded from the resource directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFixture {
    name: String,
    body: String,
}

impl MetadataFixture {
    /// Load `name` from `resource_dir`
    pub fn load(resource_dir: &Path, name: &str) -> HarnessResult<Self> {
        let path = resource_dir.join(name);
        let bytes = fs::read(&path).map_err(|e| HarnessError::resource(&path, e))?;
        let body = String::from_utf8(bytes).map_err(|e| HarnessError::InvalidFixture {
            name: name.to_string(),
            reason: format!("not valid UTF-8 text: {e}"),
        })?;

        debug!(fixture = %name, bytes = body.len(), "Loaded metadata fixture");

        Ok(Self {
            name: name.to_string(),
            body,
        })
    }

    pub fn from_text(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Where the application reaches its database from inside the container network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConnection {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl DatabaseConnection {
    pub fn jdbc_url(&self) -> String {
        format!("jdbc:postgresql://{}:{}/{}", self.host, self.port, self.name)
    }
}

/// A `dhis.conf` rendered for one run; the file lives as long as this value
#[derive(Debug)]
pub struct RenderedAppConfig {
    dir: TempDir,
    path: PathBuf,
}

impl RenderedAppConfig {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Substitute `${DB_*}` placeholders in a configuration template
pub fn render_template(template: &str, db: &DatabaseConnection) -> String {
    template
        .replace("${DB_JDBC_URL}", &db.jdbc_url())
        .replace("${DB_HOST}", &db.host)
        .replace("${DB_PORT}", &db.port.to_string())
        .replace("${DB_NAME}", &db.name)
        .replace("${DB_USER}", &db.user)
        .replace("${DB_PASSWORD}", &db.password)
}

/// Render the template at `template_path` into a fresh temporary directory
pub fn render_app_config(
    template_path: &Path,
    db: &DatabaseConnection,
) -> HarnessResult<RenderedAppConfig> {
    let template =
        fs::read_to_string(template_path).map_err(|e| HarnessError::resource(template_path, e))?;

    let dir = tempfile::Builder::new()
        .prefix("dhis2-harness-")
        .tempdir()
        .map_err(|e| HarnessError::resource(std::env::temp_dir(), e))?;

    let file_name = template_path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("dhis.conf"));
    let path = dir.path().join(file_name);

    fs::write(&path, render_template(&template, db)).map_err(|e| HarnessError::resource(&path, e))?;
    make_container_accessible(dir.path(), &path)?;

    debug!(path = %path.display(), db_host = %db.host, "Rendered application config");

    Ok(RenderedAppConfig { dir, path })
}

// The application runs as an unprivileged user inside its container and the
// mount is read-write.
#[cfg(unix)]
fn make_container_accessible(dir: &Path, file: &Path) -> HarnessResult<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o777))
        .map_err(|e| HarnessError::resource(dir, e))?;
    fs::set_permissions(file, fs::Permissions::from_mode(0o666))
        .map_err(|e| HarnessError::resource(file, e))
}

#[cfg(not(unix))]
fn make_container_accessible(_dir: &Path, _file: &Path) -> HarnessResult<()> {
    Ok(())
}
