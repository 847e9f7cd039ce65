//! # DHIS2 API Client
//!
//! HTTP client for the DHIS2 Web API. Every request carries preemptive Basic
//! credentials and a JSON content type. Typed operations assert the single
//! status code the harness expects and turn anything else into
//! [`HarnessError::UnexpectedStatus`], logging the request and response first.

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, error, info};

use super::types::{AtomicMode, FilledOrganisationUnitLevels, ImportSummary, OrganisationUnit};
use crate::config::ApiConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::resources::MetadataFixture;

const JSON: &str = "application/json";

/// Body of an outgoing request
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Sent verbatim
    Text(String),
}

/// A completed exchange, kept whole so a failed expectation can be reported
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub method: Method,
    pub url: Url,
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Pass the response through if it carries `expected`, else fail with both codes
    pub fn expect_status(self, operation: &str, expected: u16) -> HarnessResult<Self> {
        if self.status_code() == expected {
            return Ok(self);
        }

        error!(
            operation = %operation,
            method = %self.method,
            url = %self.url,
            expected = expected,
            actual = self.status_code(),
            body = %self.body,
            "Request validation failed"
        );

        Err(HarnessError::unexpected_status(
            operation,
            expected,
            self.status_code(),
            self.body,
        ))
    }

    pub fn json(&self) -> HarnessResult<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// HTTP client for the DHIS2 Web API
#[derive(Clone)]
pub struct Dhis2ApiClient {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
}

impl std::fmt::Debug for Dhis2ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dhis2ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .finish()
    }
}

impl Dhis2ApiClient {
    /// Create a client rooted at `base_url` (e.g. `http://localhost:32768`)
    pub fn new(base_url: &str, api: &ApiConfig) -> HarnessResult<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        let base_url = Url::parse(&normalized).map_err(|e| {
            HarnessError::config_error(format!("Invalid base URL '{normalized}': {e}"))
        })?;

        // Containers are published on the local host; never route through a proxy.
        let client = Client::builder()
            .no_proxy()
            .timeout(api.timeout())
            .user_agent(format!("dhis2-regression-harness/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!(
            base_url = %base_url,
            timeout_ms = api.timeout_ms,
            "Created Dhis2ApiClient"
        );

        Ok(Self {
            client,
            base_url,
            username: api.username.clone(),
            password: api.password.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issue a POST without any status expectation
    pub async fn post_raw(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: RequestBody,
    ) -> HarnessResult<ApiResponse> {
        let url = self.url(path)?;
        let mut request = self
            .client
            .request(Method::POST, url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, HeaderValue::from_static(JSON))
            .header(ACCEPT, HeaderValue::from_static(JSON));

        if !query.is_empty() {
            request = request.query(query);
        }

        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.body(serde_json::to_vec(&value)?),
            RequestBody::Text(text) => request.body(text),
        };

        debug!(url = %url, "POST");

        let response = request.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let body = response.text().await?;

        debug!(url = %url, status = status.as_u16(), "Response received");

        Ok(ApiResponse {
            method: Method::POST,
            url,
            status,
            body,
        })
    }

    /// `POST api/organisationUnits`, expecting 201; returns the new UID
    pub async fn create_organisation_unit(&self, unit: &OrganisationUnit) -> HarnessResult<String> {
        let response = self
            .post_raw(
                "api/organisationUnits",
                &[],
                RequestBody::Json(serde_json::to_value(unit)?),
            )
            .await?
            .expect_status("Create organisation unit", 201)?;

        let uid = response
            .json()?
            .pointer("/response/uid")
            .and_then(Value::as_str)
            .filter(|uid| !uid.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                HarnessError::invalid_response("response.uid", "missing or empty in web message")
            })?;

        info!(uid = %uid, name = %unit.name, "Organisation unit created");
        Ok(uid)
    }

    /// `POST api/users/{user_id}/organisationUnits/{org_unit_id}`, expecting 204
    pub async fn add_organisation_unit_to_user(
        &self,
        user_id: &str,
        org_unit_id: &str,
    ) -> HarnessResult<()> {
        self.post_raw(
            &format!("api/users/{user_id}/organisationUnits/{org_unit_id}"),
            &[],
            RequestBody::Empty,
        )
        .await?
        .expect_status("Add organisation unit to user", 204)?;

        info!(user_id = %user_id, org_unit_id = %org_unit_id, "Organisation unit assigned to user");
        Ok(())
    }

    /// `POST api/filledOrganisationUnitLevels`, expecting 201
    pub async fn create_organisation_unit_levels(
        &self,
        levels: &FilledOrganisationUnitLevels,
    ) -> HarnessResult<()> {
        self.post_raw(
            "api/filledOrganisationUnitLevels",
            &[],
            RequestBody::Json(serde_json::to_value(levels)?),
        )
        .await?
        .expect_status("Create organisation unit levels", 201)?;

        info!(
            count = levels.organisation_unit_levels.len(),
            "Organisation unit levels created"
        );
        Ok(())
    }

    /// `POST api/metadata?atomicMode=...` with the fixture verbatim, expecting 200
    pub async fn import_metadata(
        &self,
        fixture: &MetadataFixture,
        atomic_mode: AtomicMode,
    ) -> HarnessResult<ImportSummary> {
        let response = self
            .post_raw(
                "api/metadata",
                &[("atomicMode", atomic_mode.as_query_value())],
                RequestBody::Text(fixture.body().to_string()),
            )
            .await?
            .expect_status("Import metadata", 200)?;

        let summary = ImportSummary::from_body(&response.body);
        info!(
            fixture = %fixture.name(),
            atomic_mode = %atomic_mode,
            status = summary.status.as_deref().unwrap_or("unknown"),
            created = summary.stats.created,
            updated = summary.stats.updated,
            ignored = summary.stats.ignored,
            "Metadata import completed"
        );

        Ok(summary)
    }

    fn url(&self, path: &str) -> HarnessResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| HarnessError::config_error(format!("Invalid API path '{path}': {e}")))
    }
}
