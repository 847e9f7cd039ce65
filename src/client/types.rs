//! Request and response bodies for the DHIS2 REST endpoints the harness touches.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST api/organisationUnits`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganisationUnit {
    pub name: String,
    pub short_name: String,
    /// Epoch milliseconds
    pub opening_date: i64,
}

impl OrganisationUnit {
    /// Org unit opened now
    pub fn opened_now(name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            opening_date: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganisationUnitLevel {
    pub name: String,
    pub level: u32,
}

/// Body of `POST api/filledOrganisationUnitLevels`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilledOrganisationUnitLevels {
    pub organisation_unit_levels: Vec<OrganisationUnitLevel>,
}

impl FilledOrganisationUnitLevels {
    pub fn single(name: impl Into<String>, level: u32) -> Self {
        Self {
            organisation_unit_levels: vec![OrganisationUnitLevel {
                name: name.into(),
                level,
            }],
        }
    }
}

/// `atomicMode` query parameter of the metadata importer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AtomicMode {
    /// Any invalid object fails the whole import
    All,
    /// Valid objects are imported even when others fail
    #[default]
    None,
}

impl AtomicMode {
    pub fn as_query_value(&self) -> &'static str {
        match self {
            AtomicMode::All => "ALL",
            AtomicMode::None => "NONE",
        }
    }
}

impl std::fmt::Display for AtomicMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_query_value())
    }
}

/// Status and counters of a metadata import report
///
/// DHIS2 2.37 returns the report at the top level; newer versions wrap it in
/// a web message under `response`. Both shapes are accepted and any field
/// may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImportSummary {
    pub status: Option<String>,
    #[serde(default)]
    pub stats: ImportStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImportStats {
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
    pub ignored: u64,
    pub total: u64,
}

impl ImportSummary {
    pub fn from_body(body: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return Self::default();
        };

        let report = match value.get("response") {
            Some(inner) if inner.get("stats").is_some() => inner.clone(),
            _ => value,
        };

        serde_json::from_value(report).unwrap_or_default()
    }
}
