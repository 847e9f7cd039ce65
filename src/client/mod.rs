//! # DHIS2 Web API Client
//!
//! Typed access to the four endpoints the regression scenario needs.

pub mod api_client;
pub mod types;

pub use api_client::{ApiResponse, Dhis2ApiClient, RequestBody};
pub use types::{
    AtomicMode, FilledOrganisationUnitLevels, ImportStats, ImportSummary, OrganisationUnit,
    OrganisationUnitLevel,
};
