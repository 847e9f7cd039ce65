#![allow(clippy::doc_markdown)] // Allow technical terms like PostGIS, DHIS2 in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # DHIS2 Regression Harness
//!
//! Container-backed regression test for DHIS2-12595: importing the MLAG00
//! metadata package with `atomicMode=NONE` into an instance that already has
//! an organisation unit assigned to the admin user and one org unit level.
//!
//! ## Flow
//!
//! ```text
//! Dhis2TestEnvironment::start   PostGIS + DHIS2 on a private network
//!         │
//! BootstrapClient::run          org unit → assign to user → level
//!         │  BootstrapOutcome
//! ScenarioRunner::import_metadata   POST api/metadata?atomicMode=NONE → 200
//! ```
//!
//! Each step is a plain sequential `await`; any unexpected status ends the run
//! with [`HarnessError::UnexpectedStatus`].
//!
//! The bundled `MLAG00_1.2.1_DHIS2.37.json` is a stand-in for the upstream
//! MLAG00 1.2.1 package with invented UIDs. Its only tie to the org unit
//! hierarchy is level 1 in a validation rule, so a passing run is not a
//! byte-exact reproduction of the upstream import. Drop the upstream file into
//! `resources/` under the same name for that.
//!
//! ## Module Organization
//!
//! - [`environment`] - PostGIS and DHIS2 containers and their lifecycle
//! - [`client`] - DHIS2 Web API client and request/response types
//! - [`bootstrap`] - Reference data setup
//! - [`scenario`] - Metadata import scenario
//! - [`resources`] - Bundled fixtures and the `dhis.conf` template
//! - [`config`] - Layered harness configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Error taxonomy
//!
//! ## Testing
//!
//! ```bash
//! cargo test                          # Unit tests and fake-API integration tests
//! cargo test -- --ignored             # Docker-backed regression scenario
//! ```

pub mod bootstrap;
pub mod client;
pub mod config;
pub mod environment;
pub mod error;
pub mod logging;
pub mod resources;
pub mod scenario;

pub use bootstrap::{BootstrapClient, BootstrapOutcome};
pub use client::{AtomicMode, Dhis2ApiClient, ImportSummary};
pub use config::HarnessConfig;
pub use environment::{ContainerEndpoint, Dhis2TestEnvironment};
pub use error::{HarnessError, HarnessResult};
pub use resources::MetadataFixture;
pub use scenario::ScenarioRunner;
