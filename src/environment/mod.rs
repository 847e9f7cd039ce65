//! # Environment Provisioner
//!
//! Ephemeral containers for a regression run, built on `testcontainers`:
//!
//! ```text
//! dhis2-harness-<run id>     # private network
//! ├── db-<run id>            # PostGIS (PostgisDatabase)
//! └── dhis2-<run id>         # DHIS2 core (Dhis2Service), port 8080 published
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dhis2_harness::config::HarnessConfig;
//! use dhis2_harness::environment::Dhis2TestEnvironment;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarnessConfig::load()?;
//! let environment = Dhis2TestEnvironment::start(&config).await?;
//! let client = environment.api_client(&config.api)?;
//! // ... drive the API ...
//! environment.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Containers are removed when the environment is dropped, so an early `?`
//! or a failed assertion never leaks them. Tests that drop the environment
//! must run on a multi-threaded runtime (`#[tokio::test(flavor = "multi_thread")]`).

pub mod dhis2_container;
pub mod postgres_container;
pub mod test_suite;

pub use dhis2_container::Dhis2Service;
pub use postgres_container::PostgisDatabase;
pub use test_suite::{ContainerEndpoint, Dhis2TestEnvironment};
