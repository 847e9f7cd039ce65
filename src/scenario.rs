//! # Scenario Runner
//!
//! Submits the bundled metadata fixture to the bulk importer. A status other
//! than 200 means the DHIS2-12595 regression is back.

use tracing::info;

use crate::bootstrap::BootstrapOutcome;
use crate::client::{Dhis2ApiClient, ImportSummary};
use crate::config::ScenarioConfig;
use crate::error::HarnessResult;
use crate::resources::MetadataFixture;

pub struct ScenarioRunner<'a> {
    client: &'a Dhis2ApiClient,
    scenario: &'a ScenarioConfig,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(client: &'a Dhis2ApiClient, scenario: &'a ScenarioConfig) -> Self {
        Self { client, scenario }
    }

    pub fn load_fixture(&self) -> HarnessResult<MetadataFixture> {
        MetadataFixture::load(&self.scenario.resource_dir(), &self.scenario.fixture)
    }

    /// Import the fixture with the configured atomic mode, expecting 200
    pub async fn import_metadata(&self, setup: &BootstrapOutcome) -> HarnessResult<ImportSummary> {
        let fixture = self.load_fixture()?;

        info!(
            fixture = %fixture.name(),
            org_unit_id = %setup.org_unit_id(),
            atomic_mode = %self.scenario.atomic_mode,
            "Importing metadata fixture"
        );

        self.client
            .import_metadata(&fixture, self.scenario.atomic_mode)
            .await
    }
}
