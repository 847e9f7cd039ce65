//! # Bootstrap Client
//!
//! Creates the reference data the metadata import depends on, in a fixed
//! order: an organisation unit, its assignment to the test user, and one
//! organisation unit level. The result is returned as a [`BootstrapOutcome`]
//! that the scenario requires, so the import cannot be issued before setup.

use tracing::info;

use crate::client::{Dhis2ApiClient, FilledOrganisationUnitLevels, OrganisationUnit};
use crate::config::HarnessConfig;
use crate::error::HarnessResult;

/// Proof that bootstrap completed, carrying the created org unit's UID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    org_unit_id: String,
}

impl BootstrapOutcome {
    pub fn org_unit_id(&self) -> &str {
        &self.org_unit_id
    }
}

pub struct BootstrapClient<'a> {
    client: &'a Dhis2ApiClient,
    config: &'a HarnessConfig,
}

impl<'a> BootstrapClient<'a> {
    pub fn new(client: &'a Dhis2ApiClient, config: &'a HarnessConfig) -> Self {
        Self { client, config }
    }

    /// Create the org unit (expects 201) and return its UID
    pub async fn create_org_unit(&self) -> HarnessResult<String> {
        let unit = OrganisationUnit::opened_now(
            &self.config.scenario.org_unit_name,
            &self.config.scenario.org_unit_short_name,
        );
        self.client.create_organisation_unit(&unit).await
    }

    /// Assign `org_unit_id` to the configured user (expects 204)
    pub async fn add_org_unit_to_user(&self, org_unit_id: &str) -> HarnessResult<()> {
        self.client
            .add_organisation_unit_to_user(&self.config.api.user_id, org_unit_id)
            .await
    }

    /// Create the single configured org unit level (expects 201)
    pub async fn create_org_unit_level(&self) -> HarnessResult<()> {
        let levels = FilledOrganisationUnitLevels::single(
            &self.config.scenario.level_name,
            self.config.scenario.level,
        );
        self.client.create_organisation_unit_levels(&levels).await
    }

    /// Run all three steps once, stopping at the first failure
    pub async fn run(&self) -> HarnessResult<BootstrapOutcome> {
        let org_unit_id = self.create_org_unit().await?;
        self.add_org_unit_to_user(&org_unit_id).await?;
        self.create_org_unit_level().await?;

        info!(
            org_unit_id = %org_unit_id,
            user_id = %self.config.api.user_id,
            level = %self.config.scenario.level_name,
            "Bootstrap complete"
        );

        Ok(BootstrapOutcome { org_unit_id })
    }
}
