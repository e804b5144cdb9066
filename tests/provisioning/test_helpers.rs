//! Shared fixtures for provisioning BDD scenarios.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use nexstor::client::JobPolicy;
use nexstor::test_support::FakeAppliance;
use nexstor::{
    ApplianceProvisioner, Credentials, ManagementClient, ProvisionError, ProvisionerSettings,
    Session, VolumeDescriptor, VolumeRequest,
};
use rstest::fixture;

pub const IDENTITY: &str = "node-a";
pub const POOL: &str = "tank";

pub type ProvisioningContextResult = Result<ProvisioningContext, ProvisionError>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    Provisioned(VolumeDescriptor),
    Deleted,
    Failed(ProvisionError),
}

#[derive(Debug, Default)]
pub struct ScenarioState {
    pub request: Option<VolumeRequest>,
    pub descriptor: Option<VolumeDescriptor>,
    pub outcome: Option<Outcome>,
}

#[derive(Clone, Debug)]
pub struct ProvisioningContext {
    pub appliance: FakeAppliance,
    pub provisioner: Arc<ApplianceProvisioner<FakeAppliance>>,
    state: Arc<Mutex<ScenarioState>>,
}

impl ProvisioningContext {
    pub fn state(&self) -> MutexGuard<'_, ScenarioState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[fixture]
pub fn provisioning_context_result() -> ProvisioningContextResult {
    build_context()
}

#[fixture]
pub fn provisioning_context(
    provisioning_context_result: ProvisioningContextResult,
) -> ProvisioningContext {
    provisioning_context_result
        .unwrap_or_else(|err| panic!("provisioning context fixture should initialise: {err}"))
}

fn build_context() -> Result<ProvisioningContext, ProvisionError> {
    let appliance = FakeAppliance::new("admin", "secret");
    let client = ManagementClient::new(
        Session::new(
            "https://nexenta.example:8443/",
            Some(Credentials::new("admin", "secret")),
        ),
        appliance.clone(),
    )
    .with_job_policy(JobPolicy {
        poll_interval: Duration::from_millis(1),
        timeout: Duration::from_secs(2),
    });
    let provisioner = ApplianceProvisioner::new(
        client,
        ProvisionerSettings {
            identity: String::from(IDENTITY),
            pool: String::from(POOL),
            server: String::from("nexenta.example"),
        },
    )?;

    Ok(ProvisioningContext {
        appliance,
        provisioner: Arc::new(provisioner),
        state: Arc::new(Mutex::new(ScenarioState::default())),
    })
}
