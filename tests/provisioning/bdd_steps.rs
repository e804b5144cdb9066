//! BDD step definitions for provisioning and deleting volumes.

use std::collections::BTreeMap;

use nexstor::{
    IDENTITY_ANNOTATION, NfsSource, ProvisionError, Provisioner, VolumeDescriptor, VolumeRequest,
    parse_quantity,
};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{Outcome, ProvisioningContext};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn runtime() -> Result<Runtime, StepError> {
    Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))
}

fn descriptor(path: &str, owner: Option<&str>) -> VolumeDescriptor {
    let annotations = owner
        .map(|identity| BTreeMap::from([(IDENTITY_ANNOTATION.to_owned(), identity.to_owned())]))
        .unwrap_or_default();
    let name = path.rsplit('/').next().unwrap_or(path).to_owned();
    VolumeDescriptor::reconstructed(
        name,
        annotations,
        NfsSource {
            server: String::from("nexenta.example"),
            path: path.to_owned(),
            read_only: false,
        },
    )
}

#[given("an appliance accepting the provisioner credentials")]
fn appliance_ready(provisioning_context: ProvisioningContext) -> ProvisioningContext {
    provisioning_context
}

#[given("the appliance fails export creation")]
fn exports_fail(provisioning_context: ProvisioningContext) -> ProvisioningContext {
    provisioning_context.appliance.fail_exports();
    provisioning_context
}

#[given("the appliance completes jobs after \"{polls}\" polls")]
fn jobs_are_asynchronous(provisioning_context: ProvisioningContext, polls: u32) -> ProvisioningContext {
    provisioning_context.appliance.accept_asynchronously(polls);
    provisioning_context
}

#[given("the appliance session expires")]
fn session_expires(provisioning_context: ProvisioningContext) -> ProvisioningContext {
    provisioning_context.appliance.expire_token();
    provisioning_context
}

#[given("a volume request named \"{name}\" without a quota")]
fn request_without_quota(provisioning_context: ProvisioningContext, name: String) -> ProvisioningContext {
    provisioning_context.state().request = Some(VolumeRequest::new(name));
    provisioning_context
}

#[given("a volume request named \"{name}\" with capacity \"{capacity}\"")]
fn request_with_quota(
    provisioning_context: ProvisioningContext,
    name: String,
    capacity: String,
) -> Result<ProvisioningContext, StepError> {
    let bytes = parse_quantity(&capacity)?;
    provisioning_context.state().request = Some(VolumeRequest::new(name).with_capacity(bytes));
    Ok(provisioning_context)
}

#[given("a provisioned volume named \"{name}\"")]
fn provisioned_volume(
    provisioning_context: ProvisioningContext,
    name: String,
) -> Result<ProvisioningContext, StepError> {
    let provisioner = provisioning_context.provisioner.clone();
    let request = VolumeRequest::new(name);
    let created = runtime()?.block_on(async move { provisioner.provision(&request).await })?;
    provisioning_context.state().descriptor = Some(created);
    Ok(provisioning_context)
}

#[given("a descriptor for \"{path}\" owned by \"{owner}\"")]
fn foreign_descriptor(
    provisioning_context: ProvisioningContext,
    path: String,
    owner: String,
) -> ProvisioningContext {
    provisioning_context.state().descriptor = Some(descriptor(&path, Some(&owner)));
    provisioning_context
}

#[given("a descriptor for \"{path}\" without an identity")]
fn anonymous_descriptor(provisioning_context: ProvisioningContext, path: String) -> ProvisioningContext {
    provisioning_context.state().descriptor = Some(descriptor(&path, None));
    provisioning_context
}

#[when("I provision the volume")]
fn provision_volume(provisioning_context: ProvisioningContext) -> Result<ProvisioningContext, StepError> {
    let request = provisioning_context
        .state()
        .request
        .clone()
        .ok_or_else(|| StepError::Assertion(String::from("no volume request prepared")))?;
    let provisioner = provisioning_context.provisioner.clone();

    let result = runtime()?.block_on(async move { provisioner.provision(&request).await });
    provisioning_context.state().outcome = Some(match result {
        Ok(created) => Outcome::Provisioned(created),
        Err(err) => Outcome::Failed(err),
    });
    Ok(provisioning_context)
}

#[when("I delete the volume")]
fn delete_volume(provisioning_context: ProvisioningContext) -> Result<ProvisioningContext, StepError> {
    let target = provisioning_context
        .state()
        .descriptor
        .clone()
        .ok_or_else(|| StepError::Assertion(String::from("no descriptor prepared")))?;
    let provisioner = provisioning_context.provisioner.clone();

    let result = runtime()?.block_on(async move { provisioner.delete(&target).await });
    provisioning_context.state().outcome = Some(match result {
        Ok(()) => Outcome::Deleted,
        Err(err) => Outcome::Failed(err),
    });
    Ok(provisioning_context)
}

#[then("the operation succeeds")]
fn operation_succeeds(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    match &provisioning_context.state().outcome {
        Some(Outcome::Provisioned(_) | Outcome::Deleted) => Ok(()),
        Some(Outcome::Failed(err)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {err}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the operation fails with \"{kind}\"")]
fn operation_fails(provisioning_context: &ProvisioningContext, kind: String) -> Result<(), StepError> {
    let state = provisioning_context.state();
    let Some(Outcome::Failed(err)) = &state.outcome else {
        return Err(StepError::Assertion(String::from(
            "expected failure outcome",
        )));
    };
    let actual = match err {
        ProvisionError::Client(_) => "client",
        ProvisionError::Validation(_) => "validation",
        ProvisionError::Appliance { .. } => "appliance",
        ProvisionError::MissingIdentity { .. } => "missing-identity",
        ProvisionError::Ignored { .. } => "ignored",
        ProvisionError::InvalidQuantity { .. } => "quantity",
    };
    if actual == kind {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected failure kind {kind}, got {actual}: {err}"
        )))
    }
}

#[then("the filesystem \"{path}\" has quota \"{bytes}\"")]
fn filesystem_quota(
    provisioning_context: &ProvisioningContext,
    path: String,
    bytes: u64,
) -> Result<(), StepError> {
    let quota = provisioning_context.appliance.quota(&path);
    if quota == Some(bytes) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected quota {bytes} on {path}, got {quota:?}"
        )))
    }
}

#[then("the filesystem \"{path}\" has no quota")]
fn filesystem_without_quota(
    provisioning_context: &ProvisioningContext,
    path: String,
) -> Result<(), StepError> {
    let appliance = &provisioning_context.appliance;
    if !appliance.filesystems().contains(&path) {
        return Err(StepError::Assertion(format!("{path} was not created")));
    }
    match appliance.quota(&path) {
        None => Ok(()),
        Some(quota) => Err(StepError::Assertion(format!(
            "expected no quota on {path}, got {quota}"
        ))),
    }
}

#[then("the filesystem \"{path}\" is exported")]
fn filesystem_exported(provisioning_context: &ProvisioningContext, path: String) -> Result<(), StepError> {
    if provisioning_context.appliance.exports().contains(&path) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!("{path} is not exported")))
    }
}

#[then("the filesystem \"{path}\" is still present")]
fn filesystem_exists(provisioning_context: &ProvisioningContext, path: String) -> Result<(), StepError> {
    if provisioning_context.appliance.filesystems().contains(&path) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!("{path} does not exist")))
    }
}

#[then("the filesystem \"{path}\" was removed")]
fn filesystem_removed(provisioning_context: &ProvisioningContext, path: String) -> Result<(), StepError> {
    if provisioning_context.appliance.filesystems().contains(&path) {
        Err(StepError::Assertion(format!("{path} still exists")))
    } else {
        Ok(())
    }
}

#[then("the descriptor export path is \"{path}\"")]
fn descriptor_path(provisioning_context: &ProvisioningContext, path: String) -> Result<(), StepError> {
    match &provisioning_context.state().outcome {
        Some(Outcome::Provisioned(created)) if created.nfs().path == path => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected descriptor with export path {path}, got {other:?}"
        ))),
    }
}

#[then("the descriptor identity is \"{identity}\"")]
fn descriptor_identity(
    provisioning_context: &ProvisioningContext,
    identity: String,
) -> Result<(), StepError> {
    match &provisioning_context.state().outcome {
        Some(Outcome::Provisioned(created)) if created.identity() == Some(identity.as_str()) => {
            Ok(())
        }
        other => Err(StepError::Assertion(format!(
            "expected descriptor owned by {identity}, got {other:?}"
        ))),
    }
}

#[then("the appliance received no requests")]
fn no_requests(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    let requests = provisioning_context.appliance.requests();
    if requests.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no appliance requests, got {}",
            requests.len()
        )))
    }
}

#[then("the appliance served \"{count}\" logins")]
fn login_count(provisioning_context: &ProvisioningContext, count: usize) -> Result<(), StepError> {
    let logins = provisioning_context.appliance.logins();
    if logins == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} logins, got {logins}"
        )))
    }
}
