//! BDD scenarios for the provisioning workflow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ProvisioningContext, provisioning_context};

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Provision a volume with a quota"
)]
fn scenario_provision_with_quota(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Provision a volume without a quota"
)]
fn scenario_provision_without_quota(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Export failure leaves the filesystem behind"
)]
fn scenario_export_failure(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Wait for asynchronous appliance jobs"
)]
fn scenario_async_jobs(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Delete a volume this instance created"
)]
fn scenario_delete_own_volume(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Skip a volume owned by another instance"
)]
fn scenario_foreign_volume_ignored(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Refuse a volume without an identity marker"
)]
fn scenario_missing_identity(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Log in again after the session expires"
)]
fn scenario_relogin_after_expiry(provisioning_context: ProvisioningContext) {
    drop(provisioning_context);
}
