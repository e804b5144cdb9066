//! Core library for the `nexstor` NFS volume provisioner.
//!
//! The crate exposes an authenticating client for the appliance management
//! API and a [`Provisioner`] capability built on it: provisioning creates a
//! filesystem plus an NFS export and returns a mountable descriptor, deletion
//! removes the filesystem when the descriptor names this instance as owner.

pub mod client;
pub mod config;
pub mod files;
pub mod logging;
pub mod provisioner;
pub mod session;
pub mod test_support;

pub use client::{ApiOutcome, ApiResponse, ClientError, ManagementClient, Transport};
pub use config::{ApplianceConfig, ConfigError};
pub use provisioner::{
    AccessMode, ApplianceProvisioner, IDENTITY_ANNOTATION, NfsSource, ProvisionError, Provisioner,
    ProvisionerSettings, ReclaimPolicy, VolumeDescriptor, VolumeRequest, parse_quantity,
};
pub use session::{CachedToken, Credentials, Session, Token};
