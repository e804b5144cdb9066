//! Volume request and descriptor types exchanged with the controller.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ProvisionError;

/// Annotation key under which the owning provisioner's identity is recorded.
pub const IDENTITY_ANNOTATION: &str = "nexentaStorProvisionerIdentity";

/// How a volume may be mounted.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum AccessMode {
    /// Read-write by a single node.
    ReadWriteOnce,
    /// Read-only by many nodes.
    ReadOnlyMany,
    /// Read-write by many nodes.
    ReadWriteMany,
}

impl AccessMode {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadWriteOnce => "ReadWriteOnce",
            Self::ReadOnlyMany => "ReadOnlyMany",
            Self::ReadWriteMany => "ReadWriteMany",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = ProvisionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "ReadWriteOnce" | "RWO" => Ok(Self::ReadWriteOnce),
            "ReadOnlyMany" | "ROX" => Ok(Self::ReadOnlyMany),
            "ReadWriteMany" | "RWX" => Ok(Self::ReadWriteMany),
            other => Err(ProvisionError::Validation(format!(
                "unknown access mode {other:?}"
            ))),
        }
    }
}

/// What happens to the appliance filesystem once the volume is released.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ReclaimPolicy {
    /// Keep the filesystem.
    Retain,
    /// Delete the filesystem.
    #[default]
    Delete,
    /// Scrub and reuse. Kept for compatibility with older controllers.
    Recycle,
}

impl FromStr for ReclaimPolicy {
    type Err = ProvisionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Retain" => Ok(Self::Retain),
            "Delete" => Ok(Self::Delete),
            "Recycle" => Ok(Self::Recycle),
            other => Err(ProvisionError::Validation(format!(
                "unknown reclaim policy {other:?}"
            ))),
        }
    }
}

/// A caller's request for a new volume.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeRequest {
    /// Volume name; becomes the last component of the filesystem path.
    pub name: String,
    /// Requested capacity in bytes. `None` creates the filesystem without a
    /// quota.
    pub capacity_bytes: Option<u64>,
    /// Requested access modes, copied onto the descriptor.
    pub access_modes: Vec<AccessMode>,
    /// Reclaim policy, copied onto the descriptor.
    pub reclaim_policy: ReclaimPolicy,
}

impl VolumeRequest {
    /// Creates a request with no quota, no access modes and the default
    /// reclaim policy.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity_bytes: None,
            access_modes: Vec::new(),
            reclaim_policy: ReclaimPolicy::default(),
        }
    }

    /// Sets the requested capacity.
    #[must_use]
    pub const fn with_capacity(mut self, bytes: u64) -> Self {
        self.capacity_bytes = Some(bytes);
        self
    }

    /// Sets the access modes.
    #[must_use]
    pub fn with_access_modes(mut self, modes: impl IntoIterator<Item = AccessMode>) -> Self {
        self.access_modes = modes.into_iter().collect();
        self
    }

    /// Sets the reclaim policy.
    #[must_use]
    pub const fn with_reclaim_policy(mut self, policy: ReclaimPolicy) -> Self {
        self.reclaim_policy = policy;
        self
    }

    /// Checks that the name can be used as a single filesystem component.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] when the name is blank or
    /// contains a path separator.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ProvisionError::Validation(String::from(
                "volume name must not be empty",
            )));
        }
        if name.contains('/') {
            return Err(ProvisionError::Validation(format!(
                "volume name {name:?} must not contain '/'"
            )));
        }
        Ok(())
    }
}

/// NFS mount source handed to clients.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NfsSource {
    /// Appliance address serving the export.
    pub server: String,
    /// Exported path, `/<pool>/<name>`.
    pub path: String,
    /// Always false for provisioned volumes.
    #[serde(default)]
    pub read_only: bool,
}

/// A provisioned volume as returned to, and persisted by, the controller.
///
/// The identity annotation is written once at construction. There is no
/// setter for it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeDescriptor {
    name: String,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    capacity_bytes: Option<u64>,
    #[serde(default)]
    access_modes: Vec<AccessMode>,
    #[serde(default)]
    reclaim_policy: ReclaimPolicy,
    nfs: NfsSource,
}

impl VolumeDescriptor {
    pub(crate) fn provisioned(request: &VolumeRequest, identity: &str, nfs: NfsSource) -> Self {
        Self {
            name: request.name.trim().to_owned(),
            annotations: BTreeMap::from([(IDENTITY_ANNOTATION.to_owned(), identity.to_owned())]),
            capacity_bytes: request.capacity_bytes,
            access_modes: request.access_modes.clone(),
            reclaim_policy: request.reclaim_policy,
            nfs,
        }
    }

    /// Rebuilds a descriptor from the parts a controller persisted, for
    /// example before asking for deletion.
    #[must_use]
    pub fn reconstructed(
        name: impl Into<String>,
        annotations: BTreeMap<String, String>,
        nfs: NfsSource,
    ) -> Self {
        Self {
            name: name.into(),
            annotations,
            capacity_bytes: None,
            access_modes: Vec::new(),
            reclaim_policy: ReclaimPolicy::default(),
            nfs,
        }
    }

    /// Volume name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the provisioner that created the volume, if recorded.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.annotations.get(IDENTITY_ANNOTATION).map(String::as_str)
    }

    /// All annotations.
    #[must_use]
    pub const fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }

    /// Capacity in bytes, when one was requested.
    #[must_use]
    pub const fn capacity_bytes(&self) -> Option<u64> {
        self.capacity_bytes
    }

    /// Access modes copied from the request.
    #[must_use]
    pub fn access_modes(&self) -> &[AccessMode] {
        &self.access_modes
    }

    /// Reclaim policy copied from the request.
    #[must_use]
    pub const fn reclaim_policy(&self) -> ReclaimPolicy {
        self.reclaim_policy
    }

    /// NFS mount source.
    #[must_use]
    pub const fn nfs(&self) -> &NfsSource {
        &self.nfs
    }
}
