//! Request bodies for the appliance filesystem and NFS endpoints.

use serde::Serialize;

/// Endpoint that creates filesystems.
pub const FILESYSTEMS_ENDPOINT: &str = "storage/filesystems";

/// Endpoint that creates NFS exports.
pub const NFS_ENDPOINT: &str = "nas/nfs";

/// Anonymous user that remote root is mapped to on new exports.
pub const ANONYMOUS_ACCESS: &str = "root";

/// Body of `POST storage/filesystems`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FilesystemSpec {
    /// `<pool>/<name>`.
    pub path: String,
    /// Quota in bytes. Omitted from the body when unset.
    #[serde(rename = "quotaSize", skip_serializing_if = "Option::is_none")]
    pub quota_size: Option<u64>,
}

/// Body of `POST nas/nfs`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExportSpec {
    /// Filesystem path being exported.
    pub filesystem: String,
    /// Anonymous access mapping.
    pub anon: String,
}

impl ExportSpec {
    /// Export for `filesystem` with the administrative anonymous mapping.
    #[must_use]
    pub fn for_filesystem(filesystem: &FilesystemSpec) -> Self {
        Self {
            filesystem: filesystem.path.clone(),
            anon: ANONYMOUS_ACCESS.to_owned(),
        }
    }
}
