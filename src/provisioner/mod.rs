//! Volume provisioning on top of the management client.
//!
//! [`Provisioner`] is the capability an external controller drives.
//! [`ApplianceProvisioner`] implements it by creating a filesystem and an NFS
//! export per volume, and by deleting the filesystem on release when the
//! volume's identity marker names this instance.

mod error;
mod path;
mod payload;
mod quantity;
mod types;

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use tracing::{info, warn};

use crate::client::{
    Acknowledgement, ApiOutcome, ApiResponse, HttpTransport, ManagementClient, Method, Transport,
};
use crate::config::ApplianceConfig;

pub use error::ProvisionError;
pub use path::{encode_filesystem_path, export_path, filesystem_path};
pub use payload::{ANONYMOUS_ACCESS, ExportSpec, FILESYSTEMS_ENDPOINT, FilesystemSpec, NFS_ENDPOINT};
pub use quantity::parse_quantity;
pub use types::{
    AccessMode, IDENTITY_ANNOTATION, NfsSource, ReclaimPolicy, VolumeDescriptor, VolumeRequest,
};

/// Future returned by [`Provisioner`] operations.
pub type ProvisionFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ProvisionError>> + Send + 'a>>;

/// Creates and releases volumes on behalf of a controller.
pub trait Provisioner: Send + Sync {
    /// Creates the backing storage for `request` and describes how to mount it.
    fn provision<'a>(&'a self, request: &'a VolumeRequest)
    -> ProvisionFuture<'a, VolumeDescriptor>;

    /// Releases the backing storage of a volume this instance created.
    ///
    /// Volumes owned by another instance yield [`ProvisionError::Ignored`].
    fn delete<'a>(&'a self, descriptor: &'a VolumeDescriptor) -> ProvisionFuture<'a, ()>;
}

/// Fixed settings of one provisioner instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionerSettings {
    /// Identity recorded on, and required for deleting, volumes.
    pub identity: String,
    /// Pool new filesystems are created in.
    pub pool: String,
    /// NFS server address placed in descriptors.
    pub server: String,
}

impl ProvisionerSettings {
    /// Settings derived from appliance configuration.
    #[must_use]
    pub fn from_config(config: &ApplianceConfig) -> Self {
        Self {
            identity: config.node_name.trim().to_owned(),
            pool: config.pool.trim().to_owned(),
            server: config.hostname.trim().to_owned(),
        }
    }

    fn validate(&self) -> Result<(), ProvisionError> {
        for (field, value) in [
            ("identity", &self.identity),
            ("pool", &self.pool),
            ("server", &self.server),
        ] {
            if value.trim().is_empty() {
                return Err(ProvisionError::Validation(format!(
                    "provisioner {field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// [`Provisioner`] backed by the appliance management API.
#[derive(Debug)]
pub struct ApplianceProvisioner<T = HttpTransport> {
    client: ManagementClient<T>,
    settings: ProvisionerSettings,
}

impl ApplianceProvisioner<HttpTransport> {
    /// Builds a provisioner and its HTTPS client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Client`] when the client cannot be built and
    /// [`ProvisionError::Validation`] when the settings are incomplete.
    pub fn from_config(config: &ApplianceConfig) -> Result<Self, ProvisionError> {
        let client = ManagementClient::from_config(config)?;
        Self::new(client, ProvisionerSettings::from_config(config))
    }
}

impl<T: Transport> ApplianceProvisioner<T> {
    /// Creates a provisioner over an existing client.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] when any setting is empty.
    pub fn new(
        client: ManagementClient<T>,
        settings: ProvisionerSettings,
    ) -> Result<Self, ProvisionError> {
        settings.validate()?;
        Ok(Self { client, settings })
    }

    /// Client used for appliance calls.
    #[must_use]
    pub const fn client(&self) -> &ManagementClient<T> {
        &self.client
    }

    /// Identity recorded on volumes created by this instance.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.settings.identity
    }

    async fn create_volume(
        &self,
        request: &VolumeRequest,
    ) -> Result<VolumeDescriptor, ProvisionError> {
        request.validate()?;
        let filesystem = FilesystemSpec {
            path: filesystem_path(&self.settings.pool, &request.name),
            quota_size: request.capacity_bytes,
        };

        info!(
            volume = %request.name.trim(),
            path = %filesystem.path,
            quota = ?filesystem.quota_size,
            "creating filesystem"
        );
        self.post(FILESYSTEMS_ENDPOINT, &filesystem).await?;

        let export = ExportSpec::for_filesystem(&filesystem);
        if let Err(err) = self.post(NFS_ENDPOINT, &export).await {
            warn!(
                path = %filesystem.path,
                error = %err,
                "export creation failed; filesystem left in place"
            );
            return Err(err);
        }

        let descriptor = VolumeDescriptor::provisioned(
            request,
            &self.settings.identity,
            NfsSource {
                server: self.settings.server.clone(),
                path: export_path(&filesystem.path),
                read_only: false,
            },
        );
        info!(
            volume = %descriptor.name(),
            server = %descriptor.nfs().server,
            export = %descriptor.nfs().path,
            "volume provisioned"
        );
        Ok(descriptor)
    }

    async fn delete_volume(&self, descriptor: &VolumeDescriptor) -> Result<(), ProvisionError> {
        let volume = descriptor.name();
        let owner = descriptor
            .identity()
            .ok_or_else(|| ProvisionError::MissingIdentity {
                volume: volume.to_owned(),
            })?;
        if owner != self.settings.identity {
            info!(volume, owner, "skipping volume owned by another provisioner");
            return Err(ProvisionError::Ignored {
                volume: volume.to_owned(),
                owner: owner.to_owned(),
            });
        }

        let segment = encode_filesystem_path(&descriptor.nfs().path).ok_or_else(|| {
            ProvisionError::Validation(format!("volume {volume} has an empty export path"))
        })?;
        let endpoint = format!("{FILESYSTEMS_ENDPOINT}/{segment}");
        info!(volume, endpoint = %endpoint, "deleting filesystem");

        let response = self.client.delete(&endpoint).await?;
        if response.status() == 404 {
            info!(volume, "filesystem already absent");
            return Ok(());
        }
        Self::expect_success(&Method::DELETE, &endpoint, response)
    }

    async fn post<B>(&self, endpoint: &str, body: &B) -> Result<(), ProvisionError>
    where
        B: Serialize + Sync,
    {
        let response = self.client.post(endpoint, body).await?;
        Self::expect_success(&Method::POST, endpoint, response)
    }

    fn expect_success(
        method: &Method,
        endpoint: &str,
        response: ApiResponse,
    ) -> Result<(), ProvisionError> {
        match response.decode::<Acknowledgement>(endpoint)? {
            ApiOutcome::Ok(Acknowledgement {}) => Ok(()),
            ApiOutcome::ApiError(error) => Err(ProvisionError::appliance(
                format!("{method} {endpoint}"),
                error,
            )),
        }
    }
}

impl<T: Transport> Provisioner for ApplianceProvisioner<T> {
    fn provision<'a>(
        &'a self,
        request: &'a VolumeRequest,
    ) -> ProvisionFuture<'a, VolumeDescriptor> {
        Box::pin(self.create_volume(request))
    }

    fn delete<'a>(&'a self, descriptor: &'a VolumeDescriptor) -> ProvisionFuture<'a, ()> {
        Box::pin(self.delete_volume(descriptor))
    }
}
