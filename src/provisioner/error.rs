//! Error types for volume provisioning.

use thiserror::Error;

use crate::client::{ApiError, ClientError};

/// Errors raised by [`super::Provisioner`] operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProvisionError {
    /// Raised when the management client fails; passed through unchanged.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// Raised when a request or the provisioner settings are unusable.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Raised when the appliance answers a call with a non-success status.
    #[error("appliance rejected {operation} with HTTP {status}: {message}")]
    Appliance {
        /// Call that failed, for example `POST nas/nfs`.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Appliance `message` field.
        message: String,
        /// Appliance `code` field, when present.
        code: Option<String>,
    },
    /// Raised when a descriptor carries no identity marker at all.
    #[error("volume {volume} has no provisioner identity marker")]
    MissingIdentity {
        /// Volume name.
        volume: String,
    },
    /// Raised when another provisioner instance owns the volume. Callers
    /// should skip the volume rather than report a failure.
    #[error("volume {volume} is owned by provisioner {owner}; ignoring")]
    Ignored {
        /// Volume name.
        volume: String,
        /// Identity recorded on the volume.
        owner: String,
    },
    /// Raised when a capacity quantity cannot be parsed.
    #[error("invalid capacity {input:?}: {reason}")]
    InvalidQuantity {
        /// Text as supplied.
        input: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl ProvisionError {
    /// Returns true for the "not mine to delete" outcome.
    #[must_use]
    pub const fn is_ignorable(&self) -> bool {
        matches!(self, Self::Ignored { .. })
    }

    pub(super) fn appliance(operation: String, error: ApiError) -> Self {
        Self::Appliance {
            operation,
            status: error.status,
            message: error.message,
            code: error.code,
        }
    }
}
