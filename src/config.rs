//! Configuration loading via `ortho-config`.

use std::time::Duration;

use camino::Utf8Path;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::client::{JobPolicy, TlsPolicy};
use crate::files;
use crate::session::Credentials;

const CONFIG_FILE: &str = "nexstor.toml";
const SECTION: &str = "appliance";

/// Appliance connection settings derived from environment variables and
/// configuration files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "NEXENTA",
    discovery(
        app_name = "nexstor",
        env_var = "NEXSTOR_CONFIG_PATH",
        config_file_name = "nexstor.toml",
        dotfile_name = ".nexstor.toml",
        project_file_name = "nexstor.toml"
    )
)]
pub struct ApplianceConfig {
    /// Host name or address of the appliance management interface. Also
    /// used as the NFS server address handed to clients.
    pub hostname: String,
    /// TCP port of the management API (commonly 8443).
    pub port: u16,
    /// Storage pool that new filesystems are created in.
    pub pool: String,
    /// Management API login name.
    pub username: String,
    /// Management API password.
    pub password: String,
    /// Identity recorded on every provisioned volume. Deletion is refused
    /// for volumes carrying a different identity.
    pub node_name: String,
    /// Accept any appliance certificate. Lab use only.
    #[ortho_config(default = false)]
    pub insecure_skip_verify: bool,
    /// PEM file holding the appliance certificate or its issuing CA.
    pub ca_certificate_file: Option<String>,
    /// Per-request transport timeout.
    #[ortho_config(default = 30)]
    pub request_timeout_secs: u64,
    /// Delay between polls of an accepted (202) job.
    #[ortho_config(default = 2)]
    pub job_poll_interval_secs: u64,
    /// Upper bound on waiting for an accepted job.
    #[ortho_config(default = 120)]
    pub job_timeout_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to [{SECTION}] in {CONFIG_FILE}",
            self.description, self.env_var, self.toml_key
        ))
    }
}

impl ApplianceConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(metadata.missing());
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("nexstor")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and the configuration file key for each missing value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::Conflict`] for contradictory settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.hostname,
            &FieldMetadata::new("appliance host name", "NEXENTA_HOSTNAME", "hostname"),
        )?;
        if self.port == 0 {
            return Err(
                FieldMetadata::new("appliance port", "NEXENTA_PORT", "port").missing(),
            );
        }
        Self::require_field(
            &self.pool,
            &FieldMetadata::new("storage pool", "NEXENTA_POOL", "pool"),
        )?;
        Self::require_field(
            &self.username,
            &FieldMetadata::new("appliance username", "NEXENTA_USERNAME", "username"),
        )?;
        Self::require_field(
            &self.password,
            &FieldMetadata::new("appliance password", "NEXENTA_PASSWORD", "password"),
        )?;
        Self::require_field(
            &self.node_name,
            &FieldMetadata::new("provisioner identity", "NEXENTA_NODE_NAME", "node_name"),
        )?;
        if let Some(path) = &self.ca_certificate_file {
            Self::require_field(
                path,
                &FieldMetadata::new(
                    "CA certificate path",
                    "NEXENTA_CA_CERTIFICATE_FILE",
                    "ca_certificate_file",
                ),
            )?;
            if self.insecure_skip_verify {
                return Err(ConfigError::Conflict(String::from(
                    "insecure_skip_verify and ca_certificate_file cannot both be set",
                )));
            }
        }
        if self.request_timeout_secs == 0 || self.job_timeout_secs == 0 {
            return Err(ConfigError::Conflict(String::from(
                "request_timeout_secs and job_timeout_secs must be greater than zero",
            )));
        }
        Ok(())
    }

    /// Base address of the management API, `https://<hostname>:<port>/`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}:{}/", self.hostname.trim(), self.port)
    }

    /// Login credentials.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }

    /// Certificate validation mode. Reads the pinned certificate from disk
    /// when one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CertificateRead`] when the certificate file
    /// cannot be read.
    pub fn tls_policy(&self) -> Result<TlsPolicy, ConfigError> {
        if self.insecure_skip_verify {
            return Ok(TlsPolicy::Insecure);
        }
        self.ca_certificate_file
            .as_deref()
            .map_or(Ok(TlsPolicy::SystemRoots), |path| {
                files::read_ambient(Utf8Path::new(path))
                    .map(TlsPolicy::Pinned)
                    .map_err(|err| ConfigError::CertificateRead {
                        path: path.to_owned(),
                        message: err.to_string(),
                    })
            })
    }

    /// Per-request transport timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Bounds for polling accepted jobs.
    #[must_use]
    pub const fn job_policy(&self) -> JobPolicy {
        JobPolicy {
            poll_interval: Duration::from_secs(self.job_poll_interval_secs),
            timeout: Duration::from_secs(self.job_timeout_secs),
        }
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Two settings contradict each other.
    #[error("conflicting configuration: {0}")]
    Conflict(String),
    /// The pinned certificate file could not be read.
    #[error("failed to read CA certificate {path}: {message}")]
    CertificateRead {
        /// Configured path.
        path: String,
        /// I/O error message.
        message: String,
    },
}
