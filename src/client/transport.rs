//! HTTP transport seam for the management client.
//!
//! [`Transport`] keeps the request/response exchange swappable so the
//! authentication and polling logic can be exercised without a live
//! appliance. [`HttpTransport`] is the production implementation on top of
//! `reqwest`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Certificate, Method};
use tracing::warn;

use super::ClientError;

/// Default per-request timeout applied by [`HttpTransport`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A fully resolved request ready to be put on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// JSON payload; `None` sends no body and no `Content-Type`.
    pub body: Option<Vec<u8>>,
    /// Bearer token attached as `Authorization`.
    pub bearer: Option<String>,
}

impl ApiRequest {
    /// Parses the payload as JSON, if there is one and it is valid.
    #[must_use]
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }
}

/// Status and body of a response, before any JSON interpretation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Builds a response from a status and a textual body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Future returned by [`Transport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RawResponse, ClientError>> + Send + 'a>>;

/// Sends one request and returns whatever the appliance answered.
///
/// Implementations must not interpret status codes; non-2xx answers are
/// returned as [`RawResponse`] values. Only failures to obtain a response at
/// all are errors.
pub trait Transport: Send + Sync {
    /// Sends `request`.
    fn send(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// How the appliance certificate chain is validated.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum TlsPolicy {
    /// Validate against the bundled web PKI roots.
    #[default]
    SystemRoots,
    /// Trust only the given PEM encoded certificate (typically the appliance's
    /// self-signed certificate or its issuing CA).
    Pinned(Vec<u8>),
    /// Accept any certificate. Only for lab appliances with throwaway
    /// self-signed certificates.
    Insecure,
}

/// `reqwest` backed transport.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport honouring `policy` and a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the pinned certificate is
    /// not valid PEM or the TLS stack cannot be initialised.
    pub fn new(policy: &TlsPolicy, timeout: Duration) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        match policy {
            TlsPolicy::SystemRoots => {}
            TlsPolicy::Pinned(pem) => {
                if !contains_pem_certificate(pem) {
                    return Err(ClientError::Configuration(String::from(
                        "invalid pinned certificate: no PEM certificate block found",
                    )));
                }
                let certificate = Certificate::from_pem(pem).map_err(|err| {
                    ClientError::Configuration(format!("invalid pinned certificate: {err}"))
                })?;
                builder = builder
                    .tls_built_in_root_certs(false)
                    .add_root_certificate(certificate);
            }
            TlsPolicy::Insecure => {
                warn!("appliance certificate verification is disabled");
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        let client = builder
            .build()
            .map_err(|err| ClientError::Configuration(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

fn contains_pem_certificate(pem: &[u8]) -> bool {
    const MARKER: &[u8] = b"-----BEGIN CERTIFICATE-----";
    pem.windows(MARKER.len()).any(|window| window == MARKER)
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let ApiRequest {
                method,
                url,
                body,
                bearer,
            } = request;

            let mut builder = self.client.request(method, &url);
            if let Some(token) = bearer {
                builder = builder.bearer_auth(token);
            }
            if let Some(payload) = body {
                builder = builder.header(CONTENT_TYPE, "application/json").body(payload);
            }

            let response = builder.send().await.map_err(|err| ClientError::Transport {
                endpoint: url.clone(),
                message: err.to_string(),
            })?;
            let status = response.status().as_u16();
            let bytes = response.bytes().await.map_err(|err| ClientError::Transport {
                endpoint: url.clone(),
                message: err.to_string(),
            })?;

            Ok(RawResponse {
                status,
                body: bytes.to_vec(),
            })
        })
    }
}
