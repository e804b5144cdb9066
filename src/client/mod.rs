//! Authenticating client for the appliance JSON management API.
//!
//! Every request carries the session's cached bearer token. When the
//! appliance answers 401/403 (or the "Please login to continue" message), the
//! client refreshes the token through the session and repeats the request
//! exactly once. `202 Accepted` responses are polled until the job finishes.

mod error;
mod jobs;
mod response;
mod transport;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ApplianceConfig;
use crate::session::{Credentials, Session, Token};

pub use error::ClientError;
pub use jobs::{JobPolicy, STATUS_ACCEPTED};
pub use reqwest::Method;
pub use response::{
    Acknowledgement, ApiError, ApiOutcome, ApiResponse, LOGIN_REQUIRED_MESSAGE, LoginResponse,
};
pub use transport::{
    ApiRequest, DEFAULT_REQUEST_TIMEOUT, HttpTransport, RawResponse, TlsPolicy, Transport,
    TransportFuture,
};

use response::ErrorBody;

/// Endpoint that exchanges credentials for a bearer token.
pub const LOGIN_ENDPOINT: &str = "auth/login";

/// Client for the appliance management API.
#[derive(Debug)]
pub struct ManagementClient<T = HttpTransport> {
    session: Session,
    transport: T,
    jobs: JobPolicy,
}

impl ManagementClient<HttpTransport> {
    /// Builds a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the configuration is
    /// incomplete or the TLS settings cannot be applied.
    pub fn from_config(config: &ApplianceConfig) -> Result<Self, ClientError> {
        config
            .validate()
            .map_err(|err| ClientError::Configuration(err.to_string()))?;
        let policy = config
            .tls_policy()
            .map_err(|err| ClientError::Configuration(err.to_string()))?;
        let transport = HttpTransport::new(&policy, config.request_timeout())?;
        let session = Session::new(config.base_url(), Some(config.credentials()));
        Ok(Self::new(session, transport).with_job_policy(config.job_policy()))
    }
}

impl<T: Transport> ManagementClient<T> {
    /// Creates a client over an explicit transport.
    #[must_use]
    pub fn new(session: Session, transport: T) -> Self {
        Self {
            session,
            transport,
            jobs: JobPolicy::default(),
        }
    }

    /// Overrides how long asynchronous jobs are polled.
    #[must_use]
    pub fn with_job_policy(mut self, jobs: JobPolicy) -> Self {
        self.jobs = jobs;
        self
    }

    /// Session shared by every request from this client.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Transport used to reach the appliance.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Issues `method endpoint` with an optional JSON body.
    ///
    /// Non-2xx responses are returned, not raised, so callers can inspect
    /// the appliance's `message` and `code` fields.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the base address is empty,
    /// [`ClientError::Transport`] when no response arrives,
    /// [`ClientError::Authentication`] when login fails or the refreshed
    /// token is rejected, [`ClientError::Timeout`] when an accepted job never
    /// finishes, and [`ClientError::Decode`] when the body is not a JSON
    /// object.
    pub async fn request<B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        if self.session.base_url().is_empty() {
            return Err(ClientError::Configuration(String::from(
                "appliance base address is not set",
            )));
        }

        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|err| ClientError::Encode {
                endpoint: endpoint.to_owned(),
                message: err.to_string(),
            })?;
        let url = join_url(self.session.base_url(), endpoint);
        debug!(method = %method, endpoint, "sending appliance request");

        let sent = self.send_authenticated(&method, &url, payload).await?;
        let response = if sent.status == STATUS_ACCEPTED {
            self.await_job(&url, &sent).await?
        } else {
            sent
        };

        ApiResponse::parse(endpoint, response.status, &response.body)
    }

    /// `GET endpoint`.
    ///
    /// # Errors
    ///
    /// See [`ManagementClient::request`].
    pub async fn get(&self, endpoint: &str) -> Result<ApiResponse, ClientError> {
        self.request::<()>(Method::GET, endpoint, None).await
    }

    /// `POST endpoint` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ManagementClient::request`].
    pub async fn post<B>(&self, endpoint: &str, body: &B) -> Result<ApiResponse, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.request(Method::POST, endpoint, Some(body)).await
    }

    /// `PUT endpoint` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ManagementClient::request`].
    pub async fn put<B>(&self, endpoint: &str, body: &B) -> Result<ApiResponse, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.request(Method::PUT, endpoint, Some(body)).await
    }

    /// `DELETE endpoint`.
    ///
    /// # Errors
    ///
    /// See [`ManagementClient::request`].
    pub async fn delete(&self, endpoint: &str) -> Result<ApiResponse, ClientError> {
        self.request::<()>(Method::DELETE, endpoint, None).await
    }

    /// Sends a request, logging in and retrying once if the appliance asks
    /// for authentication.
    async fn send_authenticated(
        &self,
        method: &Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse, ClientError> {
        let cached = self.session.cached().await;
        let first = self
            .transport
            .send(ApiRequest {
                method: method.clone(),
                url: url.to_owned(),
                body: body.clone(),
                bearer: cached.token.as_ref().map(|value| value.as_str().to_owned()),
            })
            .await?;
        if !requires_login(&first) {
            return Ok(first);
        }

        debug!(
            url,
            status = first.status,
            had_token = cached.token.is_some(),
            "appliance requires authentication"
        );
        let fresh = self
            .session
            .refresh(cached.generation, |credentials| self.login(credentials))
            .await?;

        let retried = self
            .transport
            .send(ApiRequest {
                method: method.clone(),
                url: url.to_owned(),
                body,
                bearer: Some(fresh.as_str().to_owned()),
            })
            .await?;
        if requires_login(&retried) {
            warn!(url, status = retried.status, "appliance rejected refreshed token");
            return Err(ClientError::Authentication {
                message: format!(
                    "appliance rejected refreshed token for {url} with HTTP {}",
                    retried.status
                ),
            });
        }
        Ok(retried)
    }

    async fn login(&self, credentials: Credentials) -> Result<Token, ClientError> {
        let url = join_url(self.session.base_url(), LOGIN_ENDPOINT);
        let body = serde_json::to_vec(&credentials).map_err(|err| ClientError::Encode {
            endpoint: LOGIN_ENDPOINT.to_owned(),
            message: err.to_string(),
        })?;
        let raw = self
            .transport
            .send(ApiRequest {
                method: Method::POST,
                url,
                body: Some(body),
                bearer: None,
            })
            .await?;

        let outcome = ApiResponse::parse(LOGIN_ENDPOINT, raw.status, &raw.body)
            .and_then(|response| response.decode::<LoginResponse>(LOGIN_ENDPOINT))
            .map_err(|err| ClientError::Authentication {
                message: format!("login response did not carry a token: {err}"),
            })?;

        match outcome {
            ApiOutcome::Ok(LoginResponse { token }) if !token.is_empty() => {
                info!(
                    username = credentials.username(),
                    base_url = %self.session.base_url(),
                    "logged in to appliance"
                );
                Ok(Token::new(token))
            }
            ApiOutcome::Ok(_) => Err(ClientError::Authentication {
                message: String::from("login response carried an empty token"),
            }),
            ApiOutcome::ApiError(error) => Err(ClientError::Authentication {
                message: format!(
                    "login as {} rejected with HTTP {}: {}",
                    credentials.username(),
                    error.status,
                    error.message
                ),
            }),
        }
    }
}

fn requires_login(response: &RawResponse) -> bool {
    matches!(response.status, 401 | 403) || ErrorBody::requests_login(&response.body)
}

/// Appends `endpoint` to `base` with exactly one separating slash.
pub(crate) fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
