//! Response schemas for the appliance management API.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::ClientError;

/// Message the appliance returns when a request needs a fresh login.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please login to continue";

/// Parsed response: status code plus the JSON object body.
///
/// Error statuses are preserved so callers can inspect the structured
/// `message` and `code` fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiResponse {
    status: u16,
    body: Map<String, Value>,
}

impl ApiResponse {
    /// Parses a raw body. Empty bodies and JSON `null` become an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when the body is not JSON or is JSON
    /// but not an object.
    pub fn parse(endpoint: &str, status: u16, bytes: &[u8]) -> Result<Self, ClientError> {
        let body = parse_object(bytes).map_err(|message| ClientError::Decode {
            endpoint: endpoint.to_owned(),
            message,
        })?;
        Ok(Self { status, body })
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Generic key/value view of the body.
    #[must_use]
    pub const fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// The `message` field, when the appliance supplied one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    /// Decodes the body into `T` for 2xx statuses or into an [`ApiError`]
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when a successful body does not match
    /// `T`.
    pub fn decode<T: DeserializeOwned>(self, endpoint: &str) -> Result<ApiOutcome<T>, ClientError> {
        if !self.is_success() {
            return Ok(ApiOutcome::ApiError(ApiError::from_response(&self)));
        }
        serde_json::from_value(Value::Object(self.body))
            .map(ApiOutcome::Ok)
            .map_err(|err| ClientError::Decode {
                endpoint: endpoint.to_owned(),
                message: err.to_string(),
            })
    }
}

/// Typed result of an appliance call: either the decoded payload or the
/// appliance's structured error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApiOutcome<T> {
    /// 2xx response decoded into `T`.
    Ok(T),
    /// Non-2xx response.
    ApiError(ApiError),
}

/// Error document returned by the appliance for non-2xx statuses.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// `message` field, or a placeholder naming the status.
    pub message: String,
    /// `code` field (for example `EEXIST`), when present.
    pub code: Option<String>,
}

impl ApiError {
    fn from_response(response: &ApiResponse) -> Self {
        let message = response.message().map_or_else(
            || format!("appliance returned HTTP {}", response.status),
            str::to_owned,
        );
        let code = response
            .body
            .get("code")
            .and_then(Value::as_str)
            .map(str::to_owned);
        Self {
            status: response.status,
            message,
            code,
        }
    }
}

/// Body of a successful `auth/login`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
}

/// Success body for calls whose payload carries nothing we need.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct Acknowledgement {}

/// Minimal error document used to recognise the login-required signal.
#[derive(Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    pub(super) message: Option<String>,
}

impl ErrorBody {
    pub(super) fn requests_login(bytes: &[u8]) -> bool {
        serde_json::from_slice::<Self>(bytes)
            .ok()
            .and_then(|body| body.message)
            .is_some_and(|message| message == LOGIN_REQUIRED_MESSAGE)
    }
}

fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>, String> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(bytes).map_err(|err| err.to_string())? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(format!("expected a JSON object, got {}", json_kind(&other))),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
