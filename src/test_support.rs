//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError};
use std::time::Duration;

use percent_encoding::percent_decode_str;
use serde_json::{Value, json};
use tokio::sync::{Mutex, MutexGuard};

use crate::client::{
    ApiRequest, ClientError, LOGIN_ENDPOINT, LOGIN_REQUIRED_MESSAGE, RawResponse, Transport,
    TransportFuture,
};

fn lock<T>(mutex: &StdMutex<T>) -> StdMutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returns the part of `url` after the authority, without a leading slash.
#[must_use]
pub fn endpoint_of(url: &str) -> &str {
    url.splitn(4, '/').nth(3).unwrap_or_default()
}

/// Scripted transport that returns pre-seeded responses in FIFO order.
///
/// Used to drive exact response sequences without a network.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    responses: Arc<StdMutex<VecDeque<Result<RawResponse, ClientError>>>>,
    requests: Arc<StdMutex<Vec<ApiRequest>>>,
}

impl ScriptedTransport {
    /// Creates a transport with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with a textual body.
    pub fn push(&self, status: u16, body: &str) {
        lock(&self.responses).push_back(Ok(RawResponse::new(status, body)));
    }

    /// Queues a response with a JSON body.
    pub fn push_json(&self, status: u16, body: &Value) {
        self.push(status, &body.to_string());
    }

    /// Queues the appliance's "login required" answer.
    pub fn push_login_required(&self, status: u16) {
        self.push_json(status, &json!({ "message": LOGIN_REQUIRED_MESSAGE }));
    }

    /// Queues a successful login issuing `token`.
    pub fn push_token(&self, token: &str) {
        self.push_json(201, &json!({ "token": token }));
    }

    /// Queues a transport level failure.
    pub fn push_error(&self, error: ClientError) {
        lock(&self.responses).push_back(Err(error));
    }

    /// Returns a snapshot of every request sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
        let url = request.url.clone();
        lock(&self.requests).push(request);
        let next = lock(&self.responses).pop_front();
        Box::pin(async move {
            next.unwrap_or_else(|| {
                Err(ClientError::Transport {
                    endpoint: url,
                    message: String::from("no scripted response available"),
                })
            })
        })
    }
}

#[derive(Debug, Default)]
struct ApplianceState {
    username: String,
    password: String,
    logins: usize,
    valid_token: Option<String>,
    filesystems: BTreeMap<String, Option<u64>>,
    exports: BTreeSet<String>,
    jobs: BTreeMap<String, u32>,
    next_job: u32,
    async_polls: u32,
    fail_exports: bool,
    requests: Vec<ApiRequest>,
}

/// In-memory appliance implementing the subset of the management API the
/// provisioner uses: login, filesystem create/list/delete, NFS export
/// creation, and job status polling.
#[derive(Clone, Debug)]
pub struct FakeAppliance {
    state: Arc<StdMutex<ApplianceState>>,
    login_delay: Duration,
}

impl FakeAppliance {
    /// Creates an appliance that accepts the given credentials.
    #[must_use]
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            state: Arc::new(StdMutex::new(ApplianceState {
                username: username.to_owned(),
                password: password.to_owned(),
                ..ApplianceState::default()
            })),
            login_delay: Duration::ZERO,
        }
    }

    /// Delays every login answer, widening the window for concurrent logins.
    #[must_use]
    pub fn with_login_delay(mut self, delay: Duration) -> Self {
        self.login_delay = delay;
        self
    }

    /// Invalidates the current token, as a session timeout would.
    pub fn expire_token(&self) {
        lock(&self.state).valid_token = None;
    }

    /// Makes every export creation fail with HTTP 500.
    pub fn fail_exports(&self) {
        lock(&self.state).fail_exports = true;
    }

    /// Answers creations with `202 Accepted`; the job completes after `polls`
    /// status checks.
    pub fn accept_asynchronously(&self, polls: u32) {
        lock(&self.state).async_polls = polls;
    }

    /// Seeds an existing filesystem.
    pub fn insert_filesystem(&self, path: &str) {
        lock(&self.state).filesystems.insert(path.to_owned(), None);
    }

    /// Number of successful logins served.
    #[must_use]
    pub fn logins(&self) -> usize {
        lock(&self.state).logins
    }

    /// Paths of existing filesystems.
    #[must_use]
    pub fn filesystems(&self) -> Vec<String> {
        lock(&self.state).filesystems.keys().cloned().collect()
    }

    /// Quota recorded for `path`, if the filesystem exists and has one.
    #[must_use]
    pub fn quota(&self, path: &str) -> Option<u64> {
        lock(&self.state).filesystems.get(path).copied().flatten()
    }

    /// Filesystem paths that are exported over NFS.
    #[must_use]
    pub fn exports(&self) -> Vec<String> {
        lock(&self.state).exports.iter().cloned().collect()
    }

    /// Returns a snapshot of every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.state).requests.clone()
    }

    fn handle(&self, request: &ApiRequest) -> RawResponse {
        let mut state = lock(&self.state);
        state.requests.push(request.clone());
        let endpoint = endpoint_of(&request.url).to_owned();

        if endpoint == LOGIN_ENDPOINT {
            return Self::login(&mut state, request);
        }
        if state.valid_token.is_none() || request.bearer != state.valid_token {
            return reply(401, &json!({ "message": LOGIN_REQUIRED_MESSAGE }));
        }

        let body = request.json_body().unwrap_or(Value::Null);
        match (request.method.as_str(), endpoint.as_str()) {
            ("GET", "storage/filesystems") => {
                let data: Vec<Value> = state
                    .filesystems
                    .keys()
                    .map(|path| json!({ "path": path }))
                    .collect();
                reply(200, &json!({ "data": data }))
            }
            ("POST", "storage/filesystems") => Self::create_filesystem(&mut state, &body),
            ("POST", "nas/nfs") => Self::create_export(&mut state, &body),
            ("DELETE", path) if path.starts_with("storage/filesystems/") => {
                let encoded = path.trim_start_matches("storage/filesystems/");
                let decoded = percent_decode_str(encoded).decode_utf8_lossy().into_owned();
                if state.filesystems.remove(&decoded).is_none() {
                    return reply(
                        404,
                        &json!({ "code": "ENOENT", "message": format!("{decoded} not found") }),
                    );
                }
                state.exports.remove(&decoded);
                RawResponse::new(200, "")
            }
            ("GET", path) if path.starts_with("jobStatus/") => {
                let id = path.trim_start_matches("jobStatus/").to_owned();
                match state.jobs.get_mut(&id) {
                    Some(remaining) if *remaining > 0 => {
                        *remaining -= 1;
                        reply(202, &json!({ "state": "running" }))
                    }
                    Some(_) => reply(201, &json!({ "state": "done" })),
                    None => reply(404, &json!({ "message": "unknown job" })),
                }
            }
            _ => reply(404, &json!({ "message": format!("no route for {endpoint}") })),
        }
    }

    fn login(state: &mut ApplianceState, request: &ApiRequest) -> RawResponse {
        let body = request.json_body().unwrap_or(Value::Null);
        let matches = body.get("username").and_then(Value::as_str) == Some(state.username.as_str())
            && body.get("password").and_then(Value::as_str) == Some(state.password.as_str());
        if !matches {
            return reply(401, &json!({ "message": "Invalid username or password" }));
        }
        state.logins += 1;
        let token = format!("token-{}", state.logins);
        state.valid_token = Some(token.clone());
        reply(201, &json!({ "token": token }))
    }

    fn create_filesystem(state: &mut ApplianceState, body: &Value) -> RawResponse {
        let Some(path) = body.get("path").and_then(Value::as_str) else {
            return reply(400, &json!({ "code": "EBADARG", "message": "path is required" }));
        };
        if state.filesystems.contains_key(path) {
            return reply(
                409,
                &json!({ "code": "EEXIST", "message": format!("{path} already exists") }),
            );
        }
        let quota = body.get("quotaSize").and_then(Value::as_u64);
        state.filesystems.insert(path.to_owned(), quota);
        Self::accepted_or(state, 201)
    }

    fn create_export(state: &mut ApplianceState, body: &Value) -> RawResponse {
        if state.fail_exports {
            return reply(500, &json!({ "message": "NFS service unavailable" }));
        }
        let Some(path) = body.get("filesystem").and_then(Value::as_str) else {
            return reply(400, &json!({ "code": "EBADARG", "message": "filesystem is required" }));
        };
        if !state.filesystems.contains_key(path) {
            return reply(
                404,
                &json!({ "code": "ENOENT", "message": format!("{path} not found") }),
            );
        }
        state.exports.insert(path.to_owned());
        Self::accepted_or(state, 201)
    }

    fn accepted_or(state: &mut ApplianceState, status: u16) -> RawResponse {
        if state.async_polls == 0 {
            return RawResponse::new(status, "");
        }
        state.next_job += 1;
        let id = state.next_job.to_string();
        state.jobs.insert(id.clone(), state.async_polls);
        reply(
            202,
            &json!({ "links": [{ "rel": "monitor", "href": format!("/jobStatus/{id}") }] }),
        )
    }
}

impl Transport for FakeAppliance {
    fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            if endpoint_of(&request.url) == LOGIN_ENDPOINT && !self.login_delay.is_zero() {
                tokio::time::sleep(self.login_delay).await;
            }
            Ok(self.handle(&request))
        })
    }
}

fn reply(status: u16, body: &Value) -> RawResponse {
    RawResponse::new(status, body.to_string())
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
