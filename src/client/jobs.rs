//! Polling for asynchronous (`202 Accepted`) appliance jobs.

use std::time::Duration;

use reqwest::{Method, Url};
use serde::Deserialize;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use super::transport::{RawResponse, Transport};
use super::{ClientError, ManagementClient, join_url};

/// HTTP status the appliance uses for accepted-but-unfinished work.
pub const STATUS_ACCEPTED: u16 = 202;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(120);

/// Bounds for waiting on an asynchronous job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct JobPolicy {
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Total time to wait before giving up.
    pub timeout: Duration,
}

impl Default for JobPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_JOB_TIMEOUT,
        }
    }
}

#[derive(Default, Deserialize)]
struct AcceptedBody {
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Deserialize)]
struct Link {
    rel: String,
    href: String,
}

/// Resolves where to poll: the `monitor` link when offered, otherwise the
/// endpoint that accepted the job. Absolute links are only followed when they
/// stay on the appliance's origin, since polls carry the bearer token.
pub(super) fn monitor_url(base_url: &str, accepted_url: &str, body: &[u8]) -> String {
    let accepted: AcceptedBody = serde_json::from_slice(body).unwrap_or_default();
    accepted
        .links
        .into_iter()
        .find(|link| link.rel == "monitor")
        .and_then(|link| resolve_link(base_url, link.href))
        .unwrap_or_else(|| accepted_url.to_owned())
}

fn resolve_link(base_url: &str, href: String) -> Option<String> {
    if !(href.starts_with("http://") || href.starts_with("https://")) {
        return Some(join_url(base_url, &href));
    }
    if same_origin(base_url, &href) {
        return Some(href);
    }
    warn!(
        base_url,
        monitor = %href,
        "ignoring monitor link outside the appliance origin"
    );
    None
}

fn same_origin(base_url: &str, href: &str) -> bool {
    Url::parse(base_url)
        .ok()
        .zip(Url::parse(href).ok())
        .is_some_and(|(base, link)| base.origin() == link.origin())
}

impl<T: Transport> ManagementClient<T> {
    /// Polls until the job behind `accepted_url` leaves the accepted state.
    pub(super) async fn await_job(
        &self,
        accepted_url: &str,
        accepted: &RawResponse,
    ) -> Result<RawResponse, ClientError> {
        let target = monitor_url(self.session.base_url(), accepted_url, &accepted.body);
        let started = Instant::now();
        let deadline = started + self.jobs.timeout;
        debug!(endpoint = %accepted_url, monitor = %target, "appliance accepted job, polling");

        while Instant::now() < deadline {
            sleep(self.jobs.poll_interval).await;
            let response = self.send_authenticated(&Method::GET, &target, None).await?;
            if response.status != STATUS_ACCEPTED {
                debug!(
                    endpoint = %accepted_url,
                    status = response.status,
                    "appliance job finished"
                );
                return Ok(response);
            }
        }

        Err(ClientError::Timeout {
            endpoint: accepted_url.to_owned(),
            waited_secs: started.elapsed().as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const BASE: &str = "https://nexenta.example:8443/";

    #[test]
    fn monitor_link_is_resolved_against_base() {
        let body = br#"{"links":[{"rel":"self","href":"/x"},{"rel":"monitor","href":"/jobStatus/42"}]}"#;
        assert_eq!(
            monitor_url(BASE, "https://nexenta.example:8443/nas/nfs", body),
            "https://nexenta.example:8443/jobStatus/42"
        );
    }

    #[test]
    fn absolute_monitor_link_on_the_appliance_is_followed() {
        let body = br#"{"links":[{"rel":"monitor","href":"https://nexenta.example:8443/jobStatus/7"}]}"#;
        assert_eq!(
            monitor_url(BASE, "https://nexenta.example:8443/nas/nfs", body),
            "https://nexenta.example:8443/jobStatus/7"
        );
    }

    #[rstest]
    #[case("https://other:8443/jobStatus/7")]
    #[case("https://nexenta.example:9443/jobStatus/7")]
    #[case("http://nexenta.example:8443/jobStatus/7")]
    fn foreign_monitor_link_polls_the_accepting_endpoint(#[case] href: &str) {
        let body = serde_json::json!({ "links": [{ "rel": "monitor", "href": href }] }).to_string();
        assert_eq!(
            monitor_url(BASE, "https://nexenta.example:8443/nas/nfs", body.as_bytes()),
            "https://nexenta.example:8443/nas/nfs"
        );
    }

    #[test]
    fn missing_monitor_link_polls_the_same_endpoint() {
        assert_eq!(
            monitor_url(BASE, "https://nexenta.example:8443/nas/nfs", b""),
            "https://nexenta.example:8443/nas/nfs"
        );
    }
}
