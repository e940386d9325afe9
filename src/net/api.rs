//! REST collaborator for join / status-check / leave.
//!
//! Browser builds talk to the backend through `gloo-net`; the leave notice
//! goes out through `navigator.sendBeacon` so it survives page unload.
//!
//! ERROR HANDLING
//! ==============
//! Request failures surface as [`ApiError`] to the session, which logs them
//! and carries on (a failed join leaves the SDK inert, a failed status check
//! skips one tick). Nothing here panics.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::collections::BTreeMap;

use futures::future::LocalBoxFuture;
use serde_json::Value;

use super::types::{JoinRequest, LeaveNotice};

/// Failure of one backend request.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(String),
    /// The backend answered with a non-success HTTP status.
    #[error("{endpoint} failed: {status}")]
    Status {
        /// Logical endpoint name (`join`, `status`).
        endpoint: &'static str,
        /// HTTP status code.
        status: u16,
    },
    /// The response body was not JSON.
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Backend operations the session needs.
///
/// `join` and `status` hand back the raw JSON body; validation happens in the
/// session so malformed bodies are treated like any other bad payload.
pub trait Backend {
    /// Acquire (or restore) a queue slot.
    fn join(&self, request: &JoinRequest) -> LocalBoxFuture<'static, Result<Value, ApiError>>;
    /// Re-announce `uuid` and fetch its current status.
    fn status(&self, uuid: &str, params: &BTreeMap<String, String>) -> LocalBoxFuture<'static, Result<Value, ApiError>>;
    /// Queue a fire-and-forget leave notice to `url`. Returns whether it was queued.
    fn leave(&self, url: &str, notice: &LeaveNotice) -> bool;
}

/// Trim one trailing slash so endpoint joins never produce `//`.
#[must_use]
pub fn trim_base(base: &str) -> &str {
    base.strip_suffix('/').unwrap_or(base)
}

/// `POST` target for joining.
#[must_use]
pub fn join_endpoint(base: &str) -> String {
    format!("{}/join", trim_base(base))
}

/// `GET` target for the status check of `uuid`.
#[must_use]
pub fn status_endpoint(base: &str, uuid: &str) -> String {
    format!("{}/status/{uuid}", trim_base(base))
}

/// Realtime channel target derived from the REST base URL.
///
/// `http` becomes `ws` and `https` becomes `wss`; other schemes pass through.
#[must_use]
pub fn channel_endpoint(base: &str) -> String {
    let base = trim_base(base);
    let swapped = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_owned()
    };
    format!("{swapped}/channel")
}

/// `gloo-net` implementation against `{base}/join` and `{base}/status/{uuid}`.
#[cfg(feature = "browser")]
#[derive(Clone, Debug)]
pub struct HttpBackend {
    base: String,
}

#[cfg(feature = "browser")]
impl HttpBackend {
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

#[cfg(feature = "browser")]
async fn read_json(resp: gloo_net::http::Response, endpoint: &'static str) -> Result<Value, ApiError> {
    if !(200..300).contains(&resp.status()) {
        return Err(ApiError::Status { endpoint, status: resp.status() });
    }
    resp.json::<Value>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(feature = "browser")]
impl Backend for HttpBackend {
    fn join(&self, request: &JoinRequest) -> LocalBoxFuture<'static, Result<Value, ApiError>> {
        use futures::FutureExt;

        let url = join_endpoint(&self.base);
        let body = serde_json::to_value(request);
        async move {
            let body = body.map_err(|e| ApiError::Request(e.to_string()))?;
            let resp = gloo_net::http::Request::post(&url)
                .json(&body)
                .map_err(|e| ApiError::Request(e.to_string()))?
                .send()
                .await
                .map_err(|e| ApiError::Request(e.to_string()))?;
            read_json(resp, "join").await
        }
        .boxed_local()
    }

    fn status(&self, uuid: &str, params: &BTreeMap<String, String>) -> LocalBoxFuture<'static, Result<Value, ApiError>> {
        use futures::FutureExt;

        let url = status_endpoint(&self.base, uuid);
        let params = params.clone();
        async move {
            let resp = gloo_net::http::Request::get(&url)
                .query(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .send()
                .await
                .map_err(|e| ApiError::Request(e.to_string()))?;
            read_json(resp, "status").await
        }
        .boxed_local()
    }

    fn leave(&self, url: &str, notice: &LeaveNotice) -> bool {
        let Some(window) = web_sys::window() else {
            return false;
        };
        let body = match serde_json::to_string(notice) {
            Ok(body) => body,
            Err(err) => {
                log::warn!("waitroom: failed to encode leave notice: {err}");
                return false;
            }
        };
        match window.navigator().send_beacon_with_opt_str(url, Some(&body)) {
            Ok(queued) => queued,
            Err(err) => {
                log::warn!("waitroom: leave beacon failed: {err:?}");
                false
            }
        }
    }
}
