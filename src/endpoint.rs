use std::fmt;

use clap::ValueEnum;
use http::Request;
use http::header::AUTHORIZATION;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::clock::{Clock, format_call_time};
use crate::http_client::{HttpClient, HttpClientError};
use crate::token::AccessToken;

/// Sample backend endpoints the client knows how to call.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Public,
    User,
    Admin,
}

impl Endpoint {
    pub const ALL: [Endpoint; 3] = [Endpoint::Public, Endpoint::User, Endpoint::Admin];

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Public => "/api/v1/public",
            Endpoint::User => "/api/v1/user",
            Endpoint::Admin => "/api/v1/admin",
        }
    }

    /// Absolute url of the endpoint on the given backend, below any path prefix it carries.
    pub fn url(&self, backend: &Url) -> Result<Url, url::ParseError> {
        let mut base = backend.clone();
        if !base.path().ends_with('/') {
            let prefix = format!("{}/", base.path());
            base.set_path(&prefix);
        }
        base.join(self.path().trim_start_matches('/'))
    }

    /// Case insensitive lookup by name, as typed at the prompt.
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name.trim(), true).ok()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Public => write!(f, "public"),
            Endpoint::User => write!(f, "user"),
            Endpoint::Admin => write!(f, "admin"),
        }
    }
}

/// Failures that cannot be rendered as an endpoint result and are handed back to the caller.
#[derive(Error, Debug)]
pub enum CallEndpointError {
    #[error("building request for `{0}`: `{1}`")]
    InvalidRequest(String, String),
    #[error("reading response from `{0}`: `{1}`")]
    InvalidResponse(String, String),
}

/// Performs authenticated GET requests and turns their outcome into a displayable line.
pub struct EndpointCaller<C, K> {
    http_client: C,
    clock: K,
}

impl<C, K> EndpointCaller<C, K>
where
    C: HttpClient,
    K: Clock,
{
    pub fn new(http_client: C, clock: K) -> Self {
        Self { http_client, clock }
    }

    /// Calls `url` with `token` as bearer credential.
    ///
    /// Error statuses and transport failures still produce a line; only
    /// requests that cannot be built or responses that cannot be rebuilt or decoded are
    /// returned as errors.
    pub fn call(&self, url: &str, token: &AccessToken) -> Result<String, CallEndpointError> {
        let called_at = format_call_time(&self.clock.now());

        let request = Request::get(url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Vec::new())
            .map_err(|e| CallEndpointError::InvalidRequest(url.to_string(), e.to_string()))?;

        debug!(%url, "calling endpoint");

        let message = match self.http_client.send(request) {
            Ok(response) if response.status().is_success() => {
                display_payload(url, response.body())?
            }
            Ok(response) => {
                let status = response.status().as_u16();
                warn!("error calling endpoint {url}: status {status}");
                format!("Error: {status}")
            }
            Err(err @ HttpClientError::TransportError(_)) => {
                warn!("error calling endpoint {url}: {err}");
                err.to_string()
            }
            Err(HttpClientError::InvalidResponse(msg)) => {
                return Err(CallEndpointError::InvalidResponse(url.to_string(), msg));
            }
        };

        Ok(format!("called at {called_at} - {message}"))
    }
}

/// JSON strings are shown unquoted, other JSON compacted and anything else verbatim.
fn display_payload(url: &str, body: &[u8]) -> Result<String, CallEndpointError> {
    let text = std::str::from_utf8(body)
        .map_err(|e| CallEndpointError::InvalidResponse(url.to_string(), e.to_string()))?;

    Ok(match serde_json::from_str::<Value>(text) {
        Ok(Value::String(s)) => s,
        Ok(value) => value.to_string(),
        Err(_) => text.to_string(),
    })
}
