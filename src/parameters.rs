use std::time::Duration;

use clap::error::ErrorKind;
use clap::{Args, Error, Subcommand, ValueEnum};
use url::Url;

use crate::config::{
    AuthConfig, DEFAULT_AUTHORIZATION_ENDPOINT, DEFAULT_BACKEND_URL, DEFAULT_CLIENT_ID,
    DEFAULT_LOGOUT_ENDPOINT, DEFAULT_REDIRECT_URI, DEFAULT_SCOPE, DEFAULT_TOKEN_ENDPOINT,
    parse_url,
};
use crate::endpoint::Endpoint;
use crate::http::config::{HttpConfig, ProxyConfig};

pub const ACCESS_TOKEN_ENV_NAME: &str = "OIDC_DEMO_ACCESS_TOKEN";

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Prints the access token, its decoded claims and the endpoints.
    Show,
    /// Calls one or more endpoints and prints their results. Several endpoints are called at once.
    Call {
        #[arg(required = true, value_enum)]
        endpoints: Vec<Endpoint>,
    },
    /// Prompt loop with one command per page button. This is the default.
    Interactive,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ClientArgs {
    /// Access token issued by the identity provider.
    #[arg(long, env = ACCESS_TOKEN_ENV_NAME, hide_env_values = true)]
    pub access_token: String,

    /// Base url of the backend exposing /api/v1/{public,user,admin}.
    #[arg(long, default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    #[command(flatten)]
    pub identity_provider: IdentityProviderArgs,

    /// Request timeout in seconds. The transport default applies when absent.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Proxy url. Falls back to HTTPS_PROXY and HTTP_PROXY.
    #[arg(long, default_value = "")]
    pub proxy: String,

    /// Verbosity of the logs written to stderr.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct IdentityProviderArgs {
    /// Public client registered in the identity provider.
    #[arg(long, default_value = DEFAULT_CLIENT_ID)]
    pub client_id: String,

    #[arg(long, default_value = DEFAULT_AUTHORIZATION_ENDPOINT)]
    pub authorization_endpoint: String,

    #[arg(long, default_value = DEFAULT_TOKEN_ENDPOINT)]
    pub token_endpoint: String,

    #[arg(long, default_value = DEFAULT_LOGOUT_ENDPOINT)]
    pub logout_endpoint: String,

    /// Where the identity provider sends the user back after login and logout.
    #[arg(long, default_value = DEFAULT_REDIRECT_URI)]
    pub redirect_uri: String,

    #[arg(long, default_value = DEFAULT_SCOPE)]
    pub scope: String,
}

pub fn build_auth_config(args: &IdentityProviderArgs) -> Result<AuthConfig, Error> {
    AuthConfig::new(
        args.client_id.clone(),
        &args.authorization_endpoint,
        &args.token_endpoint,
        &args.logout_endpoint,
        &args.redirect_uri,
        args.scope.clone(),
    )
    .map_err(|e| Error::raw(ErrorKind::InvalidValue, e.to_string()))
}

pub fn build_backend_url(args: &ClientArgs) -> Result<Url, Error> {
    parse_url("backend", &args.backend_url)
        .map_err(|e| Error::raw(ErrorKind::InvalidValue, e.to_string()))
}

pub fn build_http_config(args: &ClientArgs) -> Result<HttpConfig, Error> {
    let proxy = ProxyConfig::new(&args.proxy)?.try_with_url_from_env()?;
    Ok(HttpConfig::new(args.timeout.map(Duration::from_secs), proxy))
}
