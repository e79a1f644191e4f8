use thiserror::Error;
use url::Url;

pub const DEFAULT_CLIENT_ID: &str = "lydtech-public-client";
pub const DEFAULT_AUTHORIZATION_ENDPOINT: &str =
    "http://localhost:8080/realms/lydtech/protocol/openid-connect/auth";
pub const DEFAULT_TOKEN_ENDPOINT: &str =
    "http://localhost:8080/realms/lydtech/protocol/openid-connect/token";
pub const DEFAULT_LOGOUT_ENDPOINT: &str =
    "http://localhost:8080/realms/lydtech/protocol/openid-connect/logout";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000";
pub const DEFAULT_SCOPE: &str = "openid";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8081";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {0} url `{1}`: `{2}`")]
    InvalidUrl(&'static str, String, url::ParseError),
}

/// Identity provider settings handed to the identity integration.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    pub client_id: String,
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    pub logout_endpoint: Url,
    pub redirect_uri: Url,
    pub scope: String,
}

impl AuthConfig {
    pub fn new(
        client_id: String,
        authorization_endpoint: &str,
        token_endpoint: &str,
        logout_endpoint: &str,
        redirect_uri: &str,
        scope: String,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client_id,
            authorization_endpoint: parse_url("authorization endpoint", authorization_endpoint)?,
            token_endpoint: parse_url("token endpoint", token_endpoint)?,
            logout_endpoint: parse_url("logout endpoint", logout_endpoint)?,
            redirect_uri: parse_url("redirect", redirect_uri)?,
            scope,
        })
    }

    /// Where the user has to go to start a new authorization-code login.
    pub fn authorization_url(&self) -> Url {
        let mut url = self.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("scope", &self.scope);
        url
    }

    /// RP-initiated logout url.
    pub fn logout_url(&self) -> Url {
        let mut url = self.logout_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("post_logout_redirect_uri", self.redirect_uri.as_str());
        url
    }
}

pub(crate) fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl(name, value.to_string(), e))
}
