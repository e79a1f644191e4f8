use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub type AccessToken = String;

#[derive(Error, Debug)]
pub enum TokenDataError {
    #[error("token is not a JWT: expected 3 segments, found {0}")]
    NotAJwt(usize),
    #[error("decoding payload segment: `{0}`")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not a JSON object: `{0}`")]
    Json(#[from] serde_json::Error),
}

/// Claims carried in the payload of the access token, keyed by claim name.
///
/// The signature is never checked: these claims are only displayed.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct TokenData(Map<String, Value>);

impl TokenData {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Decodes the payload segment of a compact JWS.
    pub fn from_access_token(token: &str) -> Result<Self, TokenDataError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [_header, payload, _signature] = segments.as_slice() else {
            return Err(TokenDataError::NotAJwt(segments.len()));
        };

        let json = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&json)?)
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pretty JSON with two space indentation.
    pub fn to_pretty_json(&self) -> String {
        // A map of JSON values always serializes.
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl fmt::Display for TokenData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_pretty_json())
    }
}
