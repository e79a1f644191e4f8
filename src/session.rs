use tracing::{info, warn};
use url::Url;

use crate::config::AuthConfig;
use crate::token::{AccessToken, TokenData};

/// The identity integration as seen by the client: it owns the token, its
/// claims and the login/logout lifecycle.
pub trait IdentitySession {
    fn token(&self) -> &AccessToken;
    fn token_data(&self) -> &TokenData;
    fn log_in(&mut self);
    fn log_out(&mut self);
}

/// Something able to send the user to an identity provider page.
pub trait Browser {
    fn open(&self, url: &Url);
}

/// Session built around an access token obtained outside this client.
///
/// Login and logout are handed to the identity provider by opening its pages.
pub struct ProvidedTokenSession<B> {
    config: AuthConfig,
    token: AccessToken,
    token_data: TokenData,
    browser: B,
}

impl<B> ProvidedTokenSession<B>
where
    B: Browser,
{
    pub fn new(config: AuthConfig, token: AccessToken, browser: B) -> Self {
        let token_data = TokenData::from_access_token(&token).unwrap_or_else(|err| {
            warn!("access token claims cannot be displayed: {err}");
            TokenData::default()
        });

        Self {
            config,
            token,
            token_data,
            browser,
        }
    }
}

impl<B> IdentitySession for ProvidedTokenSession<B>
where
    B: Browser,
{
    fn token(&self) -> &AccessToken {
        &self.token
    }

    fn token_data(&self) -> &TokenData {
        &self.token_data
    }

    fn log_in(&mut self) {
        let url = self.config.authorization_url();
        info!(client_id = %self.config.client_id, "starting login");
        self.browser.open(&url);
    }

    fn log_out(&mut self) {
        let url = self.config.logout_url();
        info!(client_id = %self.config.client_id, "logging out");
        self.browser.open(&url);
    }
}
