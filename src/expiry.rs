use tracing::info;

pub const SESSION_EXPIRED_PROMPT: &str =
    "Session expired. Refresh page to continue using the site?";

/// Raised by the identity integration when the refresh token can no longer be used.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefreshTokenExpiredEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryDecision {
    /// Start a new login with the identity provider.
    Relogin,
    /// Keep the current, expired, session.
    Ignore,
}

/// Decides what happens once the refresh token has expired.
pub trait RefreshExpiryPolicy {
    fn on_refresh_token_expired(&self, event: &RefreshTokenExpiredEvent) -> ExpiryDecision;
}

impl<F> RefreshExpiryPolicy for F
where
    F: Fn(&RefreshTokenExpiredEvent) -> ExpiryDecision,
{
    fn on_refresh_token_expired(&self, event: &RefreshTokenExpiredEvent) -> ExpiryDecision {
        self(event)
    }
}

/// Yes/no question asked to the user.
pub trait Confirm {
    fn confirm(&self, message: &str) -> bool;
}

/// Relogin only after the user accepts [SESSION_EXPIRED_PROMPT].
pub struct ConfirmBeforeRelogin<C> {
    confirm: C,
}

impl<C> ConfirmBeforeRelogin<C> {
    pub fn new(confirm: C) -> Self {
        Self { confirm }
    }
}

impl<C> RefreshExpiryPolicy for ConfirmBeforeRelogin<C>
where
    C: Confirm,
{
    fn on_refresh_token_expired(&self, _event: &RefreshTokenExpiredEvent) -> ExpiryDecision {
        if self.confirm.confirm(SESSION_EXPIRED_PROMPT) {
            info!("user accepted to log in again");
            ExpiryDecision::Relogin
        } else {
            info!("user declined to log in again");
            ExpiryDecision::Ignore
        }
    }
}
