use crate::clock::Clock;
use crate::endpoint::{CallEndpointError, Endpoint};
use crate::http_client::HttpClient;
use crate::session::IdentitySession;
use crate::user_info::UserInfo;

/// One-shot calls to a set of endpoints.
pub struct CallCommand<S, C, K> {
    user_info: UserInfo<S, C, K>,
}

impl<S, C, K> CallCommand<S, C, K>
where
    S: IdentitySession,
    C: HttpClient + Sync,
    K: Clock + Sync,
{
    pub fn new(user_info: UserInfo<S, C, K>) -> Self {
        Self { user_info }
    }

    /// Returns one `<endpoint>: <result>` line per requested endpoint, in the requested order.
    pub fn call(mut self, endpoints: &[Endpoint]) -> Result<Vec<String>, CallEndpointError> {
        match endpoints {
            [] => return Ok(Vec::new()),
            [single] => self.user_info.call(*single)?,
            several => self.user_info.call_concurrently(several)?,
        }

        Ok(endpoints
            .iter()
            .map(|endpoint| {
                format!(
                    "{}: {}",
                    endpoint.path(),
                    self.user_info.results().get(*endpoint)
                )
            })
            .collect())
    }
}
