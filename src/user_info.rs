use std::fmt::Write;
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread;

use tracing::debug;
use url::Url;

use crate::clock::Clock;
use crate::endpoint::{CallEndpointError, Endpoint, EndpointCaller};
use crate::http_client::HttpClient;
use crate::session::IdentitySession;
use crate::token::AccessToken;

pub const NOT_CALLED_YET: &str = "Not called yet";

/// A finished call, as sent back by the thread that ran it.
pub type Completion = (Endpoint, Result<String, CallEndpointError>);

/// Last completed result of every endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointResults {
    public: String,
    user: String,
    admin: String,
}

impl Default for EndpointResults {
    fn default() -> Self {
        Self {
            public: NOT_CALLED_YET.to_string(),
            user: NOT_CALLED_YET.to_string(),
            admin: NOT_CALLED_YET.to_string(),
        }
    }
}

impl EndpointResults {
    pub fn get(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Public => &self.public,
            Endpoint::User => &self.user,
            Endpoint::Admin => &self.admin,
        }
    }

    fn slot_mut(&mut self, endpoint: Endpoint) -> &mut String {
        match endpoint {
            Endpoint::Public => &mut self.public,
            Endpoint::User => &mut self.user,
            Endpoint::Admin => &mut self.admin,
        }
    }
}

/// What the user sees once logged in: the token, its claims and one result per endpoint.
pub struct UserInfo<S, C, K> {
    session: S,
    caller: Arc<EndpointCaller<C, K>>,
    backend: Url,
    results: EndpointResults,
}

impl<S, C, K> UserInfo<S, C, K>
where
    S: IdentitySession,
    C: HttpClient,
    K: Clock,
{
    pub fn new(session: S, caller: EndpointCaller<C, K>, backend: Url) -> Self {
        Self {
            session,
            caller: Arc::new(caller),
            backend,
            results: EndpointResults::default(),
        }
    }

    pub fn results(&self) -> &EndpointResults {
        &self.results
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Calls `endpoint` with the current token and replaces its result.
    ///
    /// On error the previous result is kept.
    pub fn call(&mut self, endpoint: Endpoint) -> Result<(), CallEndpointError> {
        let message = call_one(&self.caller, &self.backend, endpoint, self.session.token())?;
        *self.results.slot_mut(endpoint) = message;
        Ok(())
    }

    /// Calls `endpoint` on its own thread and sends the outcome to `done` without touching any
    /// result. Pass it to [UserInfo::complete] to store it.
    pub fn start_call(&self, endpoint: Endpoint, done: Sender<Completion>)
    where
        C: Send + Sync + 'static,
        K: Send + Sync + 'static,
    {
        let caller = Arc::clone(&self.caller);
        let backend = self.backend.clone();
        let token = self.session.token().clone();
        debug!(%endpoint, "starting call");
        thread::spawn(move || {
            let outcome = call_one(&caller, &backend, endpoint, &token);
            // Nobody is waiting anymore when the receiver is gone.
            let _ = done.send((endpoint, outcome));
        });
    }

    /// Stores the outcome of a call started with [UserInfo::start_call].
    ///
    /// On error the previous result is kept and the error is returned.
    pub fn complete(
        &mut self,
        endpoint: Endpoint,
        outcome: Result<String, CallEndpointError>,
    ) -> Result<(), CallEndpointError> {
        *self.results.slot_mut(endpoint) = outcome?;
        debug!(%endpoint, "call completed");
        Ok(())
    }

    /// Calls every endpoint at once. Results are stored as calls complete, so when
    /// an endpoint is listed twice the slowest call wins.
    ///
    /// Every successful result is stored even when another call fails. The first failure is
    /// returned.
    pub fn call_concurrently(&mut self, endpoints: &[Endpoint]) -> Result<(), CallEndpointError>
    where
        C: Sync,
        K: Sync,
    {
        let token = self.session.token();
        let caller = &*self.caller;
        let backend = &self.backend;
        let results = &mut self.results;

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();
            for &endpoint in endpoints {
                let tx = tx.clone();
                scope.spawn(move || {
                    let outcome = call_one(caller, backend, endpoint, token);
                    // The receiver outlives every worker of this scope.
                    let _ = tx.send((endpoint, outcome));
                });
            }
            drop(tx);

            let mut first_error = None;
            for (endpoint, outcome) in rx {
                match outcome {
                    Ok(message) => {
                        debug!(%endpoint, "call completed");
                        *results.slot_mut(endpoint) = message;
                    }
                    Err(err) => {
                        first_error.get_or_insert(err);
                    }
                }
            }
            first_error.map_or(Ok(()), Err)
        })
    }

    /// Hands logout to the identity integration.
    pub fn log_out(&mut self) {
        self.session.log_out();
    }

    pub fn render(&self) -> String {
        let mut view = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(view, "Your complete Access Token");
        let _ = writeln!(view, "{}", self.session.token());
        let _ = writeln!(view);
        let _ = writeln!(view, "Your decoded JWT payload");
        let _ = writeln!(view, "{}", self.session.token_data());
        for endpoint in Endpoint::ALL {
            let _ = writeln!(view);
            let _ = writeln!(view, "[Call {}]", endpoint.path());
            let _ = writeln!(view, "{}", self.results.get(endpoint));
        }
        let _ = writeln!(view);
        let _ = writeln!(view, "[Log out]");
        view
    }
}

fn call_one<C, K>(
    caller: &EndpointCaller<C, K>,
    backend: &Url,
    endpoint: Endpoint,
    token: &AccessToken,
) -> Result<String, CallEndpointError>
where
    C: HttpClient,
    K: Clock,
{
    let url = endpoint
        .url(backend)
        .map_err(|e| {
            CallEndpointError::InvalidRequest(endpoint.path().to_string(), e.to_string())
        })?;
    caller.call(url.as_str(), token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::tests::{FixedClock, at};
    use crate::http_client::HttpClientError;
    use crate::http_client::tests::MockHttpClient;
    use crate::session::tests::MockIdentitySession;
    use crate::token::TokenData;
    use assert_matches::assert_matches;
    use http::{Request, Response};
    use rstest::rstest;
    use serde_json::{Map, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const CALLED_AT: &str = "called at 5/3/2024 @ 14:7:9 - ";

    type Reply = Result<Response<Vec<u8>>, HttpClientError>;

    fn session() -> MockIdentitySession {
        let mut session = MockIdentitySession::new();
        session.expect_token().return_const(AccessToken::from("T"));
        let mut claims = Map::new();
        claims.insert("preferred_username".to_string(), json!("alice"));
        session
            .expect_token_data()
            .return_const(TokenData::new(claims));
        session
    }

    fn user_info<C: HttpClient>(http_client: C) -> UserInfo<MockIdentitySession, C, FixedClock> {
        UserInfo::new(
            session(),
            EndpointCaller::new(http_client, FixedClock(at(2024, 3, 5, 14, 7, 9))),
            Url::parse("http://localhost:8081").unwrap(),
        )
    }

    /// Backend answering by path: public is open, user is allowed and admin forbidden.
    fn backend(req: Request<Vec<u8>>) -> Reply {
        let (status, body): (u16, &str) = match req.uri().path() {
            "/api/v1/public" => (200, "public content"),
            "/api/v1/user" => (200, "user content"),
            _ => (403, ""),
        };
        Ok(Response::builder()
            .status(status)
            .body(body.as_bytes().to_vec())
            .unwrap())
    }

    #[test]
    fn starts_with_nothing_called() {
        let view = user_info(backend);

        for endpoint in Endpoint::ALL {
            assert_eq!(view.results().get(endpoint), NOT_CALLED_YET);
        }
    }

    #[rstest]
    #[case(Endpoint::Public, "public content")]
    #[case(Endpoint::User, "user content")]
    #[case(Endpoint::Admin, "Error: 403")]
    fn call_updates_only_its_own_slot(#[case] endpoint: Endpoint, #[case] message: &str) {
        let mut view = user_info(backend);

        view.call(endpoint).unwrap();

        for other in Endpoint::ALL {
            let expected = if other == endpoint {
                format!("{CALLED_AT}{message}")
            } else {
                NOT_CALLED_YET.to_string()
            };
            assert_eq!(view.results().get(other), expected);
        }
    }

    #[test]
    fn transport_failure_is_displayed() {
        let unreachable = |_: Request<Vec<u8>>| -> Reply {
            Err(HttpClientError::TransportError("Network Error".to_string()))
        };
        let mut view = user_info(unreachable);

        view.call(Endpoint::User).unwrap();

        assert!(view.results().get(Endpoint::User).contains("Network Error"));
        assert_eq!(view.results().get(Endpoint::Public), NOT_CALLED_YET);
    }

    #[test]
    fn unclassified_failure_keeps_previous_result() {
        let calls = AtomicUsize::new(0);
        let ok_then_broken = move |_: Request<Vec<u8>>| -> Reply {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(Response::builder()
                    .status(200)
                    .body(b"first".to_vec())
                    .unwrap())
            } else {
                Err(HttpClientError::InvalidResponse("broken".to_string()))
            }
        };
        let mut view = user_info(ok_then_broken);
        view.call(Endpoint::Public).unwrap();

        assert_matches!(
            view.call(Endpoint::Public),
            Err(CallEndpointError::InvalidResponse(_, _))
        );
        assert_eq!(
            view.results().get(Endpoint::Public),
            format!("{CALLED_AT}first")
        );
    }

    #[test]
    fn concurrent_calls_fill_every_slot() {
        let mut view = user_info(backend);

        view.call_concurrently(&Endpoint::ALL).unwrap();

        assert_eq!(
            view.results().get(Endpoint::Public),
            format!("{CALLED_AT}public content")
        );
        assert_eq!(
            view.results().get(Endpoint::User),
            format!("{CALLED_AT}user content")
        );
        assert_eq!(
            view.results().get(Endpoint::Admin),
            format!("{CALLED_AT}Error: 403")
        );
    }

    #[test]
    fn last_call_to_complete_wins() {
        // The first request sleeps so it completes after the second one.
        let started = AtomicUsize::new(0);
        let slow_then_fast = move |_: Request<Vec<u8>>| -> Reply {
            let order = started.fetch_add(1, Ordering::SeqCst);
            let body = if order == 0 {
                std::thread::sleep(Duration::from_millis(200));
                "started first"
            } else {
                "started second"
            };
            Ok(Response::builder()
                .status(200)
                .body(body.as_bytes().to_vec())
                .unwrap())
        };
        let mut view = user_info(slow_then_fast);

        view.call_concurrently(&[Endpoint::User, Endpoint::User])
            .unwrap();

        assert_eq!(
            view.results().get(Endpoint::User),
            format!("{CALLED_AT}started first")
        );
        assert_eq!(view.results().get(Endpoint::Public), NOT_CALLED_YET);
    }

    #[test]
    fn started_calls_are_stored_on_completion() {
        let mut view = user_info(backend);
        let (done, completions) = mpsc::channel();

        view.start_call(Endpoint::User, done.clone());
        view.start_call(Endpoint::Admin, done);

        assert_eq!(view.results(), &EndpointResults::default());
        for (endpoint, outcome) in completions {
            view.complete(endpoint, outcome).unwrap();
        }
        assert_eq!(
            view.results().get(Endpoint::User),
            format!("{CALLED_AT}user content")
        );
        assert_eq!(
            view.results().get(Endpoint::Admin),
            format!("{CALLED_AT}Error: 403")
        );
        assert_eq!(view.results().get(Endpoint::Public), NOT_CALLED_YET);
    }

    #[test]
    fn failed_completion_keeps_previous_result() {
        let mut view = user_info(backend);
        view.call(Endpoint::Public).unwrap();

        let outcome = Err(CallEndpointError::InvalidResponse(
            "/api/v1/public".to_string(),
            "broken".to_string(),
        ));

        assert_matches!(
            view.complete(Endpoint::Public, outcome),
            Err(CallEndpointError::InvalidResponse(_, _))
        );
        assert_eq!(
            view.results().get(Endpoint::Public),
            format!("{CALLED_AT}public content")
        );
    }

    #[test]
    fn log_out_is_delegated_once() {
        let mut session = session();
        session.expect_log_out().times(1).return_const(());
        session.expect_log_in().never();
        let mut view = UserInfo::new(
            session,
            EndpointCaller::new(backend, FixedClock(at(2024, 3, 5, 14, 7, 9))),
            Url::parse("http://localhost:8081").unwrap(),
        );

        view.log_out();

        assert_eq!(view.results(), &EndpointResults::default());
    }

    #[test]
    fn renders_token_claims_and_results() {
        let mut view = user_info(backend);
        view.call(Endpoint::Admin).unwrap();

        let rendered = view.render();

        assert_eq!(
            rendered,
            [
                "Your complete Access Token",
                "T",
                "",
                "Your decoded JWT payload",
                "{",
                "  \"preferred_username\": \"alice\"",
                "}",
                "",
                "[Call /api/v1/public]",
                "Not called yet",
                "",
                "[Call /api/v1/user]",
                "Not called yet",
                "",
                "[Call /api/v1/admin]",
                &format!("{CALLED_AT}Error: 403"),
                "",
                "[Log out]",
                "",
            ]
            .join("\n")
        );
    }

    #[test]
    fn unclassified_failure_is_returned() {
        let failing = |_: Request<Vec<u8>>| -> Reply {
            Err(HttpClientError::InvalidResponse("broken".to_string()))
        };
        let mut view = user_info(failing);

        assert_matches!(
            view.call(Endpoint::Admin),
            Err(CallEndpointError::InvalidResponse(_, _))
        );
        assert_eq!(view.results().get(Endpoint::Admin), NOT_CALLED_YET);
        assert_matches!(
            view.call_concurrently(&Endpoint::ALL),
            Err(CallEndpointError::InvalidResponse(_, _))
        );
        assert_eq!(view.results(), &EndpointResults::default());
    }

    #[test]
    fn mocked_client_is_called_once_per_endpoint() {
        let mut client = MockHttpClient::new();
        client
            .expect_send()
            .times(3)
            .returning(|_| Ok(Response::builder().status(200).body(vec![]).unwrap()));
        let mut view = user_info(client);

        view.call_concurrently(&Endpoint::ALL).unwrap();
    }
}
