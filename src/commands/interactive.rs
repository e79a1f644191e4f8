use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver};

use thiserror::Error;
use tracing::debug;

use crate::clock::Clock;
use crate::endpoint::{CallEndpointError, Endpoint};
use crate::expiry::{Confirm, ExpiryDecision, RefreshExpiryPolicy, RefreshTokenExpiredEvent};
use crate::http_client::HttpClient;
use crate::session::IdentitySession;
use crate::user_info::{Completion, UserInfo};

const HELP: &str = "\
commands:
  public | user | admin   call /api/v1/<name>
  all                     call every endpoint at once
  show                    print the page again
  expire                  simulate an expired refresh token
  logout                  log out and leave
  quit                    leave without logging out";

#[derive(Error, Debug)]
pub enum InteractiveError {
    #[error("terminal i/o: `{0}`")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Call(#[from] CallEndpointError),
}

#[derive(Debug, PartialEq)]
enum Action {
    Call(Endpoint),
    CallAll,
    Show,
    Expire,
    LogOut,
    Quit,
    Help,
    Unknown(String),
}

impl From<&str> for Action {
    fn from(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "all" => Action::CallAll,
            "show" => Action::Show,
            "expire" => Action::Expire,
            "logout" => Action::LogOut,
            "quit" | "exit" => Action::Quit,
            "" | "help" => Action::Help,
            other => Endpoint::from_name(other)
                .map(Action::Call)
                .unwrap_or_else(|| Action::Unknown(other.to_string())),
        }
    }
}

/// Prompt loop standing in for the page buttons.
///
/// Calls run in the background so the prompt stays available while they are in flight.
/// Finished calls are stored before the page is printed and before every prompt.
pub struct InteractiveCommand<S, C, K, P> {
    user_info: UserInfo<S, C, K>,
    expiry_policy: P,
    in_flight: usize,
}

impl<S, C, K, P> InteractiveCommand<S, C, K, P>
where
    S: IdentitySession,
    C: HttpClient + Send + Sync + 'static,
    K: Clock + Send + Sync + 'static,
    P: RefreshExpiryPolicy,
{
    pub fn new(user_info: UserInfo<S, C, K>, expiry_policy: P) -> Self {
        Self {
            user_info,
            expiry_policy,
            in_flight: 0,
        }
    }

    /// Runs until `quit`, `logout` or the end of `lines`. At the end of `lines` the calls
    /// still in flight are awaited and the final page is printed.
    ///
    /// Calls that fail without a displayable result end the loop with an error.
    pub fn run<I, W>(mut self, lines: I, mut out: W) -> Result<(), InteractiveError>
    where
        I: IntoIterator<Item = io::Result<String>>,
        W: Write,
    {
        let (done, completions) = mpsc::channel();

        write!(out, "{}", self.user_info.render())?;
        prompt(&mut out)?;

        for line in lines {
            let action = Action::from(line?.as_str());
            debug!(?action, "interactive command");

            match action {
                Action::Call(endpoint) => {
                    self.user_info.start_call(endpoint, done.clone());
                    self.in_flight += 1;
                    writeln!(out, "calling {}", endpoint.path())?;
                }
                Action::CallAll => {
                    for endpoint in Endpoint::ALL {
                        self.user_info.start_call(endpoint, done.clone());
                        self.in_flight += 1;
                        writeln!(out, "calling {}", endpoint.path())?;
                    }
                }
                Action::Show => {
                    self.store_completed(&completions)?;
                    write!(out, "{}", self.user_info.render())?;
                }
                Action::Expire => {
                    let decision = self
                        .expiry_policy
                        .on_refresh_token_expired(&RefreshTokenExpiredEvent);
                    if decision == ExpiryDecision::Relogin {
                        self.user_info.session_mut().log_in();
                    }
                }
                Action::LogOut => {
                    self.user_info.log_out();
                    writeln!(out, "Logged out.")?;
                    return Ok(());
                }
                Action::Quit => return Ok(()),
                Action::Help => writeln!(out, "{HELP}")?,
                Action::Unknown(command) => {
                    writeln!(out, "unknown command `{command}`, type `help`")?
                }
            }
            if self.store_completed(&completions)? {
                write!(out, "{}", self.user_info.render())?;
            }
            prompt(&mut out)?;
        }

        drop(done);
        if self.in_flight > 0 {
            self.await_in_flight(&completions)?;
            write!(out, "{}", self.user_info.render())?;
        }
        Ok(())
    }

    /// Stores the calls that finished so far. Returns whether any did.
    fn store_completed(
        &mut self,
        completions: &Receiver<Completion>,
    ) -> Result<bool, InteractiveError> {
        let mut stored = false;
        while let Ok((endpoint, outcome)) = completions.try_recv() {
            self.in_flight -= 1;
            self.user_info.complete(endpoint, outcome)?;
            stored = true;
        }
        Ok(stored)
    }

    /// Stores every call still in flight. Only the call threads may hold senders.
    fn await_in_flight(
        &mut self,
        completions: &Receiver<Completion>,
    ) -> Result<(), InteractiveError> {
        // Ends early only when a call thread died without sending.
        for (endpoint, outcome) in completions.iter().take(self.in_flight) {
            self.user_info.complete(endpoint, outcome)?;
        }
        self.in_flight = 0;
        Ok(())
    }
}

fn prompt<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "> ")?;
    out.flush()
}

/// Lines read from standard input, one lock per line so that [TerminalConfirm] can read in between.
pub fn stdin_lines() -> impl Iterator<Item = io::Result<String>> {
    std::iter::from_fn(|| {
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(Ok(line)),
            Err(err) => Some(Err(err)),
        }
    })
}

/// Asks a yes/no question on the terminal. Anything but `y`/`yes` is a no.
#[derive(Debug, Default)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, message: &str) -> bool {
        print!("{message} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}
