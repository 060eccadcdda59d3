//! Remote-shell transport layer.
//!
//! The rest of the crate treats the transport as an opaque capability:
//! a [`Dialer`] opens one authenticated [`Session`] to one device with one
//! credential, and a session runs commands until it is closed. The SSH
//! implementation lives in [`ssh`]; tests substitute scripted fakes.

pub mod buffer;
mod ssh;

pub use buffer::PromptBuffer;
pub(crate) use ssh::AcceptingHandler;
pub use ssh::{SshDialer, SshSession};

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result, TransportError};
use crate::inventory::{Credential, Device};

/// A live authenticated shell session on exactly one device.
///
/// Sessions are owned exclusively by the worker that opened them and are
/// closed deterministically on every exit path; a closed session is never
/// reused.
pub trait Session: Send {
    /// Run one command and return its output, with the command echo and
    /// the trailing prompt stripped.
    fn run(&mut self, command: &str) -> impl Future<Output = Result<String>> + Send;

    /// Close the session.
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// Failure of a single dial attempt.
///
/// Authentication rejections are distinguished from timeouts because only
/// the former justify retrying with another credential.
#[derive(Debug)]
pub enum DialError {
    /// The server rejected the credential.
    AuthFailed {
        /// The username that was rejected.
        user: String,
    },

    /// No session was established within the deadline.
    Timeout(Duration),

    /// Any other failure.
    Other(Error),
}

impl From<DialError> for Error {
    fn from(err: DialError) -> Self {
        match err {
            DialError::AuthFailed { user } => TransportError::AuthenticationFailed { user }.into(),
            DialError::Timeout(d) => TransportError::Timeout(d).into(),
            DialError::Other(e) => e,
        }
    }
}

/// Opens one authenticated session to one device with one credential.
///
/// This is the transport seam: production uses [`SshDialer`], tests use a
/// scripted dialer.
pub trait Dialer: Send + Sync {
    /// The session type this dialer produces.
    type Session: Session + Send + 'static;

    /// Attempt to open a session. One call, one credential, no retries.
    fn dial(
        &self,
        device: &Device,
        credential: &Credential,
    ) -> impl Future<Output = std::result::Result<Self::Session, DialError>> + Send;
}
