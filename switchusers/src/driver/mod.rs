//! Device sessions.
//!
//! [`DeviceSession`] is the small set of primitives the provisioning state
//! machine needs from a live CLI: submit a line, submit a line and answer
//! its question, run a read-only query, and disconnect. [`Connector`] opens
//! one. The SSH implementations are [`SshConnector`] and [`SshSession`].

mod builder;
mod generic;
pub(crate) mod response;

pub use builder::SshConnector;
pub use generic::SshSession;
pub use response::Response;

use std::future::Future;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::Result;
use crate::platform::VendorId;

/// Where and how to log in to one device.
#[derive(Debug, Clone, Copy)]
pub struct ConnectTarget<'a> {
    /// Vendor dialect, selects the platform definition.
    pub vendor: VendorId,

    /// Management address.
    pub address: &'a str,

    /// Operator login.
    pub username: &'a str,

    /// Operator password.
    pub password: &'a SecretString,

    /// Secret for privilege escalation, if the dialect asks for one.
    pub enable_secret: Option<&'a SecretString>,

    /// Bound on connecting and on every later read.
    pub timeout: Duration,
}

/// Opens device sessions.
pub trait Connector: Send + Sync {
    /// Session type produced by this connector.
    type Session: DeviceSession;

    /// Connect, authenticate, and reach the platform's working privilege level.
    fn connect(&self, target: ConnectTarget<'_>) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// An open CLI session on one device.
pub trait DeviceSession: Send {
    /// Submit one line and wait for the prompt or an input request.
    ///
    /// Secret lines are never logged and their echo is masked in the
    /// returned output. Rejected lines are an error.
    fn submit_line(
        &mut self,
        line: &str,
        is_secret: bool,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Submit one line and, if the device asks a question, answer with `confirm_token`.
    fn submit_and_await_confirmation(
        &mut self,
        line: &str,
        confirm_token: &str,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Run a read-only command and return its output.
    ///
    /// The read timeout is the session timeout times `read_timeout_factor`.
    fn query(
        &mut self,
        command: &str,
        read_timeout_factor: u32,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Close the session. Idempotent, never fails.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;

    /// Whether the session can still take commands.
    fn is_alive(&self) -> bool;
}
