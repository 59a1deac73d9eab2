//! In-memory device sessions for tests.
//!
//! A [`ScriptedConnector`] knows a set of addresses, each with a
//! [`DeviceScript`] describing how that device behaves. Everything sent to a
//! device is recorded and can be read back with
//! [`ScriptedConnector::submitted`].

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::driver::{ConnectTarget, Connector, DeviceSession, Response};
use crate::error::{ChannelError, DriverError, Result, TransportError};

/// One interaction seen by a scripted device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Line { text: String, secret: bool },
    Confirmed { text: String, token: String },
    Query { command: String, factor: u32 },
    Disconnect,
}

impl Submitted {
    pub fn line(text: &str, secret: bool) -> Self {
        Submitted::Line {
            text: text.to_string(),
            secret,
        }
    }

    pub fn confirmed(text: &str, token: &str) -> Self {
        Submitted::Confirmed {
            text: text.to_string(),
            token: token.to_string(),
        }
    }

    pub fn query(command: &str, factor: u32) -> Self {
        Submitted::Query {
            command: command.to_string(),
            factor,
        }
    }
}

/// How a scripted device answers.
#[derive(Debug, Clone, Default)]
pub struct DeviceScript {
    version_output: String,
    verification_output: String,
    reject_line: Option<String>,
    hang_on: Option<String>,
    panic_on: Option<String>,
    close_after: Option<String>,
    fail_verification: bool,
}

impl DeviceScript {
    /// Output of `show version`.
    pub fn version(mut self, output: &str) -> Self {
        self.version_output = output.to_string();
        self
    }

    /// Output of any other query.
    pub fn verification(mut self, output: &str) -> Self {
        self.verification_output = output.to_string();
        self
    }

    /// Reject lines starting with `prefix` as the CLI would.
    pub fn reject_line(mut self, prefix: &str) -> Self {
        self.reject_line = Some(prefix.to_string());
        self
    }

    /// Never answer lines equal to `line`.
    pub fn hang_on(mut self, line: &str) -> Self {
        self.hang_on = Some(line.to_string());
        self
    }

    /// Panic when `line` is submitted.
    pub fn panic_on(mut self, line: &str) -> Self {
        self.panic_on = Some(line.to_string());
        self
    }

    /// Drop the connection once `line` has been answered.
    pub fn close_after(mut self, line: &str) -> Self {
        self.close_after = Some(line.to_string());
        self
    }

    /// Time out on every query other than `show version`.
    pub fn fail_verification(mut self) -> Self {
        self.fail_verification = true;
        self
    }
}

type Journal = Arc<Mutex<HashMap<String, Vec<Submitted>>>>;

/// Connector over scripted devices. Unknown addresses refuse the connection.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    devices: HashMap<String, DeviceScript>,
    journal: Journal,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, address: &str, script: DeviceScript) -> Self {
        self.devices.insert(address.to_string(), script);
        self
    }

    /// Everything sent to `address`, in order.
    pub fn submitted(&self, address: &str) -> Vec<Submitted> {
        self.journal
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default()
    }
}

impl Connector for ScriptedConnector {
    type Session = ScriptedSession;

    async fn connect(&self, target: ConnectTarget<'_>) -> Result<ScriptedSession> {
        let Some(script) = self.devices.get(target.address) else {
            return Err(TransportError::ConnectionFailed {
                host: target.address.to_string(),
                port: 22,
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            }
            .into());
        };
        Ok(ScriptedSession {
            address: target.address.to_string(),
            script: script.clone(),
            journal: Arc::clone(&self.journal),
            open: true,
            disconnected: false,
        })
    }
}

/// Session on a scripted device.
#[derive(Debug)]
pub struct ScriptedSession {
    address: String,
    script: DeviceScript,
    journal: Journal,
    open: bool,
    disconnected: bool,
}

impl ScriptedSession {
    fn record(&self, entry: Submitted) {
        self.journal
            .lock()
            .unwrap()
            .entry(self.address.clone())
            .or_default()
            .push(entry);
    }

    async fn react(&mut self, line: &str) -> Result<()> {
        if self.script.panic_on.as_deref() == Some(line) {
            panic!("scripted device {} crashed on '{}'", self.address, line);
        }
        if self.script.hang_on.as_deref() == Some(line) {
            std::future::pending::<()>().await;
        }
        if let Some(prefix) = &self.script.reject_line {
            if line.starts_with(prefix.as_str()) {
                return Err(DriverError::CommandFailed {
                    command: line.to_string(),
                    message: "% Invalid input detected".to_string(),
                }
                .into());
            }
        }
        if self.script.close_after.as_deref() == Some(line) {
            self.open = false;
        }
        Ok(())
    }
}

impl DeviceSession for ScriptedSession {
    async fn submit_line(&mut self, line: &str, is_secret: bool) -> Result<Response> {
        self.record(Submitted::line(line, is_secret));
        self.react(line).await?;
        Ok(Response::new(line, "", "switch#", Duration::ZERO))
    }

    async fn submit_and_await_confirmation(&mut self, line: &str, confirm_token: &str) -> Result<Response> {
        self.record(Submitted::confirmed(line, confirm_token));
        self.react(line).await?;
        Ok(Response::new(line, "", "switch#", Duration::ZERO))
    }

    async fn query(&mut self, command: &str, read_timeout_factor: u32) -> Result<Response> {
        self.record(Submitted::query(command, read_timeout_factor));
        self.react(command).await?;
        if command == "show version" {
            return Ok(Response::new(command, self.script.version_output.clone(), "switch#", Duration::ZERO));
        }
        if self.script.fail_verification {
            return Err(ChannelError::PatternTimeout(Duration::from_secs(30)).into());
        }
        Ok(Response::new(
            command,
            self.script.verification_output.clone(),
            "switch#",
            Duration::ZERO,
        ))
    }

    async fn disconnect(&mut self) {
        if !self.disconnected {
            self.disconnected = true;
            self.open = false;
            self.record(Submitted::Disconnect);
        }
    }

    fn is_alive(&self) -> bool {
        self.open
    }
}
