//! Per-device provisioning state machine.
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Provisioning -> Verifying
//!     -> Persisting -> Disconnecting -> Terminal(Success)
//! ```
//!
//! A failure in any state jumps to `Disconnecting` (when a session exists)
//! and ends in `Terminal` with a status named after the state it failed in.
//! [`SessionDriver::run`] never returns an error: whatever happens to the
//! device ends up in its [`SessionOutcome`].

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::{DateTime, Local};
use futures_util::FutureExt;
use log::{debug, info, warn};

use crate::driver::{ConnectTarget, Connector, DeviceSession, Response};
use crate::error::{ChannelError, DriverError, Error, Result, TransportError};
use crate::inventory::DeviceRecord;
use crate::plan::{Credentials, Operation, PlanStep, UNKNOWN_VERSION, VendorProfile, build_plan};
use crate::verify::read_verification;

/// How a device's attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    Success,
    ConnectError,
    CommandError,
    VerifyError,
}

impl OutcomeStatus {
    pub fn name(self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::ConnectError => "connect_error",
            OutcomeStatus::CommandError => "command_error",
            OutcomeStatus::VerifyError => "verify_error",
        }
    }

}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a device is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Provisioning,
    Verifying,
    Persisting,
    Disconnecting,
    Terminal(OutcomeStatus),
}

impl SessionState {
    /// Status recorded when an error occurs in this state.
    pub fn failure_status(self) -> OutcomeStatus {
        match self {
            SessionState::Disconnected | SessionState::Connecting => OutcomeStatus::ConnectError,
            SessionState::Verifying => OutcomeStatus::VerifyError,
            _ => OutcomeStatus::CommandError,
        }
    }
}

/// Final record of one device's attempt. Created once, never changed.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub device: DeviceRecord,
    pub status: OutcomeStatus,

    /// Raw verification output, on success.
    pub verification_text: Option<String>,

    /// Error message, on failure.
    pub error_detail: Option<String>,

    /// Firmware version, when detected or known from the inventory.
    pub detected_version: Option<String>,

    /// Lines submitted, secrets masked.
    pub transcript: Vec<String>,

    pub timestamp: DateTime<Local>,
}

/// Error plus the state it happened in.
#[derive(Debug)]
struct StageFailure {
    state: SessionState,
    error: Error,
}

/// Bookkeeping for one device while it moves through the states.
struct DeviceRun<'a> {
    device: &'a DeviceRecord,
    state: SessionState,
    detected_version: Option<String>,
    transcript: Vec<String>,
}

impl<'a> DeviceRun<'a> {
    fn new(device: &'a DeviceRecord) -> Self {
        Self {
            device,
            state: SessionState::Disconnected,
            detected_version: device.raw_version.clone(),
            transcript: Vec::new(),
        }
    }

    fn enter(&mut self, next: SessionState) {
        debug!("{}: {:?} -> {:?}", self.device, self.state, next);
        self.state = next;
    }

    /// Tag an error with the current state.
    fn failure(&self, error: impl Into<Error>) -> StageFailure {
        StageFailure {
            state: self.state,
            error: error.into(),
        }
    }

    fn finish(mut self, result: std::result::Result<String, StageFailure>) -> SessionOutcome {
        let (status, verification_text, error_detail) = match result {
            Ok(text) => (OutcomeStatus::Success, Some(text), None),
            Err(failure) => (failure.state.failure_status(), None, Some(failure.error.to_string())),
        };
        self.enter(SessionState::Terminal(status));
        SessionOutcome {
            device: self.device.clone(),
            status,
            verification_text,
            error_detail,
            detected_version: self.detected_version,
            transcript: self.transcript,
            timestamp: Local::now(),
        }
    }
}

/// Run `future`, failing with a transport timeout after `factor` read timeouts.
async fn bounded<T>(timeout: Duration, factor: u32, future: impl Future<Output = Result<T>>) -> Result<T> {
    let limit = timeout.saturating_mul(factor);
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| TransportError::Timeout(limit))?
}

/// Error recording a panic unwound out of device processing.
fn aborted(payload: Box<dyn Any + Send>) -> Error {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    };
    DriverError::Aborted { message }.into()
}

/// Drives one device at a time through the provisioning states.
pub struct SessionDriver<'a, C> {
    connector: &'a C,
    profile: VendorProfile,
    operation: Operation,
    credentials: &'a Credentials,
    timeout: Duration,
}

impl<'a, C: Connector> SessionDriver<'a, C> {
    pub fn new(
        connector: &'a C,
        profile: VendorProfile,
        operation: Operation,
        credentials: &'a Credentials,
        timeout: Duration,
    ) -> Self {
        Self {
            connector,
            profile,
            operation,
            credentials,
            timeout,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        self.credentials
    }

    /// Take one device from `Disconnected` to `Terminal`.
    ///
    /// The session, once opened, is always disconnected before returning,
    /// including when processing panics.
    pub async fn run(&self, device: &DeviceRecord) -> SessionOutcome {
        let mut run = DeviceRun::new(device);

        run.enter(SessionState::Connecting);
        let target = ConnectTarget {
            vendor: self.profile.vendor,
            address: &device.address,
            username: &self.credentials.operator_username,
            password: &self.credentials.operator_password,
            enable_secret: Some(&self.credentials.operator_password),
            timeout: self.timeout,
        };
        // Login, escalation and paging setup are several reads
        let connecting = bounded(self.timeout, 4, self.connector.connect(target));
        let connected = match AssertUnwindSafe(connecting).catch_unwind().await {
            Ok(connected) => connected,
            Err(payload) => Err(aborted(payload)),
        };
        let mut session = match connected {
            Ok(session) => session,
            Err(e) => {
                info!("{}: connect failed: {}", device, e);
                let failure = run.failure(e);
                return run.finish(Err(failure));
            }
        };
        run.enter(SessionState::Connected);

        let result = match AssertUnwindSafe(self.drive(&mut session, &mut run)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let error = aborted(payload);
                warn!("{}: {}", device, error);
                Err(run.failure(error))
            }
        };

        run.enter(SessionState::Disconnecting);
        session.disconnect().await;

        run.finish(result)
    }

    async fn drive(
        &self,
        session: &mut C::Session,
        run: &mut DeviceRun<'_>,
    ) -> std::result::Result<String, StageFailure> {
        run.enter(SessionState::Provisioning);
        let version = self.detect_version(session, run).await.map_err(|e| run.failure(e))?;
        let variant = self.profile.variant(version.as_deref());
        debug!("{}: using {:?} templates", run.device, variant);

        let plan = build_plan(&self.profile, variant, self.operation, self.credentials)
            .map_err(|e| run.failure(e))?;
        for step in &plan.steps {
            self.submit(session, step, run).await.map_err(|e| run.failure(e))?;
        }

        run.enter(SessionState::Verifying);
        let verification = bounded(
            self.timeout,
            5,
            read_verification(session, self.profile.vendor, self.operation),
        )
        .await
        .map_err(|e| run.failure(e))?;

        run.enter(SessionState::Persisting);
        for step in &plan.persist {
            self.submit(session, step, run).await.map_err(|e| run.failure(e))?;
        }

        Ok(verification)
    }

    /// Query the firmware when the vendor and operation need it.
    async fn detect_version(&self, session: &mut C::Session, run: &mut DeviceRun<'_>) -> Result<Option<String>> {
        let Some((command, factor)) = self.profile.version_query(self.operation) else {
            return Ok(run.detected_version.clone());
        };

        let response = bounded(self.timeout, factor.saturating_add(1), session.query(command, factor)).await?;
        let version = self
            .profile
            .parse_version(&response.result)
            .or_else(|| run.device.raw_version.clone())
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
        info!("{}: detected OS version {}", run.device, version);
        run.detected_version = Some(version.clone());
        Ok(Some(version))
    }

    async fn submit(&self, session: &mut C::Session, step: &PlanStep, run: &mut DeviceRun<'_>) -> Result<Response> {
        if !session.is_alive() {
            return Err(ChannelError::Closed.into());
        }
        run.transcript.push(step.display.clone());
        debug!("{}: > {}", run.device, step.display);
        match step.confirmation {
            Some(confirmation) => {
                bounded(
                    self.timeout,
                    2,
                    session.submit_and_await_confirmation(&step.line, confirmation.token()),
                )
                .await
            }
            None => bounded(self.timeout, 2, session.submit_line(&step.line, step.is_secret)).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::fakes::{DeviceScript, ScriptedConnector, Submitted};
    use crate::platform::VendorId;

    fn device(hostname: &str, address: &str) -> DeviceRecord {
        DeviceRecord {
            hostname: hostname.to_string(),
            address: address.to_string(),
            vendor_tag: "test".to_string(),
            raw_version: None,
        }
    }

    fn create_creds() -> Credentials {
        Credentials::for_create("netops", SecretString::from("op-pass"), "alice", SecretString::from("S3cret!"))
    }

    fn delete_creds(user: &str) -> Credentials {
        Credentials::for_delete("netops", SecretString::from("op-pass"), user)
    }

    fn driver<'a>(
        connector: &'a ScriptedConnector,
        vendor: VendorId,
        operation: Operation,
        credentials: &'a Credentials,
    ) -> SessionDriver<'a, ScriptedConnector> {
        SessionDriver::new(
            connector,
            VendorProfile::new(vendor),
            operation,
            credentials,
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_cisco_create_success() {
        let connector = ScriptedConnector::new().with_device(
            "10.0.0.1",
            DeviceScript::default().verification("username alice privilege 15 secret 9 $9$abc"),
        );
        let creds = create_creds();
        let outcome = driver(&connector, VendorId::CiscoIos, Operation::Create, &creds)
            .run(&device("sw1", "10.0.0.1"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(
            outcome.verification_text.as_deref(),
            Some("username alice privilege 15 secret 9 $9$abc")
        );
        assert!(outcome.error_detail.is_none());
        assert_eq!(
            connector.submitted("10.0.0.1"),
            vec![
                Submitted::line("configure terminal", false),
                Submitted::line("username alice privilege 15 secret S3cret!", true),
                Submitted::line("end", false),
                Submitted::query("show running-config | include username", 1),
                Submitted::line("write memory", false),
                Submitted::Disconnect,
            ]
        );
        assert_eq!(
            outcome.transcript,
            vec![
                "configure terminal",
                "username alice privilege 15 secret ********",
                "end",
                "write memory",
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let connector = ScriptedConnector::new();
        let creds = create_creds();
        let outcome = driver(&connector, VendorId::CiscoIos, Operation::Create, &creds)
            .run(&device("gone", "10.9.9.9"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::ConnectError);
        assert!(outcome.error_detail.unwrap().contains("10.9.9.9"));
        assert!(outcome.transcript.is_empty());
    }

    #[tokio::test]
    async fn test_command_failure_still_disconnects() {
        let connector = ScriptedConnector::new().with_device(
            "10.0.0.1",
            DeviceScript::default().reject_line("username alice"),
        );
        let creds = create_creds();
        let outcome = driver(&connector, VendorId::CiscoIos, Operation::Create, &creds)
            .run(&device("sw1", "10.0.0.1"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::CommandError);
        assert!(outcome.verification_text.is_none());
        let submitted = connector.submitted("10.0.0.1");
        assert_eq!(submitted.last(), Some(&Submitted::Disconnect));
        assert!(!submitted.iter().any(|s| matches!(s, Submitted::Query { .. })));
    }

    #[tokio::test]
    async fn test_verification_failure() {
        let connector = ScriptedConnector::new().with_device("10.0.0.1", DeviceScript::default().fail_verification());
        let creds = delete_creds("alice");
        let outcome = driver(&connector, VendorId::CiscoIos, Operation::Delete, &creds)
            .run(&device("sw1", "10.0.0.1"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::VerifyError);
        let submitted = connector.submitted("10.0.0.1");
        assert!(!submitted.contains(&Submitted::line("write memory", false)));
        assert_eq!(submitted.last(), Some(&Submitted::Disconnect));
    }

    #[tokio::test]
    async fn test_hung_line_times_out_as_command_error() {
        let connector = ScriptedConnector::new().with_device("10.0.0.1", DeviceScript::default().hang_on("end"));
        let creds = create_creds();
        let outcome = driver(&connector, VendorId::CiscoIos, Operation::Create, &creds)
            .run(&device("sw1", "10.0.0.1"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::CommandError);
        assert!(outcome.error_detail.unwrap().contains("timed out"));
        assert_eq!(connector.submitted("10.0.0.1").last(), Some(&Submitted::Disconnect));
    }

    #[tokio::test]
    async fn test_panic_still_disconnects() {
        let connector = ScriptedConnector::new().with_device("10.0.0.1", DeviceScript::default().panic_on("end"));
        let creds = create_creds();
        let outcome = driver(&connector, VendorId::CiscoIos, Operation::Create, &creds)
            .run(&device("sw1", "10.0.0.1"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::CommandError);
        assert!(outcome.error_detail.unwrap().contains("aborted"));
        assert_eq!(connector.submitted("10.0.0.1").last(), Some(&Submitted::Disconnect));
    }

    #[tokio::test]
    async fn test_closed_session_stops_before_next_line() {
        let connector = ScriptedConnector::new().with_device(
            "10.0.0.1",
            DeviceScript::default().close_after("configure terminal"),
        );
        let creds = create_creds();
        let outcome = driver(&connector, VendorId::CiscoIos, Operation::Create, &creds)
            .run(&device("sw1", "10.0.0.1"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::CommandError);
        assert!(outcome.error_detail.unwrap().contains("closed"));
        assert_eq!(
            connector.submitted("10.0.0.1"),
            vec![Submitted::line("configure terminal", false), Submitted::Disconnect]
        );
    }

    #[tokio::test]
    async fn test_huge_timeout_does_not_overflow() {
        let connector = ScriptedConnector::new().with_device("10.0.0.1", DeviceScript::default());
        let creds = delete_creds("alice");
        let outcome = SessionDriver::new(
            &connector,
            VendorProfile::new(VendorId::BrocadeFastIron),
            Operation::Delete,
            &creds,
            Duration::MAX,
        )
        .run(&device("icx-1", "10.0.0.1"))
        .await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
    }

    #[tokio::test]
    async fn test_brocade_create_detects_legacy_firmware() {
        let connector = ScriptedConnector::new().with_device(
            "10.0.1.1",
            DeviceScript::default().version("  SW: Version 07.2.06eT3e3 Copyright (c) Brocade"),
        );
        let creds = create_creds();
        let outcome = driver(&connector, VendorId::BrocadeFastIron, Operation::Create, &creds)
            .run(&device("icx-1", "10.0.1.1"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.detected_version.as_deref(), Some("07.2.06eT3e3"));
        let submitted = connector.submitted("10.0.1.1");
        assert_eq!(submitted[0], Submitted::query("show version", 2));
        assert!(submitted.contains(&Submitted::line("username alice privilege 0 password", false)));
        assert!(submitted.contains(&Submitted::line("S3cret!", true)));
        assert_eq!(
            &submitted[submitted.len() - 2..],
            &[Submitted::confirmed("write memory", "y"), Submitted::Disconnect]
        );
    }

    #[tokio::test]
    async fn test_brocade_create_inline_on_newer_firmware() {
        let connector = ScriptedConnector::new().with_device(
            "10.0.1.2",
            DeviceScript::default().version("  SW: Version 08.0.30tT7f3 Copyright (c) Ruckus"),
        );
        let creds = create_creds();
        let outcome = driver(&connector, VendorId::BrocadeFastIron, Operation::Create, &creds)
            .run(&device("icx-2", "10.0.1.2"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert!(
            connector
                .submitted("10.0.1.2")
                .contains(&Submitted::line("username alice privilege 0 password S3cret!", true))
        );
    }

    #[tokio::test]
    async fn test_brocade_delete_skips_version_query() {
        let connector = ScriptedConnector::new().with_device("10.0.1.1", DeviceScript::default());
        let creds = delete_creds("alice");
        let outcome = driver(&connector, VendorId::BrocadeFastIron, Operation::Delete, &creds)
            .run(&device("icx-1", "10.0.1.1"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert!(!connector.submitted("10.0.1.1").contains(&Submitted::query("show version", 2)));
    }

    #[tokio::test]
    async fn test_comware_delete_sequence() {
        let connector = ScriptedConnector::new().with_device(
            "10.0.2.1",
            DeviceScript::default().verification(" local-user admin class manage"),
        );
        let creds = delete_creds("temp1");
        let outcome = driver(&connector, VendorId::H3cComware, Operation::Delete, &creds)
            .run(&device("h3c-1", "10.0.2.1"))
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(
            connector.submitted("10.0.2.1"),
            vec![
                Submitted::line("system-view", false),
                Submitted::line("undo local-user temp1", false),
                Submitted::query("display current-configuration | include local-user", 2),
                Submitted::confirmed("save", "y"),
                Submitted::confirmed("", "y"),
                Submitted::Disconnect,
            ]
        );
    }

    #[test]
    fn test_failure_status_by_state() {
        assert_eq!(SessionState::Connecting.failure_status(), OutcomeStatus::ConnectError);
        assert_eq!(SessionState::Provisioning.failure_status(), OutcomeStatus::CommandError);
        assert_eq!(SessionState::Verifying.failure_status(), OutcomeStatus::VerifyError);
        assert_eq!(SessionState::Persisting.failure_status(), OutcomeStatus::CommandError);
    }
}
