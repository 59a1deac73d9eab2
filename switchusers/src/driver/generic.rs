//! SSH-backed device session that works with any platform definition.

use std::time::{Duration, Instant};

use log::{debug, warn};
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use super::response::Response;
use super::DeviceSession;
use crate::channel::{DEFAULT_SEARCH_DEPTH, PtyChannel};
use crate::error::{DriverError, Result};
use crate::plan::MASK;
use crate::platform::PlatformDefinition;
use crate::transport::{SshConfig, SshTransport};

/// Interactive SSH session on one switch.
///
/// Handles prompt detection, privilege escalation on open, output
/// normalization and failure detection for whichever platform it was
/// opened with.
pub struct SshSession {
    /// Platform definition.
    platform: PlatformDefinition,

    /// SSH transport (None once disconnected).
    transport: Option<SshTransport>,

    /// Shell channel (None once disconnected).
    channel: Option<PtyChannel>,

    /// Bound on every read.
    timeout: Duration,

    /// Matches any privilege level's prompt.
    prompt_pattern: Regex,

    /// Matches a prompt or an input request.
    prompt_or_input: Regex,

    /// Name of the privilege level of the last seen prompt.
    current_privilege: Option<String>,
}

impl SshSession {
    /// Connect, reach the platform's default privilege, and disable paging.
    pub async fn open(
        ssh_config: SshConfig,
        platform: PlatformDefinition,
        enable_secret: Option<&SecretString>,
    ) -> Result<Self> {
        let timeout = ssh_config.timeout;
        let transport = SshTransport::connect(ssh_config).await?;
        let channel = transport.open_channel().await?;

        let mut session = Self {
            prompt_pattern: platform.prompt_pattern(),
            prompt_or_input: platform.prompt_or_input_pattern(),
            platform,
            transport: Some(transport),
            channel: Some(PtyChannel::new(channel, DEFAULT_SEARCH_DEPTH)),
            timeout,
            current_privilege: None,
        };

        if let Err(e) = session.prepare(enable_secret).await {
            session.disconnect().await;
            return Err(e);
        }
        Ok(session)
    }

    async fn prepare(&mut self, enable_secret: Option<&SecretString>) -> Result<()> {
        let prompt_or_input = self.prompt_or_input.clone();
        let prompt_pattern = self.prompt_pattern.clone();

        let (output, prompt, awaiting) = self.read(&prompt_or_input, self.timeout).await?;
        if awaiting {
            // Login banner waiting for a keypress
            debug!("{}: dismissing banner", self.platform.name);
            self.channel()?.send_line("").await?;
            let (_, prompt, _) = self.read(&prompt_pattern, self.timeout).await?;
            self.track_privilege(&prompt);
        } else {
            debug!("{}: initial output {} bytes", self.platform.name, output.len());
            self.track_privilege(&prompt);
        }

        self.escalate(enable_secret).await?;

        for command in self.platform.on_open_commands.clone() {
            self.query(&command, 1).await?;
        }
        Ok(())
    }

    /// Climb from the current privilege to the platform default.
    async fn escalate(&mut self, enable_secret: Option<&SecretString>) -> Result<()> {
        let target = self.platform.default_privilege.clone();
        let prompt_pattern = self.prompt_pattern.clone();
        let current = self
            .current_privilege
            .clone()
            .ok_or_else(|| DriverError::PrivilegeAcquisitionFailed { target: target.clone() })?;

        let path: Vec<_> = self
            .platform
            .escalation_path(&current, &target)
            .ok_or_else(|| DriverError::PrivilegeAcquisitionFailed { target: target.clone() })?
            .into_iter()
            .cloned()
            .collect();

        for level in path {
            let command = level
                .escalate_command
                .clone()
                .ok_or_else(|| DriverError::PrivilegeAcquisitionFailed {
                    target: level.name.clone(),
                })?;
            debug!("{}: escalating to {} with '{}'", self.platform.name, level.name, command);
            self.channel()?.send_line(&command).await?;

            let mut prompt = match level.escalate_prompt {
                Some(ref auth_prompt) => {
                    let either = Regex::new(&format!(
                        "(?:{})|(?:{})",
                        auth_prompt.as_str(),
                        prompt_pattern.as_str()
                    ))
                    .map_err(|e| DriverError::PrivilegeAcquisitionFailed {
                        target: format!("{} ({e})", level.name),
                    })?;
                    let (_, prompt, _) = self.read(&either, self.timeout).await?;
                    prompt
                }
                None => self.read(&prompt_pattern, self.timeout).await?.1,
            };

            if level
                .escalate_prompt
                .as_ref()
                .is_some_and(|auth| auth.is_match(prompt.as_bytes()))
            {
                let secret = enable_secret.ok_or_else(|| DriverError::MissingEnableSecret {
                    target: level.name.clone(),
                })?;
                self.channel()?.send_line(secret.expose_secret()).await?;
                prompt = self.read(&prompt_pattern, self.timeout).await?.1;
            }

            self.track_privilege(&prompt);
            if self.current_privilege.as_deref() != Some(level.name.as_str()) {
                return Err(DriverError::PrivilegeAcquisitionFailed { target: level.name }.into());
            }
        }
        Ok(())
    }

    fn channel(&mut self) -> Result<&mut PtyChannel> {
        self.channel.as_mut().ok_or_else(|| DriverError::NotConnected.into())
    }

    /// Read until `pattern`, returning (output, matched prompt, ended on input request).
    async fn read(&mut self, pattern: &Regex, timeout: Duration) -> Result<(String, String, bool)> {
        let (data, start) = self.channel()?.read_until(pattern, timeout).await?;
        let read = split_read(&self.platform, &data, start);
        Ok((read.output, read.prompt, read.awaiting_input))
    }

    fn track_privilege(&mut self, prompt: &str) {
        if let Some(level) = self.platform.privilege_for_prompt(prompt) {
            self.current_privilege = Some(level.name.clone());
        }
    }

    /// Send, read, normalize and check one exchange.
    async fn exchange(&mut self, line: &str, display: &str, pattern: &Regex, timeout: Duration) -> Result<Response> {
        let start = Instant::now();
        self.channel()?.send_line(line).await?;
        let (raw, prompt, awaiting) = self.read(pattern, timeout).await?;
        if !awaiting {
            self.track_privilege(&prompt);
        }

        let result = interpret_output(&self.platform, &raw, line, display)?;
        Ok(Response::new(display, result, prompt, start.elapsed()).with_awaiting_input(awaiting))
    }
}

impl DeviceSession for SshSession {
    async fn submit_line(&mut self, line: &str, is_secret: bool) -> Result<Response> {
        let display = if is_secret { MASK } else { line };
        debug!("{}: submit '{}'", self.platform.name, display);
        let pattern = self.prompt_or_input.clone();
        self.exchange(line, display, &pattern, self.timeout).await
    }

    async fn submit_and_await_confirmation(&mut self, line: &str, confirm_token: &str) -> Result<Response> {
        debug!("{}: submit '{}' (confirm with '{}')", self.platform.name, line, confirm_token);
        let pattern = self.prompt_or_input.clone();
        let first = self.exchange(line, line, &pattern, self.timeout).await?;
        let Some(reply) = confirmation_reply(&first, confirm_token) else {
            return Ok(first);
        };

        let answer = self.exchange(reply, reply, &pattern, self.timeout).await?;
        let mut result = first.result;
        if !answer.result.is_empty() {
            result.push('\n');
            result.push_str(&answer.result);
        }
        Ok(Response::new(line, result, answer.prompt, first.elapsed + answer.elapsed)
            .with_awaiting_input(answer.awaiting_input))
    }

    async fn query(&mut self, command: &str, read_timeout_factor: u32) -> Result<Response> {
        debug!("{}: query '{}'", self.platform.name, command);
        let pattern = self.prompt_pattern.clone();
        let timeout = self.timeout.saturating_mul(read_timeout_factor.max(1));
        self.exchange(command, command, &pattern, timeout).await
    }

    async fn disconnect(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                warn!("{}: error while closing session: {}", self.platform.name, e);
            }
        }
    }

    fn is_alive(&self) -> bool {
        match (&self.transport, &self.channel) {
            (Some(transport), Some(channel)) => !transport.is_closed() && channel.is_open(),
            _ => false,
        }
    }
}

/// One read split at the prompt or input request that ended it.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ReadOutput {
    pub output: String,
    pub prompt: String,
    pub awaiting_input: bool,
}

/// Split `data` at `start`, the offset where the ending match begins.
pub(crate) fn split_read(platform: &PlatformDefinition, data: &[u8], start: usize) -> ReadOutput {
    ReadOutput {
        output: String::from_utf8_lossy(&data[..start]).to_string(),
        prompt: String::from_utf8_lossy(&data[start..]).trim().to_string(),
        awaiting_input: platform.input_request.is_match(&data[start..]),
    }
}

/// Clean up the output of `line`, showing it as `display`.
///
/// A vendor failure marker in the output is an error.
pub(crate) fn interpret_output(
    platform: &PlatformDefinition,
    raw: &str,
    line: &str,
    display: &str,
) -> std::result::Result<String, DriverError> {
    let mut result = normalize_output(raw, line);
    if display != line && !line.is_empty() {
        result = result.replace(line, display);
    }

    if let Some(marker) = platform.detect_failure(&result) {
        return Err(DriverError::CommandFailed {
            command: display.to_string(),
            message: marker.to_string(),
        });
    }
    Ok(result)
}

/// The answer to send after the first read of a line that may ask a question.
///
/// Only a read that ended on an input request gets one.
pub(crate) fn confirmation_reply<'a>(first: &Response, token: &'a str) -> Option<&'a str> {
    first.awaiting_input.then_some(token)
}

/// Strip the command echo and surrounding blank lines from raw output.
///
/// `raw` is everything read before the prompt.
pub(crate) fn normalize_output(raw: &str, command: &str) -> String {
    let raw = raw.replace("\r\n", "\n").replace('\r', "");
    let body = match raw.split_once('\n') {
        Some((first, rest)) if !command.is_empty() && first.trim_end().ends_with(command) => rest,
        Some((first, rest)) if command.is_empty() && first.trim().is_empty() => rest,
        None if raw.trim_end().ends_with(command) => "",
        _ => raw.as_str(),
    };
    body.trim_matches('\n').trim_end().to_string()
}
