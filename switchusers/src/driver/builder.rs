//! SSH connector with builder-style settings.

use std::path::PathBuf;

use log::debug;
use secrecy::{ExposeSecret, SecretString};

use super::generic::SshSession;
use super::{ConnectTarget, Connector};
use crate::error::Result;
use crate::transport::{HostKeyVerification, SshConfig};

/// Opens [`SshSession`]s. Holds only settings shared by every device.
///
/// # Example
///
/// ```rust,no_run
/// use switchusers::driver::SshConnector;
/// use switchusers::transport::HostKeyVerification;
///
/// let connector = SshConnector::new()
///     .port(22)
///     .host_key_verification(HostKeyVerification::AcceptNew);
/// ```
#[derive(Debug, Clone)]
pub struct SshConnector {
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl SshConnector {
    /// Create a connector with default settings.
    pub fn new() -> Self {
        Self {
            port: 22,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a known_hosts file other than the user's own.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    fn ssh_config(&self, target: &ConnectTarget<'_>, terminal: (u32, u32)) -> SshConfig {
        SshConfig {
            host: target.address.to_string(),
            port: self.port,
            username: target.username.to_string(),
            password: SecretString::from(target.password.expose_secret().to_string()),
            timeout: target.timeout,
            terminal_width: terminal.0,
            terminal_height: terminal.1,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path.clone(),
        }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for SshConnector {
    type Session = SshSession;

    async fn connect(&self, target: ConnectTarget<'_>) -> Result<SshSession> {
        let platform = target.vendor.platform();
        let config = self.ssh_config(&target, (platform.terminal_width, platform.terminal_height));
        debug!("opening {} session to {}", platform.name, config.socket_addr());
        SshSession::open(config, platform, target.enable_secret).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::platform::VendorId;

    #[test]
    fn test_ssh_config_from_target() {
        let password = SecretString::from("op-pass");
        let target = ConnectTarget {
            vendor: VendorId::CiscoIos,
            address: "10.0.0.1",
            username: "netops",
            password: &password,
            enable_secret: Some(&password),
            timeout: Duration::from_secs(10),
        };
        let connector = SshConnector::new()
            .port(2222)
            .host_key_verification(HostKeyVerification::Disabled);

        let config = connector.ssh_config(&target, (512, 24));
        assert_eq!(config.socket_addr(), "10.0.0.1:2222");
        assert_eq!(config.username, "netops");
        assert_eq!(config.password.expose_secret(), "op-pass");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.host_key_verification, HostKeyVerification::Disabled);
        assert!(!format!("{config:?}").contains("op-pass"));
    }
}
