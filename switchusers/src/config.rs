//! Run settings: TOML file, then command-line overrides, then defaults.
//!
//! ```toml
//! vendor = "cisco_ios"
//! inventory = "inventory.json"
//! log_root = "user_logs"
//! port = 22
//! timeout_secs = 30
//! host_key_verification = "accept-new"
//!
//! [vendor_match]
//! contains = "catalyst"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigurationError, Result};
use crate::inventory::VendorPredicate;
use crate::platform::VendorId;
use crate::transport::HostKeyVerification;

/// Override for the inventory device-type match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorMatch {
    Equals(String),
    Contains(String),
}

impl From<VendorMatch> for VendorPredicate {
    fn from(value: VendorMatch) -> Self {
        match value {
            VendorMatch::Equals(v) => VendorPredicate::Equals(v),
            VendorMatch::Contains(v) => VendorPredicate::Contains(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub vendor: Option<VendorId>,
    pub inventory: Option<PathBuf>,
    pub log_root: PathBuf,
    pub port: u16,
    pub timeout_secs: u64,
    pub host_key_verification: HostKeyVerification,
    pub known_hosts: Option<PathBuf>,
    pub vendor_match: Option<VendorMatch>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vendor: None,
            inventory: None,
            log_root: PathBuf::from("user_logs"),
            port: 22,
            timeout_secs: 30,
            host_key_verification: HostKeyVerification::default(),
            known_hosts: None,
            vendor_match: None,
        }
    }
}

/// Longest per-read timeout accepted, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

impl Settings {
    /// Read settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text).map_err(ConfigurationError::from)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ConfigurationError::InvalidSetting {
                key: "timeout_secs",
                message: "must be greater than zero".to_string(),
            }
            .into());
        }
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigurationError::InvalidSetting {
                key: "timeout_secs",
                message: format!("must be at most {MAX_TIMEOUT_SECS}"),
            }
            .into());
        }
        if self.port == 0 {
            return Err(ConfigurationError::InvalidSetting {
                key: "port",
                message: "must be greater than zero".to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The vendor to run, which must be set by now.
    pub fn require_vendor(&self) -> Result<VendorId> {
        self.vendor.ok_or_else(|| {
            ConfigurationError::InvalidSetting {
                key: "vendor",
                message: "no vendor given".to_string(),
            }
            .into()
        })
    }

    /// The inventory file, which must be set by now.
    pub fn require_inventory(&self) -> Result<&Path> {
        self.inventory.as_deref().ok_or_else(|| {
            ConfigurationError::InvalidSetting {
                key: "inventory",
                message: "no inventory file given".to_string(),
            }
            .into()
        })
    }

    /// The configured match override, or the vendor's usual one.
    pub fn predicate(&self, vendor: VendorId) -> VendorPredicate {
        self.vendor_match
            .clone()
            .map(VendorPredicate::from)
            .unwrap_or_else(|| VendorPredicate::for_vendor(vendor))
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let settings = assert_ok!(Settings::from_toml_str(""));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, 22);
        assert_eq!(settings.timeout(), Duration::from_secs(30));
        assert_eq!(settings.log_root, PathBuf::from("user_logs"));
        assert_eq!(settings.host_key_verification, HostKeyVerification::AcceptNew);
    }

    #[test]
    fn test_full_file() {
        let settings = assert_ok!(Settings::from_toml_str(
            r#"
            vendor = "brocade"
            inventory = "fleet.json"
            log_root = "/var/log/switchusers"
            port = 2222
            timeout_secs = 10
            host_key_verification = "strict"

            [vendor_match]
            equals = "Brocade ICX 7250"
            "#,
        ));
        assert_eq!(settings.vendor, Some(VendorId::BrocadeFastIron));
        assert_eq!(settings.require_inventory().unwrap(), Path::new("fleet.json"));
        assert_eq!(settings.port, 2222);
        assert_eq!(settings.host_key_verification, HostKeyVerification::Strict);
        assert_eq!(
            settings.predicate(VendorId::BrocadeFastIron),
            VendorPredicate::Equals("Brocade ICX 7250".to_string())
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = assert_err!(Settings::from_toml_str("timeout_secs = 0"));
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::InvalidSetting { key: "timeout_secs", .. })
        ));
    }

    #[test]
    fn test_huge_timeout_rejected() {
        let err = assert_err!(Settings::from_toml_str("timeout_secs = 9223372036854775807"));
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::InvalidSetting { key: "timeout_secs", .. })
        ));
        assert_ok!(Settings::from_toml_str("timeout_secs = 3600"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert_err!(Settings::from_toml_str("retries = 3"));
    }

    #[test]
    fn test_default_predicate() {
        let settings = Settings::default();
        assert_eq!(
            settings.predicate(VendorId::H3cComware),
            VendorPredicate::Contains("h3c".to_string())
        );
        assert_err!(settings.require_vendor());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchusers.toml");
        fs::write(&path, "vendor = \"procurve\"\ntimeout_secs = 5\n").unwrap();

        let settings = assert_ok!(Settings::load(&path));
        assert_eq!(settings.vendor, Some(VendorId::HpProcurve));
        assert_eq!(settings.timeout(), Duration::from_secs(5));

        let missing = assert_err!(Settings::load(&dir.path().join("absent.toml")));
        assert!(matches!(missing, Error::Configuration(ConfigurationError::Read { .. })));
    }
}
