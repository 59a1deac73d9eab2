//! Platform definitions for multi-vendor support.
//!
//! Each supported switch family gets a [`PlatformDefinition`] describing its
//! prompts, privilege levels, failure markers and paging setup. [`VendorId`]
//! is the closed set of families the rest of the crate dispatches on.

mod definition;
mod privilege_level;
pub mod vendors;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

pub use definition::{DEFAULT_INPUT_REQUEST, PlatformDefinition};
pub use privilege_level::PrivilegeLevel;

use crate::error::PlatformError;

/// Switch family. Selects the platform definition, command templates and
/// verification query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum VendorId {
    /// Cisco IOS / IOS-XE.
    #[value(name = "cisco_ios", alias = "cisco")]
    #[serde(alias = "cisco")]
    CiscoIos,

    /// Brocade / Ruckus FastIron (ICX, FCX).
    #[value(name = "brocade_fastiron", alias = "brocade")]
    #[serde(alias = "brocade")]
    BrocadeFastIron,

    /// H3C / HPE Comware.
    #[value(name = "hp_comware", alias = "h3c")]
    #[serde(alias = "h3c")]
    H3cComware,

    /// HP ProCurve / ArubaOS-Switch.
    #[value(name = "hp_procurve", alias = "procurve")]
    #[serde(alias = "procurve")]
    HpProcurve,
}

impl VendorId {
    /// All supported vendors.
    pub const ALL: [VendorId; 4] = [
        VendorId::CiscoIos,
        VendorId::BrocadeFastIron,
        VendorId::H3cComware,
        VendorId::HpProcurve,
    ];

    /// Transport identifier, also the platform name.
    pub fn name(self) -> &'static str {
        match self {
            VendorId::CiscoIos => vendors::cisco_ios::PLATFORM_NAME,
            VendorId::BrocadeFastIron => vendors::brocade_fastiron::PLATFORM_NAME,
            VendorId::H3cComware => vendors::hp_comware::PLATFORM_NAME,
            VendorId::HpProcurve => vendors::hp_procurve::PLATFORM_NAME,
        }
    }

    /// Build the platform definition for this vendor.
    pub fn platform(self) -> PlatformDefinition {
        match self {
            VendorId::CiscoIos => vendors::cisco_ios::platform(),
            VendorId::BrocadeFastIron => vendors::brocade_fastiron::platform(),
            VendorId::H3cComware => vendors::hp_comware::platform(),
            VendorId::HpProcurve => vendors::hp_procurve::platform(),
        }
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VendorId {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cisco_ios" | "cisco" => Ok(VendorId::CiscoIos),
            "brocade_fastiron" | "brocade" => Ok(VendorId::BrocadeFastIron),
            "hp_comware" | "h3c" => Ok(VendorId::H3cComware),
            "hp_procurve" | "procurve" => Ok(VendorId::HpProcurve),
            _ => Err(PlatformError::UnknownVendor { name: s.to_string() }),
        }
    }
}
