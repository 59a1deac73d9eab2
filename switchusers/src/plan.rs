//! Command plans: the exact CLI lines submitted to a device.
//!
//! [`build_plan`] is a pure function of vendor profile, firmware variant,
//! operation and credentials. Nothing here touches a session, so every
//! vendor quirk can be checked without a device.
//!
//! A plan has two parts. `steps` mutate the account and run before
//! verification; `persist` is the vendor's save sequence and runs after it.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::DriverError;
use crate::platform::VendorId;

/// Replacement text for secrets in anything that gets logged or written.
pub const MASK: &str = "********";

/// What to do with the target account. Fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Delete,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operator login and the account being managed. Held in memory only.
#[derive(Debug)]
pub struct Credentials {
    /// Login used to reach the devices.
    pub operator_username: String,

    /// Login password; also used as the enable secret.
    pub operator_password: SecretString,

    /// Account being created or deleted.
    pub target_username: String,

    /// Password for the account. Only present for create.
    pub target_password: Option<SecretString>,
}

impl Credentials {
    /// Credentials for a create run.
    pub fn for_create(
        operator_username: impl Into<String>,
        operator_password: SecretString,
        target_username: impl Into<String>,
        target_password: SecretString,
    ) -> Self {
        Self {
            operator_username: operator_username.into(),
            operator_password,
            target_username: target_username.into(),
            target_password: Some(target_password),
        }
    }

    /// Credentials for a delete run.
    pub fn for_delete(
        operator_username: impl Into<String>,
        operator_password: SecretString,
        target_username: impl Into<String>,
    ) -> Self {
        Self {
            operator_username: operator_username.into(),
            operator_password,
            target_username: target_username.into(),
            target_password: None,
        }
    }

    /// Every secret value, for scrubbing text before it is persisted.
    pub fn secrets(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.operator_password.expose_secret())
            .chain(self.target_password.as_ref().map(|p| p.expose_secret()))
            .filter(|secret| !secret.is_empty())
    }
}

/// Command template family within a vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantTag {
    /// The vendor has a single template.
    Standard,

    /// FastIron 07.2.x: password goes on its own line after a sub-prompt.
    BrocadeInteractivePassword,

    /// FastIron 07.3.x and later: password inline with the username.
    BrocadeInlinePassword,
}

/// Firmware string used when the version could not be read.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Vendor plus the rules for picking a template variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorProfile {
    pub vendor: VendorId,
}

impl VendorProfile {
    pub fn new(vendor: VendorId) -> Self {
        Self { vendor }
    }

    /// Read-only query that reports the firmware, with its read timeout factor.
    ///
    /// Only FastIron needs it, and only when creating: the delete command
    /// is the same on every firmware.
    pub fn version_query(&self, operation: Operation) -> Option<(&'static str, u32)> {
        match (self.vendor, operation) {
            (VendorId::BrocadeFastIron, Operation::Create) => Some(("show version", 2)),
            _ => None,
        }
    }

    /// Pull the firmware string out of `show version` output.
    ///
    /// FastIron prints e.g. `  SW: Version 08.0.30tT7f3 Copyright (c) ...`;
    /// the token after `Version` is the firmware.
    pub fn parse_version(&self, output: &str) -> Option<String> {
        output
            .lines()
            .find(|line| line.contains("SW:"))
            .and_then(|line| line.rsplit("SW:").next())
            .and_then(|rest| rest.split_whitespace().nth(1))
            .map(str::to_string)
    }

    /// Resolve the template variant from a reported firmware string.
    pub fn variant(&self, raw_version: Option<&str>) -> VariantTag {
        match self.vendor {
            VendorId::BrocadeFastIron => match raw_version {
                Some(version) if version.trim().starts_with("07.2") => {
                    VariantTag::BrocadeInteractivePassword
                }
                _ => VariantTag::BrocadeInlinePassword,
            },
            _ => VariantTag::Standard,
        }
    }
}

/// Keystroke answering a device question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Answer `y`.
    Yes,
    /// Press Enter to accept the default.
    Enter,
}

impl Confirmation {
    pub fn token(self) -> &'static str {
        match self {
            Confirmation::Yes => "y",
            Confirmation::Enter => "",
        }
    }
}

/// One submitted line.
#[derive(Clone, PartialEq, Eq)]
pub struct PlanStep {
    /// Text sent to the device.
    pub line: String,

    /// Text safe to log in place of `line`.
    pub display: String,

    /// Whether `line` contains a secret.
    pub is_secret: bool,

    /// Answer to send when the device asks a question after this line.
    pub confirmation: Option<Confirmation>,
}

impl PlanStep {
    /// A plain line.
    pub fn line(line: impl Into<String>) -> Self {
        let line = line.into();
        Self {
            display: line.clone(),
            line,
            is_secret: false,
            confirmation: None,
        }
    }

    /// A line carrying a secret, logged as `display`.
    pub fn secret(line: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            display: display.into(),
            is_secret: true,
            confirmation: None,
        }
    }

    /// Expect a question after this line and answer it.
    pub fn confirm(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = Some(confirmation);
        self
    }
}

impl fmt::Debug for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanStep")
            .field("line", &self.display)
            .field("is_secret", &self.is_secret)
            .field("confirmation", &self.confirmation)
            .finish()
    }
}

/// Ordered lines for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    /// Account mutation, submitted before verification.
    pub steps: Vec<PlanStep>,

    /// Save sequence, submitted after verification.
    pub persist: Vec<PlanStep>,
}

impl CommandPlan {
    /// All steps in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter().chain(self.persist.iter())
    }

    /// Loggable form of every line.
    pub fn display_lines(&self) -> Vec<&str> {
        self.iter().map(|step| step.display.as_str()).collect()
    }
}

/// Build the command plan for one device.
///
/// Fails only when a create is requested without a target password.
pub fn build_plan(
    profile: &VendorProfile,
    variant: VariantTag,
    operation: Operation,
    credentials: &Credentials,
) -> Result<CommandPlan, DriverError> {
    let user = credentials.target_username.as_str();

    let steps = match operation {
        Operation::Create => {
            let password = credentials
                .target_password
                .as_ref()
                .ok_or_else(|| DriverError::MissingTargetPassword {
                    user: user.to_string(),
                })?
                .expose_secret();
            match profile.vendor {
                VendorId::CiscoIos => cisco_create(user, password),
                VendorId::BrocadeFastIron => brocade_create(user, password, variant),
                VendorId::H3cComware => comware_create(user, password),
                VendorId::HpProcurve => procurve_create(user, password),
            }
        }
        Operation::Delete => match profile.vendor {
            VendorId::CiscoIos => cisco_delete(user),
            VendorId::BrocadeFastIron => brocade_delete(user),
            VendorId::H3cComware => comware_delete(user),
            VendorId::HpProcurve => procurve_delete(user),
        },
    };

    Ok(CommandPlan {
        steps,
        persist: save_sequence(profile.vendor),
    })
}

/// Vendor save sequence.
pub fn save_sequence(vendor: VendorId) -> Vec<PlanStep> {
    match vendor {
        VendorId::CiscoIos => vec![PlanStep::line("write memory")],
        // Some FastIron releases ask before overwriting the startup config
        VendorId::BrocadeFastIron => vec![PlanStep::line("write memory").confirm(Confirmation::Yes)],
        // "Are you sure? [Y/N]", then the file name question (Enter keeps
        // the current one), then "overwrite? [Y/N]"
        VendorId::H3cComware | VendorId::HpProcurve => vec![
            PlanStep::line("save").confirm(Confirmation::Yes),
            PlanStep::line("").confirm(Confirmation::Yes),
        ],
    }
}

fn cisco_create(user: &str, password: &str) -> Vec<PlanStep> {
    vec![
        PlanStep::line("configure terminal"),
        PlanStep::secret(
            format!("username {user} privilege 15 secret {password}"),
            format!("username {user} privilege 15 secret {MASK}"),
        ),
        PlanStep::line("end"),
    ]
}

fn cisco_delete(user: &str) -> Vec<PlanStep> {
    vec![
        PlanStep::line("configure terminal"),
        PlanStep::line(format!("no username {user}")).confirm(Confirmation::Enter),
        PlanStep::line("end"),
    ]
}

fn brocade_create(user: &str, password: &str, variant: VariantTag) -> Vec<PlanStep> {
    let mut steps = vec![PlanStep::line("configure terminal")];
    if variant == VariantTag::BrocadeInteractivePassword {
        steps.push(PlanStep::line(format!("username {user} privilege 0 password")));
        steps.push(PlanStep::secret(password, MASK));
    } else {
        steps.push(PlanStep::secret(
            format!("username {user} privilege 0 password {password}"),
            format!("username {user} privilege 0 password {MASK}"),
        ));
    }
    steps.push(PlanStep::line("end"));
    steps
}

fn brocade_delete(user: &str) -> Vec<PlanStep> {
    vec![
        PlanStep::line("configure terminal"),
        PlanStep::line(format!("no username {user}")),
        PlanStep::line("end"),
    ]
}

fn comware_create(user: &str, password: &str) -> Vec<PlanStep> {
    vec![
        PlanStep::line("system-view"),
        PlanStep::line(format!("local-user {user} class manage")),
        PlanStep::secret(format!("password simple {password}"), format!("password simple {MASK}")),
        PlanStep::line("authorization-attribute user-role level-3"),
        PlanStep::line("service-type ssh terminal"),
        PlanStep::line("service-type ftp"),
    ]
}

fn comware_delete(user: &str) -> Vec<PlanStep> {
    vec![
        PlanStep::line("system-view"),
        PlanStep::line(format!("undo local-user {user}")),
    ]
}

fn procurve_create(user: &str, password: &str) -> Vec<PlanStep> {
    let mut steps = vec![PlanStep::line(""), PlanStep::line("configure")];
    for role in ["operator", "manager"] {
        steps.push(PlanStep::secret(
            format!("password {role} user-name {user} plaintext {password}"),
            format!("password {role} user-name {user} plaintext {MASK}"),
        ));
    }
    steps
}

fn procurve_delete(user: &str) -> Vec<PlanStep> {
    let mut steps = vec![PlanStep::line(""), PlanStep::line("configure")];
    for role in ["operator", "manager"] {
        steps.push(PlanStep::line(format!("no password {role} user-name {user}")).confirm(Confirmation::Yes));
    }
    steps
}
