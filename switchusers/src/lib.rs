//! # Switchusers
//!
//! Creates or removes a local user account on every switch of one vendor in
//! an inventory, over interactive SSH CLI sessions.
//!
//! Supported families: Cisco IOS, Brocade FastIron, H3C Comware and HP
//! ProCurve.
//!
//! For each device the [`SessionDriver`] connects, submits the vendor's
//! command plan, reads the account back for the record, saves the
//! configuration and disconnects. The [`BatchRunner`] runs devices one at a
//! time, so a device that fails never stops the rest, and writes one audit
//! file per device.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use secrecy::SecretString;
//! use switchusers::{
//!     AuditLogger, BatchRunner, Credentials, InventoryTable, Operation, SessionDriver, SshConnector,
//!     VendorId, VendorPredicate, VendorProfile,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), switchusers::Error> {
//!     let table = InventoryTable::from_json_str(&std::fs::read_to_string("inventory.json").unwrap())?;
//!     let credentials = Credentials::for_delete("netops", SecretString::from("op-pass"), "temp1");
//!
//!     let connector = SshConnector::new();
//!     let driver = SessionDriver::new(
//!         &connector,
//!         VendorProfile::new(VendorId::H3cComware),
//!         Operation::Delete,
//!         &credentials,
//!         Duration::from_secs(30),
//!     );
//!     let audit = AuditLogger::new("user_logs", Operation::Delete);
//!
//!     let report = BatchRunner::new(driver, &audit)
//!         .run_inventory(&table, &VendorPredicate::for_vendor(VendorId::H3cComware), |_| {})
//!         .await?;
//!     println!("{}", report.summary);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod inventory;
pub mod plan;
pub mod platform;
pub mod runner;
pub mod session;
pub mod transport;
pub mod verify;

#[cfg(test)]
mod fakes;

pub use audit::{AuditLogger, AuditStore, FsAuditStore};
pub use config::Settings;
pub use driver::{ConnectTarget, Connector, DeviceSession, Response, SshConnector, SshSession};
pub use error::{Error, Result};
pub use inventory::{DeviceRecord, InventoryTable, VendorPredicate, filter_devices};
pub use plan::{CommandPlan, Credentials, Operation, PlanStep, VariantTag, VendorProfile, build_plan};
pub use platform::{PlatformDefinition, PrivilegeLevel, VendorId};
pub use runner::{BatchReport, BatchRunner, Progress, Summary};
pub use session::{OutcomeStatus, SessionDriver, SessionOutcome, SessionState};
pub use transport::{HostKeyVerification, SshConfig};
