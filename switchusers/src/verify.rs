//! Post-change verification queries.
//!
//! The output is captured verbatim for the audit record and never
//! interpreted here.

use crate::driver::DeviceSession;
use crate::error::Result;
use crate::plan::Operation;
use crate::platform::VendorId;

/// A read-only command and how much longer than usual it may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationQuery {
    pub command: &'static str,
    pub read_timeout_factor: u32,
}

/// The query showing the device's local accounts after the change.
pub fn verification_query(vendor: VendorId, operation: Operation) -> VerificationQuery {
    let (command, read_timeout_factor) = match (vendor, operation) {
        (VendorId::CiscoIos, _) => ("show running-config | include username", 1),
        (VendorId::BrocadeFastIron, _) => ("show running-config | include username", 3),
        (VendorId::H3cComware, Operation::Create) => {
            ("display current-configuration | section local-user", 2)
        }
        (VendorId::H3cComware, Operation::Delete) => {
            ("display current-configuration | include local-user", 2)
        }
        (VendorId::HpProcurve, _) => ("show running-config | include user-name", 4),
    };
    VerificationQuery {
        command,
        read_timeout_factor,
    }
}

/// Run the verification query and return its raw text.
pub async fn read_verification<S: DeviceSession>(
    session: &mut S,
    vendor: VendorId,
    operation: Operation,
) -> Result<String> {
    let query = verification_query(vendor, operation);
    let response = session.query(query.command, query.read_timeout_factor).await?;
    Ok(response.result)
}
