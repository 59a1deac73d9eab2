//! Batch runner: one outcome and one audit record per device.

use std::fmt;
use std::path::PathBuf;

use log::{info, warn};

use crate::audit::{AuditLogger, AuditStore};
use crate::driver::Connector;
use crate::error::{AuditError, Result};
use crate::inventory::{DeviceRecord, InventoryTable, VendorPredicate, filter_devices};
use crate::session::{OutcomeStatus, SessionDriver, SessionOutcome};

/// Outcome counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub success: usize,
    pub connect_error: usize,
    pub command_error: usize,
    pub verify_error: usize,
}

impl Summary {
    pub fn record(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Success => self.success += 1,
            OutcomeStatus::ConnectError => self.connect_error += 1,
            OutcomeStatus::CommandError => self.command_error += 1,
            OutcomeStatus::VerifyError => self.verify_error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failed()
    }

    pub fn failed(&self) -> usize {
        self.connect_error + self.command_error + self.verify_error
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed: {} success, {} connect error, {} command error, {} verify error",
            self.total(),
            self.success,
            self.connect_error,
            self.command_error,
            self.verify_error
        )
    }
}

/// An audit record that could not be written.
#[derive(Debug)]
pub struct LogWarning {
    /// None when the operation directory itself failed.
    pub device: Option<DeviceRecord>,
    pub error: AuditError,
}

impl fmt::Display for LogWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.device {
            Some(device) => write!(f, "{}: {}", device, self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<SessionOutcome>,
    pub summary: Summary,
    pub log_warnings: Vec<LogWarning>,
    pub log_files: Vec<PathBuf>,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Progress notifications, in order, for display.
#[derive(Debug)]
pub enum Progress<'a> {
    Started {
        index: usize,
        total: usize,
        device: &'a DeviceRecord,
    },
    Finished {
        index: usize,
        total: usize,
        outcome: &'a SessionOutcome,
    },
}

/// Runs the session driver over a device list, strictly one device at a time.
pub struct BatchRunner<'a, C, S> {
    driver: SessionDriver<'a, C>,
    audit: &'a AuditLogger<S>,
}

impl<'a, C: Connector, S: AuditStore> BatchRunner<'a, C, S> {
    pub fn new(driver: SessionDriver<'a, C>, audit: &'a AuditLogger<S>) -> Self {
        Self { driver, audit }
    }

    /// Filter the inventory and run every matching device.
    ///
    /// Only an unusable inventory is an error. No matching rows is an
    /// empty report.
    pub async fn run_inventory<F>(
        &self,
        table: &InventoryTable,
        predicate: &VendorPredicate,
        on_progress: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(Progress<'_>),
    {
        let devices = filter_devices(table, predicate)?;
        info!("{} of {} inventory rows match {:?}", devices.len(), table.len(), predicate);
        Ok(self.run(&devices, on_progress).await)
    }

    /// Run every device and record its outcome.
    pub async fn run<F>(&self, devices: &[DeviceRecord], mut on_progress: F) -> BatchReport
    where
        F: FnMut(Progress<'_>),
    {
        let mut report = BatchReport::default();

        if let Err(error) = self.audit.prepare() {
            warn!("{}", error);
            report.log_warnings.push(LogWarning { device: None, error });
        }
        if devices.is_empty() {
            info!("no devices to process");
            return report;
        }

        let total = devices.len();
        let credentials = self.driver.credentials();
        for (index, device) in devices.iter().enumerate() {
            on_progress(Progress::Started { index, total, device });

            let outcome = self.driver.run(device).await;
            info!("{}: {}", device, outcome.status);

            match self
                .audit
                .record(&outcome, &credentials.target_username, credentials.secrets())
            {
                Ok(path) => report.log_files.push(path),
                Err(error) => {
                    warn!("{}: {}", device, error);
                    report.log_warnings.push(LogWarning {
                        device: Some(device.clone()),
                        error,
                    });
                }
            }

            report.summary.record(outcome.status);
            on_progress(Progress::Finished {
                index,
                total,
                outcome: &outcome,
            });
            report.outcomes.push(outcome);
        }

        report
    }
}
