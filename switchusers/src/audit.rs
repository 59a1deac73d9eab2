//! Per-device audit records.
//!
//! Every device attempt, successful or not, gets one plain-text file:
//!
//! ```text
//! <log_root>/user_<operation>/<hostname>_<address>_<operation>.log
//! ```
//!
//! Write failures come back as [`AuditError`] for the caller to report as a
//! warning. They never change the device's outcome.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AuditError;
use crate::inventory::DeviceRecord;
use crate::plan::{MASK, Operation};
use crate::session::SessionOutcome;

/// Where audit records are stored.
pub trait AuditStore: Send + Sync {
    /// Create `path` and its parents if missing.
    fn ensure_directory(&self, path: &Path) -> Result<(), AuditError>;

    /// Create or overwrite the file at `path`.
    fn write_file(&self, path: &Path, content: &str) -> Result<(), AuditError>;
}

/// Store backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsAuditStore;

impl AuditStore for FsAuditStore {
    fn ensure_directory(&self, path: &Path) -> Result<(), AuditError> {
        fs::create_dir_all(path).map_err(|source| AuditError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), AuditError> {
        fs::write(path, content).map_err(|source| AuditError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Replace every occurrence of each secret with the mask.
pub fn scrub<'a>(text: &str, secrets: impl IntoIterator<Item = &'a str>) -> String {
    let mut secrets: Vec<&str> = secrets.into_iter().filter(|s| !s.is_empty()).collect();
    // Longest first, so a secret containing another is masked whole
    secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));

    let mut scrubbed = text.to_string();
    for secret in secrets {
        scrubbed = scrubbed.replace(secret, MASK);
    }
    scrubbed
}

/// Make a value safe to use as part of a file name.
fn file_component(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == ':' || c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Render the record for one outcome. Secrets are not scrubbed here.
pub fn render_record(outcome: &SessionOutcome, operation: Operation, target_username: &str) -> String {
    let mut record = String::new();
    let _ = writeln!(record, "Operation: {}", operation);
    let _ = writeln!(record, "Device: {}", outcome.device);
    let _ = writeln!(record, "Device Type: {}", outcome.device.vendor_tag);
    let _ = writeln!(record, "Timestamp: {}", outcome.timestamp.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(record, "User: {}", target_username);
    if let Some(version) = &outcome.detected_version {
        let _ = writeln!(record, "OS Version: {}", version);
    }
    let _ = writeln!(record, "Status: {}", outcome.status);

    record.push_str("\n--- Commands ---\n");
    for line in &outcome.transcript {
        let _ = writeln!(record, "{}", line);
    }

    match (&outcome.verification_text, &outcome.error_detail) {
        (Some(text), _) => {
            record.push_str("\n--- Verification Output ---\n");
            record.push_str(text);
            record.push('\n');
        }
        (None, Some(detail)) => {
            record.push_str("\n--- Error ---\n");
            record.push_str(detail);
            record.push('\n');
        }
        (None, None) => {}
    }
    record
}

/// Writes audit records for one operation.
#[derive(Debug, Clone)]
pub struct AuditLogger<S = FsAuditStore> {
    root: PathBuf,
    operation: Operation,
    store: S,
}

impl AuditLogger<FsAuditStore> {
    pub fn new(root: impl Into<PathBuf>, operation: Operation) -> Self {
        Self::with_store(root, operation, FsAuditStore)
    }
}

impl<S: AuditStore> AuditLogger<S> {
    pub fn with_store(root: impl Into<PathBuf>, operation: Operation, store: S) -> Self {
        Self {
            root: root.into(),
            operation,
            store,
        }
    }

    /// `<root>/user_<operation>`
    pub fn operation_dir(&self) -> PathBuf {
        self.root.join(format!("user_{}", self.operation))
    }

    /// Path of a device's record.
    pub fn record_path(&self, device: &DeviceRecord) -> PathBuf {
        self.operation_dir().join(format!(
            "{}_{}_{}.log",
            file_component(&device.hostname),
            file_component(&device.address),
            self.operation
        ))
    }

    /// Create the operation directory.
    pub fn prepare(&self) -> Result<PathBuf, AuditError> {
        let dir = self.operation_dir();
        self.store.ensure_directory(&dir)?;
        Ok(dir)
    }

    /// Render, scrub and write the record for `outcome`.
    pub fn record<'a>(
        &self,
        outcome: &SessionOutcome,
        target_username: &str,
        secrets: impl IntoIterator<Item = &'a str>,
    ) -> Result<PathBuf, AuditError> {
        let content = scrub(&render_record(outcome, self.operation, target_username), secrets);
        let path = self.record_path(&outcome.device);
        self.store.ensure_directory(&self.operation_dir())?;
        self.store.write_file(&path, &content)?;
        Ok(path)
    }
}
