//! Device inventory: loosely typed rows in, validated device records out.
//!
//! Column names are normalized (trimmed, lower-cased, spaces to `_`) and the
//! address, hostname and device-type columns are found by substring, the way
//! spreadsheet exports name them ("IP Address", "Mgmt IP", "Host Name",
//! "Device Type").

use std::fmt;

use indexmap::IndexMap;
use log::info;
use serde_json::Value;

use crate::error::{ConfigurationError, Result};
use crate::platform::VendorId;

/// One inventory row, keyed by normalized column name. Empty cells are absent.
pub type InventoryRow = IndexMap<String, String>;

/// A switch to work on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceRecord {
    pub hostname: String,
    pub address: String,

    /// Raw value of the device-type column.
    pub vendor_tag: String,

    /// Firmware version recorded in the inventory, if any.
    pub raw_version: Option<String>,
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.hostname, self.address)
    }
}

/// Normalize a column header.
pub fn normalize_column(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Rows as produced by the inventory source.
#[derive(Debug, Clone, Default)]
pub struct InventoryTable {
    columns: Vec<String>,
    rows: Vec<InventoryRow>,
}

impl InventoryTable {
    /// Build a table from raw rows, normalizing column names and dropping
    /// blank cells.
    pub fn from_rows<I, R, K, V>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut columns: Vec<String> = Vec::new();
        let rows = rows
            .into_iter()
            .map(|row| {
                let mut normalized = InventoryRow::new();
                for (key, value) in row {
                    let column = normalize_column(key.as_ref());
                    if !columns.contains(&column) {
                        columns.push(column.clone());
                    }
                    let value = value.as_ref().trim();
                    if !value.is_empty() {
                        normalized.insert(column, value.to_string());
                    }
                }
                normalized
            })
            .collect();
        Self { columns, rows }
    }

    /// Parse a JSON array of objects. Scalars are stringified; nulls are blank.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| ConfigurationError::InvalidInventory {
            message: e.to_string(),
        })?;
        let Value::Array(items) = value else {
            return Err(ConfigurationError::InvalidInventory {
                message: "expected a JSON array of rows".to_string(),
            }
            .into());
        };

        let mut rows = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let Value::Object(fields) = item else {
                return Err(ConfigurationError::InvalidInventory {
                    message: format!("row {index} is not an object"),
                }
                .into());
            };
            let row: Vec<(String, String)> = fields
                .into_iter()
                .map(|(key, value)| {
                    let text = match value {
                        Value::Null => String::new(),
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, text)
                })
                .collect();
            rows.push(row);
        }
        Ok(Self::from_rows(rows))
    }

    /// Normalized column names in first-seen order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[InventoryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Case-insensitive match on the device-type column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorPredicate {
    /// Device type equals the value.
    Equals(String),
    /// Device type contains the value.
    Contains(String),
}

impl VendorPredicate {
    /// Predicate selecting a vendor's rows in a typical inventory export.
    pub fn for_vendor(vendor: VendorId) -> Self {
        match vendor {
            VendorId::CiscoIos => VendorPredicate::Equals("cisco ios".to_string()),
            VendorId::BrocadeFastIron => VendorPredicate::Contains("brocade".to_string()),
            VendorId::H3cComware => VendorPredicate::Contains("h3c".to_string()),
            VendorId::HpProcurve => VendorPredicate::Contains("procurve".to_string()),
        }
    }

    pub fn matches(&self, device_type: &str) -> bool {
        let device_type = device_type.trim().to_lowercase();
        match self {
            VendorPredicate::Equals(value) => device_type == value.trim().to_lowercase(),
            VendorPredicate::Contains(value) => device_type.contains(&value.trim().to_lowercase()),
        }
    }
}

/// The columns the filter reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub address: String,
    pub hostname: String,
    pub device_type: String,
    pub version: Option<String>,
}

impl ColumnMap {
    /// Locate the required columns.
    ///
    /// Fails if no address, hostname or device-type column can be found.
    pub fn locate(columns: &[String]) -> Result<Self> {
        let address = find_column(columns, &["ip", "ip_address", "mgmt_ip", "address"], &["ip", "address"])
            .ok_or(ConfigurationError::MissingColumn { field: "IP address" })?;
        let hostname = find_column(columns, &["hostname", "host_name", "host"], &["host"])
            .ok_or(ConfigurationError::MissingColumn { field: "hostname" })?;
        let device_type = find_column(columns, &["device_type", "device", "type"], &["device", "type"])
            .ok_or(ConfigurationError::MissingColumn { field: "device type" })?;
        let version = find_column(columns, &["version", "os_version", "firmware"], &["version", "firmware"]);

        Ok(Self {
            address,
            hostname,
            device_type,
            version,
        })
    }
}

/// Exact names win; otherwise the first column containing any fragment.
fn find_column(columns: &[String], exact: &[&str], fragments: &[&str]) -> Option<String> {
    exact
        .iter()
        .find_map(|name| columns.iter().find(|c| c == name))
        .or_else(|| {
            columns
                .iter()
                .find(|c| fragments.iter().any(|fragment| c.contains(fragment)))
        })
        .cloned()
}

/// Select the rows matching `predicate` that have an address and hostname.
///
/// An empty result is not an error; it means there is nothing to do.
pub fn filter_devices(table: &InventoryTable, predicate: &VendorPredicate) -> Result<Vec<DeviceRecord>> {
    let columns = ColumnMap::locate(table.columns())?;

    let mut devices = Vec::new();
    for (index, row) in table.rows().iter().enumerate() {
        let Some(device_type) = row.get(&columns.device_type) else {
            continue;
        };
        if !predicate.matches(device_type) {
            continue;
        }

        let (Some(address), Some(hostname)) = (row.get(&columns.address), row.get(&columns.hostname)) else {
            info!("skipping inventory row {}: missing address or hostname", index + 1);
            continue;
        };

        devices.push(DeviceRecord {
            hostname: hostname.clone(),
            address: address.clone(),
            vendor_tag: device_type.clone(),
            raw_version: columns.version.as_ref().and_then(|c| row.get(c)).cloned(),
        });
    }
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn sample() -> InventoryTable {
        InventoryTable::from_json_str(
            r#"[
                {"Device Type": "Cisco IOS", "IP Address": "10.0.0.1", "Hostname": "access-sw1"},
                {"Device Type": "cisco ios", "IP Address": "10.0.0.2", "Hostname": null},
                {"Device Type": "Brocade ICX", "IP Address": "10.0.1.1", "Hostname": "icx-1", "OS Version": "07.2.06"},
                {"Device Type": "H3C Switch", "IP Address": "10.0.2.1", "Hostname": "h3c-1"},
                {"Device Type": "Cisco IOS", "IP Address": "", "Hostname": "access-sw3"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_normalize_column() {
        assert_eq!(normalize_column("  IP Address "), "ip_address");
        assert_eq!(normalize_column("Device  Type"), "device_type");
    }

    #[test]
    fn test_locate_columns() {
        let map = ColumnMap::locate(sample().columns()).unwrap();
        assert_eq!(map.address, "ip_address");
        assert_eq!(map.hostname, "hostname");
        assert_eq!(map.device_type, "device_type");
        assert_eq!(map.version.as_deref(), Some("os_version"));
    }

    #[test]
    fn test_exact_name_beats_fragment() {
        let columns: Vec<String> = ["description", "ip", "host", "type"].iter().map(|s| s.to_string()).collect();
        let map = ColumnMap::locate(&columns).unwrap();
        assert_eq!(map.address, "ip");
    }

    #[test]
    fn test_filter_drops_incomplete_rows() {
        let devices = filter_devices(&sample(), &VendorPredicate::for_vendor(VendorId::CiscoIos)).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].hostname, "access-sw1");
        assert_eq!(devices[0].address, "10.0.0.1");
    }

    #[test]
    fn test_filter_carries_version() {
        let devices = filter_devices(&sample(), &VendorPredicate::Contains("BROCADE".into())).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].raw_version.as_deref(), Some("07.2.06"));
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let devices = filter_devices(&sample(), &VendorPredicate::for_vendor(VendorId::HpProcurve)).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn test_missing_address_column_is_fatal() {
        let table = InventoryTable::from_rows(vec![vec![("Hostname", "sw1"), ("Device Type", "Cisco IOS")]]);
        let err = filter_devices(&table, &VendorPredicate::for_vendor(VendorId::CiscoIos)).unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::MissingColumn { field: "IP address" })
        ));
    }

    #[test]
    fn test_missing_hostname_column_is_fatal() {
        let table = InventoryTable::from_rows(vec![vec![("IP", "10.0.0.1"), ("Device Type", "Cisco IOS")]]);
        let err = filter_devices(&table, &VendorPredicate::for_vendor(VendorId::CiscoIos)).unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::MissingColumn { field: "hostname" })
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(InventoryTable::from_json_str("{\"not\": \"rows\"}").is_err());
        assert!(InventoryTable::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn test_numbers_are_stringified() {
        let table = InventoryTable::from_json_str(r#"[{"host": "sw1", "ip": "10.0.0.9", "type": "brocade", "version": 8}]"#)
            .unwrap();
        assert_eq!(table.rows()[0].get("version").map(String::as_str), Some("8"));
    }
}
