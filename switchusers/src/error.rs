//! Error types for switchusers.
//!
//! Errors are layered the same way the session stack is: transport, channel,
//! driver and platform errors come from talking to a device, while
//! [`ConfigurationError`] and [`AuditError`] come from the run around it.
//! Only a `ConfigurationError` is fatal for a batch; everything else is
//! absorbed into the affected device's outcome.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for switchusers operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Platform/vendor errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Inventory schema or run settings are unusable. Aborts the batch.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host is not in known_hosts and strict checking is on
    #[error("Host key for {host}:{port} is not known")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),
}

/// Driver layer errors (command execution, privilege escalation).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Session not connected
    #[error("Session not connected")]
    NotConnected,

    /// The device rejected a submitted line
    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Failed to acquire target privilege level
    #[error("Failed to acquire privilege level '{target}'")]
    PrivilegeAcquisitionFailed { target: String },

    /// Escalation needs a secret but none was supplied
    #[error("Privilege level '{target}' requires an enable secret")]
    MissingEnableSecret { target: String },

    /// A create was requested without a password for the new account
    #[error("No password supplied for new user '{user}'")]
    MissingTargetPassword { user: String },

    /// Device processing panicked and was unwound
    #[error("Device processing aborted: {message}")]
    Aborted { message: String },
}

/// Platform/vendor definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Vendor name does not match any built-in platform
    #[error("Unknown vendor: '{name}'")]
    UnknownVendor { name: String },
}

/// Fatal run configuration errors.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// The inventory has no column that can serve as the named field.
    #[error("Inventory has no recognizable {field} column")]
    MissingColumn { field: &'static str },

    /// The inventory document could not be parsed.
    #[error("Invalid inventory: {message}")]
    InvalidInventory { message: String },

    /// A settings file could not be read.
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A settings file could not be parsed.
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting has an unusable value.
    #[error("Invalid setting '{key}': {message}")]
    InvalidSetting { key: &'static str, message: String },
}

/// Audit log write failures. Never affect a device's operational outcome.
#[derive(Error, Debug)]
pub enum AuditError {
    /// The log directory could not be created.
    #[error("Failed to create log directory {path:?}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The log file could not be written.
    #[error("Failed to write log file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type alias using switchusers' Error.
pub type Result<T> = std::result::Result<T, Error>;
