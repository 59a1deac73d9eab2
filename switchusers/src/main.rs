//! Command-line entry point.
//!
//! ```bash
//! switchusers --vendor h3c --inventory fleet.json --mode delete --user temp1
//! ```
//!
//! Anything not given on the command line or in the `--config` file is
//! asked for interactively. Passwords are read without echo.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use console::Term;
use log::debug;
use secrecy::SecretString;

use switchusers::config::VendorMatch;
use switchusers::error::ConfigurationError;
use switchusers::{
    AuditLogger, BatchRunner, Credentials, HostKeyVerification, InventoryTable, Operation, Progress,
    SessionDriver, Settings, SshConnector, VendorId, VendorProfile,
};

#[derive(Parser)]
#[command(name = "switchusers")]
#[command(about = "Create or delete a local user on every switch of one vendor.")]
#[command(version)]
struct Cli {
    /// Switch family to work on
    #[arg(long, value_enum)]
    vendor: Option<VendorId>,

    /// Inventory file (JSON array of rows)
    #[arg(long)]
    inventory: Option<PathBuf>,

    /// Settings file (TOML)
    #[arg(long, env = "SWITCHUSERS_CONFIG")]
    config: Option<PathBuf>,

    /// Create or delete; asked for when missing
    #[arg(long, value_enum)]
    mode: Option<Operation>,

    /// Account to create or delete; asked for when missing
    #[arg(long)]
    user: Option<String>,

    /// Device login; asked for when missing
    #[arg(long, env = "SWITCHUSERS_LOGIN")]
    login: Option<String>,

    /// Directory for per-device records
    #[arg(long)]
    log_root: Option<PathBuf>,

    /// SSH port
    #[arg(long)]
    port: Option<u16>,

    /// Per-read timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Host key checking
    #[arg(long, value_enum)]
    host_key: Option<HostKeyVerification>,

    /// known_hosts file to check and learn keys in
    #[arg(long)]
    known_hosts: Option<PathBuf>,

    /// Select rows whose device type contains this text instead of the vendor default
    #[arg(long = "match", value_name = "TEXT")]
    vendor_match: Option<String>,
}

impl Cli {
    /// File settings with command-line values on top.
    fn settings(&self) -> switchusers::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        if let Some(vendor) = self.vendor {
            settings.vendor = Some(vendor);
        }
        if let Some(inventory) = &self.inventory {
            settings.inventory = Some(inventory.clone());
        }
        if let Some(log_root) = &self.log_root {
            settings.log_root = log_root.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
        if let Some(mode) = self.host_key {
            settings.host_key_verification = mode;
        }
        if let Some(path) = &self.known_hosts {
            settings.known_hosts = Some(path.clone());
        }
        if let Some(text) = &self.vendor_match {
            settings.vendor_match = Some(VendorMatch::Contains(text.clone()));
        }

        settings.validate()?;
        Ok(settings)
    }
}

fn load_inventory(settings: &Settings) -> switchusers::Result<InventoryTable> {
    let path = settings.require_inventory()?;
    let text = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    InventoryTable::from_json_str(&text)
}

fn ask(term: &Term, label: &str) -> io::Result<String> {
    loop {
        term.write_str(label)?;
        let answer = term.read_line()?.trim().to_string();
        if !answer.is_empty() {
            return Ok(answer);
        }
    }
}

fn ask_secret(term: &Term, label: &str) -> io::Result<SecretString> {
    loop {
        term.write_str(label)?;
        let answer = term.read_secure_line()?;
        if !answer.is_empty() {
            return Ok(SecretString::from(answer));
        }
    }
}

fn ask_operation(term: &Term) -> io::Result<Operation> {
    loop {
        let answer = ask(term, "Enter mode (create/delete): ")?;
        match Operation::from_str(&answer, true) {
            Ok(operation) => return Ok(operation),
            Err(_) => term.write_line("Please enter 'create' or 'delete'.")?,
        }
    }
}

/// Everything the run needs from the operator.
fn gather_credentials(cli: &Cli, term: &Term) -> io::Result<(Operation, Credentials)> {
    let operation = match cli.mode {
        Some(operation) => operation,
        None => ask_operation(term)?,
    };
    let target = match &cli.user {
        Some(user) => user.clone(),
        None => ask(term, &format!("Enter the username to {operation}: "))?,
    };
    let target_password = match operation {
        Operation::Create => Some(ask_secret(term, &format!("Enter password for user '{target}': "))?),
        Operation::Delete => None,
    };
    let login = match &cli.login {
        Some(login) => login.clone(),
        None => ask(term, "Enter device login username: ")?,
    };
    let login_password = ask_secret(term, &format!("Enter login password for '{login}': "))?;

    let credentials = match target_password {
        Some(password) => Credentials::for_create(login, login_password, target, password),
        None => Credentials::for_delete(login, login_password, target),
    };
    Ok((operation, credentials))
}

fn print_progress(progress: Progress<'_>) {
    match progress {
        Progress::Started { index, total, device } => {
            println!("[{}/{}] {} ...", index + 1, total, device);
        }
        Progress::Finished { outcome, .. } => match &outcome.error_detail {
            Some(detail) => println!("    {}: {}", outcome.status, detail),
            None => println!("    {}", outcome.status),
        },
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = cli.settings()?;
    let vendor = settings.require_vendor()?;
    let table = load_inventory(&settings)?;
    let predicate = settings.predicate(vendor);
    debug!("settings: {:?}", settings);

    let term = Term::stdout();
    let (operation, credentials) = gather_credentials(&cli, &term)?;

    let mut connector = SshConnector::new()
        .port(settings.port)
        .host_key_verification(settings.host_key_verification);
    if let Some(path) = &settings.known_hosts {
        connector = connector.known_hosts_path(path);
    }

    let driver = SessionDriver::new(
        &connector,
        VendorProfile::new(vendor),
        operation,
        &credentials,
        settings.timeout(),
    );
    let audit = AuditLogger::new(&settings.log_root, operation);

    println!("{} user '{}' on {} devices", operation, credentials.target_username, vendor);
    let report = BatchRunner::new(driver, &audit)
        .run_inventory(&table, &predicate, print_progress)
        .await?;

    if report.is_empty() {
        println!("No devices matched; nothing to do.");
    }
    println!("{}", "-".repeat(50));
    println!("{}", report.summary);
    println!("Logs: {}", audit.operation_dir().display());
    for warning in &report.log_warnings {
        println!("warning: could not write log: {}", warning);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
