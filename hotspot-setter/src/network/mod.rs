pub mod command;
pub mod netsh;
pub mod nmcli;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use command::run_command;

pub use netsh::NetshBackend;
pub use nmcli::NmcliBackend;

/// One network seen in a scan. Signal and security are kept as the tool
/// printed them; `?` marks a field the tool did not report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub ssid: String,
    pub signal: String,
    pub security: String,
}

impl NetworkRecord {
    pub fn new(ssid: impl Into<String>, signal: impl Into<String>, security: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            signal: signal.into(),
            security: security.into(),
        }
    }
}

impl fmt::Display for NetworkRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Signal: {}, Security: {})", self.ssid, self.signal, self.security)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub records: Vec<NetworkRecord>,
    /// Tool output as captured, or the failure message when the tool could
    /// not be run.
    pub raw_output: String,
}

impl ScanResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            raw_output: message.into(),
        }
    }
}

/// Platform Wi-Fi tooling. One implementation is picked at startup.
pub trait WifiBackend: Send + Sync {
    /// Name of the external tool, for display.
    fn tool(&self) -> &'static str;

    /// List visible networks. Never fails: a tool error yields no records
    /// and the error text as raw output.
    fn scan(&self) -> ScanResult;

    /// Attempt one connection and return the tool's diagnostic text.
    fn connect(&self, ssid: &str, password: Option<&str>) -> String;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Auto,
    Nmcli,
    Netsh,
}

/// Resolve the configured backend for the given OS name (as in
/// `std::env::consts::OS`).
pub fn select_backend(kind: BackendKind, os: &str) -> Result<Box<dyn WifiBackend>> {
    let backend: Box<dyn WifiBackend> = match (kind, os) {
        (BackendKind::Nmcli, _) | (BackendKind::Auto, "linux") => Box::new(NmcliBackend),
        (BackendKind::Netsh, _) | (BackendKind::Auto, "windows") => Box::new(NetshBackend),
        (BackendKind::Auto, other) => return Err(Error::UnsupportedPlatform(other.to_string())),
    };

    tracing::info!("Using {} backend on {}", backend.tool(), os);
    Ok(backend)
}

/// Last scan of the current session, kept for display between actions.
#[derive(Debug, Default)]
pub struct ScanCache {
    last: Option<ScanResult>,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the previous scan entirely.
    pub fn store(&mut self, result: ScanResult) {
        self.last = Some(result);
    }

    pub fn has_scanned(&self) -> bool {
        self.last.is_some()
    }

    pub fn records(&self) -> &[NetworkRecord] {
        self.last.as_ref().map(|r| r.records.as_slice()).unwrap_or(&[])
    }

    pub fn raw_output(&self) -> &str {
        self.last.as_ref().map(|r| r.raw_output.as_str()).unwrap_or("")
    }

    pub fn get(&self, index: usize) -> Option<&NetworkRecord> {
        self.records().get(index)
    }
}

/// Keep the first record for each SSID, preserving order.
pub(crate) fn dedup_by_ssid(records: Vec<NetworkRecord>) -> Vec<NetworkRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.ssid.clone()))
        .collect()
}

pub(crate) fn scan_with(
    program: &str,
    args: &[&str],
    hint: &str,
    parse: fn(&str) -> Vec<NetworkRecord>,
) -> ScanResult {
    match run_command(program, args) {
        Ok(output) if output.success() => {
            let records = parse(&output.stdout);
            tracing::info!("{} scan parsed {} networks", program, records.len());
            ScanResult {
                records,
                raw_output: output.stdout,
            }
        }
        Ok(output) => {
            tracing::warn!("{} scan exited with {:?}", program, output.code);
            ScanResult::failed(format!(
                "Failed to run '{}'. {}\n\n{}",
                program,
                hint,
                output.diagnostic()
            ))
        }
        Err(e) => {
            tracing::error!("{} scan failed: {}", program, e);
            ScanResult::failed(format!("Failed to run '{}'. {}\n\nError: {}", program, hint, e))
        }
    }
}

pub(crate) fn connect_with(program: &str, args: &[&str]) -> String {
    match run_command(program, args) {
        Ok(output) => output.diagnostic(),
        Err(e) => {
            tracing::error!("connect via {} failed: {}", program, e);
            format!("Exception while trying to connect: {}", e)
        }
    }
}
