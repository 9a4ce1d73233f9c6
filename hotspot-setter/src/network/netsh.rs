/*!
 * Windows WLAN backend
 * Scan and connect through `netsh wlan`
 */

use std::io::Write;

use tempfile::TempPath;

use super::{connect_with, scan_with, NetworkRecord, ScanResult, WifiBackend};

const NETSH: &str = "netsh";
const SCAN_ARGS: [&str; 4] = ["wlan", "show", "networks", "mode=Bssid"];
const SCAN_HINT: &str = "Ensure the WLAN AutoConfig service is running.";

pub struct NetshBackend;

impl WifiBackend for NetshBackend {
    fn tool(&self) -> &'static str {
        NETSH
    }

    fn scan(&self) -> ScanResult {
        scan_with(NETSH, &SCAN_ARGS, SCAN_HINT, parse_networks)
    }

    fn connect(&self, ssid: &str, password: Option<&str>) -> String {
        tracing::info!("Connecting to WiFi network: {}", ssid);
        let connect_arg = format!("name={}", ssid);

        let Some(password) = password.filter(|p| !p.is_empty()) else {
            return connect_with(NETSH, &["wlan", "connect", connect_arg.as_str()]);
        };

        // netsh only connects through a stored profile, so register one first.
        let profile_report = match write_profile(ssid, password) {
            Ok(profile) => {
                let filename_arg = format!("filename={}", profile.display());
                connect_with(NETSH, &["wlan", "add", "profile", filename_arg.as_str()])
            }
            Err(e) => {
                tracing::error!("Failed to write WLAN profile: {}", e);
                format!("Failed to write WLAN profile: {}", e)
            }
        };
        let connect_report = connect_with(NETSH, &["wlan", "connect", connect_arg.as_str()]);

        format!("Add profile:\n{}\n\nConnect:\n{}", profile_report, connect_report)
    }
}

fn write_profile(ssid: &str, password: &str) -> std::io::Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix("hotspot-wlan-")
        .suffix(".xml")
        .tempfile()?;
    file.write_all(profile_xml(ssid, password).as_bytes())?;
    // Close our handle so netsh can read the file; it is removed on drop.
    Ok(file.into_temp_path())
}

/// WPA2-Personal profile for `netsh wlan add profile`.
fn profile_xml(ssid: &str, password: &str) -> String {
    let ssid = xml_escape(ssid);
    let password = xml_escape(password);
    format!(
        r#"<?xml version="1.0"?>
<WLANProfile xmlns="http://www.microsoft.com/networking/WLAN/profile/v1">
    <name>{ssid}</name>
    <SSIDConfig>
        <SSID>
            <name>{ssid}</name>
        </SSID>
    </SSIDConfig>
    <connectionType>ESS</connectionType>
    <connectionMode>manual</connectionMode>
    <MSM>
        <security>
            <authEncryption>
                <authentication>WPA2PSK</authentication>
                <encryption>AES</encryption>
                <useOneX>false</useOneX>
            </authEncryption>
            <sharedKey>
                <keyType>passPhrase</keyType>
                <protected>false</protected>
                <keyMaterial>{password}</keyMaterial>
            </sharedKey>
        </security>
    </MSM>
</WLANProfile>
"#
    )
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Parse `netsh wlan show networks mode=Bssid` output (English or German).
///
/// An `SSID n : name` line opens a record; `Signal` and
/// `Authentication`/`Authentifizierung` lines fill it in. The first value
/// reported for an SSID wins, so later BSSID blocks and repeated SSID blocks
/// do not overwrite it. Anything else is ignored.
pub fn parse_networks(output: &str) -> Vec<NetworkRecord> {
    let mut networks: Vec<NetworkRecord> = Vec::new();
    // Index of the record the current block belongs to; `None` while outside
    // a block or inside a repeated SSID block.
    let mut current: Option<usize> = None;

    for line in output.lines() {
        let line = line.trim();
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let label = label.trim();
        let value = value.trim();

        if label.starts_with("SSID ") || label == "SSID" {
            current = if value.is_empty() || networks.iter().any(|n| n.ssid == value) {
                None
            } else {
                networks.push(NetworkRecord::new(value, "?", "?"));
                Some(networks.len() - 1)
            };
        } else if label.starts_with("Signal") {
            if let Some(i) = current {
                fill(&mut networks[i].signal, value);
            }
        } else if label.starts_with("Authentication") || label.starts_with("Authentifizierung") {
            if let Some(i) = current {
                fill(&mut networks[i].security, value);
            }
        }
    }

    networks
}

fn fill(field: &mut String, value: &str) {
    if *field == "?" && !value.is_empty() {
        *field = value.to_string();
    }
}
