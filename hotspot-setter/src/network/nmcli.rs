/*!
 * NetworkManager backend
 * Scan and connect through `nmcli` terse output
 */

use super::{connect_with, dedup_by_ssid, scan_with, NetworkRecord, ScanResult, WifiBackend};

const NMCLI: &str = "nmcli";
const SCAN_ARGS: [&str; 6] = ["-t", "-f", "SSID,SIGNAL,SECURITY", "device", "wifi", "list"];
const SCAN_HINT: &str =
    "Ensure NetworkManager/nmcli are installed and manage your Wi-Fi interface.";

pub struct NmcliBackend;

impl WifiBackend for NmcliBackend {
    fn tool(&self) -> &'static str {
        NMCLI
    }

    fn scan(&self) -> ScanResult {
        scan_with(NMCLI, &SCAN_ARGS, SCAN_HINT, parse_networks)
    }

    fn connect(&self, ssid: &str, password: Option<&str>) -> String {
        tracing::info!("Connecting to WiFi network: {}", ssid);
        let args = connect_args(ssid, password);
        connect_with(NMCLI, &args)
    }
}

fn connect_args<'a>(ssid: &'a str, password: Option<&'a str>) -> Vec<&'a str> {
    let mut args = vec!["device", "wifi", "connect", ssid];
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        args.extend(["password", password]);
    }
    args
}

/// Parse `nmcli -t -f SSID,SIGNAL,SECURITY device wifi list` output.
///
/// Lines with fewer than three fields and hidden (empty) SSIDs are skipped.
/// Duplicate SSIDs, one per access point, collapse to the first seen.
pub fn parse_networks(output: &str) -> Vec<NetworkRecord> {
    let mut networks = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields = split_terse(line);
        if fields.len() < 3 {
            continue;
        }

        let ssid = fields[0].trim();
        if ssid.is_empty() {
            continue;
        }

        networks.push(NetworkRecord::new(
            ssid,
            or_unknown(&fields[1]),
            or_unknown(&fields[2]),
        ));
    }

    dedup_by_ssid(networks)
}

/// Split a terse line on `:`, honouring nmcli's `\:` and `\\` escapes.
fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => current.push(chars.next().unwrap_or('\\')),
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn or_unknown(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        "?".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_terse_listing() {
        let output = "HomeNet:82:WPA2\nCafe Guest:47:\nOffice:65:WPA1 WPA2 802.1X\n";
        let networks = parse_networks(output);

        assert_eq!(
            networks,
            vec![
                NetworkRecord::new("HomeNet", "82", "WPA2"),
                NetworkRecord::new("Cafe Guest", "47", "?"),
                NetworkRecord::new("Office", "65", "WPA1 WPA2 802.1X"),
            ]
        );
    }

    #[test]
    fn duplicates_keep_first_access_point() {
        let output = "HomeNet:82:WPA2\nHomeNet:31:WPA2\nMesh:50:WPA3\nHomeNet:90:WPA2\n";
        let networks = parse_networks(output);

        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0], NetworkRecord::new("HomeNet", "82", "WPA2"));
        assert_eq!(networks[1].ssid, "Mesh");
    }

    #[test]
    fn hidden_and_short_lines_are_skipped() {
        let output = ":70:WPA2\nbroken line\nonly:two\n\n   \nVisible:12:--\n";
        let networks = parse_networks(output);

        assert_eq!(networks, vec![NetworkRecord::new("Visible", "12", "--")]);
    }

    #[test]
    fn escaped_colon_stays_in_ssid() {
        let networks = parse_networks("Lab\\:5G:73:WPA2\nback\\\\slash:10:\n");

        assert_eq!(networks[0].ssid, "Lab:5G");
        assert_eq!(networks[0].signal, "73");
        assert_eq!(networks[1].ssid, "back\\slash");
    }

    #[test]
    fn malformed_output_yields_nothing() {
        assert!(parse_networks("").is_empty());
        assert!(parse_networks("Error: NetworkManager is not running.").is_empty());
    }

    #[test]
    fn password_only_added_when_present() {
        assert_eq!(connect_args("Home", None), vec!["device", "wifi", "connect", "Home"]);
        assert_eq!(connect_args("Home", Some("")), vec!["device", "wifi", "connect", "Home"]);
        assert_eq!(
            connect_args("Home", Some("hunter22")),
            vec!["device", "wifi", "connect", "Home", "password", "hunter22"]
        );
    }
}
