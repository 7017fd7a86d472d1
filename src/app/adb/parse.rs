use std::sync::OnceLock;

use regex::Regex;

use crate::app::models::{Device, DeviceFileEntry, PackageDetail};

/// Parses `adb devices -l` output into device rows. The header line, daemon
/// restart chatter and blank lines are skipped.
pub fn parse_devices_output(output: &str) -> Vec<Device> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('*'))
        .filter(|line| !line.to_lowercase().contains("list of devices"))
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 2 {
                return None;
            }
            let mut device = Device::new(tokens[0], tokens[1]);
            for token in tokens.iter().skip(2) {
                if let Some(value) = token.strip_prefix("model:") {
                    device.model = Some(value.to_string());
                }
            }
            Some(device)
        })
        .collect()
}

/// A single `getprop <name>` read: first non-empty line, trimmed.
pub fn parse_getprop_value(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.to_string())
}

pub fn parse_battery_level(output: &str) -> Option<u8> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"level:\s*(\d+)").expect("battery level regex"));
    re.captures(output)
        .and_then(|caps| caps[1].parse::<u8>().ok())
}

/// `pm list packages` lines come back as `package:<name>`.
pub fn parse_package_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("package:"))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// `pm path <pkg>` also uses the `package:` prefix, one APK path per line.
pub fn parse_package_paths(output: &str) -> Vec<String> {
    parse_package_list(output)
}

pub fn parse_package_detail(package: &str, dumpsys_output: &str) -> PackageDetail {
    static VERSION_NAME_RE: OnceLock<Regex> = OnceLock::new();
    static VERSION_CODE_RE: OnceLock<Regex> = OnceLock::new();
    static INSTALL_TIME_RE: OnceLock<Regex> = OnceLock::new();
    static SYSTEM_FLAG_RE: OnceLock<Regex> = OnceLock::new();

    let version_name = VERSION_NAME_RE
        .get_or_init(|| Regex::new(r"versionName=(\S+)").expect("versionName regex"))
        .captures(dumpsys_output)
        .map(|caps| caps[1].to_string());
    let version_code = VERSION_CODE_RE
        .get_or_init(|| Regex::new(r"versionCode=(\d+)").expect("versionCode regex"))
        .captures(dumpsys_output)
        .map(|caps| caps[1].to_string());
    let first_install_time = INSTALL_TIME_RE
        .get_or_init(|| Regex::new(r"firstInstallTime=([^\n]+)").expect("install time regex"))
        .captures(dumpsys_output)
        .map(|caps| caps[1].trim().to_string());
    let is_system = SYSTEM_FLAG_RE
        .get_or_init(|| Regex::new(r"(?m)^\s*(?:pkg)?[Ff]lags=.*SYSTEM").expect("flags regex"))
        .is_match(dumpsys_output);
    let is_running = dumpsys_output.contains("running=true");

    PackageDetail {
        package_name: package.to_string(),
        version_name,
        version_code,
        first_install_time,
        is_system,
        is_running,
    }
}

/// `ls -la` rows for a directory listing. The `total` header and the `.`
/// and `..` entries are skipped; names with spaces are kept intact.
pub fn parse_ls_la(path: &str, output: &str) -> Vec<DeviceFileEntry> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("total"))
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 8 {
                return None;
            }
            let permissions = tokens[0].to_string();
            let is_dir = permissions.starts_with('d');
            let size_bytes = tokens.get(4).and_then(|value| value.parse::<u64>().ok());
            // toybox ls prints `perm links owner group size date time name`;
            // anything past the time column is the (possibly spaced) name.
            let modified_at = format!("{} {}", tokens[5], tokens[6]);
            let name = tokens[7..].join(" ");
            if name.is_empty() || name == "." || name == ".." {
                return None;
            }
            Some(DeviceFileEntry {
                path: format!("{}/{}", path.trim_end_matches('/'), name),
                name,
                is_dir,
                permissions,
                size_bytes,
                modified_at: Some(modified_at).filter(|value| !value.trim().is_empty()),
            })
        })
        .collect()
}

/// `adb connect` reports success in prose, not via the exit code.
pub fn connect_succeeded(output: &str) -> bool {
    let lowered = output.to_lowercase();
    lowered.contains("connected") && !lowered.contains("cannot connect")
}

/// `pm install` / `pm uninstall` print `Success` on their own line.
pub fn install_succeeded(output: &str) -> bool {
    output.lines().any(|line| line.trim() == "Success")
}
