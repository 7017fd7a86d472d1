use std::path::{Path, PathBuf};

/// Conventional adb install locations probed when no explicit path is
/// configured, most specific first.
pub fn candidate_adb_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(sdk_root) = std::env::var("ANDROID_HOME") {
        candidates.push(PathBuf::from(sdk_root).join("platform-tools").join(adb_binary_name()));
    }
    if let Some(home) = dirs::home_dir() {
        if cfg!(target_os = "macos") {
            candidates.push(home.join("Library/Android/sdk/platform-tools").join(adb_binary_name()));
        } else if cfg!(windows) {
            candidates.push(
                home.join("AppData/Local/Android/Sdk/platform-tools")
                    .join(adb_binary_name()),
            );
        } else {
            candidates.push(home.join("Android/Sdk/platform-tools").join(adb_binary_name()));
        }
    }
    candidates
}

fn adb_binary_name() -> &'static str {
    if cfg!(windows) {
        "adb.exe"
    } else {
        "adb"
    }
}

pub fn normalize_command_path(value: &str) -> String {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|candidate| candidate.strip_suffix(quote))
        {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Picks the adb program: configured path wins, then the first existing SDK
/// candidate, then bare `adb` on PATH.
pub fn resolve_adb_program(config_command_path: &str) -> String {
    let normalized = normalize_command_path(config_command_path);
    if !normalized.is_empty() {
        return normalized;
    }
    for candidate in candidate_adb_paths() {
        if candidate.is_file() {
            return candidate.to_string_lossy().to_string();
        }
    }
    "adb".to_string()
}

pub fn validate_adb_program(program: &str) -> Result<(), String> {
    if program.trim().is_empty() {
        return Err("ADB command is empty".to_string());
    }
    if program == "adb" {
        // Bare name resolves through PATH at spawn time.
        return Ok(());
    }
    let path = Path::new(program);
    if path.is_dir() {
        return Err("ADB path must point to an executable file".to_string());
    }
    if !path.exists() {
        return Err("ADB executable not found at the configured path".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_wrapping_quotes() {
        assert_eq!(
            normalize_command_path("  \"/opt/platform-tools/adb\"  "),
            "/opt/platform-tools/adb"
        );
        assert_eq!(
            normalize_command_path("'/opt/platform-tools/adb'"),
            "/opt/platform-tools/adb"
        );
    }

    #[test]
    fn configured_path_wins_over_probing() {
        assert_eq!(
            resolve_adb_program("/custom/adb"),
            "/custom/adb"
        );
    }

    #[test]
    fn validates_nonexistent_path() {
        let err = validate_adb_program("/this/path/should/not/exist/adb").unwrap_err();
        assert!(err.to_lowercase().contains("not found"));
    }

    #[test]
    fn bare_adb_passes_validation() {
        assert!(validate_adb_program("adb").is_ok());
        assert!(validate_adb_program("  ").is_err());
    }

    #[test]
    fn existing_file_passes_validation() {
        let tmp = tempfile::NamedTempFile::new().expect("tmp file");
        assert!(validate_adb_program(&tmp.path().to_string_lossy()).is_ok());
    }
}
