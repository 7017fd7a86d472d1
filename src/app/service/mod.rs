use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::app::adb::locator::resolve_adb_program;
use crate::app::adb::output::{family_of, interpret};
use crate::app::adb::parse::{
    connect_succeeded, install_succeeded, parse_battery_level, parse_devices_output,
    parse_getprop_value, parse_ls_la, parse_package_detail, parse_package_list,
    parse_package_paths,
};
use crate::app::adb::runner::{run_command_with_timeout, CommandOutput};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::models::{
    AdbInfo, CommandResponse, Device, DeviceFileEntry, PackageDetail, QueueStatus,
    RecordingStatus,
};
use crate::app::queue::{classify, CommandDispatcher};
use crate::app::recording::{generate_recording_file_name, RecordingManager};

#[cfg(test)]
mod tests;

const INSTALL_STAGING_PATH: &str = "/data/local/tmp/temp_install.apk";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFilter {
    All,
    System,
    User,
}

impl PackageFilter {
    fn pm_flag(&self) -> Option<&'static str> {
        match self {
            PackageFilter::All => None,
            PackageFilter::System => Some("-s"),
            PackageFilter::User => Some("-3"),
        }
    }
}

/// The call surface consumed by the UI layer. Owns the dispatcher and the
/// recording manager; every adb invocation flows through a lane.
pub struct AdbService {
    adb_program: String,
    dispatcher: CommandDispatcher,
    recorder: RecordingManager,
    config: AppConfig,
}

impl AdbService {
    pub fn new(config: AppConfig) -> Self {
        let adb_program = resolve_adb_program(&config.adb.command_path);
        Self::with_parts(config, adb_program, RecordingManager::new())
    }

    pub fn with_parts(
        config: AppConfig,
        adb_program: String,
        recorder: RecordingManager,
    ) -> Self {
        Self {
            adb_program,
            dispatcher: CommandDispatcher::new(),
            recorder,
            config,
        }
    }

    pub fn adb_program(&self) -> &str {
        &self.adb_program
    }

    // ---- dispatch plumbing -------------------------------------------------

    /// Classifies the rendered argument string, submits the invocation to
    /// that lane, and blocks on the result.
    fn dispatch<T, F>(
        &self,
        args: Vec<String>,
        timeout: Duration,
        trace_id: &str,
        parse: F,
    ) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(CommandOutput) -> Result<T, AppError> + Send + 'static,
    {
        let lane = classify(&args.join(" "));
        let program = self.adb_program.clone();
        let trace = trace_id.to_string();
        self.dispatcher
            .submit(lane, move || {
                let output = run_command_with_timeout(&program, &args, timeout, &trace)?;
                parse(output)
            })
            .wait()
    }

    fn run_raw(
        &self,
        args: Vec<String>,
        timeout: Duration,
        trace_id: &str,
    ) -> Result<CommandOutput, AppError> {
        self.dispatch(args, timeout, trace_id, Ok)
    }

    fn run_interpreted(
        &self,
        args: Vec<String>,
        timeout: Duration,
        trace_id: &str,
    ) -> Result<String, AppError> {
        let family = family_of(&args);
        let trace = trace_id.to_string();
        self.dispatch(args, timeout, trace_id, move |output| {
            interpret(family, &output, &trace)
        })
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.config.adb.default_timeout_secs)
    }

    fn devices_timeout(&self) -> Duration {
        Duration::from_secs(self.config.adb.devices_timeout_secs)
    }

    fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.config.adb.install_timeout_secs)
    }

    // ---- device operations -------------------------------------------------

    pub fn check_adb(&self, trace_id: Option<String>) -> Result<CommandResponse<AdbInfo>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        let program = self.adb_program.clone();
        let args = vec!["version".to_string()];
        let info = self
            .dispatch(args, self.devices_timeout(), &trace_id, move |output| {
                Ok(AdbInfo {
                    available: output.succeeded(),
                    version_output: output.stdout.trim().to_string(),
                    command_path: program,
                    error: if output.succeeded() {
                        None
                    } else {
                        Some(output.stderr.trim().to_string())
                    },
                })
            })
            .unwrap_or_else(|err| AdbInfo {
                available: false,
                version_output: String::new(),
                command_path: self.adb_program.clone(),
                error: Some(err.error),
            });
        Ok(CommandResponse {
            trace_id,
            data: info,
        })
    }

    pub fn list_devices(
        &self,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<Vec<Device>>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        let args = vec!["devices".to_string(), "-l".to_string()];
        let trace = trace_id.clone();
        let devices = self.dispatch(args, self.devices_timeout(), &trace_id, move |output| {
            if !output.succeeded() {
                return Err(AppError::dependency(
                    format!("Failed to list devices: {}", output.stderr.trim()),
                    &trace,
                ));
            }
            Ok(parse_devices_output(&output.stdout))
        })?;
        let devices = if self.config.device.show_offline_devices {
            devices
        } else {
            devices
                .into_iter()
                .filter(|device| device.status != "offline")
                .collect()
        };
        Ok(CommandResponse {
            trace_id,
            data: devices,
        })
    }

    /// Per-property reads, issued as individual commands the way the
    /// original tool does. Missing properties stay `None`.
    pub fn device_detail(
        &self,
        serial: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<Device>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;

        // Property reads are tolerant: an unreadable property leaves the
        // field unset instead of failing the whole detail call.
        let mut device = Device::new(serial, "device");
        device.model = self.getprop(serial, "ro.product.model", &trace_id).unwrap_or(None);
        device.android_version = self
            .getprop(serial, "ro.build.version.release", &trace_id)
            .unwrap_or(None);
        device.api_level = self
            .getprop(serial, "ro.build.version.sdk", &trace_id)
            .unwrap_or(None);
        device.manufacturer = self
            .getprop(serial, "ro.product.manufacturer", &trace_id)
            .unwrap_or(None);

        let battery_args = shell_args(serial, &["dumpsys", "battery"]);
        device.battery_level = self
            .run_interpreted(battery_args, self.default_timeout(), &trace_id)
            .ok()
            .as_deref()
            .and_then(parse_battery_level);

        Ok(CommandResponse {
            trace_id,
            data: device,
        })
    }

    fn getprop(
        &self,
        serial: &str,
        property: &str,
        trace_id: &str,
    ) -> Result<Option<String>, AppError> {
        let args = shell_args(serial, &["getprop", property]);
        let value = self.run_interpreted(args, self.default_timeout(), trace_id)?;
        Ok(parse_getprop_value(&value))
    }

    pub fn connect_wifi(
        &self,
        host: &str,
        port: u16,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(host, "host", &trace_id)?;
        let endpoint = format!("{host}:{port}");
        let args = vec!["connect".to_string(), endpoint.clone()];
        let message = self.run_interpreted(args, self.default_timeout(), &trace_id)?;
        if !connect_succeeded(&message) {
            return Err(AppError::dependency(
                format!("Failed to connect to {endpoint}: {message}"),
                &trace_id,
            ));
        }
        info!(endpoint = %endpoint, "wireless device connected");
        Ok(CommandResponse {
            trace_id,
            data: message,
        })
    }

    pub fn disconnect_device(
        &self,
        serial: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        let args = vec!["disconnect".to_string(), serial.to_string()];
        let message = self.run_interpreted(args, self.default_timeout(), &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: message,
        })
    }

    pub fn enable_tcpip(
        &self,
        serial: &str,
        port: u16,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        let args = vec![
            "-s".to_string(),
            serial.to_string(),
            "tcpip".to_string(),
            port.to_string(),
        ];
        let message = self.run_interpreted(args, self.default_timeout(), &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: message,
        })
    }

    pub fn reboot_device(
        &self,
        serial: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        let args = vec!["-s".to_string(), serial.to_string(), "reboot".to_string()];
        let message = self.run_interpreted(args, self.default_timeout(), &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: message,
        })
    }

    // ---- raw command surface -----------------------------------------------

    /// Free-form command execution: accepts the same strings the original
    /// tool's terminal accepted, with or without a leading `adb`.
    pub fn exec_raw(
        &self,
        command: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        let args = exec_args_from_command(command, &trace_id)?;
        let message = self.run_interpreted(args, self.default_timeout(), &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: message,
        })
    }

    // ---- app operations ----------------------------------------------------

    pub fn list_packages(
        &self,
        serial: &str,
        filter: PackageFilter,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<Vec<String>>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        let mut parts = vec!["pm", "list", "packages"];
        if let Some(flag) = filter.pm_flag() {
            parts.push(flag);
        }
        let args = shell_args(serial, &parts);
        let output = self.run_interpreted(args, self.default_timeout(), &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: parse_package_list(&output),
        })
    }

    pub fn package_detail(
        &self,
        serial: &str,
        package: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<PackageDetail>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        ensure_non_empty(package, "package", &trace_id)?;
        let args = shell_args(serial, &["dumpsys", "package", package]);
        let output = self.run_interpreted(args, self.default_timeout(), &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: parse_package_detail(package, &output),
        })
    }

    pub fn package_paths(
        &self,
        serial: &str,
        package: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<Vec<String>>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        ensure_non_empty(package, "package", &trace_id)?;
        let args = shell_args(serial, &["pm", "path", package]);
        let output = self.run_interpreted(args, self.default_timeout(), &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: parse_package_paths(&output),
        })
    }

    /// Push to a device staging path, `pm install -r`, then clean up the
    /// staging file. Success requires pm's own `Success` line.
    pub fn install_apk(
        &self,
        serial: &str,
        apk_path: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        if !Path::new(apk_path).is_file() {
            return Err(AppError::validation(
                format!("APK not found: {apk_path}"),
                &trace_id,
            ));
        }

        let push_args = vec![
            "-s".to_string(),
            serial.to_string(),
            "push".to_string(),
            apk_path.to_string(),
            INSTALL_STAGING_PATH.to_string(),
        ];
        self.run_interpreted(push_args, self.install_timeout(), &trace_id)?;

        let install_args = shell_args(serial, &["pm", "install", "-r", INSTALL_STAGING_PATH]);
        let output = self.run_raw(install_args, self.install_timeout(), &trace_id)?;
        let combined = format!("{}\n{}", output.stdout.trim(), output.stderr.trim());

        // Best-effort staging cleanup, success or not.
        let cleanup_args = shell_args(serial, &["rm", INSTALL_STAGING_PATH]);
        if let Err(err) = self.run_raw(cleanup_args, self.default_timeout(), &trace_id) {
            warn!(trace_id = %trace_id, error = %err.error, "failed to remove install staging file");
        }

        if !install_succeeded(&combined) {
            return Err(AppError::dependency(
                format!("Install failed: {}", combined.trim()),
                &trace_id,
            ));
        }
        info!(serial = %serial, apk = %apk_path, "apk installed");
        Ok(CommandResponse {
            trace_id,
            data: combined.trim().to_string(),
        })
    }

    /// Install from in-memory APK bytes (the upload path of the original
    /// tool): stage to a temp file, then run the normal install flow.
    pub fn install_apk_bytes(
        &self,
        serial: &str,
        file_name: &str,
        bytes: &[u8],
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(file_name, "file_name", &trace_id)?;
        let staging = tempfile::TempDir::new().map_err(|err| {
            AppError::system(format!("Failed to create staging dir: {err}"), &trace_id)
        })?;
        let local_path = staging.path().join(file_name);
        fs::write(&local_path, bytes).map_err(|err| {
            AppError::system(format!("Failed to write staging APK: {err}"), &trace_id)
        })?;
        self.install_apk(
            serial,
            &local_path.to_string_lossy(),
            Some(trace_id),
        )
    }

    pub fn uninstall_app(
        &self,
        serial: &str,
        package: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        ensure_non_empty(package, "package", &trace_id)?;
        let args = vec![
            "-s".to_string(),
            serial.to_string(),
            "uninstall".to_string(),
            package.to_string(),
        ];
        let output = self.run_raw(args, self.default_timeout(), &trace_id)?;
        let combined = format!("{}\n{}", output.stdout.trim(), output.stderr.trim());
        if !install_succeeded(&combined) {
            return Err(AppError::dependency(
                format!("Uninstall failed: {}", combined.trim()),
                &trace_id,
            ));
        }
        Ok(CommandResponse {
            trace_id,
            data: combined.trim().to_string(),
        })
    }

    /// Launches via the monkey launcher intent, as the original tool does.
    pub fn launch_app(
        &self,
        serial: &str,
        package: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        ensure_non_empty(package, "package", &trace_id)?;
        let args = shell_args(
            serial,
            &[
                "monkey",
                "-p",
                package,
                "-c",
                "android.intent.category.LAUNCHER",
                "1",
            ],
        );
        let message = self.run_interpreted(args, self.default_timeout(), &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: message,
        })
    }

    pub fn force_stop_app(
        &self,
        serial: &str,
        package: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        ensure_non_empty(package, "package", &trace_id)?;
        let args = shell_args(serial, &["am", "force-stop", package]);
        let message = self.run_interpreted(args, self.default_timeout(), &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: message,
        })
    }

    pub fn clear_app_data(
        &self,
        serial: &str,
        package: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        ensure_non_empty(package, "package", &trace_id)?;
        let args = shell_args(serial, &["pm", "clear", package]);
        let output = self.run_raw(args, self.default_timeout(), &trace_id)?;
        let combined = format!("{}\n{}", output.stdout.trim(), output.stderr.trim());
        if !install_succeeded(&combined) {
            return Err(AppError::dependency(
                format!("Clearing app data failed: {}", combined.trim()),
                &trace_id,
            ));
        }
        Ok(CommandResponse {
            trace_id,
            data: combined.trim().to_string(),
        })
    }

    // ---- file operations ---------------------------------------------------

    pub fn list_files(
        &self,
        serial: &str,
        path: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<Vec<DeviceFileEntry>>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        validate_device_path(path).map_err(|message| AppError::validation(message, &trace_id))?;
        let args = shell_args(serial, &["ls", "-la", path]);
        let output = self.run_interpreted(args, self.default_timeout(), &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: parse_ls_la(path, &output),
        })
    }

    pub fn pull_file(
        &self,
        serial: &str,
        remote_path: &str,
        local_path: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        validate_device_path(remote_path)
            .map_err(|message| AppError::validation(message, &trace_id))?;
        if let Some(parent) = Path::new(local_path).parent() {
            let _ = fs::create_dir_all(parent);
        }
        let args = vec![
            "-s".to_string(),
            serial.to_string(),
            "pull".to_string(),
            remote_path.to_string(),
            local_path.to_string(),
        ];
        let message = self.run_interpreted(args, self.install_timeout(), &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: message,
        })
    }

    pub fn push_file(
        &self,
        serial: &str,
        local_path: &str,
        remote_path: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        validate_device_path(remote_path)
            .map_err(|message| AppError::validation(message, &trace_id))?;
        if !Path::new(local_path).exists() {
            return Err(AppError::validation(
                format!("Local file not found: {local_path}"),
                &trace_id,
            ));
        }
        let args = vec![
            "-s".to_string(),
            serial.to_string(),
            "push".to_string(),
            local_path.to_string(),
            remote_path.to_string(),
        ];
        let message = self.run_interpreted(args, self.install_timeout(), &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: message,
        })
    }

    pub fn delete_path(
        &self,
        serial: &str,
        remote_path: &str,
        recursive: bool,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        validate_device_path(remote_path)
            .map_err(|message| AppError::validation(message, &trace_id))?;
        if remote_path.trim_end_matches('/').is_empty() {
            return Err(AppError::validation(
                "refusing to delete the device root",
                &trace_id,
            ));
        }
        let mut parts = vec!["rm"];
        if recursive {
            parts.push("-r");
        }
        parts.push("-f");
        parts.push(remote_path);
        let args = shell_args(serial, &parts);
        let message = self.run_interpreted(args, self.default_timeout(), &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: message,
        })
    }

    // ---- screen operations -------------------------------------------------

    /// screencap to the device, pull the file into `output_dir`, remove the
    /// device-side copy, and verify the local result is non-empty.
    pub fn capture_screenshot(
        &self,
        serial: &str,
        output_dir: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        ensure_non_empty(serial, "serial", &trace_id)?;
        ensure_non_empty(output_dir, "output_dir", &trace_id)?;

        let file_name = generate_screenshot_file_name();
        let remote_path = format!("/sdcard/{file_name}");

        let capture_args = shell_args(serial, &["screencap", "-p", &remote_path]);
        self.run_interpreted(capture_args, self.default_timeout(), &trace_id)?;

        fs::create_dir_all(output_dir).map_err(|err| {
            AppError::system(format!("Failed to create output dir: {err}"), &trace_id)
        })?;
        let local_path = PathBuf::from(output_dir).join(&file_name);
        let pull_args = vec![
            "-s".to_string(),
            serial.to_string(),
            "pull".to_string(),
            remote_path.clone(),
            local_path.to_string_lossy().to_string(),
        ];
        self.run_interpreted(pull_args, self.install_timeout(), &trace_id)?;

        let cleanup_args = shell_args(serial, &["rm", &remote_path]);
        if let Err(err) = self.run_raw(cleanup_args, self.default_timeout(), &trace_id) {
            warn!(trace_id = %trace_id, error = %err.error, "failed to remove device screenshot");
        }

        let size = fs::metadata(&local_path).map(|meta| meta.len()).unwrap_or(0);
        if size == 0 {
            return Err(AppError::dependency(
                "Screenshot file missing or empty after pull",
                &trace_id,
            ));
        }
        info!(serial = %serial, path = %local_path.display(), "screenshot captured");
        Ok(CommandResponse {
            trace_id,
            data: local_path.to_string_lossy().to_string(),
        })
    }

    pub fn start_recording(
        &self,
        serial: &str,
        file_name: Option<String>,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        let file_name = file_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(generate_recording_file_name);
        let remote = self.recorder.start_recording(
            &self.adb_program,
            serial,
            &file_name,
            &self.config.screen_record,
            &trace_id,
        )?;
        Ok(CommandResponse {
            trace_id,
            data: remote,
        })
    }

    pub fn stop_recording(
        &self,
        serial: &str,
        file_name: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<String>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        let remote =
            self.recorder
                .stop_recording(&self.adb_program, serial, file_name, &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: remote,
        })
    }

    pub fn recording_status(
        &self,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<RecordingStatus>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        let status = self.recorder.get_status(&trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: status,
        })
    }

    // ---- diagnostics -------------------------------------------------------

    pub fn queue_status(&self) -> QueueStatus {
        self.dispatcher.status()
    }
}

// ---- helpers ---------------------------------------------------------------

pub(crate) fn resolve_trace_id(trace_id: Option<String>) -> String {
    trace_id
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn ensure_non_empty(value: &str, field: &str, trace_id: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(
            format!("{field} is required"),
            trace_id,
        ));
    }
    Ok(())
}

fn shell_args(serial: &str, parts: &[&str]) -> Vec<String> {
    let mut args = vec!["-s".to_string(), serial.to_string(), "shell".to_string()];
    args.extend(parts.iter().map(|part| part.to_string()));
    args
}

/// Splits a free-form command into adb arguments, tolerating a leading
/// `adb` the way the original tool's terminal did. Quoting is not
/// interpreted; arguments are whitespace-separated.
pub(crate) fn exec_args_from_command(
    command: &str,
    trace_id: &str,
) -> Result<Vec<String>, AppError> {
    let trimmed = command.trim();
    let stripped = if trimmed == "adb" {
        ""
    } else {
        trimmed.strip_prefix("adb ").unwrap_or(trimmed)
    };
    let args: Vec<String> = stripped
        .split_whitespace()
        .map(|part| part.to_string())
        .collect();
    if args.is_empty() {
        return Err(AppError::validation("Command is empty", trace_id));
    }
    Ok(args)
}

pub(crate) fn validate_device_path(path: &str) -> Result<(), String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err("device path is required".to_string());
    }
    if !trimmed.starts_with('/') {
        return Err("device path must be absolute".to_string());
    }
    if trimmed.split('/').any(|segment| segment == "..") {
        return Err("device path must not contain '..' segments".to_string());
    }
    Ok(())
}

/// Screenshot filenames follow the original tool: `adbtools-<timestamp>.png`.
pub fn generate_screenshot_file_name() -> String {
    format!("adbtools-{}.png", chrono::Local::now().format("%Y%m%d%H%M%S"))
}
