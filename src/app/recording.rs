use std::fs;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::app::adb::locator::validate_adb_program;
use crate::app::adb::runner::{run_command_with_timeout, CommandOutput};
use crate::app::config::ScreenRecordSettings;
use crate::app::error::AppError;
use crate::app::models::RecordingStatus;

/// Grace period for screenrecord to flush after the device-side interrupt.
const STOP_WAIT: Duration = Duration::from_millis(3000);
/// Extra wait before the device-side file is treated as finalized.
const SETTLE_WAIT: Duration = Duration::from_millis(2000);

const DEVICE_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

type DeviceRunner<'a> = dyn Fn(&[String], Duration) -> Result<CommandOutput, AppError> + 'a;

struct ActiveRecording {
    child: Child,
    serial: String,
    remote_path: String,
}

/// Tracks the single screen-recording process and mirrors its state to a
/// JSON status file so a restarted instance can still stop a recording it
/// no longer holds a handle for.
pub struct RecordingManager {
    active: Mutex<Option<ActiveRecording>>,
    status_path: PathBuf,
    stop_wait: Duration,
    settle_wait: Duration,
}

pub fn default_status_path() -> PathBuf {
    if let Ok(path) = std::env::var("ADBTOOLS_RECORDING_STATUS_PATH") {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".adbtools_recording_status.json")
}

impl RecordingManager {
    pub fn new() -> Self {
        Self::with_status_path(default_status_path())
    }

    pub fn with_status_path(status_path: PathBuf) -> Self {
        Self {
            active: Mutex::new(None),
            status_path,
            stop_wait: STOP_WAIT,
            settle_wait: SETTLE_WAIT,
        }
    }

    #[cfg(test)]
    fn with_waits(mut self, stop_wait: Duration, settle_wait: Duration) -> Self {
        self.stop_wait = stop_wait;
        self.settle_wait = settle_wait;
        self
    }

    /// Starts recording `serial` into `/sdcard/<file_name>`. An already
    /// active session (any device) is force-terminated first.
    pub fn start_recording(
        &self,
        adb_program: &str,
        serial: &str,
        file_name: &str,
        options: &ScreenRecordSettings,
        trace_id: &str,
    ) -> Result<String, AppError> {
        validate_adb_program(adb_program)
            .map_err(|message| AppError::dependency(message, trace_id))?;

        let program = adb_program.to_string();
        self.start_recording_with(
            move |args| {
                Command::new(&program)
                    .args(args)
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .map_err(|err| {
                        AppError::dependency(format!("Failed to start screenrecord: {err}"), "")
                    })
            },
            serial,
            file_name,
            options,
            trace_id,
        )
    }

    pub(crate) fn start_recording_with(
        &self,
        spawn: impl FnOnce(&[String]) -> Result<Child, AppError>,
        serial: &str,
        file_name: &str,
        options: &ScreenRecordSettings,
        trace_id: &str,
    ) -> Result<String, AppError> {
        ensure_non_empty(serial, "serial", trace_id)?;
        ensure_valid_file_name(file_name, trace_id)?;

        let mut guard = self
            .active
            .lock()
            .map_err(|_| AppError::system("Recording registry locked", trace_id))?;

        if let Some(mut previous) = guard.take() {
            warn!(
                serial = %previous.serial,
                "terminating active recording before starting a new one"
            );
            let _ = previous.child.kill();
            let _ = previous.child.wait();
            self.write_status(&RecordingStatus::idle(), trace_id)?;
        }

        let remote_path = format!("/sdcard/{file_name}");
        let args = build_screenrecord_args(serial, &remote_path, options);
        let child = spawn(&args).map_err(|mut err| {
            if err.trace_id.is_empty() {
                err.trace_id = trace_id.to_string();
            }
            err
        })?;

        self.write_status(&RecordingStatus::active(serial), trace_id)?;
        *guard = Some(ActiveRecording {
            child,
            serial: serial.to_string(),
            remote_path: remote_path.clone(),
        });
        info!(serial = %serial, remote_path = %remote_path, "screen recording started");

        Ok(remote_path)
    }

    /// Stops the recording for `serial` and returns the device-side path of
    /// the finished file. Falls back to a purely device-side stop when the
    /// in-memory handle is gone but the status mirror still claims an active
    /// recording (app restarted mid-recording).
    pub fn stop_recording(
        &self,
        adb_program: &str,
        serial: &str,
        file_name: &str,
        trace_id: &str,
    ) -> Result<String, AppError> {
        let program = adb_program.to_string();
        let trace = trace_id.to_string();
        let runner = move |args: &[String], timeout: Duration| {
            run_command_with_timeout(&program, args, timeout, &trace)
        };
        self.stop_recording_with(&runner, serial, file_name, trace_id)
    }

    pub(crate) fn stop_recording_with(
        &self,
        run_device: &DeviceRunner<'_>,
        serial: &str,
        file_name: &str,
        trace_id: &str,
    ) -> Result<String, AppError> {
        ensure_non_empty(serial, "serial", trace_id)?;
        ensure_valid_file_name(file_name, trace_id)?;

        let mut guard = self
            .active
            .lock()
            .map_err(|_| AppError::system("Recording registry locked", trace_id))?;

        let matches_memory = guard
            .as_ref()
            .map(|active| active.serial == serial)
            .unwrap_or(false);

        if matches_memory {
            let mut active = guard.take().expect("checked above");
            drop(guard);

            self.interrupt_device_recorder(run_device, serial);
            self.wait_for_exit(&mut active.child);
            std::thread::sleep(self.settle_wait);

            let verified = self.verify_remote_file(run_device, serial, &active.remote_path);
            self.write_status(&RecordingStatus::idle(), trace_id)?;
            info!(serial = %serial, "screen recording stopped");

            return if verified {
                Ok(active.remote_path)
            } else {
                Err(AppError::dependency(
                    "Recording file missing on device; the recording may have been too short",
                    trace_id,
                ))
            };
        }

        if guard.is_some() {
            return Err(AppError::validation(
                "No recording in progress for this device",
                trace_id,
            ));
        }
        drop(guard);

        // No local handle. Recover through the status mirror: the recorder
        // may still be running on the device from a previous app instance.
        let persisted = self.read_status();
        if !(persisted.is_recording && persisted.device_id.as_deref() == Some(serial)) {
            return Err(AppError::validation("No recording in progress", trace_id));
        }

        self.interrupt_device_recorder(run_device, serial);
        std::thread::sleep(self.settle_wait);

        let remote_path = format!("/sdcard/{file_name}");
        let verified = self.verify_remote_file(run_device, serial, &remote_path);
        self.write_status(&RecordingStatus::idle(), trace_id)?;
        info!(serial = %serial, "orphaned screen recording stopped via device fallback");

        if verified {
            Ok(remote_path)
        } else {
            Err(AppError::dependency(
                "Recording file missing on device; the recording may have been too short",
                trace_id,
            ))
        }
    }

    /// Current state. A recorder that exited on its own transitions back to
    /// idle here; without an in-memory handle the persisted mirror answers.
    pub fn get_status(&self, trace_id: &str) -> Result<RecordingStatus, AppError> {
        let mut guard = self
            .active
            .lock()
            .map_err(|_| AppError::system("Recording registry locked", trace_id))?;

        if let Some(active) = guard.as_mut() {
            match active.child.try_wait() {
                Ok(Some(_)) => {
                    let serial = active.serial.clone();
                    *guard = None;
                    self.write_status(&RecordingStatus::idle(), trace_id)?;
                    info!(serial = %serial, "screen recording process exited on its own");
                    return Ok(RecordingStatus::idle());
                }
                Ok(None) => return Ok(RecordingStatus::active(active.serial.clone())),
                Err(err) => {
                    return Err(AppError::system(
                        format!("Failed to poll recording process: {err}"),
                        trace_id,
                    ))
                }
            }
        }

        Ok(self.read_status())
    }

    fn interrupt_device_recorder(&self, run_device: &DeviceRunner<'_>, serial: &str) {
        let args = vec![
            "-s".to_string(),
            serial.to_string(),
            "shell".to_string(),
            "pkill".to_string(),
            "-SIGINT".to_string(),
            "screenrecord".to_string(),
        ];
        if let Err(err) = run_device(&args, DEVICE_COMMAND_TIMEOUT) {
            warn!(serial = %serial, error = %err, "failed to interrupt device recorder");
        }
    }

    fn wait_for_exit(&self, child: &mut Child) {
        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => {
                    if start.elapsed() >= self.stop_wait {
                        let _ = child.kill();
                        let _ = child.wait();
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(_) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return;
                }
            }
        }
    }

    fn verify_remote_file(
        &self,
        run_device: &DeviceRunner<'_>,
        serial: &str,
        remote_path: &str,
    ) -> bool {
        let args = vec![
            "-s".to_string(),
            serial.to_string(),
            "shell".to_string(),
            "ls".to_string(),
            remote_path.to_string(),
        ];
        match run_device(&args, DEVICE_COMMAND_TIMEOUT) {
            Ok(output) => {
                output.succeeded()
                    && !output.stdout.contains("No such file")
                    && !output.stderr.contains("No such file")
            }
            Err(_) => false,
        }
    }

    fn write_status(&self, status: &RecordingStatus, trace_id: &str) -> Result<(), AppError> {
        if let Some(parent) = self.status_path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let payload = serde_json::to_string_pretty(status).map_err(|err| {
            AppError::system(format!("Failed to serialize recording status: {err}"), trace_id)
        })?;
        fs::write(&self.status_path, payload).map_err(|err| {
            AppError::system(format!("Failed to write recording status: {err}"), trace_id)
        })
    }

    fn read_status(&self) -> RecordingStatus {
        match fs::read_to_string(&self.status_path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|_| RecordingStatus::idle()),
            Err(_) => RecordingStatus::idle(),
        }
    }
}

impl Default for RecordingManager {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_screenrecord_args(
    serial: &str,
    remote_path: &str,
    options: &ScreenRecordSettings,
) -> Vec<String> {
    let mut args = vec![
        "-s".to_string(),
        serial.to_string(),
        "shell".to_string(),
        "screenrecord".to_string(),
    ];
    if !options.bit_rate.trim().is_empty() {
        args.push("--bit-rate".to_string());
        args.push(options.bit_rate.trim().to_string());
    }
    if options.time_limit_sec > 0 {
        args.push("--time-limit".to_string());
        args.push(options.time_limit_sec.to_string());
    }
    if !options.size.trim().is_empty() {
        args.push("--size".to_string());
        args.push(options.size.trim().to_string());
    }
    args.push(remote_path.to_string());
    args
}

/// Recording filenames follow the original tool: `adbtools-<timestamp>.mp4`.
pub fn generate_recording_file_name() -> String {
    format!("adbtools-{}.mp4", chrono::Local::now().format("%Y%m%d%H%M%S"))
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

fn ensure_valid_file_name(file_name: &str, trace_id: &str) -> Result<(), AppError> {
    ensure_non_empty(file_name, "file_name", trace_id)?;
    if file_name.contains('/') || file_name.contains('\\') {
        return Err(AppError::validation(
            "file_name must not contain path separators",
            trace_id,
        ));
    }
    Ok(())
}
