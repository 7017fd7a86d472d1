use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::app::error::AppError;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

pub fn run_adb(program: &str, args: &[String], trace_id: &str) -> Result<CommandOutput, AppError> {
    run_command_with_timeout(program, args, DEFAULT_COMMAND_TIMEOUT, trace_id)
}

pub fn run_command_with_timeout(
    program: &str,
    args: &[String],
    timeout: Duration,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| AppError::system(format!("Failed to spawn command: {err}"), trace_id))?;

    // Both pipes are drained on their own threads; a chatty child would
    // otherwise block once the pipe buffer fills and look like a timeout.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stdout", trace_id))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stderr", trace_id))?;

    let stdout_handle = std::thread::spawn(move || drain(stdout));
    let stderr_handle = std::thread::spawn(move || drain(stderr));

    let start = Instant::now();
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout_handle.join();
                    let _ = stderr_handle.join();
                    return Err(AppError::system("Command timed out", trace_id));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                let _ = stdout_handle.join();
                let _ = stderr_handle.join();
                return Err(AppError::system(
                    format!("Failed to poll command: {err}"),
                    trace_id,
                ));
            }
        }
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).to_string(),
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
        exit_code,
    })
}

fn drain(mut reader: impl Read) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(count) => buffer.extend_from_slice(&chunk[..count]),
            Err(_) => break,
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_output_and_exit_code() {
        let (program, args) = if cfg!(windows) {
            ("cmd.exe", vec!["/C".to_string(), "echo hello".to_string()])
        } else {
            ("sh", vec!["-c".to_string(), "echo hello".to_string()])
        };
        let output = run_adb(program, &args, "trace-echo").expect("run");
        assert_eq!(output.exit_code, Some(0));
        assert!(output.succeeded());
        assert!(output.stdout.contains("hello"));
    }

    #[test]
    fn kills_on_timeout() {
        let (program, args) = if cfg!(windows) {
            (
                "cmd.exe",
                vec!["/C".to_string(), "ping 127.0.0.1 -n 30".to_string()],
            )
        } else {
            ("sh", vec!["-c".to_string(), "sleep 30".to_string()])
        };
        let err = run_command_with_timeout(
            program,
            &args,
            Duration::from_millis(200),
            "trace-timeout",
        )
        .expect_err("expected timeout");
        assert_eq!(err.code, "ERR_SYSTEM");
        assert!(err.error.to_lowercase().contains("timed out"));
    }

    #[test]
    fn does_not_deadlock_on_large_stdout() {
        // Regression guard: undrained pipes stall the child once the buffer
        // fills, and a fast command then "hangs" until the timeout.
        let (program, args, min_len) = if cfg!(windows) {
            (
                "cmd.exe".to_string(),
                vec![
                    "/C".to_string(),
                    "for /L %i in (1,1,100000) do @echo 1234567890".to_string(),
                ],
                1_000_000usize,
            )
        } else {
            (
                "sh".to_string(),
                vec![
                    "-c".to_string(),
                    "i=0; while [ $i -lt 100000 ]; do echo 1234567890; i=$((i+1)); done"
                        .to_string(),
                ],
                1_000_000usize,
            )
        };

        let output =
            run_command_with_timeout(&program, &args, Duration::from_secs(10), "trace-large")
                .expect("large output");
        assert_eq!(output.exit_code, Some(0));
        assert!(output.stdout.len() >= min_len);
    }
}
