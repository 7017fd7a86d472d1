use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use adbtools_rust::app::config::load_config;
use adbtools_rust::app::error::AppError;
use adbtools_rust::app::logging::init_logging;
use adbtools_rust::app::models::QueueStatus;
use adbtools_rust::app::queue::{classify, CommandDispatcher, LaneKind};
use adbtools_rust::app::service::AdbService;

#[derive(Debug, Clone)]
struct Args {
    json: bool,
    with_device: bool,
}

#[derive(Serialize)]
struct SmokeSummary {
    tool: &'static str,
    status: &'static str,
    trace_id: String,
    adb_program: String,
    queue: QueueStatus,
    checks: Vec<SmokeCheck>,
}

#[derive(Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: &'static str, // pass|fail|skip
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut json = false;
    let mut with_device = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            "--with-device" => with_device = true,
            "-h" | "--help" => {
                return Err(
                    "Usage: cargo run --bin smoke -- [--json] [--with-device]\n".to_string(),
                )
            }
            other => return Err(format!("Unknown arg: {other}")),
        }
    }
    Ok(Args { json, with_device })
}

/// Exercises the dispatcher with fake operations: more submissions than
/// capacity, concurrency sampled from inside the jobs.
fn dispatcher_check() -> Result<String, AppError> {
    let dispatcher = CommandDispatcher::new();

    let running = Arc::new(AtomicUsize::new(0));
    let max_running = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let running = Arc::clone(&running);
        let max_running = Arc::clone(&max_running);
        handles.push(dispatcher.submit(LaneKind::Normal, move || {
            let current = running.fetch_add(1, Ordering::SeqCst) + 1;
            max_running.fetch_max(current, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }));
    }
    for handle in handles {
        handle.wait()?;
    }

    let observed = max_running.load(Ordering::SeqCst);
    if observed > 2 {
        return Err(AppError::system(
            format!("normal lane exceeded its capacity: {observed}"),
            "smoke",
        ));
    }
    Ok(format!("peak concurrency {observed}/2"))
}

fn classifier_check() -> Result<String, AppError> {
    let cases: HashMap<&str, LaneKind> = HashMap::from([
        ("devices -l", LaneKind::Fast),
        ("shell pm list packages -f", LaneKind::Bulk),
        ("shell pm path com.example.app", LaneKind::Bulk),
        ("shell getprop ro.product.model", LaneKind::Normal),
    ]);
    for (command, expected) in cases {
        let actual = classify(command);
        if actual != expected {
            return Err(AppError::system(
                format!("'{command}' routed to {} instead of {}", actual.as_str(), expected.as_str()),
                "smoke",
            ));
        }
    }
    Ok("4 routing cases".to_string())
}

fn main() {
    init_logging();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let trace_id = Uuid::new_v4().to_string();
    let mut checks = Vec::new();
    let mut status = "pass";

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {err}");
            std::process::exit(1);
        }
    };
    let service = AdbService::new(config);

    match classifier_check() {
        Ok(detail) => checks.push(SmokeCheck {
            name: "classifier_routing",
            status: "pass",
            detail: Some(detail),
            error: None,
        }),
        Err(err) => {
            status = "fail";
            checks.push(SmokeCheck {
                name: "classifier_routing",
                status: "fail",
                detail: None,
                error: Some(err.to_string()),
            });
        }
    }

    match dispatcher_check() {
        Ok(detail) => checks.push(SmokeCheck {
            name: "dispatcher_capacity",
            status: "pass",
            detail: Some(detail),
            error: None,
        }),
        Err(err) => {
            status = "fail";
            checks.push(SmokeCheck {
                name: "dispatcher_capacity",
                status: "fail",
                detail: None,
                error: Some(err.to_string()),
            });
        }
    }

    if args.with_device {
        match service.list_devices(Some(trace_id.clone())) {
            Ok(response) => {
                let online = response
                    .data
                    .iter()
                    .filter(|device| device.is_online())
                    .count();
                checks.push(SmokeCheck {
                    name: "list_devices",
                    status: "pass",
                    detail: Some(format!("{} device(s), {online} online", response.data.len())),
                    error: None,
                });
            }
            Err(err) => {
                status = "fail";
                checks.push(SmokeCheck {
                    name: "list_devices",
                    status: "fail",
                    detail: None,
                    error: Some(err.to_string()),
                });
            }
        }

        match service.recording_status(Some(trace_id.clone())) {
            Ok(response) => checks.push(SmokeCheck {
                name: "recording_status",
                status: "pass",
                detail: Some(format!(
                    "isRecording={} deviceId={:?}",
                    response.data.is_recording, response.data.device_id
                )),
                error: None,
            }),
            Err(err) => {
                status = "fail";
                checks.push(SmokeCheck {
                    name: "recording_status",
                    status: "fail",
                    detail: None,
                    error: Some(err.to_string()),
                });
            }
        }
    } else {
        checks.push(SmokeCheck {
            name: "list_devices",
            status: "skip",
            detail: None,
            error: None,
        });
        checks.push(SmokeCheck {
            name: "recording_status",
            status: "skip",
            detail: None,
            error: None,
        });
    }

    let summary = SmokeSummary {
        tool: "adbtools_backend_smoke",
        status,
        trace_id,
        adb_program: service.adb_program().to_string(),
        queue: service.queue_status(),
        checks,
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        println!("status: {}", summary.status);
        println!("adb: {}", summary.adb_program);
        for check in &summary.checks {
            match (&check.detail, &check.error) {
                (Some(detail), _) => println!("  {}: {} ({detail})", check.name, check.status),
                (None, Some(error)) => println!("  {}: {} ({error})", check.name, check.status),
                (None, None) => println!("  {}: {}", check.name, check.status),
            }
        }
    }

    if summary.status != "pass" {
        std::process::exit(1);
    }
}
