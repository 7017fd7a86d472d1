use super::*;

use crate::app::queue::LaneKind;

fn test_service(dir: &tempfile::TempDir) -> AdbService {
    let recorder = RecordingManager::with_status_path(dir.path().join("recording_status.json"));
    AdbService::with_parts(
        AppConfig::default(),
        "/definitely/not/a/real/adb".to_string(),
        recorder,
    )
}

#[test]
fn resolve_trace_id_keeps_caller_value() {
    assert_eq!(
        resolve_trace_id(Some("trace-42".to_string())),
        "trace-42"
    );
}

#[test]
fn resolve_trace_id_mints_uuid_when_absent() {
    let minted = resolve_trace_id(None);
    assert_eq!(Uuid::parse_str(&minted).expect("uuid").get_version_num(), 4);
    assert_ne!(resolve_trace_id(Some("  ".to_string())), "  ");
}

#[test]
fn exec_args_strip_the_adb_prefix() {
    let args = exec_args_from_command("adb devices -l", "trace").expect("args");
    assert_eq!(args, vec!["devices", "-l"]);

    let args = exec_args_from_command("  shell getprop ro.product.model ", "trace").expect("args");
    assert_eq!(args, vec!["shell", "getprop", "ro.product.model"]);
}

#[test]
fn exec_args_reject_empty_commands() {
    assert_eq!(
        exec_args_from_command("adb", "trace").expect_err("err").code,
        "ERR_VALIDATION"
    );
    assert_eq!(
        exec_args_from_command("   ", "trace").expect_err("err").code,
        "ERR_VALIDATION"
    );
}

#[test]
fn device_paths_must_be_absolute_without_traversal() {
    assert!(validate_device_path("/sdcard/Download").is_ok());
    assert!(validate_device_path("sdcard/Download").is_err());
    assert!(validate_device_path("").is_err());
    assert!(validate_device_path("/sdcard/../etc/passwd").is_err());
}

#[test]
fn screenshot_file_name_matches_original_format() {
    let name = generate_screenshot_file_name();
    let re = regex::Regex::new(r"^adbtools-\d{14}\.png$").expect("regex");
    assert!(re.is_match(&name), "unexpected file name: {name}");
}

#[test]
fn package_filter_maps_to_pm_flags() {
    assert_eq!(PackageFilter::All.pm_flag(), None);
    assert_eq!(PackageFilter::System.pm_flag(), Some("-s"));
    assert_eq!(PackageFilter::User.pm_flag(), Some("-3"));
}

#[test]
fn shell_args_prefix_serial_and_shell() {
    let args = shell_args("ABC", &["pm", "list", "packages"]);
    assert_eq!(args, vec!["-s", "ABC", "shell", "pm", "list", "packages"]);
}

#[test]
fn service_commands_route_to_the_expected_lanes() {
    // The service classifies the rendered argument string; these mirror the
    // commands the operations actually issue.
    assert_eq!(classify("devices -l"), LaneKind::Fast);
    assert_eq!(
        classify(&shell_args("ABC", &["pm", "list", "packages"]).join(" ")),
        LaneKind::Bulk
    );
    assert_eq!(
        classify(&shell_args("ABC", &["ls", "-la", "/sdcard"]).join(" ")),
        LaneKind::Bulk
    );
    assert_eq!(
        classify(&shell_args("ABC", &["screencap", "-p", "/sdcard/a.png"]).join(" ")),
        LaneKind::Normal
    );
    assert_eq!(
        classify(
            &shell_args(
                "ABC",
                &["monkey", "-p", "com.x", "-c", "android.intent.category.LAUNCHER", "1"]
            )
            .join(" ")
        ),
        LaneKind::Normal
    );
}

#[test]
fn queue_status_starts_idle_with_fixed_capacities() {
    let tmp = tempfile::TempDir::new().expect("tmp");
    let service = test_service(&tmp);
    let status = service.queue_status();
    assert_eq!(status.fast.max_concurrency, 2);
    assert_eq!(status.normal.max_concurrency, 2);
    assert_eq!(status.bulk.max_concurrency, 4);
    assert_eq!(status.fast.concurrency, 0);
    assert_eq!(status.fast.queue_length, 0);
}

#[test]
fn validation_failures_never_reach_the_spawner() {
    let tmp = tempfile::TempDir::new().expect("tmp");
    let service = test_service(&tmp);

    assert_eq!(
        service
            .list_files("", "/sdcard", Some("t1".to_string()))
            .expect_err("empty serial")
            .code,
        "ERR_VALIDATION"
    );
    assert_eq!(
        service
            .list_files("ABC", "relative/path", Some("t2".to_string()))
            .expect_err("relative path")
            .code,
        "ERR_VALIDATION"
    );
    assert_eq!(
        service
            .install_apk("ABC", "/no/such/file.apk", Some("t3".to_string()))
            .expect_err("missing apk")
            .code,
        "ERR_VALIDATION"
    );
    assert_eq!(
        service
            .push_file("ABC", "/no/such/local", "/sdcard/x", Some("t4".to_string()))
            .expect_err("missing local file")
            .code,
        "ERR_VALIDATION"
    );
    assert_eq!(
        service
            .delete_path("ABC", "/", true, Some("t5".to_string()))
            .expect_err("device root")
            .code,
        "ERR_VALIDATION"
    );
}

#[test]
fn recording_surface_round_trips_through_the_manager() {
    let tmp = tempfile::TempDir::new().expect("tmp");
    let service = test_service(&tmp);

    let status = service
        .recording_status(Some("t1".to_string()))
        .expect("status");
    assert_eq!(status.data, RecordingStatus::idle());

    // Starting against a nonexistent adb binary fails fast and stays idle.
    let err = service
        .start_recording("DEVICE-A", None, Some("t2".to_string()))
        .expect_err("missing binary");
    assert_eq!(err.code, "ERR_DEPENDENCY");
    assert_eq!(
        service
            .recording_status(Some("t3".to_string()))
            .expect("status")
            .data,
        RecordingStatus::idle()
    );
}

#[test]
fn check_adb_reports_unavailable_for_bogus_program() {
    let tmp = tempfile::TempDir::new().expect("tmp");
    let service = test_service(&tmp);
    let response = service.check_adb(Some("t1".to_string())).expect("response");
    assert!(!response.data.available);
    assert!(response.data.error.is_some());
    assert_eq!(response.trace_id, "t1");
}
