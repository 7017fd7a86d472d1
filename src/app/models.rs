use serde::{Deserialize, Serialize};

/// One row of `adb devices -l`, enriched with per-property reads when the
/// caller asked for details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub status: String,
    pub model: Option<String>,
    pub android_version: Option<String>,
    pub api_level: Option<String>,
    pub manufacturer: Option<String>,
    pub battery_level: Option<u8>,
}

impl Device {
    pub fn new(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
            model: None,
            android_version: None,
            api_level: None,
            manufacturer: None,
            battery_level: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == "device"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageDetail {
    pub package_name: String,
    pub version_name: Option<String>,
    pub version_code: Option<String>,
    pub first_install_time: Option<String>,
    pub is_system: bool,
    pub is_running: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceFileEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub permissions: String,
    pub size_bytes: Option<u64>,
    pub modified_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdbInfo {
    pub available: bool,
    pub version_output: String,
    pub command_path: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse<T> {
    pub trace_id: String,
    pub data: T,
}

/// Wire shape of one lane in the queue monitor. Field names follow the
/// original UI contract, hence the camelCase rename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LaneStatus {
    pub name: String,
    pub queue_length: usize,
    pub concurrency: usize,
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueStatus {
    pub fast: LaneStatus,
    pub normal: LaneStatus,
    pub bulk: LaneStatus,
}

/// Durable recording state, mirrored to disk on every transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatus {
    pub is_recording: bool,
    pub device_id: Option<String>,
}

impl RecordingStatus {
    pub fn idle() -> Self {
        Self {
            is_recording: false,
            device_id: None,
        }
    }

    pub fn active(device_id: impl Into<String>) -> Self {
        Self {
            is_recording: true,
            device_id: Some(device_id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_status_serializes_with_camel_case_keys() {
        let json = serde_json::to_string(&RecordingStatus::active("ABC")).expect("serialize");
        assert!(json.contains("\"isRecording\":true"));
        assert!(json.contains("\"deviceId\":\"ABC\""));

        let idle: RecordingStatus =
            serde_json::from_str("{\"isRecording\":false,\"deviceId\":null}").expect("parse");
        assert_eq!(idle, RecordingStatus::idle());
    }

    #[test]
    fn lane_status_serializes_with_camel_case_keys() {
        let status = LaneStatus {
            name: "bulk".to_string(),
            queue_length: 3,
            concurrency: 2,
            max_concurrency: 4,
        };
        let json = serde_json::to_string(&status).expect("serialize");
        assert!(json.contains("\"queueLength\":3"));
        assert!(json.contains("\"maxConcurrency\":4"));
    }

    #[test]
    fn device_reports_online_state() {
        assert!(Device::new("A", "device").is_online());
        assert!(!Device::new("A", "unauthorized").is_online());
        assert!(!Device::new("A", "offline").is_online());
    }
}
