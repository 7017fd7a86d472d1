use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::warn;

use crate::app::error::AppError;
use crate::app::models::Device;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Connected(Device),
    Disconnected(String),
    StateChanged(Device),
}

/// Diffs two device snapshots into connection events. `known` is updated in
/// place so the caller can feed it straight into the next poll.
pub fn diff_snapshots(
    known: &mut HashMap<String, Device>,
    current: &[Device],
) -> Vec<DeviceEvent> {
    let mut events = Vec::new();

    for device in current {
        match known.get(&device.id) {
            None => {
                known.insert(device.id.clone(), device.clone());
                events.push(DeviceEvent::Connected(device.clone()));
            }
            Some(previous) if previous.status != device.status => {
                known.insert(device.id.clone(), device.clone());
                events.push(DeviceEvent::StateChanged(device.clone()));
            }
            Some(_) => {}
        }
    }

    let current_ids: Vec<&str> = current.iter().map(|device| device.id.as_str()).collect();
    let gone: Vec<String> = known
        .keys()
        .filter(|id| !current_ids.contains(&id.as_str()))
        .cloned()
        .collect();
    for id in gone {
        known.remove(&id);
        events.push(DeviceEvent::Disconnected(id));
    }

    events
}

/// Background poller emitting device events at a fixed interval. The poll
/// function is injected so callers (and tests) decide how snapshots are
/// produced; a failed poll is logged and skipped, not fatal.
pub struct DeviceWatcher {
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DeviceWatcher {
    pub fn start<P, C>(interval: Duration, poll: P, mut callback: C) -> Self
    where
        P: Fn() -> Result<Vec<Device>, AppError> + Send + 'static,
        C: FnMut(DeviceEvent) + Send + 'static,
    {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_flag);
        let handle = std::thread::spawn(move || {
            let mut known: HashMap<String, Device> = HashMap::new();
            while !stop.load(Ordering::Relaxed) {
                match poll() {
                    Ok(snapshot) => {
                        for event in diff_snapshots(&mut known, &snapshot) {
                            callback(event);
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "device poll failed");
                    }
                }
                // Sleep in short slices so stop requests take effect quickly.
                let mut remaining = interval;
                while !stop.load(Ordering::Relaxed) && remaining > Duration::ZERO {
                    let slice = remaining.min(Duration::from_millis(50));
                    std::thread::sleep(slice);
                    remaining = remaining.saturating_sub(slice);
                }
            }
        });

        Self {
            stop_flag,
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DeviceWatcher {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
