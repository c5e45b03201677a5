//! # Gamepad Module
//!
//! Gamepad detection, connection and input reading using the Linux evdev interface.
//!
//! The gamepad is an event source: [`spawn_reader`] runs a dedicated thread that
//! blocks on the device, maps each raw event through an [`EventMapper`] and
//! forwards the result, in arrival order, to the dispatcher's channel.

use evdev::Device;
use std::path::Path;
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::event::InputEvent;
use super::mapper::EventMapper;
use super::profile::ControllerProfile;
use crate::error::{Result, TelloPadError};

/// Gamepad handle
///
/// Represents an open evdev device for a supported controller model.
pub struct Gamepad {
    device: Device,
    device_path: String,
}

impl std::fmt::Debug for Gamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl Gamepad {
    /// Detect and open the first connected controller matching `profile`
    ///
    /// Scans all `/dev/input/event*` devices in sorted order and matches vendor
    /// and product IDs.
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: No matching controller found on the system
    /// - `Controller`: `/dev/input` missing or unreadable
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tellopad::controller::gamepad::Gamepad;
    /// use tellopad::controller::profile::ControllerModel;
    ///
    /// let gamepad = Gamepad::open(ControllerModel::DualShock4.profile())?;
    /// println!("Connected to controller at: {}", gamepad.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(profile: ControllerProfile) -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(TelloPadError::Controller(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| TelloPadError::Controller(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TelloPadError::Controller(format!("Failed to read directory entry: {}", e)))?;

        // Deterministic pick when several controllers are connected
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event_node {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    let id = device.input_id();
                    debug!(
                        "Found input device: {} (vendor: 0x{:04x}, product: 0x{:04x})",
                        path.display(),
                        id.vendor(),
                        id.product()
                    );

                    if profile.matches(id.vendor(), id.product()) {
                        let device_path = path.to_string_lossy().to_string();
                        info!("Found {} controller at: {}", profile.model, device_path);
                        return Ok(Gamepad { device, device_path });
                    }
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(TelloPadError::ControllerNotFound(profile.model.to_string()))
    }

    /// Open a specific `/dev/input/eventX` node without checking its ids
    ///
    /// # Errors
    ///
    /// Returns `Controller` error if the device cannot be opened.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let device = Device::open(path)
            .map_err(|e| TelloPadError::Controller(format!("Failed to open {}: {}", path.display(), e)))?;
        let device_path = path.to_string_lossy().to_string();
        info!("Opened controller at: {}", device_path);
        Ok(Gamepad { device, device_path })
    }

    /// Get the device path of this controller
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Get controller name from evdev
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Fetch events from the controller
    ///
    /// Blocks until at least one event is available.
    ///
    /// # Errors
    ///
    /// Returns `Controller` error if fetching events fails (e.g., controller disconnected).
    pub fn fetch_events(&mut self) -> Result<impl Iterator<Item = evdev::InputEvent> + '_> {
        self.device
            .fetch_events()
            .map_err(|e| TelloPadError::Controller(format!("Failed to fetch events: {}", e)))
    }
}

/// Reads the gamepad on its own thread and forwards mapped events to `tx`.
///
/// The thread ends when the device fails (there is no reconnection) or when the
/// receiving dispatcher is gone.
///
/// # Errors
///
/// Returns `Io` error if the thread cannot be spawned.
pub fn spawn_reader(
    mut gamepad: Gamepad,
    mapper: EventMapper,
    tx: mpsc::Sender<InputEvent>,
) -> Result<thread::JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("gamepad".to_string())
        .spawn(move || loop {
            let events = match gamepad.fetch_events() {
                Ok(events) => events,
                Err(e) => {
                    error!("{}", e);
                    return;
                }
            };
            for input in events.filter_map(|event| mapper.map(&event)) {
                if tx.blocking_send(input).is_err() {
                    debug!("Gamepad dispatcher closed");
                    return;
                }
            }
        })?;
    Ok(handle)
}
