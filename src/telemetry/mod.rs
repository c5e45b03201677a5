//! # Telemetry Module
//!
//! Records drone flight data to JSONL files with rotation.
//!
//! This module handles:
//! - Sampling the latest [`FlightData`] on a fixed interval
//! - Formatting each sample as one JSON line with an RFC 3339 timestamp
//! - Rotating to a new file after N records and keeping only the newest M files
//!
//! Recording is best-effort: failures are logged and never reach the control path.

use chrono::{Local, SecondsFormat};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::drone::FlightData;
use crate::error::Result;

const FILE_PREFIX: &str = "flight-";
const FILE_EXTENSION: &str = "jsonl";

/// One JSONL line.
#[derive(Debug, Serialize)]
pub struct TelemetryRecord {
    pub timestamp: String,
    #[serde(flatten)]
    pub data: FlightData,
}

/// Appends records to rotating JSONL files in one directory.
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    files_opened: u64,
}

impl TelemetryLogger {
    /// Creates the log directory if needed. No file is opened until the first record.
    ///
    /// # Errors
    ///
    /// Returns `Io` error if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(dir: P, max_records_per_file: usize, max_files_to_keep: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            files_opened: 0,
        })
    }

    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        Self::new(&config.log_dir, config.max_records_per_file, config.max_files_to_keep)
    }

    /// Appends one record, rotating first if the current file is full.
    ///
    /// # Errors
    ///
    /// Returns `Io` error if the file cannot be opened or written.
    pub fn record(&mut self, data: &FlightData) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = TelemetryRecord {
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            data: *data,
        };
        let line = serde_json::to_string(&record).map_err(std::io::Error::from)?;

        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.files_opened += 1;
        let name = format!(
            "{}{}-{:04}.{}",
            FILE_PREFIX,
            Local::now().format("%Y%m%dT%H%M%S"),
            self.files_opened,
            FILE_EXTENSION
        );
        let path = self.dir.join(name);
        let file = File::create(&path)?;
        debug!("Telemetry file: {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.prune()
    }

    /// Deletes the oldest log files beyond `max_files_to_keep`.
    fn prune(&self) -> Result<()> {
        let mut files = log_files(&self.dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }
        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            debug!("Removing old telemetry file {}", path.display());
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Telemetry files in `dir`, unsorted.
///
/// # Errors
///
/// Returns `Io` error if the directory cannot be read.
pub fn log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with(FILE_PREFIX))
            .unwrap_or(false)
            && path.extension().map(|ext| ext == FILE_EXTENSION).unwrap_or(false);
        if is_log {
            files.push(path);
        }
    }
    Ok(files)
}

/// Samples `flight_data` every `log_interval_ms` and records it.
///
/// Returns `None` when telemetry is disabled or the log directory is unusable.
pub fn spawn_recorder(
    config: &TelemetryConfig,
    mut flight_data: watch::Receiver<Option<FlightData>>,
) -> Option<JoinHandle<()>> {
    if !config.enabled {
        return None;
    }

    let mut logger = match TelemetryLogger::from_config(config) {
        Ok(logger) => logger,
        Err(e) => {
            warn!("Telemetry disabled: {}", e);
            return None;
        }
    };
    let period = Duration::from_millis(config.log_interval_ms);
    info!("Recording telemetry to {} every {:?}", config.log_dir, period);

    Some(tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if flight_data.has_changed().is_err() {
                debug!("Flight data source closed, stopping recorder");
                return;
            }
            let latest = *flight_data.borrow_and_update();
            if let Some(data) = latest {
                if let Err(e) = logger.record(&data) {
                    warn!("Telemetry write failed: {}", e);
                }
            }
        }
    }))
}
