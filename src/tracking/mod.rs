//! # Tracking Loop
//!
//! Vision-assisted flight: reads decoded frames from the decoder's stdout, runs
//! the detector on each one and issues yaw/altitude corrections through the same
//! actuator the command router uses. There is no arbitration with the pilot; the
//! last command to reach the drone wins.
//!
//! ```text
//! decoder stdout ──read_frame──► RawFrame ──Detector──► Detections
//!                                                           │ confidence >= threshold
//!                                                           ▼
//!                                 Actuator ◄── corrections(PixelBox)
//! ```
//!
//! Read failures (short reads, I/O errors) are logged and the read is retried
//! after a short pause. The loop only ends when the stop signal is raised.

pub mod detector;
pub mod geometry;

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::task;
use tracing::{debug, error, info, warn};

use crate::config::TrackingConfig;
use crate::drone::Actuator;
use crate::error::{Result, TelloPadError};
use detector::{Detector, RawFrame};
use geometry::{corrections, CorrectionSpeeds, PixelBox};

/// Tracking parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingSettings {
    pub frame_width: u32,
    pub frame_height: u32,
    /// Detections below this confidence are ignored (inclusive threshold)
    pub confidence_threshold: f32,
    pub speeds: CorrectionSpeeds,
    pub read_retry: Duration,
}

impl TrackingSettings {
    #[must_use]
    pub fn from_config(config: &TrackingConfig) -> Self {
        Self {
            frame_width: config.frame_width,
            frame_height: config.frame_height,
            confidence_threshold: config.confidence_threshold,
            speeds: CorrectionSpeeds {
                yaw: config.yaw_speed,
                altitude: config.altitude_speed,
            },
            read_retry: Duration::from_millis(config.read_retry_ms),
        }
    }

    #[must_use]
    pub fn frame_len(&self) -> usize {
        RawFrame::byte_len(self.frame_width, self.frame_height)
    }
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackingStats {
    pub frames: u64,
    pub read_failures: u64,
    pub detector_failures: u64,
}

/// Fills `buf` completely from `reader`.
///
/// # Errors
///
/// - `FrameRead`: the stream ended before a full frame arrived
/// - `Io`: the read itself failed
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(TelloPadError::FrameRead {
                expected: buf.len(),
                got: filled,
            });
        }
        filled += n;
    }
    Ok(())
}

pub struct TrackingLoop<D> {
    actuator: Arc<dyn Actuator>,
    detector: D,
    settings: TrackingSettings,
}

impl<D: Detector + 'static> TrackingLoop<D> {
    pub fn new(actuator: Arc<dyn Actuator>, detector: D, settings: TrackingSettings) -> Self {
        Self {
            actuator,
            detector,
            settings,
        }
    }

    /// Detects on one frame and issues corrections for every confident detection,
    /// in detector order. Returns how many detections were acted on.
    ///
    /// # Errors
    ///
    /// Returns the detector's error; nothing is issued in that case.
    pub fn process_frame(&mut self, frame: &RawFrame) -> Result<usize> {
        let detections = self.detector.detect(frame)?;
        let mut acted = 0;

        for detection in detections
            .iter()
            .filter(|d| d.confidence >= self.settings.confidence_threshold)
        {
            let pixel_box = PixelBox::from_normalized(&detection.bounding_box, frame.width(), frame.height());
            debug!("Tracking {:?} (confidence {:.2})", pixel_box, detection.confidence);
            for command in corrections(&pixel_box, frame.width(), frame.height(), self.settings.speeds) {
                self.actuator.issue(command);
            }
            acted += 1;
        }

        Ok(acted)
    }

    /// Runs until `stop` reads `true`.
    pub async fn run<R: AsyncRead + Unpin>(self, mut reader: R, mut stop: watch::Receiver<bool>) -> TrackingStats {
        let settings = self.settings;
        let mut stats = TrackingStats::default();
        let mut tracker = self;

        info!(
            "Tracking loop started ({}x{}, {} bytes per frame)",
            settings.frame_width,
            settings.frame_height,
            settings.frame_len()
        );

        loop {
            if *stop.borrow_and_update() {
                break;
            }

            let mut buf = vec![0u8; settings.frame_len()];
            let read = tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() {
                        debug!("Stop signal dropped");
                        break;
                    }
                    continue;
                }
                read = read_frame(&mut reader, &mut buf) => read,
            };

            if let Err(e) = read {
                stats.read_failures += 1;
                warn!("Frame read failed: {}", e);
                tokio::time::sleep(settings.read_retry).await;
                continue;
            }

            let frame = match RawFrame::new(settings.frame_width, settings.frame_height, buf) {
                Ok(frame) => frame,
                Err(e) => {
                    stats.read_failures += 1;
                    warn!("{}", e);
                    continue;
                }
            };
            stats.frames += 1;

            // Inference blocks; hand the tracker to the blocking pool and take it back
            let joined = task::spawn_blocking(move || {
                let outcome = tracker.process_frame(&frame);
                (tracker, outcome)
            })
            .await;

            match joined {
                Ok((returned, outcome)) => {
                    tracker = returned;
                    if let Err(e) = outcome {
                        stats.detector_failures += 1;
                        error!("Detection failed: {}", e);
                    }
                }
                Err(e) => {
                    error!("Detector task aborted: {}", e);
                    break;
                }
            }
        }

        info!(
            "Tracking loop stopped ({} frames, {} read failures, {} detector failures)",
            stats.frames, stats.read_failures, stats.detector_failures
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drone::mocks::RecordingActuator;
    use crate::drone::{Direction, DroneCommand};
    use detector::{BoundingBox, Detection};
    use std::collections::VecDeque;
    use std::io;

    /// Replays scripted detections and raises the stop signal once the script runs out.
    struct ScriptedDetector {
        script: VecDeque<Result<Vec<Detection>>>,
        stop: Option<watch::Sender<bool>>,
    }

    impl ScriptedDetector {
        fn new(script: Vec<Result<Vec<Detection>>>) -> Self {
            Self {
                script: script.into(),
                stop: None,
            }
        }

        fn stopping(mut self, stop: watch::Sender<bool>) -> Self {
            self.stop = Some(stop);
            self
        }
    }

    impl Detector for ScriptedDetector {
        fn detect(&mut self, _frame: &RawFrame) -> Result<Vec<Detection>> {
            let next = self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()));
            if self.script.is_empty() {
                if let Some(stop) = &self.stop {
                    stop.send_replace(true);
                }
            }
            next
        }
    }

    fn detection(confidence: f32, left: f32, top: f32, right: f32, bottom: f32) -> Detection {
        Detection {
            confidence,
            bounding_box: BoundingBox { left, top, right, bottom },
        }
    }

    fn settings() -> TrackingSettings {
        TrackingSettings::from_config(&TrackingConfig::default())
    }

    fn blank_frame(settings: &TrackingSettings) -> RawFrame {
        RawFrame::new(settings.frame_width, settings.frame_height, vec![0; settings.frame_len()]).unwrap()
    }

    #[test]
    fn test_settings_defaults() {
        let settings = settings();
        assert_eq!(settings.frame_len(), 360 * 240 * 3);
        assert_eq!(settings.confidence_threshold, 0.5);
        assert_eq!(settings.speeds, CorrectionSpeeds { yaw: 50, altitude: 25 });
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let actuator = Arc::new(RecordingActuator::new());
        let detector = ScriptedDetector::new(vec![
            Ok(vec![detection(0.5, 0.1, 0.1, 0.3, 0.3)]),
            Ok(vec![detection(0.499, 0.1, 0.1, 0.3, 0.3)]),
        ]);
        let settings = settings();
        let frame = blank_frame(&settings);
        let mut tracker = TrackingLoop::new(actuator.clone(), detector, settings);

        assert_eq!(tracker.process_frame(&frame).unwrap(), 1);
        assert_eq!(actuator.commands().len(), 2);

        actuator.clear();
        assert_eq!(tracker.process_frame(&frame).unwrap(), 0);
        assert!(actuator.commands().is_empty());
    }

    #[test]
    fn test_every_detection_issues_in_order() {
        let actuator = Arc::new(RecordingActuator::new());
        let detector = ScriptedDetector::new(vec![Ok(vec![
            detection(0.9, 0.1, 0.1, 0.3, 0.3),
            detection(0.2, 0.6, 0.6, 0.9, 0.9),
            detection(0.8, 0.6, 0.6, 0.9, 0.9),
        ])]);
        let settings = settings();
        let frame = blank_frame(&settings);
        let mut tracker = TrackingLoop::new(actuator.clone(), detector, settings);

        assert_eq!(tracker.process_frame(&frame).unwrap(), 2);
        assert_eq!(
            actuator.commands(),
            vec![
                DroneCommand::movement(Direction::CounterClockwise, 50),
                DroneCommand::movement(Direction::Up, 25),
                DroneCommand::movement(Direction::Clockwise, 50),
                DroneCommand::movement(Direction::Down, 25),
            ]
        );
    }

    #[test]
    fn test_detector_error_issues_nothing() {
        let actuator = Arc::new(RecordingActuator::new());
        let detector = ScriptedDetector::new(vec![Err(TelloPadError::Detector("boom".to_string()))]);
        let settings = settings();
        let frame = blank_frame(&settings);
        let mut tracker = TrackingLoop::new(actuator.clone(), detector, settings);

        assert!(tracker.process_frame(&frame).is_err());
        assert!(actuator.commands().is_empty());
    }

    #[tokio::test]
    async fn test_read_frame_short_read() {
        let mut reader: &[u8] = &[1, 2, 3, 4, 5];
        let mut buf = [0u8; 8];
        match read_frame(&mut reader, &mut buf).await {
            Err(TelloPadError::FrameRead { expected, got }) => {
                assert_eq!(expected, 8);
                assert_eq!(got, 5);
            }
            other => panic!("Expected FrameRead error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_frame_across_chunks() {
        let mut reader = tokio_test::io::Builder::new()
            .read(&[1, 2, 3])
            .read(&[4, 5])
            .read(&[6, 7, 8])
            .build();
        let mut buf = [0u8; 8];
        read_frame(&mut reader, &mut buf).await.unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[tokio::test]
    async fn test_loop_end_to_end() {
        let settings = TrackingSettings {
            read_retry: Duration::from_millis(1),
            ..settings()
        };
        let frame = vec![0u8; settings.frame_len()];
        let reader = tokio_test::io::Builder::new()
            .read(&frame[..1000])
            .read_error(io::Error::new(io::ErrorKind::BrokenPipe, "decoder restarted"))
            .read(&frame)
            .build();

        let (stop_tx, stop_rx) = watch::channel(false);
        let actuator = Arc::new(RecordingActuator::new());
        let detector = ScriptedDetector::new(vec![Ok(vec![detection(0.9, 0.1, 0.1, 0.3, 0.3)])]).stopping(stop_tx);

        let stats = TrackingLoop::new(actuator.clone(), detector, settings)
            .run(reader, stop_rx)
            .await;

        assert_eq!(stats.frames, 1);
        assert_eq!(stats.read_failures, 1);
        assert_eq!(
            actuator.commands(),
            vec![
                DroneCommand::movement(Direction::CounterClockwise, 50),
                DroneCommand::movement(Direction::Up, 25),
            ]
        );
    }

    #[tokio::test]
    async fn test_loop_stops_immediately_when_signalled() {
        let (stop_tx, stop_rx) = watch::channel(true);
        let actuator = Arc::new(RecordingActuator::new());
        let reader = tokio_test::io::Builder::new().build();

        let stats = TrackingLoop::new(actuator.clone(), ScriptedDetector::new(Vec::new()), settings())
            .run(reader, stop_rx)
            .await;

        drop(stop_tx);
        assert_eq!(stats, TrackingStats::default());
        assert!(actuator.commands().is_empty());
    }

    #[tokio::test]
    async fn test_loop_stops_while_waiting_for_frame() {
        let (stop_tx, stop_rx) = watch::channel(false);
        let actuator = Arc::new(RecordingActuator::new());
        // Never yields data
        let (reader, _writer) = tokio::io::duplex(64);

        let handle = tokio::spawn(
            TrackingLoop::new(actuator, ScriptedDetector::new(Vec::new()), settings()).run(reader, stop_rx),
        );
        tokio::task::yield_now().await;
        stop_tx.send_replace(true);

        let stats = handle.await.unwrap();
        assert_eq!(stats.frames, 0);
    }
}
