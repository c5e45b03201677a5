//! # Detector
//!
//! Single-shot detector (SSD) plumbing around an external inference runtime.
//!
//! ## Input
//!
//! A packed BGR24 frame is resized to the network input size and laid out as a
//! `1 x 3 x H x W` f32 blob with the per-channel mean `(104, 177, 123)`
//! subtracted. Scale is 1.0 and channels are not swapped.
//!
//! ## Output
//!
//! The `detection_out` tensor is a flat list of 7-float rows:
//!
//! ```text
//! [image_id, class_id, confidence, left, top, right, bottom]
//! ```
//!
//! with box edges normalized to `[0, 1]`.

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

use crate::error::{Result, TelloPadError};

/// Per-channel mean subtracted from the blob, in frame channel order.
pub const CHANNEL_MEAN: [f32; 3] = [104.0, 177.0, 123.0];

/// Floats per SSD output row.
pub const SSD_ROW_LEN: usize = 7;

/// Box edges normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

/// One decoded frame: `width * height * 3` bytes of packed BGR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RawFrame {
    /// Byte length of a `width` x `height` BGR24 frame.
    #[must_use]
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// # Errors
    ///
    /// Returns `FrameRead` error if `data` is not exactly one frame long.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(TelloPadError::FrameRead {
                expected,
                got: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// External object detector.
pub trait Detector: Send {
    /// Returns every detection in `frame`, unfiltered.
    fn detect(&mut self, frame: &RawFrame) -> Result<Vec<Detection>>;
}

/// Builds the network input blob for `frame`.
///
/// # Errors
///
/// Returns `Detector` error if the input size is zero.
pub fn preprocess(frame: &RawFrame, input_width: u32, input_height: u32) -> Result<Array4<f32>> {
    if input_width == 0 || input_height == 0 {
        return Err(TelloPadError::Detector(format!(
            "invalid input size {}x{}",
            input_width, input_height
        )));
    }

    // Channels stay in BGR order; RgbImage is only used as a 3-channel container
    let image = RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| TelloPadError::Detector("frame buffer does not match its size".to_string()))?;
    let resized = imageops::resize(&image, input_width, input_height, FilterType::Triangle);

    let mut blob = Array4::<f32>::zeros((1, 3, input_height as usize, input_width as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for (c, mean) in CHANNEL_MEAN.iter().enumerate() {
            blob[[0, c, y as usize, x as usize]] = f32::from(pixel.0[c]) - mean;
        }
    }
    Ok(blob)
}

/// Parses a flat SSD output; a trailing partial row is ignored.
#[must_use]
pub fn parse_ssd_output(output: &[f32]) -> Vec<Detection> {
    output
        .chunks_exact(SSD_ROW_LEN)
        .map(|row| Detection {
            confidence: row[2],
            bounding_box: BoundingBox {
                left: row[3],
                top: row[4],
                right: row[5],
                bottom: row[6],
            },
        })
        .collect()
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxDetector;

#[cfg(feature = "onnx")]
mod onnx {
    use std::fs::File;
    use std::path::Path;

    use ort::session::builder::GraphOptimizationLevel;
    use ort::session::Session;
    use ort::value::Tensor;
    use tracing::info;

    use super::{parse_ssd_output, preprocess, Detection, Detector, RawFrame};
    use crate::error::{Result, TelloPadError};

    fn ort_error(e: ort::Error) -> TelloPadError {
        TelloPadError::Detector(e.to_string())
    }

    /// SSD face detector running on ONNX Runtime.
    pub struct OnnxDetector {
        session: Session,
        input_width: u32,
        input_height: u32,
    }

    impl OnnxDetector {
        /// Loads the network graph `topology` whose tensor data lives in `weights`.
        ///
        /// # Errors
        ///
        /// Returns `Detector` error if either file is unreadable, the weights do not
        /// sit beside the graph or the runtime rejects the model.
        pub fn load<P: AsRef<Path>>(topology: P, weights: P, input_width: u32, input_height: u32) -> Result<Self> {
            let topology = topology.as_ref();
            let weights = weights.as_ref();

            for path in [topology, weights] {
                File::open(path).map_err(|e| {
                    TelloPadError::Detector(format!("Error reading network model from {}: {}", path.display(), e))
                })?;
            }

            // External tensor data is resolved relative to the graph file
            if topology.parent() != weights.parent() {
                return Err(TelloPadError::Detector(format!(
                    "{} must be in the same directory as {}",
                    weights.display(),
                    topology.display()
                )));
            }

            let session = Session::builder()
                .map_err(ort_error)?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(ort_error)?
                .commit_from_file(topology)
                .map_err(ort_error)?;

            info!("Loaded detector {} ({}x{})", topology.display(), input_width, input_height);
            Ok(Self {
                session,
                input_width,
                input_height,
            })
        }
    }

    impl Detector for OnnxDetector {
        fn detect(&mut self, frame: &RawFrame) -> Result<Vec<Detection>> {
            let blob = preprocess(frame, self.input_width, self.input_height)?;
            let input = Tensor::from_array(blob).map_err(ort_error)?;
            let outputs = self
                .session
                .run(ort::inputs![input].map_err(ort_error)?)
                .map_err(ort_error)?;
            let output = outputs[0].try_extract_tensor::<f32>().map_err(ort_error)?;
            let flat: Vec<f32> = output.iter().copied().collect();
            Ok(parse_ssd_output(&flat))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_frame(width: u32, height: u32, bgr: [u8; 3]) -> RawFrame {
        let data = bgr.iter().copied().cycle().take(RawFrame::byte_len(width, height)).collect();
        RawFrame::new(width, height, data).unwrap()
    }

    #[test]
    fn test_frame_size() {
        assert_eq!(RawFrame::byte_len(360, 240), 259_200);
        match RawFrame::new(4, 4, vec![0; 10]) {
            Err(TelloPadError::FrameRead { expected, got }) => {
                assert_eq!(expected, 48);
                assert_eq!(got, 10);
            }
            other => panic!("Expected FrameRead error, got: {:?}", other),
        }
    }

    #[test]
    fn test_preprocess_shape() {
        let frame = uniform_frame(360, 240, [0, 0, 0]);
        let blob = preprocess(&frame, 128, 96).unwrap();
        assert_eq!(blob.shape(), &[1, 3, 96, 128]);
    }

    #[test]
    fn test_preprocess_subtracts_mean_per_channel() {
        let frame = uniform_frame(36, 24, [104, 177, 123]);
        let blob = preprocess(&frame, 12, 8).unwrap();
        assert!(blob.iter().all(|v| v.abs() < 1.0));

        let frame = uniform_frame(36, 24, [0, 0, 0]);
        let blob = preprocess(&frame, 12, 8).unwrap();
        assert!((blob[[0, 0, 3, 3]] + 104.0).abs() < 1.0);
        assert!((blob[[0, 1, 3, 3]] + 177.0).abs() < 1.0);
        assert!((blob[[0, 2, 3, 3]] + 123.0).abs() < 1.0);
    }

    #[test]
    fn test_preprocess_rejects_zero_input() {
        let frame = uniform_frame(4, 4, [1, 2, 3]);
        assert!(matches!(preprocess(&frame, 0, 96), Err(TelloPadError::Detector(_))));
    }

    #[test]
    fn test_parse_ssd_output() {
        let output = [
            0.0, 1.0, 0.9, 0.1, 0.1, 0.3, 0.3, //
            0.0, 1.0, 0.2, 0.5, 0.5, 0.6, 0.7, //
            0.0, 1.0, 0.7, // truncated
        ];
        let detections = parse_ssd_output(&output);
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].confidence, 0.9);
        assert_eq!(
            detections[1].bounding_box,
            BoundingBox { left: 0.5, top: 0.5, right: 0.6, bottom: 0.7 }
        );
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_ssd_output(&[]).is_empty());
    }
}
