mod onnx;
pub mod preprocess;
pub mod tiny_face;

use crate::{
    config::DetectorConfig,
    types::{DisplaySize, FaceDetection, Frame},
};

pub use self::onnx::OrtFaceDetector;

/// Fixed per-call detector configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorOptions {
    pub input_size: u32,
    pub score_threshold: f32,
    pub iou_threshold: f32,
    pub max_faces: usize,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self::from(&DetectorConfig::default())
    }
}

impl From<&DetectorConfig> for DetectorOptions {
    fn from(cfg: &DetectorConfig) -> Self {
        Self {
            input_size: cfg.input_size,
            score_threshold: cfg.score_threshold,
            iou_threshold: cfg.iou_threshold,
            max_faces: cfg.max_faces,
        }
    }
}

/// All faces in a frame, with landmarks and expressions, in frame pixels.
pub trait FaceDetector: Send + 'static {
    fn detect_faces(
        &mut self,
        frame: &Frame,
        options: &DetectorOptions,
    ) -> anyhow::Result<Vec<FaceDetection>>;

    fn label(&self) -> &'static str;
}

/// Rescales detections from the frame they were computed on to the display.
pub fn resize_results(
    detections: &[FaceDetection],
    source: DisplaySize,
    display: DisplaySize,
) -> Vec<FaceDetection> {
    if source == display || source.width == 0 || source.height == 0 {
        return detections.to_vec();
    }
    let sx = display.width as f32 / source.width as f32;
    let sy = display.height as f32 / source.height as f32;
    detections.iter().map(|d| d.scaled(sx, sy)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{landmarks::FaceRegion, overlay::tests::sample_face, types::Point};

    #[test]
    fn default_options_match_detector_contract() {
        let options = DetectorOptions::default();
        assert_eq!(options.input_size, 512);
        assert_eq!(options.score_threshold, 0.5);
    }

    #[test]
    fn resize_scales_boxes_and_landmarks() {
        let face = sample_face();
        let resized = resize_results(
            &[face.clone()],
            DisplaySize {
                width: 320,
                height: 240,
            },
            DisplaySize {
                width: 640,
                height: 120,
            },
        );

        assert_eq!(resized.len(), 1);
        assert_eq!(resized[0].bbox, face.bbox.scaled(2.0, 0.5));
        let eye = resized[0].landmarks.region(FaceRegion::LeftEye)[0];
        assert_eq!(eye, Point::new(72.0, 36.0));
        assert_eq!(resized[0].score, face.score);
    }

    #[test]
    fn resize_to_same_size_is_identity() {
        let face = sample_face();
        let size = DisplaySize {
            width: 100,
            height: 100,
        };
        let resized = resize_results(&[face.clone()], size, size);
        assert_eq!(resized[0].bbox, face.bbox);
        assert_eq!(resized[0].landmarks, face.landmarks);
    }
}
