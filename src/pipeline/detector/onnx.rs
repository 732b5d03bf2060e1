use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    DetectorOptions, FaceDetector,
    preprocess::{self, CropTransform},
    tiny_face::{self, FaceBox},
};
use crate::{
    landmarks::{FaceLandmarks68, NUM_FACE_LANDMARKS},
    types::{FaceDetection, FaceExpressions, Frame, Point},
};

const NUM_EXPRESSIONS: usize = 7;

pub struct OrtFaceDetector {
    face_detector: Session,
    landmark_net: Session,
    expression_net: Session,
}

fn load_session(model_path: &Path) -> Result<Session> {
    Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(2)?
        .commit_from_file(model_path)
        .with_context(|| format!("failed to load ORT session from {}", model_path.display()))
}

impl OrtFaceDetector {
    /// Builds the three inference sessions in parallel.
    pub fn new(face_detector: &Path, landmark_net: &Path, expression_net: &Path) -> Result<Self> {
        let (face_detector, (landmark_net, expression_net)) = rayon::join(
            || load_session(face_detector),
            || {
                rayon::join(
                    || load_session(landmark_net),
                    || load_session(expression_net),
                )
            },
        );
        Ok(Self {
            face_detector: face_detector?,
            landmark_net: landmark_net?,
            expression_net: expression_net?,
        })
    }

    fn detect_boxes(&mut self, frame: &Frame, options: &DetectorOptions) -> Result<Vec<FaceBox>> {
        let (input, letterbox) = preprocess::prepare_frame(frame, options.input_size)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .face_detector
            .run(ort::inputs![tensor])
            .context("failed to run face detector session")?;
        if outputs.len() < 1 {
            return Err(anyhow!("face detector returned no outputs"));
        }

        let grid = outputs[0].try_extract_array::<f32>()?;
        let shape = grid.shape().to_vec();
        let flat: Vec<f32> = grid.iter().copied().collect();
        tiny_face::decode_tiny_face_output(&flat, &shape, &letterbox, options.input_size, options)
    }

    fn run_on_crop(session: &mut Session, crop: ndarray::Array4<f32>) -> Result<Vec<f32>> {
        let tensor = Tensor::from_array(crop)?;
        let outputs = session
            .run(ort::inputs![tensor])
            .context("failed to run face crop session")?;
        if outputs.len() < 1 {
            return Err(anyhow!("face crop model returned no outputs"));
        }
        let values = outputs[0].try_extract_array::<f32>()?;
        Ok(values.iter().copied().collect())
    }

    fn describe_face(&mut self, frame: &Frame, face: FaceBox) -> Result<FaceDetection> {
        let (crop, transform) = preprocess::prepare_face_crop(frame, &face.bbox)?;

        let raw_landmarks = Self::run_on_crop(&mut self.landmark_net, crop.clone())?;
        let landmarks = decode_landmarks(&raw_landmarks, &transform)?;

        let raw_expressions = Self::run_on_crop(&mut self.expression_net, crop)?;
        let expressions = decode_expressions(&raw_expressions)?;

        Ok(FaceDetection {
            bbox: face.bbox,
            score: face.score,
            landmarks,
            expressions,
        })
    }
}

impl FaceDetector for OrtFaceDetector {
    fn detect_faces(
        &mut self,
        frame: &Frame,
        options: &DetectorOptions,
    ) -> Result<Vec<FaceDetection>> {
        let boxes = self.detect_boxes(frame, options)?;
        let mut faces = Vec::with_capacity(boxes.len());
        for face in boxes {
            match self.describe_face(frame, face) {
                Ok(detection) => faces.push(detection),
                Err(err) => log::warn!("landmark/expression pass failed: {err:?}"),
            }
        }
        Ok(faces)
    }

    fn label(&self) -> &'static str {
        "ort"
    }
}

/// 136 values, `x, y` pairs relative to the square crop input.
fn decode_landmarks(flat: &[f32], transform: &CropTransform) -> Result<FaceLandmarks68> {
    if flat.len() < NUM_FACE_LANDMARKS * 2 {
        return Err(anyhow!(
            "unexpected landmarks length: got {}, need {}",
            flat.len(),
            NUM_FACE_LANDMARKS * 2
        ));
    }
    let points: Vec<Point> = flat
        .chunks_exact(2)
        .take(NUM_FACE_LANDMARKS)
        .map(|xy| transform.project(xy[0], xy[1]))
        .collect();
    FaceLandmarks68::new(points).ok_or_else(|| anyhow!("landmark count mismatch"))
}

/// Accepts either probabilities or raw logits.
fn decode_expressions(flat: &[f32]) -> Result<FaceExpressions> {
    if flat.len() < NUM_EXPRESSIONS {
        return Err(anyhow!(
            "unexpected expression output length: got {}, need {NUM_EXPRESSIONS}",
            flat.len()
        ));
    }
    let mut scores = [0.0_f32; NUM_EXPRESSIONS];
    scores.copy_from_slice(&flat[..NUM_EXPRESSIONS]);

    let sum: f32 = scores.iter().sum();
    let is_distribution = scores.iter().all(|s| (0.0..=1.0).contains(s)) && (sum - 1.0).abs() < 1e-3;
    if !is_distribution {
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut total = 0.0;
        for s in scores.iter_mut() {
            *s = (*s - max).exp();
            total += *s;
        }
        for s in scores.iter_mut() {
            *s /= total;
        }
    }
    Ok(FaceExpressions::from_scores(scores))
}
