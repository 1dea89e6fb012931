//! UltraFace face detector via ONNX Runtime.
//!
//! Runs the version-RFB-320 UltraFace model. The graph takes a 320x240
//! RGB tensor and already decodes its priors internally, emitting
//! per-candidate [background, face] scores and normalized corner-form
//! boxes; post-processing is a score filter, NMS, and a scale back to
//! pixel coordinates.

use crate::types::FaceRegion;
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ULTRAFACE_INPUT_WIDTH: usize = 320;
const ULTRAFACE_INPUT_HEIGHT: usize = 240;
const ULTRAFACE_MEAN: f32 = 127.0;
const ULTRAFACE_STD: f32 = 128.0;
const ULTRAFACE_SCORE_THRESHOLD: f32 = 0.7;
const ULTRAFACE_NMS_THRESHOLD: f32 = 0.3;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download version-RFB-320.onnx from the Ultra-Light-Fast face detector release and place it in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Candidate detection in normalized [0, 1] corner coordinates.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

/// UltraFace-based face detector.
pub struct FaceDetector {
    session: Session,
    score_threshold: f32,
}

impl FaceDetector {
    /// Load the UltraFace ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded UltraFace model"
        );

        Ok(Self {
            session,
            score_threshold: ULTRAFACE_SCORE_THRESHOLD,
        })
    }

    /// Detect faces in an RGB image.
    ///
    /// Returns regions in pixel coordinates of the input image, sorted by
    /// confidence (highest first).
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceRegion>, DetectorError> {
        let input = preprocess(image);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        // Output order is [scores, boxes]: [1, N, 2] and [1, N, 4].
        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("scores: {e}")))?;
        let (_, boxes) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("boxes: {e}")))?;

        let candidates = decode_candidates(scores, boxes, self.score_threshold);
        let kept = nms(candidates, ULTRAFACE_NMS_THRESHOLD);

        Ok(to_regions(&kept, image.width(), image.height()))
    }
}

/// Resize to the model's 320x240 input and normalize into an NCHW tensor.
fn preprocess(image: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(
        image,
        ULTRAFACE_INPUT_WIDTH as u32,
        ULTRAFACE_INPUT_HEIGHT as u32,
        FilterType::Triangle,
    );

    let mut tensor = Array4::<f32>::zeros((1, 3, ULTRAFACE_INPUT_HEIGHT, ULTRAFACE_INPUT_WIDTH));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 - ULTRAFACE_MEAN) / ULTRAFACE_STD;
        }
    }
    tensor
}

/// Filter raw model outputs down to face candidates above the score
/// threshold.
///
/// `scores` is row-major [N, 2] ([background, face] per candidate) and
/// `boxes` row-major [N, 4] (normalized x1, y1, x2, y2).
fn decode_candidates(scores: &[f32], boxes: &[f32], threshold: f32) -> Vec<Candidate> {
    let count = scores.len() / 2;
    let mut candidates = Vec::new();

    for idx in 0..count {
        let score = scores[idx * 2 + 1];
        if score <= threshold {
            continue;
        }
        let off = idx * 4;
        if off + 3 >= boxes.len() {
            continue;
        }
        candidates.push(Candidate {
            score,
            x1: boxes[off],
            y1: boxes[off + 1],
            x2: boxes[off + 2],
            y2: boxes[off + 3],
        });
    }

    candidates
}

/// Non-Maximum Suppression: remove overlapping candidates.
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(candidates[i]);

        for j in (i + 1)..candidates.len() {
            if suppressed[j] {
                continue;
            }
            if iou(&candidates[i], &candidates[j]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Intersection-over-Union of two corner-form boxes.
fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a.x2 - a.x1).max(0.0) * (a.y2 - a.y1).max(0.0);
    let area_b = (b.x2 - b.x1).max(0.0) * (b.y2 - b.y1).max(0.0);
    let union = area_a + area_b - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Scale normalized candidates to pixel coordinates, clamping boxes that
/// the model pushed slightly outside [0, 1].
fn to_regions(candidates: &[Candidate], width: u32, height: u32) -> Vec<FaceRegion> {
    let w = width as f32;
    let h = height as f32;

    candidates
        .iter()
        .map(|c| {
            let x1 = c.x1.clamp(0.0, 1.0) * w;
            let y1 = c.y1.clamp(0.0, 1.0) * h;
            let x2 = c.x2.clamp(0.0, 1.0) * w;
            let y2 = c.y2.clamp(0.0, 1.0) * h;
            FaceRegion {
                x: x1,
                y: y1,
                width: (x2 - x1).max(0.0),
                height: (y2 - y1).max(0.0),
                confidence: c.score,
            }
        })
        .collect()
}
