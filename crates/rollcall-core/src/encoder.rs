//! The face-encoding seam: an image in, located embeddings out.
//!
//! Everything above this trait treats detection and embedding as a black
//! box; tests substitute stubs here.

use crate::detector::{DetectorError, FaceDetector};
use crate::embedder::{EmbedderError, FaceEmbedder};
use crate::types::DetectedFace;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

/// File name of the detector model inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "version-RFB-320.onnx";
/// File name of the embedder model inside the model directory.
pub const EMBEDDER_MODEL_FILE: &str = "mobilefacenet.onnx";

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("detection failed: {0}")]
    Detector(#[from] DetectorError),
    #[error("embedding extraction failed: {0}")]
    Embedder(#[from] EmbedderError),
}

/// Turns one image into zero or more located face embeddings.
pub trait FaceEncoder {
    fn encode(&mut self, image: &DynamicImage) -> Result<Vec<DetectedFace>, EncoderError>;
}

/// Production encoder: UltraFace detection followed by MobileFaceNet
/// embedding per detected face.
pub struct OnnxEncoder {
    detector: FaceDetector,
    embedder: FaceEmbedder,
}

impl OnnxEncoder {
    pub fn new(detector: FaceDetector, embedder: FaceEmbedder) -> Self {
        Self { detector, embedder }
    }

    /// Load both ONNX models from explicit paths.
    pub fn load(detector_path: &str, embedder_path: &str) -> Result<Self, EncoderError> {
        let detector = FaceDetector::load(detector_path)?;
        let embedder = FaceEmbedder::load(embedder_path)?;
        Ok(Self::new(detector, embedder))
    }

    /// Load both ONNX models from their standard file names in `model_dir`.
    pub fn load_from_dir(model_dir: &Path) -> Result<Self, EncoderError> {
        Self::load(
            &model_dir.join(DETECTOR_MODEL_FILE).to_string_lossy(),
            &model_dir.join(EMBEDDER_MODEL_FILE).to_string_lossy(),
        )
    }
}

impl FaceEncoder for OnnxEncoder {
    fn encode(&mut self, image: &DynamicImage) -> Result<Vec<DetectedFace>, EncoderError> {
        let rgb = image.to_rgb8();
        let regions = self.detector.detect(&rgb)?;

        let mut faces = Vec::with_capacity(regions.len());
        for region in regions {
            let embedding = self.embedder.extract(&rgb, &region)?;
            faces.push(DetectedFace { region, embedding });
        }
        Ok(faces)
    }
}
