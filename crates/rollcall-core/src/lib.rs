//! rollcall-core — Face recognition and attendance-session logic.
//!
//! Uses UltraFace for face detection and a MobileFaceNet-style embedder
//! for 128-dimensional face embeddings, both running via ONNX Runtime for
//! CPU inference. Identity decisions are nearest-neighbor Euclidean
//! distance over an in-memory gallery built from reference images.

pub mod detector;
pub mod embedder;
pub mod encoder;
pub mod gallery;
pub mod matcher;
pub mod session;
pub mod types;

pub use encoder::{EncoderError, FaceEncoder, OnnxEncoder};
pub use encoder::{DETECTOR_MODEL_FILE, EMBEDDER_MODEL_FILE};
pub use gallery::Gallery;
pub use matcher::{MatchDecision, Matcher, NearestMatcher, DEFAULT_THRESHOLD, UNKNOWN_LABEL};
pub use session::Session;
pub use types::{DetectedFace, Embedding, FaceRegion, GalleryEntry};

use std::path::PathBuf;

/// Default directory searched for the ONNX model files.
pub fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}
