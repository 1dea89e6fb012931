//! MobileFaceNet-style face embedder via ONNX Runtime.
//!
//! Extracts 128-dimensional embeddings from face crops. The crop is the
//! detector box expanded by a fixed margin and resized to 112x112; the
//! output is L2-normalized so Euclidean distances are comparable across
//! probes.

use crate::types::{Embedding, FaceRegion};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const EMBED_INPUT_SIZE: usize = 112;
const EMBED_MEAN: f32 = 127.5;
const EMBED_STD: f32 = 127.5;
/// Output dimensionality of the MobileFaceNet graph.
pub const EMBEDDING_DIM: usize = 128;
/// Context kept around the detector box on each side, as a fraction of
/// the box size.
const CROP_MARGIN: f32 = 0.2;

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("model file not found: {0} — place mobilefacenet.onnx in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// MobileFaceNet-based face embedder.
pub struct FaceEmbedder {
    session: Session,
}

impl FaceEmbedder {
    /// Load the embedder ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, EmbedderError> {
        if !Path::new(model_path).exists() {
            return Err(EmbedderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded embedder model"
        );

        Ok(Self { session })
    }

    /// Extract an embedding for one detected face region.
    pub fn extract(
        &mut self,
        image: &RgbImage,
        region: &FaceRegion,
    ) -> Result<Embedding, EmbedderError> {
        let crop = crop_with_margin(image, region, CROP_MARGIN);
        let input = preprocess(&crop);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != EMBEDDING_DIM {
            return Err(EmbedderError::InferenceFailed(format!(
                "expected {EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(Embedding::l2_normalized(raw.to_vec()))
    }
}

/// Crop the region expanded by `margin` on each side, clamped to the
/// image bounds. Always returns at least a 1x1 crop.
fn crop_with_margin(image: &RgbImage, region: &FaceRegion, margin: f32) -> RgbImage {
    let img_w = image.width() as f32;
    let img_h = image.height() as f32;

    let mx = region.width * margin;
    let my = region.height * margin;

    let x0 = (region.x - mx).clamp(0.0, img_w - 1.0);
    let y0 = (region.y - my).clamp(0.0, img_h - 1.0);
    let x1 = (region.x + region.width + mx).clamp(x0 + 1.0, img_w);
    let y1 = (region.y + region.height + my).clamp(y0 + 1.0, img_h);

    image::imageops::crop_imm(
        image,
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    )
    .to_image()
}

/// Resize a crop to 112x112 and normalize into an NCHW float tensor.
fn preprocess(crop: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(
        crop,
        EMBED_INPUT_SIZE as u32,
        EMBED_INPUT_SIZE as u32,
        FilterType::Triangle,
    );

    let mut tensor = Array4::<f32>::zeros((1, 3, EMBED_INPUT_SIZE, EMBED_INPUT_SIZE));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 - EMBED_MEAN) / EMBED_STD;
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: f32, y: f32, w: f32, h: f32) -> FaceRegion {
        FaceRegion {
            x,
            y,
            width: w,
            height: h,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_crop_interior_region_includes_margin() {
        let image = RgbImage::new(100, 100);
        let crop = crop_with_margin(&image, &region(40.0, 40.0, 20.0, 20.0), 0.2);
        // 20px box + 4px margin each side.
        assert_eq!(crop.dimensions(), (28, 28));
    }

    #[test]
    fn test_crop_clamps_at_image_border() {
        let image = RgbImage::new(100, 100);
        let crop = crop_with_margin(&image, &region(0.0, 0.0, 10.0, 10.0), 0.2);
        assert_eq!(crop.dimensions(), (12, 12));
    }

    #[test]
    fn test_crop_region_beyond_right_edge() {
        let image = RgbImage::new(50, 50);
        let crop = crop_with_margin(&image, &region(40.0, 40.0, 30.0, 30.0), 0.2);
        // Clamped to the remaining 16x16 corner (34..50).
        assert_eq!(crop.dimensions(), (16, 16));
    }

    #[test]
    fn test_crop_degenerate_region_is_nonempty() {
        let image = RgbImage::new(10, 10);
        let crop = crop_with_margin(&image, &region(9.5, 9.5, 0.0, 0.0), 0.2);
        assert!(crop.width() >= 1 && crop.height() >= 1);
    }

    #[test]
    fn test_preprocess_output_shape() {
        let crop = RgbImage::new(28, 28);
        let tensor = preprocess(&crop);
        assert_eq!(tensor.shape(), &[1, 3, EMBED_INPUT_SIZE, EMBED_INPUT_SIZE]);
    }

    #[test]
    fn test_preprocess_normalization_range() {
        // Black → -1.0, white → +1.0.
        let black = preprocess(&RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0])));
        let white = preprocess(&RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255])));
        assert!((black[[0, 0, 0, 0]] + 1.0).abs() < 1e-6);
        assert!((white[[0, 0, 0, 0]] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_preprocess_channels_follow_input() {
        let crop = RgbImage::from_pixel(8, 8, image::Rgb([255, 0, 255]));
        let tensor = preprocess(&crop);
        assert!(tensor[[0, 0, 50, 50]] > 0.9);
        assert!(tensor[[0, 1, 50, 50]] < -0.9);
        assert!(tensor[[0, 2, 50, 50]] > 0.9);
    }
}
