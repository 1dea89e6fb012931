//! Gallery of known faces built from a directory of reference images.

use crate::encoder::FaceEncoder;
use crate::types::GalleryEntry;
use std::path::Path;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Ordered, immutable set of known (name, embedding) pairs.
///
/// Built once at startup; an empty gallery is valid and means every
/// probe will come back Unknown.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn new(entries: Vec<GalleryEntry>) -> Self {
        Self { entries }
    }

    /// Build a gallery by encoding every reference image in `dir`.
    ///
    /// The entry name is the file stem; the embedding comes from the
    /// highest-confidence face in the file. Files with no detectable
    /// face and undecodable files are skipped with a warning; a missing
    /// directory yields an empty gallery. Entries are ordered by file
    /// name so gallery order is stable across runs.
    pub fn build(dir: &Path, encoder: &mut dyn FaceEncoder) -> Self {
        let read_dir = match std::fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(err) => {
                tracing::error!(
                    dir = %dir.display(),
                    error = %err,
                    "reference image directory not readable"
                );
                return Self::default();
            }
        };

        let mut paths: Vec<_> = read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| has_image_extension(path))
            .collect();
        paths.sort();

        let mut entries = Vec::new();
        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let image = match image::open(&path) {
                Ok(image) => image,
                Err(err) => {
                    tracing::warn!(
                        file = %path.display(),
                        error = %err,
                        "skipping unreadable reference image"
                    );
                    continue;
                }
            };

            match encoder.encode(&image) {
                Ok(faces) => match faces.into_iter().next() {
                    Some(face) => {
                        tracing::info!(name, "loaded reference face");
                        entries.push(GalleryEntry {
                            name: name.to_string(),
                            embedding: face.embedding,
                        });
                    }
                    None => {
                        tracing::warn!(
                            file = %path.display(),
                            "no face found in reference image"
                        );
                    }
                },
                Err(err) => {
                    tracing::warn!(
                        file = %path.display(),
                        error = %err,
                        "skipping reference image"
                    );
                }
            }
        }

        tracing::info!(count = entries.len(), dir = %dir.display(), "gallery built");
        Self { entries }
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Known names, in gallery order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{EncoderError, FaceEncoder};
    use crate::types::{DetectedFace, Embedding, FaceRegion};
    use image::{DynamicImage, RgbImage};
    use std::path::PathBuf;

    /// Reports one face for images at least 10px wide, none otherwise.
    struct StubEncoder;

    impl FaceEncoder for StubEncoder {
        fn encode(&mut self, image: &DynamicImage) -> Result<Vec<DetectedFace>, EncoderError> {
            if image.width() < 10 {
                return Ok(vec![]);
            }
            Ok(vec![DetectedFace {
                region: FaceRegion {
                    x: 0.0,
                    y: 0.0,
                    width: image.width() as f32,
                    height: image.height() as f32,
                    confidence: 0.9,
                },
                embedding: Embedding {
                    values: vec![image.width() as f32, 0.0],
                },
            }])
        }
    }

    fn write_image(dir: &Path, name: &str, size: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(size, size, image::Rgb([90, 120, 150]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_build_skips_faceless_and_non_images() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "alice.jpg", 16);
        write_image(dir.path(), "bob.jpg", 8); // stub finds no face
        std::fs::write(dir.path().join("readme.txt"), "not an image").unwrap();

        let gallery = Gallery::build(dir.path(), &mut StubEncoder);

        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.entries()[0].name, "alice");
        assert_eq!(gallery.entries()[0].embedding.values[0], 16.0);
    }

    #[test]
    fn test_build_order_is_sorted_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "zoe.png", 20);
        write_image(dir.path(), "amy.jpg", 24);
        write_image(dir.path(), "mia.jpeg", 28);

        let gallery = Gallery::build(dir.path(), &mut StubEncoder);

        let names: Vec<_> = gallery.names().collect();
        assert_eq!(names, vec!["amy", "mia", "zoe"]);
    }

    #[test]
    fn test_build_missing_directory_is_empty() {
        let gallery = Gallery::build(Path::new("/nonexistent/faces"), &mut StubEncoder);
        assert!(gallery.is_empty());
    }

    #[test]
    fn test_build_skips_undecodable_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("corrupt.jpg"), b"not really a jpeg").unwrap();
        write_image(dir.path(), "alice.jpg", 16);

        let gallery = Gallery::build(dir.path(), &mut StubEncoder);

        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.entries()[0].name, "alice");
    }

    #[test]
    fn test_extension_filter_case_insensitive() {
        assert!(has_image_extension(Path::new("a/B.JPG")));
        assert!(has_image_extension(Path::new("a/b.Png")));
        assert!(!has_image_extension(Path::new("a/b.txt")));
        assert!(!has_image_extension(Path::new("a/jpg")));
    }
}
