use std::path::Path;
use std::sync::Arc;

use image::RgbImage;

use crate::error::DetectorError;
use crate::face_detector::{FaceBounds, FaceDetector};

/// File name of the SeetaFace frontal model inside the model directory.
pub const MODEL_FILE: &str = "seeta_fd_frontal_v1.0.bin";

/// Lowest score threshold the SeetaFace cascade is run with.
///
/// SeetaFace scores are raw classifier margins, not probabilities in `[0, 1]`.
/// Frontal faces typically score well above this value.
pub const SEETA_SCORE_THRESHOLD: f64 = 2.0;

/// Engine threshold for a caller's confidence floor. Floors below
/// [`SEETA_SCORE_THRESHOLD`] (such as the default `0.2`) have no effect of
/// their own; higher floors tighten the cascade itself.
fn score_threshold(min_confidence: f64) -> f64 {
    if min_confidence.is_finite() {
        min_confidence.max(SEETA_SCORE_THRESHOLD)
    } else {
        SEETA_SCORE_THRESHOLD
    }
}

/// Face detector backed by the `rustface` crate (SeetaFace engine).
pub struct RustfaceDetector {
    model: rustface::Model,
}

impl RustfaceDetector {
    /// Load `MODEL_FILE` from `base_path`.
    pub fn from_model_dir(base_path: impl AsRef<Path>) -> Result<Self, DetectorError> {
        let path = base_path.as_ref().join(MODEL_FILE);
        let bytes = std::fs::read(&path)
            .map_err(|e| DetectorError::new(format!("cannot read {}: {e}", path.display())))?;
        Self::from_model_bytes(&bytes)
    }

    /// Parse a SeetaFace model already in memory.
    pub fn from_model_bytes(bytes: &[u8]) -> Result<Self, DetectorError> {
        let model = rustface::read_model(std::io::Cursor::new(bytes))
            .map_err(|e| DetectorError::new(format!("invalid SeetaFace model: {e}")))?;
        Ok(Self { model })
    }

    /// Loader for [`crate::SharedDetector`] that reads the model from `base_path`
    /// on first use.
    pub fn loader(
        base_path: impl AsRef<Path>,
    ) -> impl Fn() -> Result<Arc<dyn FaceDetector>, DetectorError> + Send + Sync + 'static {
        let base_path = base_path.as_ref().to_path_buf();
        move || Ok(Arc::new(RustfaceDetector::from_model_dir(&base_path)?) as Arc<dyn FaceDetector>)
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&self, image: &RgbImage, min_confidence: f64) -> Result<Vec<FaceBounds>, DetectorError> {
        let gray = image::imageops::grayscale(image);
        let (width, height) = gray.dimensions();

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(20);
        let threshold = score_threshold(min_confidence);
        detector.set_score_thresh(threshold);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));

        Ok(faces
            .iter()
            .filter(|face| face.score() >= threshold)
            .map(|face| {
                let bbox = face.bbox();
                FaceBounds {
                    x: bbox.x() as f64,
                    y: bbox.y() as f64,
                    width: bbox.width() as f64,
                    height: bbox.height() as f64,
                    confidence: face.score(),
                }
            })
            .collect())
    }
}
