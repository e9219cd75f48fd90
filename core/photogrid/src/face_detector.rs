use std::sync::{Arc, OnceLock};

use image::RgbImage;

use crate::error::{CollageError, DetectorError};

/// Bounding box of a detected face within an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBounds {
    /// X coordinate of the top-left corner (pixels).
    pub x: f64,
    /// Y coordinate of the top-left corner (pixels).
    pub y: f64,
    /// Width of the bounding box (pixels).
    pub width: f64,
    /// Height of the bounding box (pixels).
    pub height: f64,
    /// Detection confidence score.
    pub confidence: f64,
}

impl FaceBounds {
    /// Box area in square pixels.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Centre point of the box.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Map a box found on an image resized by `factor` back to the original
    /// image's coordinates.
    pub fn unscaled(&self, factor: f64) -> Self {
        Self {
            x: self.x / factor,
            y: self.y / factor,
            width: self.width / factor,
            height: self.height / factor,
            confidence: self.confidence,
        }
    }
}

/// Pluggable face detection backend.
///
/// Implement this trait to plug in any detector (ONNX, dlib, a browser API
/// bridge, ...). Only boxes scoring at least `min_confidence` should be returned.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in `image`.
    fn detect(&self, image: &RgbImage, min_confidence: f64) -> Result<Vec<FaceBounds>, DetectorError>;
}

type Loader = Box<dyn Fn() -> Result<Arc<dyn FaceDetector>, DetectorError> + Send + Sync>;

/// A detector that is loaded lazily, exactly once.
///
/// The first [`SharedDetector::initialize`] call runs the loader. Callers that
/// arrive while it is running block on the same initialization instead of
/// starting their own. The outcome is kept for the lifetime of the value, and
/// a failed load is never retried.
pub struct SharedDetector {
    loader: Loader,
    state: OnceLock<Result<Arc<dyn FaceDetector>, String>>,
}

impl SharedDetector {
    /// Defer loading to the first [`SharedDetector::initialize`] call.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn FaceDetector>, DetectorError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            state: OnceLock::new(),
        }
    }

    /// Wrap an already constructed detector.
    pub fn ready(detector: Arc<dyn FaceDetector>) -> Self {
        let state = OnceLock::new();
        let _ = state.set(Ok(detector));
        Self {
            loader: Box::new(|| Err(DetectorError::new("detector was supplied pre-initialized"))),
            state,
        }
    }

    /// A detector that never loads. Auto-cropping with it always falls back.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(move || Err(DetectorError::new(reason.clone())))
    }

    /// The process-wide detector. The first call installs `loader`; later
    /// calls ignore their argument and share the first instance.
    pub fn global<F>(loader: F) -> &'static SharedDetector
    where
        F: Fn() -> Result<Arc<dyn FaceDetector>, DetectorError> + Send + Sync + 'static,
    {
        static GLOBAL: OnceLock<SharedDetector> = OnceLock::new();
        GLOBAL.get_or_init(|| SharedDetector::new(loader))
    }

    /// Load the detector if needed and return it.
    pub fn initialize(&self) -> Result<Arc<dyn FaceDetector>, CollageError> {
        let state = self.state.get_or_init(|| {
            tracing::debug!("loading face detector");
            match (self.loader)() {
                Ok(detector) => Ok(detector),
                Err(e) => {
                    tracing::warn!(error = %e, "face detector failed to load");
                    Err(e.0)
                }
            }
        });
        match state {
            Ok(detector) => Ok(Arc::clone(detector)),
            Err(message) => Err(CollageError::DetectorInit(message.clone())),
        }
    }

    /// Whether initialization has finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        self.state.get().is_some()
    }
}

impl std::fmt::Debug for SharedDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state.get() {
            None => "uninitialized",
            Some(Ok(_)) => "ready",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("SharedDetector").field("state", &state).finish()
    }
}
