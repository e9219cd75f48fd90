use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};

use crate::composite::allocate_surface;
use crate::cover::blend_onto;
use crate::error::CollageError;
use crate::export::encode_png;
use crate::face_detector::{FaceBounds, SharedDetector};

/// Images larger than this on either side are downscaled before detection.
pub const DETECT_MAX_DIMENSION: u32 = 640;

/// Minimum detector confidence for a box to count as a face.
pub const MIN_CONFIDENCE: f64 = 0.2;

/// Largest share of the container's width or height the face box may take.
pub const TARGET_FILL: f64 = 0.5;

/// Background of auto-crop output where the scaled image does not reach.
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Settings for [`center_crop_face`].
#[derive(Debug, Clone, Copy)]
pub struct AutoCropOptions {
    /// Output width in pixels.
    pub container_width: u32,
    /// Output height in pixels.
    pub container_height: u32,
    /// Largest share of either container axis the face may fill (default: 0.5).
    pub target_fill: f64,
    /// Longest side of the copy handed to the detector (default: 640).
    pub detect_max_dimension: u32,
    /// Detector confidence floor (default: 0.2).
    pub min_confidence: f64,
    /// Filter used for both the detection downscale and the final render.
    pub filter: FilterType,
}

impl AutoCropOptions {
    /// Defaults for a `container_width × container_height` output.
    pub fn new(container_width: u32, container_height: u32) -> Self {
        Self {
            container_width,
            container_height,
            target_fill: TARGET_FILL,
            detect_max_dimension: DETECT_MAX_DIMENSION,
            min_confidence: MIN_CONFIDENCE,
            filter: FilterType::Lanczos3,
        }
    }

    /// Set the largest share of either axis the face may fill.
    pub fn target_fill(mut self, fill: f64) -> Self {
        self.target_fill = fill;
        self
    }

    /// Set the longest side of the detection copy.
    pub fn detect_max_dimension(mut self, dimension: u32) -> Self {
        self.detect_max_dimension = dimension;
        self
    }

    /// Set the detector confidence floor.
    pub fn min_confidence(mut self, confidence: f64) -> Self {
        self.min_confidence = confidence;
        self
    }

    /// Set the resampling filter.
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

/// Why [`center_crop_face`] returned the input unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// The detector could not be loaded (sticky for the detector's lifetime).
    DetectorUnavailable(String),
    /// The detector ran and reported an error.
    DetectorFailed(String),
    /// No box reached the confidence floor.
    NoFace,
    /// The chosen box has no area, so no framing scale exists.
    DegenerateFace,
}

/// Outcome of a face-centring auto-crop.
#[derive(Debug, Clone)]
pub enum FaceCrop {
    /// A face was found and the image re-rendered around it, PNG-encoded.
    Framed {
        /// PNG bytes of the framed image.
        data: Vec<u8>,
        /// Chosen face in original-image coordinates.
        face: FaceBounds,
        /// Output width in pixels.
        width: u32,
        /// Output height in pixels.
        height: u32,
    },
    /// The original bytes, untouched.
    Fallback {
        /// The input, as given.
        data: Vec<u8>,
        /// Why no framing happened.
        reason: FallbackReason,
    },
}

impl FaceCrop {
    /// Output bytes, framed or original.
    pub fn data(&self) -> &[u8] {
        match self {
            FaceCrop::Framed { data, .. } | FaceCrop::Fallback { data, .. } => data,
        }
    }

    /// Take the output bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            FaceCrop::Framed { data, .. } | FaceCrop::Fallback { data, .. } => data,
        }
    }

    /// Whether a face was found and framed.
    pub fn is_framed(&self) -> bool {
        matches!(self, FaceCrop::Framed { .. })
    }
}

/// Size of the detection copy and the factor it was scaled by
/// (`scaled_width / original_width`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionScale {
    /// Width of the detection copy.
    pub width: u32,
    /// Height of the detection copy.
    pub height: u32,
    /// `scaled / original`, at most 1.
    pub factor: f64,
}

/// Downscale `width × height` so the longer side is at most `max_dimension`.
pub fn detection_scale(width: u32, height: u32, max_dimension: u32) -> DetectionScale {
    if width <= max_dimension && height <= max_dimension {
        return DetectionScale {
            width,
            height,
            factor: 1.0,
        };
    }

    let (scaled_w, scaled_h) = if width >= height {
        let h = ((height as f64 / width as f64) * max_dimension as f64).round() as u32;
        (max_dimension, h.max(1))
    } else {
        let w = ((width as f64 / height as f64) * max_dimension as f64).round() as u32;
        (w.max(1), max_dimension)
    };

    DetectionScale {
        width: scaled_w,
        height: scaled_h,
        factor: scaled_w as f64 / width as f64,
    }
}

/// The face with the largest box. Ties go to the earliest in detector order.
pub fn select_largest(faces: &[FaceBounds]) -> Option<&FaceBounds> {
    faces.iter().fold(None, |best: Option<&FaceBounds>, face| match best {
        Some(current) if current.area() >= face.area() => Some(current),
        _ => Some(face),
    })
}

/// Uniform scale plus translation that puts a face at the container centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramingTransform {
    /// Uniform zoom applied to the source.
    pub scale: f64,
    /// Horizontal translation of the scaled source, in output pixels.
    pub offset_x: f64,
    /// Vertical translation of the scaled source, in output pixels.
    pub offset_y: f64,
}

/// Framing for `face` (original-image coordinates) in a
/// `container_w × container_h` output.
///
/// The scale is the smaller of the two axis-fill ratios, so the face box
/// takes at most `target_fill` of either dimension.
pub fn framing_transform(
    face: &FaceBounds,
    container_w: u32,
    container_h: u32,
    target_fill: f64,
) -> Option<FramingTransform> {
    let (cw, ch) = (container_w as f64, container_h as f64);
    let scale = (cw * target_fill / face.width).min(ch * target_fill / face.height);
    if !scale.is_finite() || scale <= 0.0 {
        return None;
    }

    let (face_cx, face_cy) = face.center();
    Some(FramingTransform {
        scale,
        offset_x: cw / 2.0 - face_cx * scale,
        offset_y: ch / 2.0 - face_cy * scale,
    })
}

/// Draw `image`, scaled and translated by `transform`, onto a white
/// `container_w × container_h` canvas.
///
/// Only the part of the source that lands on the canvas is resampled, so a
/// large zoom never materialises the full scaled image.
pub fn render_framed(
    image: &DynamicImage,
    container_w: u32,
    container_h: u32,
    transform: &FramingTransform,
    filter: FilterType,
) -> Result<RgbaImage, CollageError> {
    let mut canvas = allocate_surface(container_w, container_h)?;
    let FramingTransform {
        scale,
        offset_x,
        offset_y,
    } = *transform;
    let (iw, ih) = (image.width() as f64, image.height() as f64);

    // Visible source window, widened to whole pixels.
    let sx0 = (-offset_x / scale).max(0.0).floor();
    let sy0 = (-offset_y / scale).max(0.0).floor();
    let sx1 = ((container_w as f64 - offset_x) / scale).min(iw).ceil();
    let sy1 = ((container_h as f64 - offset_y) / scale).min(ih).ceil();
    if sx1 <= sx0 || sy1 <= sy0 {
        return Ok(canvas);
    }

    let dx0 = (offset_x + sx0 * scale).round();
    let dy0 = (offset_y + sy0 * scale).round();
    let dx1 = (offset_x + sx1 * scale).round();
    let dy1 = (offset_y + sy1 * scale).round();
    let (dest_w, dest_h) = ((dx1 - dx0).max(1.0) as u32, (dy1 - dy0).max(1.0) as u32);

    let window = image.crop_imm(sx0 as u32, sy0 as u32, (sx1 - sx0) as u32, (sy1 - sy0) as u32);
    let tile = window.resize_exact(dest_w, dest_h, filter).to_rgba8();
    blend_onto(&mut canvas, &tile, dx0 as i64, dy0 as i64);

    Ok(canvas)
}

/// Re-render `input` so the largest detected face sits at the centre of a
/// `container_width × container_height` PNG.
///
/// Detector problems (load failure, inference error, no faces) are not
/// errors: the original bytes come back as [`FaceCrop::Fallback`]. Bytes
/// that do not decode fail with [`CollageError::DecodeError`].
pub fn center_crop_face(
    input: &[u8],
    detector: &SharedDetector,
    options: &AutoCropOptions,
) -> Result<FaceCrop, CollageError> {
    let fallback = |reason: FallbackReason| -> Result<FaceCrop, CollageError> {
        tracing::info!(?reason, "auto-crop fell back to the original image");
        Ok(FaceCrop::Fallback {
            data: input.to_vec(),
            reason,
        })
    };

    let detector = match detector.initialize() {
        Ok(detector) => detector,
        Err(e) => return fallback(FallbackReason::DetectorUnavailable(e.to_string())),
    };

    let original = image::load_from_memory(input).map_err(|e| CollageError::DecodeError(e.to_string()))?;
    if original.width() == 0 || original.height() == 0 {
        return Err(CollageError::DecodeError("image has zero dimensions".into()));
    }

    let detect_scale = detection_scale(original.width(), original.height(), options.detect_max_dimension);
    let detect_copy = if detect_scale.factor < 1.0 {
        original
            .resize_exact(detect_scale.width, detect_scale.height, options.filter)
            .to_rgb8()
    } else {
        original.to_rgb8()
    };

    let faces = match detector.detect(&detect_copy, options.min_confidence) {
        Ok(faces) => faces,
        Err(e) => {
            tracing::warn!(error = %e, "face detector failed");
            return fallback(FallbackReason::DetectorFailed(e.to_string()));
        }
    };
    let Some(best) = select_largest(&faces) else {
        return fallback(FallbackReason::NoFace);
    };

    let face = best.unscaled(detect_scale.factor);
    let Some(transform) =
        framing_transform(&face, options.container_width, options.container_height, options.target_fill)
    else {
        return fallback(FallbackReason::DegenerateFace);
    };

    let canvas = render_framed(
        &original,
        options.container_width,
        options.container_height,
        &transform,
        options.filter,
    )?;
    let data = encode_png(&canvas)?;

    tracing::info!(
        faces = faces.len(),
        scale = transform.scale,
        width = canvas.width(),
        height = canvas.height(),
        "face centred"
    );

    Ok(FaceCrop::Framed {
        data,
        face,
        width: canvas.width(),
        height: canvas.height(),
    })
}
