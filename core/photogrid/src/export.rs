use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage};

use crate::composite::{composite, CompositeSettings};
use crate::error::CollageError;
use crate::layout::LayoutDescriptor;
use crate::store::CellStore;
use crate::{ExportOptions, ExportResult, OutputScale};

/// Lowest and highest device-pixel-ratio multiplier for screen layouts.
const MIN_SCREEN_SCALE: f64 = 2.0;
const MAX_SCREEN_SCALE: f64 = 4.0;

/// Suggested download name for a template's export.
pub fn export_filename(template_id: &str) -> String {
    format!("template-{template_id}.png")
}

/// Device pixels per logical pixel for `layout`.
///
/// Print layouts already carry DPI-derived pixel counts and always use 1.0.
pub(crate) fn resolve_scale(layout: &LayoutDescriptor, scale: OutputScale) -> f64 {
    if layout.is_print() {
        return 1.0;
    }
    match scale {
        OutputScale::Screen { device_pixel_ratio } if device_pixel_ratio.is_nan() => MIN_SCREEN_SCALE,
        OutputScale::Screen { device_pixel_ratio } => device_pixel_ratio.clamp(MIN_SCREEN_SCALE, MAX_SCREEN_SCALE),
        OutputScale::Exact(scale) => scale,
    }
}

/// Encode a raster as PNG.
pub(crate) fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CollageError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(image.as_raw(), image.width(), image.height(), image::ExtendedColorType::Rgba8)
        .map_err(|e| CollageError::EncodeError(e.to_string()))?;
    Ok(buffer)
}

/// Full export pipeline: snapshot → scale → composite → encode.
///
/// Reads the store through a snapshot and never writes to it.
pub(crate) fn export_pipeline(
    layout: &LayoutDescriptor,
    store: &CellStore,
    filename: String,
    options: &ExportOptions,
) -> Result<ExportResult, CollageError> {
    let cells = store.snapshot();
    let populated = layout
        .placements()
        .iter()
        .filter(|p| cells.get(&p.key).is_some())
        .count();
    if populated == 0 {
        return Err(CollageError::NoContent);
    }

    let settings = CompositeSettings {
        scale: resolve_scale(layout, options.scale),
        pan_aware: options.pan_aware,
        filter: options.filter,
    };
    let surface = composite(layout, &cells, &settings)?;
    let data = encode_png(&surface)?;

    tracing::debug!(
        filename = %filename,
        width = surface.width(),
        height = surface.height(),
        bytes = data.len(),
        "collage exported"
    );

    Ok(ExportResult {
        data,
        filename,
        width: surface.width(),
        height: surface.height(),
    })
}
