//! Grid photo collages: per-cell image state, template layouts, cover-fit
//! compositing, high-resolution PNG export, and face-centred auto-cropping.
//!
//! # Example
//!
//! ```no_run
//! use photogrid::{export_png, CellStore, ExportOptions, Template};
//!
//! let template = Template::Grid2x2;
//! let mut cells = CellStore::new();
//! cells.upload(template.key("grid", 0, 0), std::fs::read("a.jpg").unwrap()).unwrap();
//! cells.upload(template.key("grid", 1, 1), std::fs::read("b.png").unwrap()).unwrap();
//! cells.set_offset(&template.key("grid", 0, 0), 30.0, 50.0);
//!
//! let result = export_png(&template.layout(), &cells, template.filename(), &ExportOptions::default()).unwrap();
//! std::fs::write(&result.filename, &result.data).unwrap();
//! ```
#![warn(missing_docs)]

mod autocrop;
mod composite;
mod cover;
mod drag;
mod error;
mod export;
/// Face detection traits and data types.
pub mod face_detector;
mod layout;
#[cfg(feature = "rustface")]
/// Built-in SeetaFace-based face detector backend.
pub mod rustface_backend;
mod store;
mod template;

/// Face-centring auto-crop pipeline and its geometry helpers.
pub use autocrop::{
    center_crop_face, detection_scale, framing_transform, render_framed, select_largest, AutoCropOptions,
    DetectionScale, FaceCrop, FallbackReason, FramingTransform, BACKGROUND, DETECT_MAX_DIMENSION, MIN_CONFIDENCE,
    TARGET_FILL,
};
/// Grid compositor.
pub use composite::{composite, CompositeSettings, MAX_SURFACE_PIXELS};
/// Cover-fit geometry and drawing.
pub use cover::{centered_source_rect, cover_source_rect, draw_cover, render_cover_tile, SourceRect};
/// Drag-to-pan state machine.
pub use drag::{DragController, DragSession, DragState};
/// Error types returned by photogrid operations.
pub use error::{CollageError, DetectorError};
pub use export::export_filename;
/// Face detection trait, bounding-box type and lazily loaded detector.
pub use face_detector::{FaceBounds, FaceDetector, SharedDetector};
/// Resampling filters accepted by [`ExportOptions::filter`] and [`AutoCropOptions::filter`].
pub use image::imageops::FilterType;
/// Layout descriptors and their geometry.
pub use layout::{CellPlacement, DestRect, LayoutBuilder, LayoutDescriptor, PhysicalSize, Sizing, MAX_GRID_CELLS};
#[cfg(feature = "rustface")]
/// Built-in detector that loads the SeetaFace model from a directory.
pub use rustface_backend::RustfaceDetector;
/// Cell store and its snapshot.
pub use store::{cell_key, BackgroundPosition, CellEntry, CellSnapshot, CellStore, ImageRef, Offset};
/// Built-in templates.
pub use template::Template;

/// How many device pixels a logical pixel becomes on export.
///
/// Only applies to screen layouts. Print layouts always render at their
/// DPI-derived size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputScale {
    /// Follow the display's device-pixel ratio, clamped to `[2, 4]` so the
    /// output is sharp on low-density screens without unbounded memory on
    /// dense ones.
    Screen {
        /// `window.devicePixelRatio` or equivalent.
        device_pixel_ratio: f64,
    },

    /// Use this multiplier as given.
    Exact(f64),
}

impl Default for OutputScale {
    fn default() -> Self {
        OutputScale::Screen {
            device_pixel_ratio: 1.0,
        }
    }
}

/// Settings for [`export_png`].
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    scale: OutputScale,
    pan_aware: bool,
    filter: FilterType,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: OutputScale::default(),
            pan_aware: true,
            filter: FilterType::CatmullRom,
        }
    }
}

impl ExportOptions {
    /// Default options: screen scale at device-pixel ratio 1 (clamped to 2),
    /// pan-aware crops, bicubic resampling.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output scale (default: `OutputScale::Screen { device_pixel_ratio: 1.0 }`).
    pub fn scale(mut self, scale: OutputScale) -> Self {
        self.scale = scale;
        self
    }

    /// Shorthand for `scale(OutputScale::Screen { device_pixel_ratio })`.
    pub fn device_pixel_ratio(self, device_pixel_ratio: f64) -> Self {
        self.scale(OutputScale::Screen { device_pixel_ratio })
    }

    /// Honour each cell's pan offset in the export (default: true).
    ///
    /// With `false`, every cell is centre-cropped regardless of how it was
    /// panned on screen.
    pub fn pan_aware(mut self, enable: bool) -> Self {
        self.pan_aware = enable;
        self
    }

    /// Resampling filter for cell images (default: `FilterType::CatmullRom`).
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

/// An exported collage, ready to hand to a download trigger.
#[derive(Debug, Clone)]
pub struct ExportResult {
    /// PNG bytes.
    pub data: Vec<u8>,

    /// Suggested filename.
    pub filename: String,

    /// Width of the raster in pixels.
    pub width: u32,

    /// Height of the raster in pixels.
    pub height: u32,
}

/// Render `layout` with the images in `store` and encode the result as PNG.
///
/// Fails with [`CollageError::NoContent`] before allocating anything when no
/// placement of `layout` has an image. The store is only read, so repeated
/// or concurrent exports are safe.
pub fn export_png(
    layout: &LayoutDescriptor,
    store: &CellStore,
    filename: impl Into<String>,
    options: &ExportOptions,
) -> Result<ExportResult, CollageError> {
    export::export_pipeline(layout, store, filename.into(), options)
}
