use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::cover::{blend_onto, render_cover_tile};
use crate::error::CollageError;
use crate::layout::{CellPlacement, DestRect, LayoutDescriptor};
use crate::store::{CellEntry, CellSnapshot, Offset};

/// Largest surface the compositor will allocate (16384 × 16384).
pub const MAX_SURFACE_PIXELS: u64 = 16_384 * 16_384;

/// Knobs for a single composite pass.
#[derive(Debug, Clone, Copy)]
pub struct CompositeSettings {
    /// Device pixels per logical pixel.
    pub scale: f64,
    /// Bias each cell's crop by its stored pan offset instead of centring.
    pub pan_aware: bool,
    /// Resampling filter for the cover-fit resize.
    pub filter: FilterType,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan_aware: true,
            filter: FilterType::CatmullRom,
        }
    }
}

/// Allocate an opaque white `width × height` surface, refusing sizes the
/// renderer cannot hold.
pub(crate) fn allocate_surface(width: u32, height: u32) -> Result<RgbaImage, CollageError> {
    let pixels = width as u64 * height as u64;
    if pixels == 0 || pixels > MAX_SURFACE_PIXELS {
        return Err(CollageError::CanvasUnavailable {
            width: width as u64,
            height: height as u64,
        });
    }
    Ok(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])))
}

fn decode_cell(entry: &CellEntry) -> Result<DynamicImage, CollageError> {
    let image = entry.image();
    image::load_from_memory_with_format(image.bytes(), image.format())
        .map_err(|e| CollageError::DecodeError(e.to_string()))
}

type Tile = (DestRect, RgbaImage);

fn render_cell(
    layout: &LayoutDescriptor,
    placement: &CellPlacement,
    entry: &CellEntry,
    settings: &CompositeSettings,
) -> Result<Option<Tile>, CollageError> {
    let dest = layout.dest_rect(placement, settings.scale);
    if dest.is_empty() {
        return Ok(None);
    }

    let decoded = decode_cell(entry)?;
    let bias = if settings.pan_aware {
        entry.offset()
    } else {
        Offset::CENTER
    };

    tracing::debug!(
        key = %placement.key,
        x = dest.x,
        y = dest.y,
        width = dest.width,
        height = dest.height,
        "drawing cell"
    );
    Ok(render_cover_tile(&decoded, dest.width, dest.height, bias, settings.filter).map(|tile| (dest, tile)))
}

/// Rasterise `layout` with the images in `cells`.
///
/// Cells are decoded and resampled independently (in parallel with the
/// `parallel` feature). All tiles are finished before any of them is placed
/// on the surface, so a failure never leaves a partial raster behind.
pub fn composite(
    layout: &LayoutDescriptor,
    cells: &CellSnapshot,
    settings: &CompositeSettings,
) -> Result<RgbaImage, CollageError> {
    let (width, height) = layout.surface_size(settings.scale);
    let mut surface = allocate_surface(width, height)?;

    let jobs: Vec<(&CellPlacement, &CellEntry)> = layout
        .placements()
        .iter()
        .filter_map(|placement| cells.get(&placement.key).map(|entry| (placement, entry)))
        .collect();

    tracing::debug!(width, height, scale = settings.scale, cells = jobs.len(), "compositing collage");

    #[cfg(feature = "parallel")]
    let tiles = jobs
        .par_iter()
        .map(|(placement, entry)| render_cell(layout, placement, entry, settings))
        .collect::<Result<Vec<_>, _>>()?;
    #[cfg(not(feature = "parallel"))]
    let tiles = jobs
        .iter()
        .map(|(placement, entry)| render_cell(layout, placement, entry, settings))
        .collect::<Result<Vec<_>, _>>()?;

    for (dest, tile) in tiles.into_iter().flatten() {
        blend_onto(&mut surface, &tile, dest.x as i64, dest.y as i64);
    }

    Ok(surface)
}
