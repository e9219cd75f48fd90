//! Render every built-in template with synthetic photos.
//!
//! Usage:
//!   cargo run --example render_templates [output-dir]
//!
//! Set `RUST_LOG=photogrid=debug` to watch the per-cell geometry.

use std::path::PathBuf;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use photogrid::{export_png, CellStore, ExportOptions, Template};
use tracing_subscriber::EnvFilter;

/// A diagonal gradient tinted by `seed`, with a different aspect per seed so
/// both cover-fit axes get exercised.
fn synthetic_photo(seed: u32) -> Vec<u8> {
    let (width, height) = if seed % 2 == 0 { (640, 400) } else { (360, 540) };
    let tint = [(seed * 67) % 256, (seed * 131) % 256, (seed * 199) % 256];
    let img = RgbImage::from_fn(width, height, |x, y| {
        let t = (x + y) * 255 / (width + height);
        Rgb([
            ((t + tint[0]) / 2) as u8,
            ((t + tint[1]) / 2) as u8,
            ((255 - t + tint[2]) / 2) as u8,
        ])
    });

    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buffer
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/collages"));
    std::fs::create_dir_all(&output_dir).expect("failed to create output directory");

    for template in Template::ALL {
        let layout = template.layout();
        let mut cells = CellStore::new();
        for (seed, placement) in layout.placements().iter().enumerate() {
            cells.upload(placement.key.clone(), synthetic_photo(seed as u32)).unwrap();
        }
        // Pan the first cell to its left edge so the export shows the offset.
        if let Some(first) = layout.placements().first() {
            cells.set_offset(&first.key, 0.0, 50.0);
        }

        let result = export_png(&layout, &cells, template.filename(), &ExportOptions::default()).unwrap();
        let path = output_dir.join(&result.filename);
        std::fs::write(&path, &result.data).unwrap();

        println!(
            "  {id}: {name} ({width}x{height}, {size} bytes)",
            id = template.id(),
            name = result.filename,
            width = result.width,
            height = result.height,
            size = result.data.len(),
        );
    }

    println!("Output written to {}", output_dir.display());
}
