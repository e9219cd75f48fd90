//! Run the face-centring auto-crop on images and report what it decided.
//!
//! Usage:
//!   PHOTOGRID_MODEL_DIR=model cargo run --example debug_face_center --features rustface -- a.jpg b.png
//!
//! Framed results are written next to each input as `<stem>.centered.png`.

use std::path::Path;

use photogrid::{center_crop_face, AutoCropOptions, FaceCrop, RustfaceDetector, SharedDetector};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("photogrid=info")))
        .init();

    let model_dir = std::env::var("PHOTOGRID_MODEL_DIR").unwrap_or_else(|_| "model".to_string());
    let detector = SharedDetector::new(RustfaceDetector::loader(&model_dir));
    let options = AutoCropOptions::new(300, 300);

    for input_path in std::env::args().skip(1) {
        let input = std::fs::read(&input_path).unwrap_or_else(|e| panic!("failed to read {input_path}: {e}"));
        println!("=== {input_path} ===");

        match center_crop_face(&input, &detector, &options) {
            Ok(FaceCrop::Framed {
                data,
                face,
                width,
                height,
            }) => {
                let (cx, cy) = face.center();
                println!(
                    "  face: score={:.2}, bbox=({:.0}, {:.0}, {:.0}x{:.0}), center=({cx:.0}, {cy:.0})",
                    face.confidence, face.x, face.y, face.width, face.height,
                );
                let stem = Path::new(&input_path).file_stem().unwrap().to_string_lossy();
                let output = Path::new(&input_path).with_file_name(format!("{stem}.centered.png"));
                std::fs::write(&output, &data).unwrap();
                println!("  → framed {width}x{height}: {}", output.display());
            }
            Ok(FaceCrop::Fallback { reason, .. }) => println!("  → unchanged ({reason:?})"),
            Err(e) => println!("  → error: {e}"),
        }
        println!();
    }
}
