use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use photogrid::CollageError;
use photogrid_wasm::{center_crop, error_code, templates, AutoCropJsOptions, CollageSession, ExportPngOptions};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

fn make_test_png(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ]);
    }

    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buffer
}

#[wasm_bindgen_test]
fn template_session_exports_png() {
    let mut session = CollageSession::new("grid-2x2").unwrap();
    let key = session.key("grid", 0, 0);
    session.upload(key, "image/png", make_test_png(64, 48)).unwrap();

    let result = session.export(&ExportPngOptions::default()).unwrap();
    assert_eq!((result.width, result.height), (1200, 1200));
    assert_eq!(result.filename, "template-grid-2x2.png");
    assert!(result.data.starts_with(&[0x89, b'P', b'N', b'G']));
}

#[wasm_bindgen_test]
fn exact_scale_option_wins() {
    let mut session = CollageSession::new("grid-2x2").unwrap();
    let key = session.key("grid", 1, 1);
    session.upload(key, "image/png", make_test_png(10, 10)).unwrap();

    let opts = ExportPngOptions {
        device_pixel_ratio: Some(3.0),
        scale: Some(1.0),
        pan_aware: None,
    };
    let result = session.export(&opts).unwrap();
    assert_eq!((result.width, result.height), (600, 600));
}

#[wasm_bindgen_test]
fn empty_session_has_no_content() {
    let session = CollageSession::new("grid-3x3").unwrap();
    let err = session.export(&ExportPngOptions::default()).unwrap_err();
    assert!(matches!(err, CollageError::NoContent));
    assert_eq!(error_code(&err), "NO_CONTENT");
}

#[wasm_bindgen_test]
fn unknown_template_is_rejected() {
    let err = CollageSession::for_template("mosaic-9").err().unwrap();
    assert_eq!(error_code(&err), "UNKNOWN_TEMPLATE");
}

#[wasm_bindgen_test]
fn non_image_upload_is_rejected() {
    let mut session = CollageSession::new("strip-4").unwrap();
    let key = session.key("grid", 0, 0);
    assert!(session.upload(key.clone(), "text/plain", b"hello".to_vec()).is_err());
    assert!(!session.has_image(&key));
}

#[wasm_bindgen_test]
fn drag_updates_background_position() {
    let mut session = CollageSession::new("grid-2x2").unwrap();
    let key = session.key("grid", 0, 0);
    session.upload(key.clone(), "image/png", make_test_png(40, 20)).unwrap();
    assert_eq!(session.style_for(&key).as_deref(), Some("50% 50%"));

    assert!(session.pointer_down(&key, 100.0, 100.0, 200.0, 200.0));
    assert!(session.pointer_move(120.0, 100.0));
    assert!(!session.pointer_move(140.0, 100.0));
    assert_eq!(session.flush_frame().as_deref(), Some("30% 50%"));
    assert_eq!(session.pointer_up(), None);
    assert_eq!(session.style_for(&key).as_deref(), Some("30% 50%"));
}

#[wasm_bindgen_test]
fn templates_lists_every_builtin() {
    let list = templates().unwrap();
    assert_eq!(list.length(), 6);
    let first = list.get(0);
    let id = js_sys::Reflect::get(&first, &JsValue::from_str("id")).unwrap();
    assert_eq!(id.as_string().as_deref(), Some("grid-2x2"));
}

#[wasm_bindgen_test]
fn auto_crop_without_detector_returns_input() {
    let png = make_test_png(80, 60);
    let crop = center_crop(&png, 100, 100, &AutoCropJsOptions::default()).unwrap();
    assert!(!crop.is_framed());
    assert_eq!(crop.data(), &png[..]);
}
