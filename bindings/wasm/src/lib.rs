use std::sync::Arc;

use photogrid::{
    cell_key, export_filename, AutoCropOptions, CollageError, DetectorError, DragController, ExportOptions,
    FaceCrop, FaceDetector, FallbackReason, LayoutDescriptor, OutputScale, SharedDetector, Template,
};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

/// Options for `exportPng`, passed as a JavaScript object.
///
/// All fields are optional. `scale` wins over `devicePixelRatio` when both
/// are present.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportPngOptions {
    pub device_pixel_ratio: Option<f64>,
    pub scale: Option<f64>,
    pub pan_aware: Option<bool>,
}

/// Options for `centerCropFace`.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoCropJsOptions {
    pub target_fill: Option<f64>,
    pub min_confidence: Option<f64>,
    pub detect_max_dimension: Option<u32>,
}

/// Create a JS `Error` with a `code` property.
fn make_error(code: &str, message: &str) -> JsValue {
    let err = js_sys::Error::new(message);
    let _ = js_sys::Reflect::set(&err, &"code".into(), &JsValue::from_str(code));
    JsValue::from(err)
}

/// Machine-readable code for a `CollageError`.
pub fn error_code(e: &CollageError) -> &'static str {
    match e {
        CollageError::InvalidFileType => "INVALID_FILE_TYPE",
        CollageError::NoContent => "NO_CONTENT",
        CollageError::CanvasUnavailable { .. } => "CANVAS_UNAVAILABLE",
        CollageError::EncodeError(_) => "ENCODE_ERROR",
        CollageError::DecodeError(_) => "DECODE_ERROR",
        CollageError::DetectorInit(_) => "DETECTOR_INIT",
        CollageError::OverlappingPlacement { .. }
        | CollageError::OutOfBounds { .. }
        | CollageError::EmptySpan { .. }
        | CollageError::InvalidGeometry(_) => "INVALID_LAYOUT",
        CollageError::UnknownTemplate(_) => "UNKNOWN_TEMPLATE",
    }
}

/// Convert a `CollageError` into a JS `Error` with a machine-readable `code` property.
fn to_js_error(e: CollageError) -> JsValue {
    make_error(error_code(&e), &e.to_string())
}

fn parse_options<T: Default + for<'de> Deserialize<'de>>(options: JsValue) -> Result<T, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(T::default())
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid options: {e}")))
    }
}

/// Map parsed JS options onto the core export settings.
pub fn export_options(opts: &ExportPngOptions) -> ExportOptions {
    let mut options = ExportOptions::new();
    if let Some(dpr) = opts.device_pixel_ratio {
        options = options.device_pixel_ratio(dpr);
    }
    if let Some(scale) = opts.scale {
        options = options.scale(OutputScale::Exact(scale));
    }
    if let Some(pan_aware) = opts.pan_aware {
        options = options.pan_aware(pan_aware);
    }
    options
}

/// One collage being edited: its layout, cell images, and the active drag.
#[wasm_bindgen]
pub struct CollageSession {
    component: String,
    filename: String,
    layout: LayoutDescriptor,
    cells: photogrid::CellStore,
    drag: DragController,
}

impl CollageSession {
    /// Session for a built-in template, addressable without a JS runtime.
    pub fn for_template(template_id: &str) -> Result<CollageSession, CollageError> {
        let template = Template::from_id(template_id)?;
        Ok(CollageSession {
            component: template.id().to_string(),
            filename: template.filename(),
            layout: template.layout(),
            cells: photogrid::CellStore::new(),
            drag: DragController::new(),
        })
    }

    /// Session for a caller-built layout.
    pub fn for_layout(name: &str, layout: LayoutDescriptor) -> CollageSession {
        CollageSession {
            component: name.to_string(),
            filename: export_filename(name),
            layout,
            cells: photogrid::CellStore::new(),
            drag: DragController::new(),
        }
    }

    pub fn cells(&self) -> &photogrid::CellStore {
        &self.cells
    }

    pub fn layout(&self) -> &LayoutDescriptor {
        &self.layout
    }

    /// Export and return the raw result, for callers on the Rust side.
    pub fn export(&self, opts: &ExportPngOptions) -> Result<photogrid::ExportResult, CollageError> {
        photogrid::export_png(&self.layout, &self.cells, self.filename.clone(), &export_options(opts))
    }
}

#[wasm_bindgen]
impl CollageSession {
    /// Start an empty session for the template with id `templateId`
    /// (see `templates()`).
    #[wasm_bindgen(constructor)]
    pub fn new(template_id: &str) -> Result<CollageSession, JsValue> {
        CollageSession::for_template(template_id).map_err(to_js_error)
    }

    /// Start an empty session for a custom layout object:
    /// `{ cols, rows, cellBasePx | targetPhysical, gapPx, placements }`.
    #[wasm_bindgen(js_name = "fromLayout")]
    pub fn from_layout(name: &str, layout: JsValue) -> Result<CollageSession, JsValue> {
        let layout: LayoutDescriptor = serde_wasm_bindgen::from_value(layout)
            .map_err(|e| make_error("INVALID_LAYOUT", &format!("invalid layout: {e}")))?;
        Ok(CollageSession::for_layout(name, layout))
    }

    /// Cell key for a placement, e.g. `key("grid", 0, 1)`.
    pub fn key(&self, section: &str, row: u32, col: u32) -> String {
        cell_key(&self.component, section, row, col)
    }

    /// Keys of every placement in the layout, in layout order.
    #[wasm_bindgen(getter, js_name = "cellKeys")]
    pub fn cell_keys(&self) -> Vec<String> {
        self.layout.placements().iter().map(|p| p.key.clone()).collect()
    }

    #[wasm_bindgen(getter)]
    pub fn filename(&self) -> String {
        self.filename.clone()
    }

    /// Store an uploaded file for `key`. `mime` is the `File.type` reported
    /// by the picker; non-image files are rejected with `INVALID_FILE_TYPE`.
    pub fn upload(&mut self, key: String, mime: &str, bytes: Vec<u8>) -> Result<(), JsValue> {
        self.cells.upload_typed(key, mime, bytes).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = "hasImage")]
    pub fn has_image(&self, key: &str) -> bool {
        self.cells.contains(key)
    }

    /// Set the pan offset (percent) for `key`. Returns `false` when the cell
    /// has no image.
    #[wasm_bindgen(js_name = "setOffset")]
    pub fn set_offset(&mut self, key: &str, x: f64, y: f64) -> bool {
        self.cells.set_offset(key, x, y)
    }

    /// CSS `background-position` for `key`, or `undefined` for an empty cell.
    #[wasm_bindgen(js_name = "styleFor")]
    pub fn style_for(&self, key: &str) -> Option<String> {
        self.cells.style_for(key).map(|position| position.to_string())
    }

    /// Begin a drag on `key` at client position `(x, y)` over a cell of the
    /// given on-screen size.
    #[wasm_bindgen(js_name = "pointerDown")]
    pub fn pointer_down(&mut self, key: &str, x: f64, y: f64, cell_width: f64, cell_height: f64) -> bool {
        self.drag.pointer_down(&self.cells, key, x, y, cell_width, cell_height)
    }

    /// Record a move. Returns `true` when a `requestAnimationFrame` callback
    /// should be scheduled to call `flushFrame`.
    #[wasm_bindgen(js_name = "pointerMove")]
    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.drag.pointer_move(x, y)
    }

    /// Apply the latest move. Returns the new `background-position`, if any.
    #[wasm_bindgen(js_name = "flushFrame")]
    pub fn flush_frame(&mut self) -> Option<String> {
        let key = self.dragged_key()?;
        self.drag.flush_frame(&mut self.cells)?;
        self.style_for(&key)
    }

    #[wasm_bindgen(js_name = "pointerUp")]
    pub fn pointer_up(&mut self) -> Option<String> {
        let key = self.dragged_key()?;
        self.drag.pointer_up(&mut self.cells)?;
        self.style_for(&key)
    }

    #[wasm_bindgen(js_name = "cancelDrag")]
    pub fn cancel_drag(&mut self) {
        self.drag.cancel(&mut self.cells);
    }

    /// Render the collage to PNG.
    ///
    /// @param options - Optional object with fields: devicePixelRatio,
    ///   scale, panAware
    /// @returns `{ data: Uint8Array, filename, width, height }`
    #[wasm_bindgen(js_name = "exportPng")]
    pub fn export_png(&self, options: JsValue) -> Result<JsValue, JsValue> {
        let opts: ExportPngOptions = parse_options(options)?;
        let result = self.export(&opts).map_err(to_js_error)?;

        let obj = js_sys::Object::new();
        let data = js_sys::Uint8Array::from(&result.data[..]);
        js_sys::Reflect::set(&obj, &"data".into(), &data)?;
        js_sys::Reflect::set(&obj, &"filename".into(), &JsValue::from_str(&result.filename))?;
        js_sys::Reflect::set(&obj, &"width".into(), &JsValue::from(result.width))?;
        js_sys::Reflect::set(&obj, &"height".into(), &JsValue::from(result.height))?;
        Ok(JsValue::from(obj))
    }
}

impl CollageSession {
    fn dragged_key(&self) -> Option<String> {
        match self.drag.state() {
            photogrid::DragState::Dragging(session) => Some(session.key.clone()),
            photogrid::DragState::Idle => None,
        }
    }
}

/// Built-in templates as `[{ id, filename, cols, rows }]`.
#[wasm_bindgen]
pub fn templates() -> Result<js_sys::Array, JsValue> {
    let list = js_sys::Array::new();
    for template in Template::ALL {
        let layout = template.layout();
        let obj = js_sys::Object::new();
        js_sys::Reflect::set(&obj, &"id".into(), &JsValue::from_str(template.id()))?;
        js_sys::Reflect::set(&obj, &"filename".into(), &JsValue::from_str(&template.filename()))?;
        js_sys::Reflect::set(&obj, &"cols".into(), &JsValue::from(layout.cols()))?;
        js_sys::Reflect::set(&obj, &"rows".into(), &JsValue::from(layout.rows()))?;
        list.push(&obj);
    }
    Ok(list)
}

#[cfg(feature = "face-detection")]
static MODEL: std::sync::OnceLock<Vec<u8>> = std::sync::OnceLock::new();

/// Provide the SeetaFace model bytes (fetched by the page) before the first
/// `centerCropFace` call. Later calls are ignored.
#[cfg(feature = "face-detection")]
#[wasm_bindgen(js_name = "initFaceDetector")]
pub fn init_face_detector(model: Vec<u8>) {
    let _ = MODEL.set(model);
}

#[cfg(feature = "face-detection")]
fn load_detector() -> Result<Arc<dyn FaceDetector>, DetectorError> {
    let model = MODEL
        .get()
        .ok_or_else(|| DetectorError::new("initFaceDetector was not called"))?;
    Ok(Arc::new(photogrid::RustfaceDetector::from_model_bytes(model)?))
}

#[cfg(not(feature = "face-detection"))]
fn load_detector() -> Result<Arc<dyn FaceDetector>, DetectorError> {
    Err(DetectorError::new("built without face detection"))
}

fn fallback_reason(reason: &FallbackReason) -> &'static str {
    match reason {
        FallbackReason::DetectorUnavailable(_) => "detector-unavailable",
        FallbackReason::DetectorFailed(_) => "detector-failed",
        FallbackReason::NoFace => "no-face",
        FallbackReason::DegenerateFace => "degenerate-face",
    }
}

/// Auto-crop with the process-wide detector, for callers on the Rust side.
pub fn center_crop(input: &[u8], width: u32, height: u32, opts: &AutoCropJsOptions) -> Result<FaceCrop, CollageError> {
    let mut options = AutoCropOptions::new(width, height);
    if let Some(fill) = opts.target_fill {
        options = options.target_fill(fill);
    }
    if let Some(confidence) = opts.min_confidence {
        options = options.min_confidence(confidence);
    }
    if let Some(dimension) = opts.detect_max_dimension {
        options = options.detect_max_dimension(dimension);
    }
    photogrid::center_crop_face(input, SharedDetector::global(load_detector), &options)
}

/// Re-frame a portrait so the largest face sits centred in a
/// `width × height` container.
///
/// @param input - Raw image bytes
/// @param options - Optional object with fields: targetFill, minConfidence,
///   detectMaxDimension
/// @returns `{ data: Uint8Array, framed: boolean, reason?: string }`; when
///   `framed` is false `data` holds the input unchanged.
#[wasm_bindgen(js_name = "centerCropFace")]
pub fn center_crop_face(input: Vec<u8>, width: u32, height: u32, options: JsValue) -> Result<JsValue, JsValue> {
    let opts: AutoCropJsOptions = parse_options(options)?;
    let crop = center_crop(&input, width, height, &opts).map_err(to_js_error)?;

    let obj = js_sys::Object::new();
    js_sys::Reflect::set(&obj, &"data".into(), &js_sys::Uint8Array::from(crop.data()))?;
    js_sys::Reflect::set(&obj, &"framed".into(), &JsValue::from(crop.is_framed()))?;
    if let FaceCrop::Fallback { reason, .. } = &crop {
        js_sys::Reflect::set(&obj, &"reason".into(), &JsValue::from_str(fallback_reason(reason)))?;
    }
    Ok(JsValue::from(obj))
}
