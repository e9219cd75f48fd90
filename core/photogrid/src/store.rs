use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use image::ImageFormat;

use crate::error::CollageError;

/// Pan position within a cell, as a percentage of the image's travel on
/// each axis. `{50, 50}` is centred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offset {
    /// Horizontal position, 0.0 (left edge) to 100.0 (right edge).
    pub x: f64,
    /// Vertical position, 0.0 (top edge) to 100.0 (bottom edge).
    pub y: f64,
}

impl Offset {
    /// The centred offset used when a cell has never been dragged.
    pub const CENTER: Offset = Offset { x: 50.0, y: 50.0 };

    /// Build an offset with both axes clamped to `[0, 100]`.
    ///
    /// NaN inputs collapse to the centre rather than poisoning later math.
    pub fn clamped(x: f64, y: f64) -> Self {
        Self {
            x: clamp_percent(x),
            y: clamp_percent(y),
        }
    }
}

impl Default for Offset {
    fn default() -> Self {
        Self::CENTER
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        50.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Reference to the raw bytes of an uploaded image.
///
/// Cloning is cheap: the bytes are shared.
#[derive(Debug, Clone)]
pub struct ImageRef {
    bytes: Arc<[u8]>,
    format: ImageFormat,
}

impl ImageRef {
    /// Sniff the container format of `bytes` and decode them once.
    ///
    /// Anything that does not fully decode with the enabled codecs fails
    /// with [`CollageError::InvalidFileType`]: unknown signatures, formats
    /// compiled out of this build, and truncated or corrupt files alike.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self, CollageError> {
        let bytes = bytes.into();
        let format = image::guess_format(&bytes).map_err(|_| CollageError::InvalidFileType)?;
        let decoded = image::load_from_memory_with_format(&bytes, format).map_err(|e| {
            tracing::debug!(?format, error = %e, "rejecting undecodable upload");
            CollageError::InvalidFileType
        })?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(CollageError::InvalidFileType);
        }
        Ok(Self { bytes, format })
    }

    /// The uploaded bytes, unmodified.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Container format detected at upload time.
    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

/// State held for one cell: the uploaded image and its pan offset.
///
/// The offset is optional so that "never dragged" stays distinguishable from
/// an explicit centre; readers see [`Offset::CENTER`] either way.
#[derive(Debug, Clone)]
pub struct CellEntry {
    image: ImageRef,
    offset: Option<Offset>,
}

impl CellEntry {
    /// The uploaded image.
    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    /// Pan offset, [`Offset::CENTER`] until the cell is dragged.
    pub fn offset(&self) -> Offset {
        self.offset.unwrap_or_default()
    }

    /// Whether the offset was ever set explicitly.
    pub fn has_custom_offset(&self) -> bool {
        self.offset.is_some()
    }
}

/// CSS `background-position` pair for a cell, e.g. `"50% 50%"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundPosition {
    /// Horizontal percentage.
    pub x: f64,
    /// Vertical percentage.
    pub y: f64,
}

impl fmt::Display for BackgroundPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}% {}%", self.x, self.y)
    }
}

/// Build a cell key from a template id, a section name and grid coordinates.
pub fn cell_key(component: &str, section: &str, row: u32, col: u32) -> String {
    format!("{component}-{section}-{row}-{col}")
}

/// Per-session mapping from cell key to uploaded image and pan offset.
///
/// Entries sit behind an `Arc`, so [`CellStore::snapshot`] is O(1) and writes
/// copy on demand. An export reading a snapshot never sees a half-applied
/// drag update.
#[derive(Debug, Clone, Default)]
pub struct CellStore {
    entries: Arc<HashMap<String, CellEntry>>,
}

impl CellStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under `key`, replacing any previous image.
    ///
    /// An existing offset for `key` is kept. Content that is not a
    /// recognisable image fails with [`CollageError::InvalidFileType`] and
    /// leaves the store untouched.
    pub fn upload(&mut self, key: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Result<(), CollageError> {
        let image = ImageRef::from_bytes(bytes)?;
        let key = key.into();
        tracing::debug!(key = %key, format = ?image.format(), size = image.bytes().len(), "cell image uploaded");

        let entries = Arc::make_mut(&mut self.entries);
        match entries.get_mut(&key) {
            Some(entry) => entry.image = image,
            None => {
                entries.insert(key, CellEntry { image, offset: None });
            }
        }
        Ok(())
    }

    /// Like [`CellStore::upload`], but first checks the declared MIME type
    /// (as reported by a file picker) for an `image/` prefix.
    pub fn upload_typed(
        &mut self,
        key: impl Into<String>,
        mime: &str,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<(), CollageError> {
        if !mime.trim().to_ascii_lowercase().starts_with("image/") {
            return Err(CollageError::InvalidFileType);
        }
        self.upload(key, bytes)
    }

    /// Set the pan offset for `key`, clamped to `[0, 100]` on both axes.
    ///
    /// Returns `false` without touching the store when `key` has no image.
    pub fn set_offset(&mut self, key: &str, x: f64, y: f64) -> bool {
        if !self.entries.contains_key(key) {
            return false;
        }
        if let Some(entry) = Arc::make_mut(&mut self.entries).get_mut(key) {
            entry.offset = Some(Offset::clamped(x, y));
        }
        true
    }

    /// Background position to render `key` with, or `None` when the cell is empty.
    pub fn style_for(&self, key: &str) -> Option<BackgroundPosition> {
        self.entries.get(key).map(|entry| {
            let Offset { x, y } = entry.offset();
            BackgroundPosition { x, y }
        })
    }

    /// Entry for `key`, if it holds an image.
    pub fn get(&self, key: &str) -> Option<&CellEntry> {
        self.entries.get(key)
    }

    /// Current offset of `key`, if it holds an image.
    pub fn offset(&self, key: &str) -> Option<Offset> {
        self.entries.get(key).map(CellEntry::offset)
    }

    /// Whether `key` holds an image.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cells holding an image.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no cell holds an image.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of all populated cells, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Immutable view of the current entries for an export to read.
    pub fn snapshot(&self) -> CellSnapshot {
        CellSnapshot {
            entries: Arc::clone(&self.entries),
        }
    }
}

/// Point-in-time, read-only copy of a [`CellStore`].
#[derive(Debug, Clone)]
pub struct CellSnapshot {
    entries: Arc<HashMap<String, CellEntry>>,
}

impl CellSnapshot {
    /// Entry for `key` as of the snapshot.
    pub fn get(&self, key: &str) -> Option<&CellEntry> {
        self.entries.get(key)
    }

    /// Number of populated cells in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot has no populated cells.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
