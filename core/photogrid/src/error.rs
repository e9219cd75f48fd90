use thiserror::Error;

/// Errors produced by the collage engine.
#[derive(Debug, Error)]
pub enum CollageError {
    /// Upload is not a decodable image.
    #[error("uploaded file is not an image")]
    InvalidFileType,

    /// Export requested while every cell is empty.
    #[error("nothing to export: no cell holds an image")]
    NoContent,

    /// Output surface is zero-sized or too large to allocate.
    #[error("cannot allocate a {width}x{height} drawing surface")]
    CanvasUnavailable {
        /// Requested width in pixels.
        width: u64,
        /// Requested height in pixels.
        height: u64,
    },

    /// PNG encoding failed.
    #[error("failed to encode image: {0}")]
    EncodeError(String),

    /// A stored image could not be decoded.
    #[error("failed to decode image: {0}")]
    DecodeError(String),

    /// The face detector could not be loaded.
    #[error("face detector failed to initialize: {0}")]
    DetectorInit(String),

    /// Two placements claim the same grid unit.
    #[error("placements {first} and {second} overlap")]
    OverlappingPlacement {
        /// Key of the earlier placement.
        first: String,
        /// Key of the placement that collided with it.
        second: String,
    },

    /// A placement reaches past the last row or column.
    #[error("placement {key} extends outside the grid")]
    OutOfBounds {
        /// Key of the offending placement.
        key: String,
    },

    /// A placement spans zero rows or columns.
    #[error("placement {key} has a zero row or column span")]
    EmptySpan {
        /// Key of the offending placement.
        key: String,
    },

    /// Grid size, cell size, gap or physical size is unusable.
    #[error("invalid layout geometry: {0}")]
    InvalidGeometry(String),

    /// No built-in template has this id.
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
}

/// Failure reported by a [`crate::FaceDetector`] backend.
#[derive(Debug, Clone, Error)]
#[error("face detection failed: {0}")]
pub struct DetectorError(pub String);

impl DetectorError {
    /// Wrap a backend message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
