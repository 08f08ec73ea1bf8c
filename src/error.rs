use thiserror::Error;

/// Errors raised while turning an uploaded file into a dataset.
///
/// None of these are fatal: the upload is discarded, prior state is left
/// untouched and the message is shown to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// File name does not carry a supported extension
    #[error("Unsupported file type")]
    UnsupportedFile,

    /// Another file was accepted with it, or is still being parsed
    #[error("Only one file can be uploaded at a time")]
    OneFileAtATime,

    /// File contents could not be read
    #[error("Could not read file: {0}")]
    Unreadable(String),

    /// File exceeds the configured upload ceiling
    #[error("File is too large ({size} bytes, max {max} bytes)")]
    TooLarge { size: usize, max: usize },

    /// File content is not UTF-8 text
    #[error("File is not valid UTF-8 text")]
    NotUtf8,

    /// File content is not parseable JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// JSON parsed but is not a GeoJSON object
    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),
}

/// Errors raised while measuring a shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A line or ring has no coordinates at all
    #[error("Geometry has no coordinates")]
    MissingCoordinates,

    /// Circle radius is negative, NaN or infinite
    #[error("Invalid circle radius: {0}")]
    InvalidRadius(f64),

    /// A coordinate is NaN or infinite
    #[error("Geometry contains a non-finite coordinate")]
    NonFiniteCoordinate,
}

/// Errors reported by a render surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// Layer operations attempted before the map finished initializing
    #[error("Render surface is not ready")]
    NotReady,

    /// The surface does not know the given layer
    #[error("Unknown layer: {0}")]
    UnknownLayer(String),
}

/// Errors raised while loading [`crate::ViewerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
