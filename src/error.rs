use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for map loading and rendering setup.
#[derive(Error, Debug)]
pub enum MapError {
    /// File I/O error
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON parse error (TMJ maps and TSJ tilesets)
    #[error("JSON parse error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// XML parse error (TMX maps and TSX tilesets)
    #[error("XML parse error in {}: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    /// Loader parameters could not be read
    #[error("Invalid loader configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Image header could not be probed for its dimensions
    #[error("Unable to read image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Texture upload failed in a rendering backend
    #[error("Unable to load texture {}: {message}", path.display())]
    Texture { path: PathBuf, message: String },

    /// Unsupported map file format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Structurally invalid map or tileset document
    #[error("Invalid map: {0}")]
    InvalidMap(String),

    /// Layer tile data could not be decoded
    #[error("Invalid tile data in layer '{layer}': {source}")]
    TileData {
        layer: String,
        #[source]
        source: TileDataError,
    },

    /// Property declared with a type we do not know
    #[error("Wrong type given for property '{name}': '{kind}' (supported: string, file, int, float, bool, color, object, class)")]
    UnsupportedPropertyType { name: String, kind: String },

    /// Property value does not parse as its declared type
    #[error("Property '{name}' of type '{kind}' has invalid value '{value}'")]
    InvalidPropertyValue {
        name: String,
        kind: String,
        value: String,
    },

    /// Tile object references a gid that no tileset defines
    #[error("Object {object_id} in layer '{layer}' references unknown gid {gid}")]
    InvalidObjectGid {
        layer: String,
        object_id: u32,
        gid: u32,
    },

    /// Atlas-backed map has no `atlas` property
    #[error("The map is missing the 'atlas' property")]
    MissingAtlas,

    /// Texture atlas file could not be parsed
    #[error("Invalid atlas {} at line {line}: {message}", path.display())]
    Atlas {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// Failure while decoding a layer's packed tile grid.
#[derive(Error, Debug)]
pub enum TileDataError {
    #[error("Unrecognised encoding ({0})")]
    UnsupportedEncoding(String),

    #[error("Unrecognised compression ({0})")]
    UnsupportedCompression(String),

    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decompression failed: {0}")]
    Decompress(#[source] io::Error),

    #[error("invalid tile id '{0}'")]
    InvalidCsvValue(String),

    #[error("expected {expected} tiles, found {found}")]
    SizeMismatch { expected: usize, found: usize },

    #[error("premature end of tile data: expected {expected} bytes, found {found}")]
    PrematureEnd { expected: usize, found: usize },

    #[error("layer of {width}x{height} tiles is too large")]
    TooLarge { width: usize, height: usize },
}

impl MapError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MapError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn tile_data(layer: &str, source: TileDataError) -> Self {
        MapError::TileData {
            layer: layer.to_owned(),
            source,
        }
    }
}
