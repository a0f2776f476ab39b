use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for the TMX map loader.
///
/// Every variant is fatal to the decode in progress; no partial map is returned.
#[derive(Debug, Error)]
pub enum MapError {
    /// Tile data has no `encoding` attribute (plain XML `<tile>` elements).
    #[error("Unsupported encoding (XML) for TMX layer data")]
    UnsupportedEncoding,
    /// Tile data uses an encoding other than `csv` or `base64`.
    #[error("Unrecognised encoding ({0}) for TMX layer data")]
    UnrecognizedEncoding(String),
    /// Tile data uses a compression other than `gzip` or `zlib`.
    #[error("Unrecognised compression ({0}) for TMX layer data")]
    UnrecognizedCompression(String),
    /// The payload ended before every cell of the layer was read.
    #[error("Error reading TMX layer data: premature end of tile data (expected {expected} tiles, found {found})")]
    TruncatedTileData {
        /// width * height of the layer
        expected: usize,
        /// number of tile ids actually available
        found: usize,
    },
    /// Read error while decompressing a layer payload.
    #[error("Error reading TMX layer data")]
    TileDataIo {
        /// underlying stream error
        #[source]
        source: io::Error,
    },
    /// A CSV payload contained something that is not an integer.
    #[error("Invalid tile data: {0}")]
    InvalidTileData(String),
    /// A base64 payload could not be decoded.
    #[error("Invalid base64 tile data")]
    Base64(#[from] base64::DecodeError),
    /// An external `.tsx` tileset is not well-formed XML.
    #[error("Error parsing external tileset {}", .path.display())]
    ExternalTilesetParseFailure {
        /// path of the tileset document
        path: PathBuf,
        /// parser error
        #[source]
        source: roxmltree::Error,
    },
    /// The map document itself is not well-formed XML.
    #[error("Error parsing map {}", .path.display())]
    Xml {
        /// path of the map document
        path: PathBuf,
        /// parser error
        #[source]
        source: roxmltree::Error,
    },
    /// A class property was found but no project file was configured.
    #[error("No class information loaded to support class properties. Did you set the 'project_file_path' parameter?")]
    MissingClassSchema,
    /// The configured project file defines no classes.
    #[error("No class information available. Did you set the correct Tiled project path in the 'project_file_path' parameter?")]
    EmptyClassSchema,
    /// The class is not defined in the project file.
    #[error("There is no class with name '{0}' in the given Tiled project file")]
    UnknownClass(String),
    /// A `<property>` declares a type the loader does not know.
    #[error("Wrong type given for property '{name}', given: {kind}, supported: string, file, int, float, bool, color, object, class")]
    UnsupportedPropertyType {
        /// property name
        name: String,
        /// declared type
        kind: String,
    },
    /// An attribute value could not be parsed into the expected type.
    #[error("Invalid value '{value}' for attribute '{name}' on <{element}>")]
    InvalidAttribute {
        /// element tag
        element: String,
        /// attribute (or property) name
        name: String,
        /// offending value
        value: String,
    },
    /// A required attribute is absent.
    #[error("Missing attribute '{name}' on <{element}>")]
    MissingAttribute {
        /// element tag
        element: String,
        /// attribute name
        name: String,
    },
    /// A tile object references a gid no tileset provides.
    #[error("Object {object_id} references unknown tile gid {gid}")]
    InvalidObjectGid {
        /// id of the offending object (0 when it has none)
        object_id: u32,
        /// flag-free gid
        gid: u32,
    },
    /// Structural problem in the document.
    #[error("Invalid map: {0}")]
    InvalidMap(String),
    /// File I/O error.
    #[error("I/O error reading {}", .path.display())]
    Io {
        /// file being read
        path: PathBuf,
        /// underlying error
        #[source]
        source: io::Error,
    },
    /// The project file is not valid JSON.
    #[error("JSON parse error in {}", .path.display())]
    Json {
        /// project file path
        path: PathBuf,
        /// serde error
        #[source]
        source: serde_json::Error,
    },
    /// The image resolver could not provide an image.
    #[error("Failed to load image {}: {}", .path.display(), .message)]
    Image {
        /// image path
        path: PathBuf,
        /// resolver message
        message: String,
    },
    /// Unsupported file format (non-TMX).
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

impl MapError {
    pub(crate) fn invalid_attribute(element: &str, name: &str, value: &str) -> Self {
        MapError::InvalidAttribute {
            element: element.to_owned(),
            name: name.to_owned(),
            value: value.to_owned(),
        }
    }
}
