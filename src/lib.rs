#![warn(missing_docs)]

//! Tiled TMX map loader for Macroquad.
//!
//! Decodes a `.tmx` document (plus external `.tsx` tilesets and an optional
//! `.tiled-project` class schema) into a [`Map`]: an arena of layers, a tileset
//! registry and an object index.

mod config;
mod error;
pub mod gid;
mod loader {
    pub mod data;
    pub mod layers;
    pub mod objects;
    pub mod properties;
    pub mod tilesets;
    pub mod tmx_loader;
    pub mod xml;
}
mod map;
mod object;
mod project;
mod properties;
mod resolver;
mod tileset;

pub use config::LoaderConfig;
pub use error::MapError;
pub use gid::TileId;
pub use loader::tmx_loader::TmxLoader;
pub use map::{
    Cell, GroupLayer, ImageLayer, Layer, LayerId, LayerKind, Map, ObjectLayer, ObjectLocation, Orientation,
    TileLayer,
};
pub use object::{HorizontalAlign, MapObject, ObjectShape, TextObject, TileObject, VerticalAlign};
pub use project::{ClassMember, ProjectClassSchema};
pub use properties::{parse_tiled_color, tiled_color_to_rgba, Properties, PropertyValue};
pub use resolver::{FileResolver, FsResolver, ImageResolver, MemoryResolver, TextureRegion};
pub use tileset::{AnimationFrame, Tile, TileKind, TileSet, TilesetImage};
