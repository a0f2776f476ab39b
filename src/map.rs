use crate::config::LoaderConfig;
use crate::gid::TileId;
use crate::loader::tmx_loader::TmxLoader;
use crate::object::MapObject;
use crate::properties::Properties;
use crate::resolver::{FsResolver, TextureRegion};
use crate::tileset::{Tile, TileSet};
use anyhow::Context;
use macroquad::color::{Color, WHITE};
use macroquad::math::{vec2, Vec2};
use std::collections::HashMap;
use std::path::Path;

/// Index of a layer in the map's layer arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub usize);

/// Map projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Square grid.
    Orthogonal,
    /// Diamond projection.
    Isometric,
    /// Isometric with interlocking rows.
    Staggered,
    /// Hexagonal with interlocking rows.
    Hexagonal,
}

impl Orientation {
    pub(crate) fn from_attr(value: &str) -> Option<Self> {
        match value {
            "orthogonal" => Some(Orientation::Orthogonal),
            "isometric" => Some(Orientation::Isometric),
            "staggered" => Some(Orientation::Staggered),
            "hexagonal" => Some(Orientation::Hexagonal),
            _ => None,
        }
    }
}

/// A placed tile: the tile's flag-free gid plus its flip flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Flag-free global id.
    pub tile: u32,
    /// Mirrored left to right.
    pub flip_horizontally: bool,
    /// Mirrored top to bottom.
    pub flip_vertically: bool,
    /// Transposed along the anti-diagonal.
    pub flip_diagonally: bool,
}

impl Cell {
    pub(crate) fn from_tile_id(id: TileId) -> Self {
        Cell {
            tile: id.clean(),
            flip_horizontally: id.flip_h(),
            flip_vertically: id.flip_v(),
            flip_diagonally: id.flip_d(),
        }
    }
}

/// Dense row-major grid of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    /// Columns.
    pub width: usize,
    /// Rows.
    pub height: usize,
    /// Map tile width in pixels.
    pub tile_width: u32,
    /// Map tile height in pixels.
    pub tile_height: u32,
    /// `width * height` cells, row-major; `None` is an empty cell.
    pub cells: Vec<Option<Cell>>,
}

impl TileLayer {
    pub(crate) fn new(width: usize, height: usize, tile_width: u32, tile_height: u32) -> Self {
        TileLayer {
            width,
            height,
            tile_width,
            tile_height,
            cells: vec![None; width * height],
        }
    }

    /// Cell at column `x`, row `y`.
    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells[y * self.width + x].as_ref()
    }

    pub(crate) fn set_cell(&mut self, x: usize, y: usize, cell: Cell) {
        self.cells[y * self.width + x] = Some(cell);
    }
}

/// Objects of an `<objectgroup>`, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectLayer {
    #[allow(missing_docs)]
    pub objects: Vec<MapObject>,
}

/// A single image drawn at a position.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer {
    /// The image, when the layer has one.
    pub image: Option<TextureRegion>,
    /// Top-left (or, under Y-flip, bottom-left) corner.
    pub position: Vec2,
    /// Tiled horizontally.
    pub repeat_x: bool,
    /// Tiled vertically.
    pub repeat_y: bool,
}

/// Children of a `<group>`, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupLayer {
    #[allow(missing_docs)]
    pub children: Vec<LayerId>,
}

/// Variant-specific layer content.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    /// `<layer>`
    Tiles(TileLayer),
    /// `<objectgroup>`
    Objects(ObjectLayer),
    /// `<imagelayer>`
    Image(ImageLayer),
    /// `<group>`
    Group(GroupLayer),
}

/// A layer of any kind with its shared attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Layer name (empty when absent).
    pub name: String,
    /// 0.0 to 1.0.
    pub opacity: f32,
    /// Whether the layer is shown.
    pub visible: bool,
    /// Pixel offset from `offsetx`/`offsety`.
    pub offset: Vec2,
    /// Effective parallax factor (own factor times every ancestor group's).
    pub parallax: Vec2,
    /// Tint color, opaque white by default.
    pub tint: Color,
    /// Enclosing group, if any. Not an ownership edge: the map owns every layer.
    pub parent: Option<LayerId>,
    /// Custom properties (plus `color`/`draworder` on object groups).
    pub properties: Properties,
    /// Tiles, objects, image or children.
    pub kind: LayerKind,
}

impl Layer {
    pub(crate) fn new(kind: LayerKind) -> Self {
        Layer {
            name: String::new(),
            opacity: 1.0,
            visible: true,
            offset: Vec2::ZERO,
            parallax: vec2(1.0, 1.0),
            tint: WHITE,
            parent: None,
            properties: Properties::new(),
            kind,
        }
    }

    /// Tile grid, if this is a tile layer.
    pub fn as_tiles(&self) -> Option<&TileLayer> {
        match &self.kind {
            LayerKind::Tiles(t) => Some(t),
            _ => None,
        }
    }

    /// Objects, if this is an object group.
    pub fn as_objects(&self) -> Option<&ObjectLayer> {
        match &self.kind {
            LayerKind::Objects(o) => Some(o),
            _ => None,
        }
    }

    /// Image, if this is an image layer.
    pub fn as_image(&self) -> Option<&ImageLayer> {
        match &self.kind {
            LayerKind::Image(i) => Some(i),
            _ => None,
        }
    }

    /// Children, if this is a group.
    pub fn as_group(&self) -> Option<&GroupLayer> {
        match &self.kind {
            LayerKind::Group(g) => Some(g),
            _ => None,
        }
    }
}

/// Where an object with an id lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectLocation {
    /// `index`-th object of an object group.
    #[allow(missing_docs)]
    Layer { layer: LayerId, index: usize },
    /// `index`-th collision object of the tile with global id `gid`.
    #[allow(missing_docs)]
    Tile { gid: u32, index: usize },
}

/// A decoded Tiled map.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    /// `None` when the attribute is absent or unknown.
    pub orientation: Option<Orientation>,
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Tile width in pixels.
    pub tile_width: u32,
    /// Tile height in pixels.
    pub tile_height: u32,
    /// Hexagonal maps only.
    pub hex_side_length: u32,
    /// `x` or `y` for staggered and hexagonal maps.
    pub stagger_axis: Option<String>,
    /// `odd` or `even` for staggered and hexagonal maps.
    pub stagger_index: Option<String>,
    /// Parsed `backgroundcolor`.
    pub background_color: Option<Color>,
    /// Pixel width, including the staggered half tile.
    pub width_in_pixels: u32,
    /// Pixel height; y is flipped against this.
    pub height_in_pixels: u32,
    /// Custom properties plus the header attributes under their Tiled names.
    pub properties: Properties,
    pub(crate) tilesets: Vec<TileSet>,
    pub(crate) layers: Vec<Layer>,
    pub(crate) root: Vec<LayerId>,
    pub(crate) object_index: HashMap<u32, ObjectLocation>,
}

impl Map {
    pub(crate) fn empty() -> Self {
        Map {
            orientation: None,
            width: 0,
            height: 0,
            tile_width: 0,
            tile_height: 0,
            hex_side_length: 0,
            stagger_axis: None,
            stagger_index: None,
            background_color: None,
            width_in_pixels: 0,
            height_in_pixels: 0,
            properties: Properties::new(),
            tilesets: Vec::new(),
            layers: Vec::new(),
            root: Vec::new(),
            object_index: HashMap::new(),
        }
    }

    /// Load a `.tmx` file from disk with the default configuration.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::load_with(path, LoaderConfig::default())
    }

    /// Load a `.tmx` file from disk.
    pub fn load_with(path: impl AsRef<Path>, config: LoaderConfig) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let loader = TmxLoader::new(FsResolver, config)
            .with_context(|| format!("Preparing loader for {}", path.display()))?;
        loader
            .load(path)
            .with_context(|| format!("Loading map file {}", path.display()))
    }

    pub(crate) fn push_layer(&mut self, layer: Layer) -> LayerId {
        self.layers.push(layer);
        LayerId(self.layers.len() - 1)
    }

    /// Top-level layers in document order.
    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &Layer)> {
        self.root.iter().map(move |&id| (id, &self.layers[id.0]))
    }

    /// Ids of the top-level layers in document order.
    pub fn root_layers(&self) -> &[LayerId] {
        &self.root
    }

    /// Layer by id.
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id.0)
    }

    /// Direct children of a group layer (empty for other kinds).
    pub fn children(&self, id: LayerId) -> impl Iterator<Item = (LayerId, &Layer)> {
        let children = self
            .layer(id)
            .and_then(Layer::as_group)
            .map(|g| g.children.as_slice())
            .unwrap_or(&[]);
        children.iter().map(move |&c| (c, &self.layers[c.0]))
    }

    /// Every layer, depth-first in document order.
    pub fn all_layers(&self) -> Vec<(LayerId, &Layer)> {
        let mut out = Vec::with_capacity(self.layers.len());
        let mut stack: Vec<LayerId> = self.root.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let layer = &self.layers[id.0];
            out.push((id, layer));
            if let Some(group) = layer.as_group() {
                stack.extend(group.children.iter().rev().copied());
            }
        }
        out
    }

    /// First layer with the given name, depth-first in document order.
    pub fn layer_by_name(&self, name: &str) -> Option<(LayerId, &Layer)> {
        self.all_layers().into_iter().find(|(_, l)| l.name == name)
    }

    /// Tilesets in document order.
    pub fn tilesets(&self) -> &[TileSet] {
        &self.tilesets
    }

    /// Tile for a flag-free gid. Later tilesets take precedence.
    pub fn tile(&self, gid: u32) -> Option<&Tile> {
        if gid == 0 {
            return None;
        }
        self.tilesets.iter().rev().find_map(|ts| ts.tile_by_gid(gid))
    }

    /// Where the object with `id` lives.
    pub fn object_location(&self, id: u32) -> Option<ObjectLocation> {
        self.object_index.get(&id).copied()
    }

    /// Object with the given id, wherever it lives.
    pub fn object(&self, id: u32) -> Option<&MapObject> {
        match self.object_location(id)? {
            ObjectLocation::Layer { layer, index } => {
                self.layer(layer)?.as_objects()?.objects.get(index)
            }
            ObjectLocation::Tile { gid, index } => self.tile(gid)?.objects.get(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(children: Vec<LayerId>) -> Layer {
        Layer::new(LayerKind::Group(GroupLayer { children }))
    }

    #[test]
    fn all_layers_is_depth_first_document_order() {
        let mut map = Map::empty();
        let a = map.push_layer(Layer {
            name: "a".into(),
            ..Layer::new(LayerKind::Objects(ObjectLayer::default()))
        });
        let b = map.push_layer(Layer {
            name: "b".into(),
            ..Layer::new(LayerKind::Objects(ObjectLayer::default()))
        });
        let g = map.push_layer(Layer {
            name: "g".into(),
            ..group(vec![a, b])
        });
        let c = map.push_layer(Layer {
            name: "c".into(),
            ..Layer::new(LayerKind::Objects(ObjectLayer::default()))
        });
        map.root = vec![g, c];

        let names: Vec<_> = map.all_layers().iter().map(|(_, l)| l.name.clone()).collect();
        assert_eq!(names, vec!["g", "a", "b", "c"]);
        assert_eq!(map.children(g).count(), 2);
        assert_eq!(map.children(c).count(), 0);
        assert_eq!(map.layer_by_name("b").map(|(id, _)| id), Some(b));
    }

    #[test]
    fn cell_lookup_is_bounds_checked() {
        let mut layer = TileLayer::new(2, 2, 16, 16);
        layer.set_cell(1, 0, Cell::from_tile_id(TileId(3)));
        assert_eq!(layer.cell(1, 0).map(|c| c.tile), Some(3));
        assert!(layer.cell(0, 0).is_none());
        assert!(layer.cell(2, 0).is_none());
    }

    #[test]
    fn gid_zero_never_resolves() {
        let map = Map::empty();
        assert!(map.tile(0).is_none());
    }
}
