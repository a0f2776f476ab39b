use crate::object::MapObject;
use crate::properties::Properties;
use crate::resolver::TextureRegion;
use macroquad::math::Vec2;
use std::collections::BTreeMap;

/// The `<image>` a tileset was sliced from.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetImage {
    /// Source path as authored.
    pub source: String,
    /// Declared pixel width (0 when absent).
    pub width: u32,
    /// Declared pixel height (0 when absent).
    pub height: u32,
}

/// One frame of an animated tile.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrame {
    /// Global id of the static tile shown during this frame.
    pub tile: u32,
    /// Region of that static tile.
    pub region: TextureRegion,
    /// Frame duration in milliseconds.
    pub duration: u32,
}

/// Static or animated.
#[derive(Debug, Clone, PartialEq)]
pub enum TileKind {
    /// A single region.
    Static,
    /// Cycles through frames in order.
    Animated(Vec<AnimationFrame>),
}

/// A tile of a tileset.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// Global id (`first_gid + local id`).
    pub id: u32,
    /// Image region; for animated tiles the region of the tile it replaced.
    pub region: TextureRegion,
    /// Drawing offset from the tileset's `<tileoffset>`.
    pub offset: Vec2,
    /// Custom properties plus `terrain`, `probability` and `type` when authored.
    pub properties: Properties,
    /// Collision/hit-area objects from the tile's `<objectgroup>`.
    pub objects: Vec<MapObject>,
    /// Static or animated.
    pub kind: TileKind,
}

impl Tile {
    pub(crate) fn new_static(id: u32, region: TextureRegion, offset: Vec2) -> Self {
        Tile {
            id,
            region,
            offset,
            properties: Properties::new(),
            objects: Vec::new(),
            kind: TileKind::Static,
        }
    }

    /// Animation frames, if animated.
    pub fn frames(&self) -> Option<&[AnimationFrame]> {
        match &self.kind {
            TileKind::Animated(frames) => Some(frames),
            TileKind::Static => None,
        }
    }

    /// True for animated tiles.
    pub fn is_animated(&self) -> bool {
        matches!(self.kind, TileKind::Animated(_))
    }
}

/// A tileset and its tiles, keyed by local id.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSet {
    /// Tileset name.
    pub name: String,
    /// Global id of the tile with local id 0.
    pub first_gid: u32,
    /// Tile width in pixels.
    pub tile_width: u32,
    /// Tile height in pixels.
    pub tile_height: u32,
    /// Pixels between atlas tiles.
    pub spacing: u32,
    /// Pixels around the atlas edge.
    pub margin: u32,
    /// Drawing offset applied to every tile.
    pub tile_offset: Vec2,
    /// Atlas image; `None` for image collections.
    pub image: Option<TilesetImage>,
    /// Custom properties plus the synthetic `firstgid`.
    pub properties: Properties,
    pub(crate) tiles: BTreeMap<u32, Tile>,
}

impl TileSet {
    /// Tile with the given local id.
    pub fn tile(&self, local_id: u32) -> Option<&Tile> {
        self.tiles.get(&local_id)
    }

    /// Tile with the given flag-free global id.
    pub fn tile_by_gid(&self, gid: u32) -> Option<&Tile> {
        if gid == 0 {
            return None;
        }
        gid.checked_sub(self.first_gid).and_then(|local| self.tile(local))
    }

    /// Tiles in local-id order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Number of tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// True when the tileset has no tiles.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
