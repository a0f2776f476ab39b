use crate::properties::Properties;
use macroquad::math::{Rect, Vec2};

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    /// `left` (default)
    Left,
    /// `center`
    Center,
    /// `right`
    Right,
    /// `justify`
    Justify,
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    /// `top` (default)
    Top,
    /// `center`
    Center,
    /// `bottom`
    Bottom,
}

/// Text object content and typography.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct TextObject {
    /// Box the text is laid out in.
    pub rect: Rect,
    pub text: String,
    /// Degrees, clockwise.
    pub rotation: f32,
    pub font_family: String,
    /// Font size in pixels (16 when absent).
    pub pixel_size: u32,
    pub halign: HorizontalAlign,
    pub valign: VerticalAlign,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikeout: bool,
    pub wrap: bool,
    pub kerning: bool,
    pub color: macroquad::color::Color,
}

/// A tile placed as an object.
#[derive(Debug, Clone, PartialEq)]
pub struct TileObject {
    /// Flag-free global id of the tile.
    pub tile: u32,
    /// Mirrored left to right.
    pub flip_horizontally: bool,
    /// Mirrored top to bottom.
    pub flip_vertically: bool,
    /// Anchor of the tile image.
    pub position: Vec2,
    /// Requested size relative to the tile's native size (times the tile-space scale).
    pub scale: Vec2,
    /// Degrees, clockwise.
    pub rotation: f32,
}

/// Geometry of a map object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectShape {
    /// Axis-aligned box.
    Rectangle(Rect),
    /// Ellipse inscribed in the box.
    Ellipse(Rect),
    /// Single point.
    Point(Vec2),
    /// Closed shape; vertices are relative to `position`.
    #[allow(missing_docs)]
    Polygon { position: Vec2, vertices: Vec<Vec2> },
    /// Open shape; vertices are relative to `position`.
    #[allow(missing_docs)]
    Polyline { position: Vec2, vertices: Vec<Vec2> },
    /// Text box.
    Text(Box<TextObject>),
    /// Placed tile.
    Tile(TileObject),
}

/// An object from an object group or a tile's collision group.
#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    /// Object id, 0 when the document gives none.
    pub id: u32,
    /// Object name (empty when absent).
    pub name: String,
    /// Whether the object is shown.
    pub visible: bool,
    /// Degrees, clockwise.
    pub rotation: f32,
    /// Custom properties plus the synthetic `x`, `y`, `width`, `height` (and `id`, `type`, `rotation`, `gid` when present).
    pub properties: Properties,
    /// Geometry.
    pub shape: ObjectShape,
}

impl MapObject {
    /// Anchor position of the shape.
    pub fn position(&self) -> Vec2 {
        match &self.shape {
            ObjectShape::Rectangle(r) | ObjectShape::Ellipse(r) => r.point(),
            ObjectShape::Point(p) => *p,
            ObjectShape::Polygon { position, .. } | ObjectShape::Polyline { position, .. } => *position,
            ObjectShape::Text(t) => t.rect.point(),
            ObjectShape::Tile(t) => t.position,
        }
    }

    /// The `type`/class of the object, if any.
    pub fn class_name(&self) -> Option<&str> {
        self.properties.get_string("type")
    }
}
