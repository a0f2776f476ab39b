use crate::error::MapError;
use crate::gid::{parse_raw_gid, TileId};
use crate::loader::properties::{load_child_properties, load_class_defaults};
use crate::loader::tmx_loader::DecodeContext;
use crate::loader::xml::NodeExt;
use crate::object::{HorizontalAlign, MapObject, ObjectShape, TextObject, TileObject, VerticalAlign};
use crate::properties::{parse_tiled_color, Properties, PropertyValue};
use macroquad::math::{vec2, Rect, Vec2};
use roxmltree::Node;

/// Build one `<object>`.
///
/// `reference_height` is the height y is flipped against: the map's pixel height for
/// object groups, the tile's region height for collision objects.
pub(crate) fn load_object(
    ctx: &mut DecodeContext<'_>,
    element: Node,
    reference_height: f32,
) -> Result<MapObject, MapError> {
    let (sx, sy) = ctx.object_scale();
    let flip = ctx.config.flip_y;

    let raw_y: f32 = element.attr_or("y", 0.0)?;
    let x = element.attr_or::<f32>("x", 0.0)? * sx;
    let y = (if flip { reference_height - raw_y } else { raw_y }) * sy;
    let width = element.attr_or::<f32>("width", 0.0)? * sx;
    let height = element.attr_or::<f32>("height", 0.0)? * sy;
    let id: u32 = element.attr_or("id", 0)?;

    // Top-left corner for box-like shapes.
    let top = if flip { y - height } else { y };

    let mut tile_gid = None;
    let shape = if let Some(polygon) = element.child("polygon") {
        ObjectShape::Polygon {
            position: vec2(x, y),
            vertices: parse_points(polygon, sx, sy, flip)?,
        }
    } else if let Some(polyline) = element.child("polyline") {
        ObjectShape::Polyline {
            position: vec2(x, y),
            vertices: parse_points(polyline, sx, sy, flip)?,
        }
    } else if element.child("ellipse").is_some() {
        ObjectShape::Ellipse(Rect::new(x, top, width, height))
    } else if element.child("point").is_some() {
        ObjectShape::Point(vec2(x, top))
    } else if let Some(text) = element.child("text") {
        ObjectShape::Text(Box::new(load_text(text, Rect::new(x, top, width, height))?))
    } else if let Some(gid) = element.attribute("gid") {
        let raw = parse_raw_gid(gid).ok_or_else(|| MapError::invalid_attribute("object", "gid", gid))?;
        tile_gid = Some(raw);
        ObjectShape::Tile(load_tile_object(ctx, element, id, raw, x, if flip { y } else { y - height })?)
    } else {
        ObjectShape::Rectangle(Rect::new(x, top, width, height))
    };

    let mut properties = Properties::new();
    let is_tile = tile_gid.is_some();
    if let Some(raw) = tile_gid {
        properties.insert("gid", PropertyValue::I64(raw.into()));
    }
    let rotation: Option<f32> = element.attr_parse("rotation")?;
    if let Some(rotation) = rotation {
        properties.insert("rotation", PropertyValue::F32(rotation));
    }
    let class_name = element.attribute("type").or_else(|| element.attribute("class"));
    if let Some(class_name) = class_name {
        properties.insert("type", PropertyValue::String(class_name.to_owned()));
    }
    if id != 0 {
        properties.insert("id", PropertyValue::I64(id.into()));
    }
    properties.insert("x", PropertyValue::F32(x));
    properties.insert("y", PropertyValue::F32(if is_tile { y } else { top }));
    properties.insert("width", PropertyValue::F32(width));
    properties.insert("height", PropertyValue::F32(height));

    load_child_properties(ctx, &mut properties, element)?;
    load_class_defaults(ctx, class_name, &mut properties)?;

    Ok(MapObject {
        id,
        name: element.attribute("name").unwrap_or_default().to_owned(),
        visible: element.attr_flag("visible", true)?,
        rotation: rotation.unwrap_or(0.0),
        properties,
        shape,
    })
}

fn parse_points(element: Node, sx: f32, sy: f32, flip: bool) -> Result<Vec<Vec2>, MapError> {
    let points = element.require_attr("points")?;
    let invalid = || MapError::invalid_attribute(element.tag_name().name(), "points", points);
    let y_sign = if flip { -1.0 } else { 1.0 };
    points
        .split_whitespace()
        .map(|pair| {
            let (px, py) = pair.split_once(',').ok_or_else(invalid)?;
            let px: f32 = px.trim().parse().map_err(|_| invalid())?;
            let py: f32 = py.trim().parse().map_err(|_| invalid())?;
            Ok(vec2(px * sx, py * sy * y_sign))
        })
        .collect()
}

fn load_text(element: Node, rect: Rect) -> Result<TextObject, MapError> {
    let pixel_size = match element.attr_parse("pixelsize")? {
        Some(size) => size,
        None => element.attr_or("pixelSize", 16)?,
    };
    let halign = match element.attribute("halign").unwrap_or("left") {
        "center" => HorizontalAlign::Center,
        "right" => HorizontalAlign::Right,
        "justify" => HorizontalAlign::Justify,
        _ => HorizontalAlign::Left,
    };
    let valign = match element.attribute("valign").unwrap_or("top") {
        "center" => VerticalAlign::Center,
        "bottom" => VerticalAlign::Bottom,
        _ => VerticalAlign::Top,
    };
    let color_attr = element.attribute("color").unwrap_or("#000000");
    let color = parse_tiled_color(color_attr)
        .ok_or_else(|| MapError::invalid_attribute("text", "color", color_attr))?;

    Ok(TextObject {
        rect,
        text: element.text_or_empty().to_owned(),
        rotation: element.attr_or("rotation", 0.0)?,
        font_family: element.attribute("fontfamily").unwrap_or_default().to_owned(),
        pixel_size,
        halign,
        valign,
        bold: element.attr_flag("bold", false)?,
        italic: element.attr_flag("italic", false)?,
        underline: element.attr_flag("underline", false)?,
        strikeout: element.attr_flag("strikeout", false)?,
        wrap: element.attr_flag("wrap", false)?,
        kerning: element.attr_flag("kerning", true)?,
        color,
    })
}

fn load_tile_object(
    ctx: &DecodeContext<'_>,
    element: Node,
    object_id: u32,
    raw_gid: u32,
    x: f32,
    y: f32,
) -> Result<TileObject, MapError> {
    let id = TileId(raw_gid);
    let tile = ctx.map.tile(id.clean()).ok_or(MapError::InvalidObjectGid {
        object_id,
        gid: id.clean(),
    })?;
    let (sx, sy) = ctx.object_scale();
    let region_w = tile.region.width();
    let region_h = tile.region.height();
    let object_w: f32 = element.attr_or("width", region_w)?;
    let object_h: f32 = element.attr_or("height", region_h)?;

    Ok(TileObject {
        tile: id.clean(),
        flip_horizontally: id.flip_h(),
        flip_vertically: id.flip_v(),
        position: vec2(x, y),
        scale: vec2(sx * (object_w / region_w), sy * (object_h / region_h)),
        rotation: element.attr_or("rotation", 0.0)?,
    })
}
