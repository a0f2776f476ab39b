use crate::error::MapError;
use crate::gid::TileId;
use crate::loader::data::decode_tile_ids;
use crate::loader::objects::load_object;
use crate::loader::properties::load_child_properties;
use crate::loader::tmx_loader::DecodeContext;
use crate::loader::xml::NodeExt;
use crate::map::{Cell, GroupLayer, ImageLayer, Layer, LayerId, LayerKind, ObjectLayer, ObjectLocation, TileLayer};
use crate::properties::{parse_tiled_color, PropertyValue};
use log::{debug, warn};
use macroquad::math::vec2;
use roxmltree::Node;

/// Build the layer described by `element` and add it to the map's arena.
///
/// Returns `None` for elements that are not layers.
pub(crate) fn load_layer(ctx: &mut DecodeContext<'_>, element: Node) -> Result<Option<LayerId>, MapError> {
    let id = match element.tag_name().name() {
        "layer" => load_tile_layer(ctx, element)?,
        "objectgroup" => load_object_group(ctx, element)?,
        "imagelayer" => load_image_layer(ctx, element)?,
        "group" => load_group(ctx, element)?,
        _ => return Ok(None),
    };
    Ok(Some(id))
}

/// Attributes every layer kind shares. Custom properties are loaded by the caller.
fn basic_layer(element: Node, kind: LayerKind) -> Result<Layer, MapError> {
    let tint_attr = element.attribute("tintcolor").unwrap_or("#ffffffff");
    let tint = parse_tiled_color(tint_attr)
        .ok_or_else(|| MapError::invalid_attribute(element.tag_name().name(), "tintcolor", tint_attr))?;
    Ok(Layer {
        name: element.attribute("name").unwrap_or_default().to_owned(),
        opacity: element.attr_or("opacity", 1.0)?,
        visible: element.attr_flag("visible", true)?,
        offset: vec2(element.attr_or("offsetx", 0.0)?, element.attr_or("offsety", 0.0)?),
        parallax: vec2(element.attr_or("parallaxx", 1.0)?, element.attr_or("parallaxy", 1.0)?),
        tint,
        ..Layer::new(kind)
    })
}

fn load_tile_layer(ctx: &mut DecodeContext<'_>, element: Node) -> Result<LayerId, MapError> {
    let width: usize = element.attr_or("width", 0)?;
    let height: usize = element.attr_or("height", 0)?;
    let ids = decode_tile_ids(element, width, height)?;

    let mut grid = TileLayer::new(width, height, ctx.map.tile_width, ctx.map.tile_height);
    for y in 0..height {
        let row = if ctx.config.flip_y { height - 1 - y } else { y };
        for x in 0..width {
            let id = TileId(ids[y * width + x]);
            if id.is_empty() {
                continue;
            }
            if ctx.map.tile(id.clean()).is_none() {
                warn!(
                    "layer '{}': no tile with gid {} at ({x}, {y}), leaving the cell empty",
                    element.attribute("name").unwrap_or_default(),
                    id.clean()
                );
                continue;
            }
            grid.set_cell(x, row, Cell::from_tile_id(id));
        }
    }

    let mut layer = basic_layer(element, LayerKind::Tiles(grid))?;
    load_child_properties(ctx, &mut layer.properties, element)?;
    debug!("tile layer '{}' {width}x{height}", layer.name);
    Ok(ctx.map.push_layer(layer))
}

fn load_object_group(ctx: &mut DecodeContext<'_>, element: Node) -> Result<LayerId, MapError> {
    let mut layer = basic_layer(element, LayerKind::Objects(ObjectLayer::default()))?;
    for name in ["color", "draworder"] {
        if let Some(value) = element.attribute(name) {
            layer.properties.insert(name, PropertyValue::String(value.to_owned()));
        }
    }
    load_child_properties(ctx, &mut layer.properties, element)?;

    let reference_height = ctx.map.height_in_pixels as f32;
    let mut objects = Vec::new();
    for object in element.children_named("object") {
        objects.push(load_object(ctx, object, reference_height)?);
    }
    debug!("object group '{}' with {} objects", layer.name, objects.len());

    let registrations: Vec<(usize, u32)> = objects
        .iter()
        .enumerate()
        .filter(|(_, o)| o.id != 0)
        .map(|(index, o)| (index, o.id))
        .collect();
    layer.kind = LayerKind::Objects(ObjectLayer { objects });
    let layer_id = ctx.map.push_layer(layer);
    for (index, object_id) in registrations {
        ctx.map
            .object_index
            .insert(object_id, ObjectLocation::Layer { layer: layer_id, index });
    }
    Ok(layer_id)
}

fn load_image_layer(ctx: &mut DecodeContext<'_>, element: Node) -> Result<LayerId, MapError> {
    let x: f32 = match element.attr_parse("offsetx")? {
        Some(x) => x,
        None => element.attr_or("x", 0.0)?,
    };
    let mut y: f32 = match element.attr_parse("offsety")? {
        Some(y) => y,
        None => element.attr_or("y", 0.0)?,
    };
    if ctx.config.flip_y {
        y = ctx.map.height_in_pixels as f32 - y;
    }

    let image = match element.child("image") {
        Some(image) => {
            let path = ctx.files.resolve(ctx.map_path, image.require_attr("source")?);
            let region = ctx.images.image(&path)?;
            y -= region.height();
            Some(region)
        }
        None => None,
    };

    let kind = LayerKind::Image(ImageLayer {
        image,
        position: vec2(x, y),
        repeat_x: element.attr_flag("repeatx", false)?,
        repeat_y: element.attr_flag("repeaty", false)?,
    });
    let mut layer = basic_layer(element, kind)?;
    load_child_properties(ctx, &mut layer.properties, element)?;
    debug!("image layer '{}' at ({x}, {y})", layer.name);
    Ok(ctx.map.push_layer(layer))
}

fn load_group(ctx: &mut DecodeContext<'_>, element: Node) -> Result<LayerId, MapError> {
    let mut layer = basic_layer(element, LayerKind::Group(GroupLayer::default()))?;
    load_child_properties(ctx, &mut layer.properties, element)?;

    let mut children = Vec::new();
    for child in element.children().filter(Node::is_element) {
        if let Some(id) = load_layer(ctx, child)? {
            children.push(id);
        }
    }
    debug!("group '{}' with {} children", layer.name, children.len());

    layer.kind = LayerKind::Group(GroupLayer {
        children: children.clone(),
    });
    let group_id = ctx.map.push_layer(layer);
    for child in children {
        ctx.map.layers[child.0].parent = Some(group_id);
    }
    Ok(group_id)
}
