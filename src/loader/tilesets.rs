use crate::error::MapError;
use crate::gid::FLIP_MASK;
use crate::loader::objects::load_object;
use crate::loader::properties::{load_child_properties, load_class_defaults};
use crate::loader::tmx_loader::DecodeContext;
use crate::loader::xml::NodeExt;
use crate::map::ObjectLocation;
use crate::properties::{Properties, PropertyValue};
use crate::tileset::{AnimationFrame, Tile, TileKind, TileSet, TilesetImage};
use log::debug;
use macroquad::math::{vec2, Vec2};
use roxmltree::{Document, Node};
use std::collections::BTreeMap;
use std::path::Path;

/// Build a `<tileset>` (inline or external) and add it to the map's registry.
pub(crate) fn load_tileset(ctx: &mut DecodeContext<'_>, element: Node) -> Result<(), MapError> {
    let first_gid: u32 = element.attr_or("firstgid", 1)?;

    let tileset = match element.attribute("source") {
        Some(source) => {
            let path = ctx.files.resolve(ctx.map_path, source);
            let text = ctx.files.read_to_string(&path)?;
            let doc = Document::parse(&text).map_err(|source| MapError::ExternalTilesetParseFailure {
                path: path.clone(),
                source,
            })?;
            debug!("external tileset {}", path.display());
            build_tileset(ctx, doc.root_element(), first_gid, &path)?
        }
        None => {
            let base = ctx.map_path;
            build_tileset(ctx, element, first_gid, base)?
        }
    };

    for tile in tileset.tiles() {
        for (index, object) in tile.objects.iter().enumerate() {
            if object.id != 0 {
                ctx.map
                    .object_index
                    .insert(object.id, ObjectLocation::Tile { gid: tile.id, index });
            }
        }
    }
    debug!(
        "tileset '{}' firstgid {} with {} tiles",
        tileset.name,
        tileset.first_gid,
        tileset.len()
    );
    ctx.map.tilesets.push(tileset);
    Ok(())
}

/// `base` is the document image paths are relative to: the `.tsx` or the map.
fn build_tileset(
    ctx: &mut DecodeContext<'_>,
    element: Node,
    first_gid: u32,
    base: &Path,
) -> Result<TileSet, MapError> {
    let tile_width: u32 = element.attr_or("tilewidth", 0)?;
    let tile_height: u32 = element.attr_or("tileheight", 0)?;
    let spacing: u32 = element.attr_or("spacing", 0)?;
    let margin: u32 = element.attr_or("margin", 0)?;

    let tile_offset = match element.child("tileoffset") {
        Some(offset) => {
            let x: f32 = offset.attr_or("x", 0.0)?;
            let y: f32 = offset.attr_or("y", 0.0)?;
            vec2(x, if ctx.config.flip_y { -y } else { y })
        }
        None => Vec2::ZERO,
    };

    let image = match element.child("image") {
        Some(image) => Some(TilesetImage {
            source: image.require_attr("source")?.to_owned(),
            width: image.attr_or("width", 0)?,
            height: image.attr_or("height", 0)?,
        }),
        None => None,
    };

    let mut properties = Properties::new();
    load_child_properties(ctx, &mut properties, element)?;
    properties.insert("firstgid", PropertyValue::I64(first_gid.into()));

    let mut tileset = TileSet {
        name: element.attribute("name").unwrap_or_default().to_owned(),
        first_gid,
        tile_width,
        tile_height,
        spacing,
        margin,
        tile_offset,
        image,
        properties,
        tiles: BTreeMap::new(),
    };

    if tileset.image.is_some() {
        slice_atlas(ctx, &mut tileset, base)?;
    } else {
        load_image_collection(ctx, &mut tileset, element, base)?;
    }

    let mut animated = Vec::new();
    for tile_element in element.children_named("tile") {
        let local: u32 = tile_element.attr_or("id", 0)?;
        let Some(static_tile) = tileset.tiles.get(&local) else {
            continue;
        };
        let mut tile = match tile_element.child("animation") {
            Some(animation) => {
                let frames = load_frames(&tileset, animation)?;
                let mut tile = static_tile.clone();
                tile.kind = TileKind::Animated(frames);
                Some(tile)
            }
            None => None,
        };

        let target = match tile.as_mut() {
            Some(tile) => tile,
            None => match tileset.tiles.get_mut(&local) {
                Some(tile) => tile,
                None => continue,
            },
        };
        add_tile_properties(ctx, target, tile_element)?;
        add_tile_objects(ctx, target, tile_element)?;

        if let Some(tile) = tile.take() {
            animated.push((local, tile));
        }
    }

    // Frames were built against the static tiles, so the swap happens only now.
    for (local, tile) in animated {
        tileset.tiles.insert(local, tile);
    }
    Ok(tileset)
}

fn slice_atlas(ctx: &DecodeContext<'_>, tileset: &mut TileSet, base: &Path) -> Result<(), MapError> {
    let Some(image) = tileset.image.as_ref() else {
        return Ok(());
    };
    let (tw, th) = (tileset.tile_width, tileset.tile_height);
    if tw == 0 || th == 0 {
        return Err(MapError::InvalidMap(format!(
            "tileset '{}' has an image but no tile size",
            tileset.name
        )));
    }

    let path = ctx.files.resolve(base, &image.source);
    let region = ctx.images.image(&path)?;
    let (image_w, image_h) = (region.width() as u32, region.height() as u32);

    let props = &mut tileset.properties;
    props.insert("imagesource", PropertyValue::String(image.source.clone()));
    props.insert("imagewidth", PropertyValue::I64(image.width.into()));
    props.insert("imageheight", PropertyValue::I64(image.height.into()));
    props.insert("tilewidth", PropertyValue::I64(tw.into()));
    props.insert("tileheight", PropertyValue::I64(th.into()));
    props.insert("margin", PropertyValue::I64(tileset.margin.into()));
    props.insert("spacing", PropertyValue::I64(tileset.spacing.into()));

    // Walk in u64 so margin + spacing + tile size cannot wrap; every x, y inside the image fits in u32.
    let spacing = u64::from(tileset.spacing);
    let (step_x, step_y) = (u64::from(tw) + spacing, u64::from(th) + spacing);
    let mut local = 0u32;
    let mut y = u64::from(tileset.margin);
    while y + u64::from(th) <= u64::from(image_h) {
        let mut x = u64::from(tileset.margin);
        while x + u64::from(tw) <= u64::from(image_w) {
            let gid = global_id(tileset, local)?;
            let tile = Tile::new_static(gid, region.sub(x as u32, y as u32, tw, th), tileset.tile_offset);
            tileset.tiles.insert(local, tile);
            local += 1;
            x += step_x;
        }
        y += step_y;
    }
    Ok(())
}

/// `first_gid + local`, rejecting ids past the 29 bits a stored tile id can carry.
fn global_id(tileset: &TileSet, local: u32) -> Result<u32, MapError> {
    tileset
        .first_gid
        .checked_add(local)
        .filter(|gid| gid & FLIP_MASK == 0)
        .ok_or_else(|| {
            MapError::InvalidMap(format!(
                "tile {local} of tileset '{}' (firstgid {}) is past the largest tile id",
                tileset.name, tileset.first_gid
            ))
        })
}

fn load_image_collection(
    ctx: &DecodeContext<'_>,
    tileset: &mut TileSet,
    element: Node,
    base: &Path,
) -> Result<(), MapError> {
    for tile_element in element.children_named("tile") {
        let Some(image) = tile_element.child("image") else {
            continue;
        };
        let local: u32 = tile_element.attr_or("id", 0)?;
        let path = ctx.files.resolve(base, image.require_attr("source")?);
        let region = ctx.images.image(&path)?;
        let tile = Tile::new_static(global_id(tileset, local)?, region, tileset.tile_offset);
        tileset.tiles.insert(local, tile);
    }
    Ok(())
}

fn load_frames(tileset: &TileSet, animation: Node) -> Result<Vec<AnimationFrame>, MapError> {
    animation
        .children_named("frame")
        .map(|frame| {
            let local: u32 = frame.attr_parse("tileid")?.ok_or_else(|| MapError::MissingAttribute {
                element: "frame".to_owned(),
                name: "tileid".to_owned(),
            })?;
            let duration: u32 = frame.attr_or("duration", 0)?;
            let tile = tileset.tile(local).ok_or_else(|| {
                MapError::InvalidMap(format!(
                    "animation frame references tile {local} missing from tileset '{}'",
                    tileset.name
                ))
            })?;
            Ok(AnimationFrame {
                tile: tile.id,
                region: tile.region.clone(),
                duration,
            })
        })
        .collect()
}

fn add_tile_properties(ctx: &mut DecodeContext<'_>, tile: &mut Tile, element: Node) -> Result<(), MapError> {
    for name in ["terrain", "probability"] {
        if let Some(value) = element.attribute(name) {
            tile.properties.insert(name, PropertyValue::String(value.to_owned()));
        }
    }
    let class_name = element.attribute("type").or_else(|| element.attribute("class"));
    if let Some(class_name) = class_name {
        tile.properties.insert("type", PropertyValue::String(class_name.to_owned()));
    }
    load_child_properties(ctx, &mut tile.properties, element)?;
    load_class_defaults(ctx, class_name, &mut tile.properties)
}

fn add_tile_objects(ctx: &mut DecodeContext<'_>, tile: &mut Tile, element: Node) -> Result<(), MapError> {
    let Some(group) = element.child("objectgroup") else {
        return Ok(());
    };
    let reference_height = tile.region.height();
    for object in group.children_named("object") {
        tile.objects.push(load_object(ctx, object, reference_height)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderConfig;
    use crate::map::Map;
    use crate::project::ProjectClassSchema;
    use crate::resolver::MemoryResolver;
    use macroquad::math::Rect;

    fn load(
        xml: &str,
        resolver: &MemoryResolver,
        schema: Option<&ProjectClassSchema>,
    ) -> Result<Map, MapError> {
        let config = LoaderConfig::default();
        let doc = roxmltree::Document::parse(xml).expect("xml");
        let mut ctx = DecodeContext::new(&config, schema, resolver, resolver, Path::new("maps/level.tmx"));
        load_tileset(&mut ctx, doc.root_element())?;
        Ok(ctx.map)
    }

    #[test]
    fn atlas_is_sliced_with_margin_and_spacing() {
        let resolver = MemoryResolver::new().with_image("maps/tiles.png", 37, 20);
        let xml = r#"<tileset firstgid="5" name="terrain" tilewidth="16" tileheight="8" spacing="2" margin="1">
            <tileoffset x="3" y="4"/>
            <image source="tiles.png" width="37" height="20"/>
        </tileset>"#;
        let map = load(xml, &resolver, None).expect("tileset");
        let ts = &map.tilesets()[0];

        assert_eq!(ts.len(), 4);
        assert_eq!(ts.properties.get_i64("firstgid"), Some(5));
        assert_eq!(ts.properties.get_string("imagesource"), Some("tiles.png"));
        assert_eq!(ts.properties.get_i64("spacing"), Some(2));
        assert_eq!(ts.tile_offset, vec2(3.0, -4.0));

        let last = map.tile(8).expect("gid 8");
        assert_eq!(last.region.rect, Rect::new(19.0, 11.0, 16.0, 8.0));
        assert_eq!(last.offset, vec2(3.0, -4.0));
        assert!(map.tile(9).is_none());
        assert!(map.tile(4).is_none());
    }

    #[test]
    fn image_collection_tiles_use_their_own_images() {
        let resolver = MemoryResolver::new()
            .with_image("maps/a.png", 10, 12)
            .with_image("maps/b.png", 30, 40);
        let xml = r#"<tileset firstgid="1" name="props" tilewidth="30" tileheight="40">
            <tile id="0"><image source="a.png"/></tile>
            <tile id="3" type="Crate" probability="0.5"><image source="b.png"/></tile>
        </tileset>"#;
        let map = load(xml, &resolver, None).expect("tileset");
        assert_eq!(map.tile(1).map(|t| t.region.height()), Some(12.0));
        let crate_tile = map.tile(4).expect("gid 4");
        assert_eq!(crate_tile.region.width(), 30.0);
        assert_eq!(crate_tile.properties.get_string("type"), Some("Crate"));
        assert_eq!(crate_tile.properties.get_string("probability"), Some("0.5"));
        assert!(map.tile(2).is_none());
    }

    #[test]
    fn animated_tiles_replace_static_slots_after_the_loop() {
        let resolver = MemoryResolver::new().with_image("maps/anim.png", 48, 16);
        let xml = r#"<tileset firstgid="1" name="anim" tilewidth="16" tileheight="16">
            <image source="anim.png" width="48" height="16"/>
            <tile id="0">
              <properties><property name="lava" type="bool" value="true"/></properties>
              <animation><frame tileid="1" duration="100"/><frame tileid="2" duration="150"/></animation>
            </tile>
            <tile id="1">
              <animation><frame tileid="0" duration="50"/></animation>
            </tile>
        </tileset>"#;
        let map = load(xml, &resolver, None).expect("tileset");

        let first = map.tile(1).expect("gid 1");
        assert!(first.is_animated());
        assert_eq!(first.properties.get_bool("lava"), Some(true));
        let frames = first.frames().expect("frames");
        assert_eq!(frames.iter().map(|f| (f.tile, f.duration)).collect::<Vec<_>>(), vec![(2, 100), (3, 150)]);
        assert_eq!(frames[1].region.rect.x, 32.0);

        let second = map.tile(2).and_then(Tile::frames).expect("gid 2 frames");
        assert_eq!(second[0].tile, 1);
        assert!(!map.tile(3).expect("gid 3").is_animated());
    }

    #[test]
    fn external_tileset_resolves_images_next_to_the_tsx() {
        let tsx = r#"<?xml version="1.0"?>
            <tileset name="ext" tilewidth="8" tileheight="8">
              <image source="img/ext.png" width="16" height="8"/>
              <tile id="1">
                <objectgroup>
                  <object id="12" x="0" y="2" width="8" height="2"/>
                </objectgroup>
              </tile>
            </tileset>"#;
        let resolver = MemoryResolver::new()
            .with_file("maps/../shared/ext.tsx", tsx)
            .with_image("maps/../shared/img/ext.png", 16, 8);
        let map = load(r#"<tileset firstgid="10" source="../shared/ext.tsx"/>"#, &resolver, None).expect("tileset");

        let ts = &map.tilesets()[0];
        assert_eq!(ts.name, "ext");
        assert_eq!(ts.first_gid, 10);
        let tile = map.tile(11).expect("gid 11");
        assert_eq!(tile.objects.len(), 1);
        assert_eq!(map.object_location(12), Some(ObjectLocation::Tile { gid: 11, index: 0 }));
        // flipped against the 8px tile region
        assert_eq!(map.object(12).map(|o| o.position().y), Some(4.0));
    }

    #[test]
    fn gids_past_the_id_range_are_rejected() {
        let resolver = MemoryResolver::new().with_image("maps/a.png", 8, 8);
        let xml = r#"<tileset firstgid="4294967295" name="far" tilewidth="8" tileheight="8">
            <tile id="5"><image source="a.png"/></tile>
        </tileset>"#;
        let err = load(xml, &resolver, None).unwrap_err();
        assert!(matches!(err, MapError::InvalidMap(_)));

        let resolver = MemoryResolver::new().with_image("maps/strip.png", 32, 8);
        let xml = r#"<tileset firstgid="536870911" name="edge" tilewidth="8" tileheight="8">
            <image source="strip.png"/>
        </tileset>"#;
        let err = load(xml, &resolver, None).unwrap_err();
        assert!(matches!(err, MapError::InvalidMap(_)));
    }

    #[test]
    fn huge_margin_and_spacing_slice_nothing() {
        let resolver = MemoryResolver::new().with_image("maps/t.png", 16, 16);
        let xml = r#"<tileset name="t" tilewidth="8" tileheight="8" margin="4294967295" spacing="4294967295">
            <image source="t.png"/>
        </tileset>"#;
        let map = load(xml, &resolver, None).expect("tileset");
        assert_eq!(map.tilesets()[0].len(), 0);

        let xml = r#"<tileset name="t" tilewidth="8" tileheight="8" spacing="4294967295">
            <image source="t.png"/>
        </tileset>"#;
        let map = load(xml, &resolver, None).expect("tileset");
        assert_eq!(map.tilesets()[0].len(), 1);
    }

    #[test]
    fn malformed_external_tileset_is_reported() {
        let resolver = MemoryResolver::new().with_file("maps/bad.tsx", "<tileset><unclosed></tileset>");
        let err = load(r#"<tileset source="bad.tsx"/>"#, &resolver, None).unwrap_err();
        assert!(matches!(err, MapError::ExternalTilesetParseFailure { .. }));
    }

    #[test]
    fn tile_class_defaults_come_from_the_schema() {
        let mut schema = ProjectClassSchema::new();
        schema.insert_class(
            "Spikes",
            serde_json::from_str(r#"[{"name": "damage", "type": "int", "value": 5}]"#).expect("members"),
        );
        let resolver = MemoryResolver::new().with_image("maps/s.png", 8, 8);
        let xml = r#"<tileset name="s" tilewidth="8" tileheight="8">
            <image source="s.png"/>
            <tile id="0" class="Spikes"/>
        </tileset>"#;
        let map = load(xml, &resolver, Some(&schema)).expect("tileset");
        let tile = map.tile(1).expect("default firstgid is 1");
        assert_eq!(tile.properties.get_i64("damage"), Some(5));
        assert_eq!(tile.properties.get_string("type"), Some("Spikes"));
    }
}
