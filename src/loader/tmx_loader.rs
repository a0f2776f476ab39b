use crate::config::LoaderConfig;
use crate::error::MapError;
use crate::loader::layers::load_layer;
use crate::loader::properties::load_child_properties;
use crate::loader::tilesets::load_tileset;
use crate::loader::xml::NodeExt;
use crate::map::{LayerKind, Map, Orientation};
use crate::project::{ClassMember, ProjectClassSchema};
use crate::properties::{parse_tiled_color, PropertyValue};
use crate::resolver::{FileResolver, ImageResolver};
use log::{debug, info};
use roxmltree::{Document, Node};
use std::collections::VecDeque;
use std::path::Path;

/// Work queued during construction that needs the finished map.
pub(crate) type DeferredAction = Box<dyn FnOnce(&mut Map) -> Result<(), MapError>>;

/// State of a single decode: the map under construction plus its scratch data.
pub(crate) struct DecodeContext<'s> {
    pub config: &'s LoaderConfig,
    pub schema: Option<&'s ProjectClassSchema>,
    pub files: &'s dyn FileResolver,
    pub images: &'s dyn ImageResolver,
    pub map_path: &'s Path,
    pub map: Map,
    deferred: VecDeque<DeferredAction>,
}

impl<'s> DecodeContext<'s> {
    pub fn new(
        config: &'s LoaderConfig,
        schema: Option<&'s ProjectClassSchema>,
        files: &'s dyn FileResolver,
        images: &'s dyn ImageResolver,
        map_path: &'s Path,
    ) -> Self {
        DecodeContext {
            config,
            schema,
            files,
            images,
            map_path,
            map: Map::empty(),
            deferred: VecDeque::new(),
        }
    }

    pub fn defer(&mut self, action: DeferredAction) {
        self.deferred.push_back(action);
    }

    pub fn class_members(&self, class_name: &str) -> Result<&'s [ClassMember], MapError> {
        self.schema
            .ok_or(MapError::MissingClassSchema)?
            .members(class_name)
    }

    /// Scale applied to object geometry: tile units or pixels.
    pub fn object_scale(&self) -> (f32, f32) {
        if self.config.convert_object_to_tile_space {
            (
                1.0 / self.map.tile_width as f32,
                1.0 / self.map.tile_height as f32,
            )
        } else {
            (1.0, 1.0)
        }
    }

    /// Run queued actions in order and hand the map over.
    fn finish(mut self) -> Result<Map, MapError> {
        while let Some(action) = self.deferred.pop_front() {
            action(&mut self.map)?;
        }
        Ok(self.map)
    }
}

/// Decodes TMX documents into [`Map`]s.
pub struct TmxLoader<R> {
    resolver: R,
    config: LoaderConfig,
    schema: Option<ProjectClassSchema>,
}

impl<R: FileResolver + ImageResolver> TmxLoader<R> {
    /// Create a loader. When the config names a project file it is read through `resolver`.
    pub fn new(resolver: R, config: LoaderConfig) -> Result<Self, MapError> {
        let schema = match &config.project_file_path {
            Some(path) => {
                let json = resolver.read_to_string(path)?;
                let schema = ProjectClassSchema::from_json_str(&json).map_err(|source| MapError::Json {
                    path: path.clone(),
                    source,
                })?;
                Some(schema)
            }
            None => None,
        };
        Ok(TmxLoader {
            resolver,
            config,
            schema,
        })
    }

    /// Use `schema` for class properties instead of (or without) a project file.
    pub fn with_schema(mut self, schema: ProjectClassSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Read and decode the `.tmx` file at `path`.
    pub fn load(&self, path: &Path) -> Result<Map, MapError> {
        if path.extension().and_then(|e| e.to_str()) != Some("tmx") {
            return Err(MapError::UnsupportedFormat(path.display().to_string()));
        }
        let text = self.resolver.read_to_string(path)?;
        self.load_from_str(&text, path)
    }

    /// Decode TMX text; `path` anchors relative references (tilesets, images).
    pub fn load_from_str(&self, xml: &str, path: &Path) -> Result<Map, MapError> {
        let doc = Document::parse(xml).map_err(|source| MapError::Xml {
            path: path.to_path_buf(),
            source,
        })?;
        self.decode(doc.root_element(), path)
    }

    /// Decode an already parsed `<map>` element.
    pub fn decode(&self, root: Node, path: &Path) -> Result<Map, MapError> {
        info!("Loading TMX map {}", path.display());
        if !root.has_tag_name("map") {
            return Err(MapError::InvalidMap(format!(
                "root element is <{}>, expected <map>",
                root.tag_name().name()
            )));
        }

        let mut ctx = DecodeContext::new(
            &self.config,
            self.schema.as_ref(),
            &self.resolver,
            &self.resolver,
            path,
        );

        load_header(&mut ctx, root)?;

        let mut properties = std::mem::take(&mut ctx.map.properties);
        load_child_properties(&mut ctx, &mut properties, root)?;
        ctx.map.properties = properties;

        for tileset in root.children_named("tileset") {
            load_tileset(&mut ctx, tileset)?;
        }

        for element in root.children().filter(|c| c.is_element() && !c.has_tag_name("tileset")) {
            if let Some(id) = load_layer(&mut ctx, element)? {
                ctx.map.root.push(id);
            }
        }

        propagate_parallax(&mut ctx.map);

        let map = ctx.finish()?;
        info!(
            "Loaded map {} ({}x{} tiles, {} tilesets, {} layers)",
            path.display(),
            map.width,
            map.height,
            map.tilesets.len(),
            map.layers.len()
        );
        Ok(map)
    }
}

fn load_header(ctx: &mut DecodeContext<'_>, root: Node) -> Result<(), MapError> {
    let orientation = root.attribute("orientation");
    let width: u32 = root.attr_or("width", 0)?;
    let height: u32 = root.attr_or("height", 0)?;
    let tile_width: u32 = root.attr_or("tilewidth", 0)?;
    let tile_height: u32 = root.attr_or("tileheight", 0)?;
    let hex_side_length: u32 = root.attr_or("hexsidelength", 0)?;
    let stagger_axis = root.attribute("staggeraxis");
    let stagger_index = root.attribute("staggerindex");
    let background = root.attribute("backgroundcolor");

    let map = &mut ctx.map;
    let props = &mut map.properties;
    if let Some(o) = orientation {
        props.insert("orientation", PropertyValue::String(o.to_owned()));
    }
    props.insert("width", PropertyValue::I64(width.into()));
    props.insert("height", PropertyValue::I64(height.into()));
    props.insert("tilewidth", PropertyValue::I64(tile_width.into()));
    props.insert("tileheight", PropertyValue::I64(tile_height.into()));
    props.insert("hexsidelength", PropertyValue::I64(hex_side_length.into()));
    if let Some(axis) = stagger_axis {
        props.insert("staggeraxis", PropertyValue::String(axis.to_owned()));
    }
    if let Some(index) = stagger_index {
        props.insert("staggerindex", PropertyValue::String(index.to_owned()));
    }
    if let Some(color) = background {
        props.insert("backgroundcolor", PropertyValue::String(color.to_owned()));
    }

    map.orientation = orientation.and_then(Orientation::from_attr);
    map.width = width;
    map.height = height;
    map.tile_width = tile_width;
    map.tile_height = tile_height;
    map.hex_side_length = hex_side_length;
    map.stagger_axis = stagger_axis.map(str::to_owned);
    map.stagger_index = stagger_index.map(str::to_owned);
    map.background_color = background.and_then(parse_tiled_color);

    let (w, h) = pixel_extent(map.orientation, width, height, tile_width, tile_height).ok_or_else(|| {
        MapError::InvalidMap(format!(
            "{width}x{height} tiles of {tile_width}x{tile_height} pixels overflow the pixel extent"
        ))
    })?;
    map.width_in_pixels = w;
    map.height_in_pixels = h;
    debug!("map {width}x{height} tiles, {w}x{h} pixels");
    Ok(())
}

/// Pixel footprint of the map. Staggered maps interlock rows, so they are half as tall
/// plus half a tile, and half a tile wider. `None` when the extent does not fit in `u32`.
pub(crate) fn pixel_extent(
    orientation: Option<Orientation>,
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
) -> Option<(u32, u32)> {
    let mut w = width.checked_mul(tile_width)?;
    let mut h = height.checked_mul(tile_height)?;
    if orientation == Some(Orientation::Staggered) && height > 1 {
        w = w.checked_add(tile_width / 2)?;
        h = h / 2 + tile_height / 2;
    }
    Some((w, h))
}

/// Multiply every layer's parallax factor by those of its ancestor groups.
pub(crate) fn propagate_parallax(map: &mut Map) {
    let mut groups: VecDeque<_> = map
        .root
        .iter()
        .copied()
        .filter(|id| matches!(map.layers[id.0].kind, LayerKind::Group(_)))
        .collect();

    while let Some(group_id) = groups.pop_front() {
        let group = &map.layers[group_id.0];
        let factor = group.parallax;
        let children = match &group.kind {
            LayerKind::Group(g) => g.children.clone(),
            _ => continue,
        };
        for child_id in children {
            let child = &mut map.layers[child_id.0];
            child.parallax *= factor;
            if matches!(child.kind, LayerKind::Group(_)) {
                groups.push_back(child_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{GroupLayer, Layer, LayerId, ObjectLayer};
    use macroquad::math::vec2;

    #[test]
    fn staggered_maps_get_interlocked_extent() {
        assert_eq!(pixel_extent(Some(Orientation::Staggered), 10, 10, 32, 32), Some((336, 176)));
        assert_eq!(pixel_extent(Some(Orientation::Staggered), 10, 1, 32, 32), Some((320, 32)));
        assert_eq!(pixel_extent(Some(Orientation::Orthogonal), 10, 10, 32, 32), Some((320, 320)));
        assert_eq!(pixel_extent(None, 3, 2, 16, 8), Some((48, 16)));
    }

    #[test]
    fn pixel_extent_overflow_is_none() {
        assert_eq!(pixel_extent(None, 70_000, 1, 70_000, 16), None);
        assert_eq!(pixel_extent(None, 1, 70_000, 16, 70_000), None);
        assert_eq!(pixel_extent(Some(Orientation::Staggered), 1, 2, u32::MAX, 1), None);
    }

    fn layer(parallax: (f32, f32), kind: LayerKind) -> Layer {
        Layer {
            parallax: vec2(parallax.0, parallax.1),
            ..Layer::new(kind)
        }
    }

    #[test]
    fn parallax_multiplies_down_the_group_tree() {
        let mut map = Map::empty();
        let m = map.push_layer(layer((1.0, 1.0), LayerKind::Objects(ObjectLayer::default())));
        let sub = map.push_layer(layer((2.0, 1.0), LayerKind::Group(GroupLayer { children: vec![m] })));
        let l = map.push_layer(layer((1.0, 1.0), LayerKind::Objects(ObjectLayer::default())));
        let g = map.push_layer(layer((2.0, 3.0), LayerKind::Group(GroupLayer { children: vec![l, sub] })));
        let top = map.push_layer(layer((0.5, 0.5), LayerKind::Objects(ObjectLayer::default())));
        map.root = vec![g, top];

        propagate_parallax(&mut map);

        let p = |id: LayerId| map.layer(id).expect("layer").parallax;
        assert_eq!(p(g), vec2(2.0, 3.0));
        assert_eq!(p(l), vec2(2.0, 3.0));
        assert_eq!(p(sub), vec2(4.0, 3.0));
        assert_eq!(p(m), vec2(4.0, 3.0));
        assert_eq!(p(top), vec2(0.5, 0.5));
    }

    #[test]
    fn deferred_actions_run_in_order() {
        let config = LoaderConfig::default();
        let resolver = crate::resolver::MemoryResolver::new();
        let mut ctx = DecodeContext::new(&config, None, &resolver, &resolver, Path::new("m.tmx"));
        ctx.defer(Box::new(|map: &mut Map| {
            map.width = 1;
            Ok(())
        }));
        ctx.defer(Box::new(|map: &mut Map| {
            map.width *= 10;
            Ok(())
        }));
        let map = ctx.finish().expect("finish");
        assert_eq!(map.width, 10);
    }
}
