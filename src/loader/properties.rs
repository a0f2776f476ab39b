// Custom property resolution, including nested class values backed by the project schema.
use crate::error::MapError;
use crate::loader::tmx_loader::DecodeContext;
use crate::loader::xml::NodeExt;
use crate::map::Map;
use crate::project::ClassMember;
use crate::properties::{parse_tiled_color, Properties, PropertyValue};
use log::warn;
use macroquad::color::Color;
use roxmltree::Node;

/// What a value is declared as.
#[derive(Debug, Clone, Copy)]
enum ValueKind<'t> {
    Untyped,
    Primitive(&'t str),
    Object,
    Class(&'t str),
}

impl<'t> ValueKind<'t> {
    fn of_member(member: &'t ClassMember) -> Result<Self, MapError> {
        Ok(match member.member_type.as_str() {
            "class" => {
                let nested = member.property_type.as_deref().ok_or_else(|| {
                    MapError::InvalidMap(format!("class member '{}' has no propertyType", member.name))
                })?;
                ValueKind::Class(nested)
            }
            "object" => ValueKind::Object,
            other => ValueKind::Primitive(other),
        })
    }
}

/// Where a value comes from: an authored `<property>` or a JSON default from the schema.
#[derive(Clone, Copy)]
enum Source<'a, 'input, 's> {
    Xml(Node<'a, 'input>),
    Json(&'s serde_json::Value),
}

impl Source<'_, '_, '_> {
    fn raw_text(&self) -> String {
        match self {
            Source::Xml(node) => node
                .attribute("value")
                .unwrap_or_else(|| node.text_or_empty())
                .to_owned(),
            Source::Json(serde_json::Value::String(s)) => s.clone(),
            Source::Json(serde_json::Value::Null) => String::new(),
            Source::Json(other) => other.to_string(),
        }
    }
}

/// Read every `<property>` child of a `<properties>` element into `props`.
pub(crate) fn load_properties(
    ctx: &mut DecodeContext<'_>,
    props: &mut Properties,
    element: Node,
) -> Result<(), MapError> {
    for property in element.children_named("property") {
        let name = property.attribute("name").unwrap_or_default();
        let kind = match property.attribute("type") {
            None => ValueKind::Untyped,
            Some("object") => ValueKind::Object,
            Some("class") => ValueKind::Class(property.require_attr("propertytype")?),
            Some(other) => ValueKind::Primitive(other),
        };
        let value = resolve_value(ctx, name, kind, Source::Xml(property))?;
        props.insert(name, value);
    }
    Ok(())
}

/// Load the `<properties>` child of `element`, if there is one.
pub(crate) fn load_child_properties(
    ctx: &mut DecodeContext<'_>,
    props: &mut Properties,
    element: Node,
) -> Result<(), MapError> {
    match element.child("properties") {
        Some(properties) => load_properties(ctx, props, properties),
        None => Ok(()),
    }
}

/// Fill in the schema defaults of `class_name` for every member `props` does not define yet.
///
/// Without a configured schema this does nothing: plain `type` labels are common in maps
/// loaded without a project file.
pub(crate) fn load_class_defaults(
    ctx: &mut DecodeContext<'_>,
    class_name: Option<&str>,
    props: &mut Properties,
) -> Result<(), MapError> {
    let (Some(class_name), Some(schema)) = (class_name, ctx.schema) else {
        return Ok(());
    };
    for member in schema.members(class_name)? {
        if props.contains_key(&member.name) {
            continue;
        }
        let kind = ValueKind::of_member(member)?;
        let value = resolve_value(ctx, &member.name, kind, Source::Json(&member.value))?;
        props.insert(member.name.clone(), value);
    }
    Ok(())
}

fn resolve_value<'s>(
    ctx: &mut DecodeContext<'s>,
    name: &str,
    kind: ValueKind<'_>,
    source: Source<'_, '_, 's>,
) -> Result<PropertyValue, MapError> {
    match kind {
        ValueKind::Untyped => Ok(PropertyValue::String(source.raw_text())),
        ValueKind::Primitive(ty) => coerce(name, ty, source.raw_text()),
        ValueKind::Object => {
            let raw = source.raw_text();
            let id = if raw.trim().is_empty() {
                0
            } else {
                raw.trim()
                    .parse::<u32>()
                    .map_err(|_| MapError::invalid_attribute("property", name, &raw))?
            };
            if id != 0 {
                let name = name.to_owned();
                ctx.defer(Box::new(move |map: &mut Map| {
                    if map.object(id).is_none() {
                        warn!("property '{name}' references object {id}, which does not exist");
                    }
                    Ok(())
                }));
            }
            Ok(PropertyValue::Object(id))
        }
        ValueKind::Class(class_name) => {
            let mut nested = Properties::new();
            nested.insert("type", PropertyValue::String(class_name.to_owned()));
            for member in ctx.class_members(class_name)? {
                let member_source = match source {
                    Source::Xml(node) => find_property(node, &member.name)
                        .map(Source::Xml)
                        .unwrap_or(Source::Json(&member.value)),
                    Source::Json(values) => values
                        .get(member.name.as_str())
                        .map(Source::Json)
                        .unwrap_or(Source::Json(&member.value)),
                };
                let member_kind = ValueKind::of_member(member)?;
                let value = resolve_value(ctx, &member.name, member_kind, member_source)?;
                nested.insert(member.name.clone(), value);
            }
            Ok(PropertyValue::Class(nested))
        }
    }
}

// Members of a class live in the class property's own <properties>; nested classes nest
// further, so fall back to a search through every descendant.
fn find_property<'a, 'input>(class_property: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    let direct = class_property
        .child("properties")
        .and_then(|props| {
            props
                .children_named("property")
                .find(|p| p.attribute("name") == Some(name))
        });
    direct.or_else(|| {
        class_property.descendants().skip(1).find(|p| {
            p.has_tag_name("property") && p.attribute("name") == Some(name)
        })
    })
}

fn coerce(name: &str, ty: &str, raw: String) -> Result<PropertyValue, MapError> {
    let invalid = || MapError::invalid_attribute("property", name, &raw);
    Ok(match ty {
        "string" => PropertyValue::String(raw),
        "file" => PropertyValue::File(raw),
        "int" => PropertyValue::I64(raw.trim().parse().map_err(|_| invalid())?),
        "float" => PropertyValue::F32(raw.trim().parse().map_err(|_| invalid())?),
        "bool" => PropertyValue::Bool(raw.trim().eq_ignore_ascii_case("true")),
        "color" if raw.trim().is_empty() => PropertyValue::Color(Color::new(0.0, 0.0, 0.0, 0.0)),
        "color" => PropertyValue::Color(parse_tiled_color(raw.trim()).ok_or_else(invalid)?),
        other => {
            return Err(MapError::UnsupportedPropertyType {
                name: name.to_owned(),
                kind: other.to_owned(),
            })
        }
    })
}
