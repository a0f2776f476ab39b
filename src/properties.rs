use macroquad::color::Color;

/// A typed custom property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// `string` (or untyped) property
    String(String),
    /// `int` property, kept wide so raw gids and large ids survive
    I64(i64),
    /// `float` property
    F32(f32),
    /// `bool` property
    Bool(bool),
    /// `color` property, already reordered to RGBA
    Color(Color),
    /// `file` property (path as authored)
    File(String),
    /// `object` property: id of the referenced map object (0 = none)
    Object(u32),
    /// `class` property: nested properties carrying a `type` entry
    Class(Properties),
}

/// Ordered name → value mapping. Inserting an existing name replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, PropertyValue)>,
}

impl Properties {
    /// Empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Raw lookup.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Whether `name` is present.
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Boolean value of `name`.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer value of `name`, if it fits in an `i32`.
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get_i64(name).and_then(|v| i32::try_from(v).ok())
    }

    /// Integer value of `name`.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            PropertyValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Float value of `name`.
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            PropertyValue::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// String (or file) value of `name`.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::String(v) | PropertyValue::File(v) => Some(v),
            _ => None,
        }
    }

    /// Color value of `name`.
    pub fn get_color(&self, name: &str) -> Option<Color> {
        match self.get(name)? {
            PropertyValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    /// Referenced object id of `name`. Resolve it with [`crate::Map::object`].
    pub fn get_object(&self, name: &str) -> Option<u32> {
        match self.get(name)? {
            PropertyValue::Object(v) => Some(*v),
            _ => None,
        }
    }

    /// Nested class value of `name`.
    pub fn get_class(&self, name: &str) -> Option<&Properties> {
        match self.get(name)? {
            PropertyValue::Class(v) => Some(v),
            _ => None,
        }
    }

    /// The synthetic `type` entry of a class value.
    pub fn class_name(&self) -> Option<&str> {
        self.get_string("type")
    }
}

/// Reorder a Tiled color (`#AARRGGBB` or `#RRGGBB`) into `RRGGBBAA`.
///
/// Colors without an alpha component are treated as opaque.
pub fn tiled_color_to_rgba(tiled: &str) -> String {
    let hex = tiled.strip_prefix('#').unwrap_or(tiled);
    if hex.len() == 8 && hex.is_ascii() {
        format!("{}{}", &hex[2..], &hex[..2])
    } else {
        format!("{hex}ff")
    }
}

/// Parse an `RRGGBBAA` (or `RRGGBB`) hex string, with or without a leading `#`.
pub fn parse_rgba(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let a = if hex.len() == 8 { channel(6)? } else { 255 };
    Some(Color::from_rgba(channel(0)?, channel(2)?, channel(4)?, a))
}

/// Parse a color as Tiled writes it (alpha first).
pub fn parse_tiled_color(tiled: &str) -> Option<Color> {
    parse_rgba(&tiled_color_to_rgba(tiled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorders_alpha_first_colors() {
        assert_eq!(tiled_color_to_rgba("#80FF0000"), "FF000080");
        assert_eq!(tiled_color_to_rgba("#ff0000"), "ff0000ff");
        assert_eq!(tiled_color_to_rgba("#ffffffff"), "ffffffff");
    }

    #[test]
    fn parses_tiled_color_into_rgba_channels() {
        let c = parse_tiled_color("#80FF0000").expect("color");
        assert_eq!(c, Color::from_rgba(255, 0, 0, 128));
        assert_eq!(parse_tiled_color("#000000"), Some(Color::from_rgba(0, 0, 0, 255)));
        assert_eq!(parse_tiled_color("#zz"), None);
    }

    #[test]
    fn insert_overwrites_in_place() {
        let mut props = Properties::new();
        props.insert("x", PropertyValue::F32(1.0));
        props.insert("name", PropertyValue::String("a".into()));
        props.insert("x", PropertyValue::F32(2.0));

        let keys: Vec<_> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["x", "name"]);
        assert_eq!(props.get_f32("x"), Some(2.0));
    }

    #[test]
    fn narrowing_getters_reject_large_values() {
        let mut props = Properties::new();
        props.insert("big", PropertyValue::I64(5_000_000_000));
        assert_eq!(props.get_i64("big"), Some(5_000_000_000));
        assert_eq!(props.get_i32("big"), None);
    }
}
