// Typed attribute access on roxmltree nodes.
use crate::error::MapError;
use roxmltree::Node;
use std::str::FromStr;

pub(crate) trait NodeExt<'a, 'input> {
    fn child(&self, tag: &str) -> Option<Node<'a, 'input>>;
    fn children_named(&self, tag: &'static str) -> Box<dyn Iterator<Item = Node<'a, 'input>> + 'a>;
    fn attr_parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, MapError>;
    fn attr_or<T: FromStr>(&self, name: &str, default: T) -> Result<T, MapError>;
    fn attr_flag(&self, name: &str, default: bool) -> Result<bool, MapError>;
    fn require_attr(&self, name: &str) -> Result<&'a str, MapError>;
    fn text_or_empty(&self) -> &'a str;
}

impl<'a, 'input: 'a> NodeExt<'a, 'input> for Node<'a, 'input> {
    fn child(&self, tag: &str) -> Option<Node<'a, 'input>> {
        self.children().find(|c| c.has_tag_name(tag))
    }

    fn children_named(&self, tag: &'static str) -> Box<dyn Iterator<Item = Node<'a, 'input>> + 'a> {
        Box::new(self.children().filter(move |c| c.has_tag_name(tag)))
    }

    fn attr_parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, MapError> {
        match self.attribute(name) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| MapError::invalid_attribute(self.tag_name().name(), name, raw)),
        }
    }

    fn attr_or<T: FromStr>(&self, name: &str, default: T) -> Result<T, MapError> {
        Ok(self.attr_parse(name)?.unwrap_or(default))
    }

    /// Tiled writes booleans as `0`/`1`; only `1` counts as set.
    fn attr_flag(&self, name: &str, default: bool) -> Result<bool, MapError> {
        Ok(self.attr_or::<i32>(name, i32::from(default))? == 1)
    }

    fn require_attr(&self, name: &str) -> Result<&'a str, MapError> {
        self.attribute(name).ok_or_else(|| MapError::MissingAttribute {
            element: self.tag_name().name().to_owned(),
            name: name.to_owned(),
        })
    }

    fn text_or_empty(&self) -> &'a str {
        self.text().unwrap_or("")
    }
}
