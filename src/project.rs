//! Tiled project file (`.tiled-project`) class definitions.
//!
//! Only `class` property types are kept; they drive class-typed properties and
//! the default values of typed objects and tiles.

use crate::error::MapError;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectFile {
    #[serde(default)]
    property_types: Vec<serde_json::Value>,
}

/// A member field of a class definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMember {
    /// Name of the member field.
    pub name: String,

    /// Type of the member (`string`, `int`, `float`, `bool`, `color`, `file`, `object` or `class`).
    #[serde(rename = "type")]
    pub member_type: String,

    /// Class (or enum) name for nested types.
    #[serde(default)]
    pub property_type: Option<String>,

    /// Default value for this member.
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Deserialize)]
struct ClassDefinition {
    name: String,
    #[serde(default)]
    members: Vec<ClassMember>,
}

/// Class name → ordered member list.
#[derive(Debug, Clone, Default)]
pub struct ProjectClassSchema {
    classes: HashMap<String, Vec<ClassMember>>,
}

impl ProjectClassSchema {
    /// Empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON contents of a `.tiled-project` file.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let project: ProjectFile = serde_json::from_str(json)?;
        let mut schema = Self::new();
        for ty in project.property_types {
            if ty.get("type").and_then(|t| t.as_str()) != Some("class") {
                continue;
            }
            let class: ClassDefinition = serde_json::from_value(ty)?;
            schema.classes.insert(class.name, class.members);
        }
        Ok(schema)
    }

    /// Register (or replace) a class definition.
    pub fn insert_class(&mut self, name: impl Into<String>, members: Vec<ClassMember>) {
        self.classes.insert(name.into(), members);
    }

    /// True when the project defines no classes.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Members of `class_name`, in declaration order.
    pub fn members(&self, class_name: &str) -> Result<&[ClassMember], MapError> {
        if self.classes.is_empty() {
            return Err(MapError::EmptyClassSchema);
        }
        self.classes
            .get(class_name)
            .map(Vec::as_slice)
            .ok_or_else(|| MapError::UnknownClass(class_name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"{
      "automappingRulesFile": "",
      "propertyTypes": [
        {
          "id": 1,
          "name": "Stats",
          "type": "class",
          "useAs": ["property", "object"],
          "members": [
            {"name": "hp", "type": "int", "value": 10},
            {"name": "speed", "type": "float", "value": 1.5}
          ]
        },
        {
          "id": 2,
          "name": "Kind",
          "type": "enum",
          "storageType": "string",
          "values": ["a", "b"]
        }
      ]
    }"#;

    #[test]
    fn keeps_only_class_definitions() {
        let schema = ProjectClassSchema::from_json_str(PROJECT).expect("schema");
        let members = schema.members("Stats").expect("Stats");
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "hp");
        assert_eq!(members[1].member_type, "float");
        assert!(matches!(schema.members("Kind"), Err(MapError::UnknownClass(name)) if name == "Kind"));
    }

    #[test]
    fn empty_schema_is_reported_before_lookup() {
        let schema = ProjectClassSchema::from_json_str(r#"{"propertyTypes": []}"#).expect("schema");
        assert!(schema.is_empty());
        assert!(matches!(schema.members("Stats"), Err(MapError::EmptyClassSchema)));
    }

    #[test]
    fn malformed_project_is_an_error() {
        assert!(ProjectClassSchema::from_json_str("{ nope").is_err());
    }
}
