use serde::Deserialize;
use std::path::PathBuf;

/// Options accepted by [`crate::TmxLoader`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoaderConfig {
    /// Express object geometry in tiles instead of pixels.
    #[serde(default)]
    pub convert_object_to_tile_space: bool,
    /// Flip the Y axis so the origin is bottom-left.
    #[serde(default = "default_true")]
    pub flip_y: bool,
    /// `.tiled-project` file supplying class definitions.
    #[serde(default)]
    pub project_file_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            convert_object_to_tile_space: false,
            flip_y: true,
            project_file_path: None,
        }
    }
}

impl LoaderConfig {
    /// Read a configuration from JSON; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let cfg = LoaderConfig::from_json_str("{}").expect("config");
        assert_eq!(cfg, LoaderConfig::default());
        assert!(cfg.flip_y);
    }

    #[test]
    fn reads_every_field() {
        let cfg = LoaderConfig::from_json_str(
            r#"{"convert_object_to_tile_space": true, "flip_y": false, "project_file_path": "game.tiled-project"}"#,
        )
        .expect("config");
        assert!(cfg.convert_object_to_tile_space);
        assert!(!cfg.flip_y);
        assert_eq!(cfg.project_file_path, Some(PathBuf::from("game.tiled-project")));
    }
}
