// tests/load_tests.rs

use macroquad_tmx::{LoaderConfig, Map, MapError};
use std::fs;
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("macroquad_tmx_{}_{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

const MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="2" height="1" tilewidth="8" tileheight="8">
  <tileset firstgid="1" source="props.tsx"/>
  <objectgroup name="spawns">
    <object id="1" name="player" type="Spawn" x="4" y="4"><point/></object>
  </objectgroup>
</map>
"#;

const TSX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" name="props" tilewidth="8" tileheight="8" tilecount="0" columns="0">
  <properties><property name="kind" value="collection"/></properties>
</tileset>
"#;

#[test]
fn integration_load_from_disk() {
    let dir = scratch_dir("disk");
    fs::write(dir.join("level.tmx"), MAP).unwrap();
    fs::write(dir.join("props.tsx"), TSX).unwrap();

    let map = Map::load(dir.join("level.tmx")).expect("map should load from disk");
    assert_eq!(map.width_in_pixels, 16);
    assert_eq!(map.tilesets()[0].properties.get_string("kind"), Some("collection"));
    let player = map.object(1).expect("player");
    assert_eq!(player.class_name(), Some("Spawn"));
    // flipped against the 8px map height
    assert_eq!(player.position().y, 4.0);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn integration_project_file_from_disk() {
    let dir = scratch_dir("project");
    fs::write(dir.join("level.tmx"), MAP).unwrap();
    fs::write(dir.join("props.tsx"), TSX).unwrap();
    fs::write(
        dir.join("game.tiled-project"),
        r#"{"propertyTypes": [{"id": 1, "name": "Spawn", "type": "class",
            "members": [{"name": "team", "type": "string", "value": "red"}]}]}"#,
    )
    .unwrap();

    let config = LoaderConfig {
        flip_y: false,
        project_file_path: Some(dir.join("game.tiled-project")),
        ..LoaderConfig::default()
    };
    let map = Map::load_with(dir.join("level.tmx"), config).expect("map should load");
    let player = map.object(1).expect("player");
    assert_eq!(player.properties.get_string("team"), Some("red"));
    assert_eq!(player.position().y, 4.0);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn integration_unsupported_format() {
    let err = Map::load("foo.json").unwrap_err();
    match err.downcast_ref::<MapError>() {
        Some(MapError::UnsupportedFormat(path)) => assert_eq!(path, "foo.json"),
        other => panic!("expected UnsupportedFormat, got {:?}", other),
    }
}

#[test]
fn integration_missing_file_keeps_the_path_in_context() {
    let err = Map::load("does/not/exist.tmx").unwrap_err();
    assert!(format!("{err:#}").contains("does/not/exist.tmx"));
    assert!(matches!(err.downcast_ref::<MapError>(), Some(MapError::Io { .. })));
}
