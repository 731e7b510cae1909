//! Bundled narrative/game-metadata table: load it from disk and push whole
//! documents through both directions.

use std::path::PathBuf;

use json_cast::{DescriptorTable, Engine, Error};
use serde_json::{json, Value};

fn engine() -> Engine {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("schemas/jrpg.json");
    Engine::new(DescriptorTable::from_path(path).expect("bundled table loads"))
}

fn view_name(en: &str, jp: &str) -> Value {
    json!({"en": en, "jp": jp})
}

fn scene(title: &str) -> Value {
    json!({
        "title": view_name(title, "タイトル"),
        "story": {"style": "auto", "text": view_name("Once upon a time", "むかしむかし")}
    })
}

fn phase() -> Value {
    json!({"A1": {
        "introduction": scene("intro"),
        "a": scene("a"),
        "b": scene("b"),
        "c": scene("c"),
        "d": scene("d")
    }})
}

fn document() -> Value {
    let info = ["Phase-1", "Phase-2", "Phase-3", "Phase-4", "Phase-5", "Phase-Free"]
        .iter()
        .map(|phase| (phase.to_string(), view_name(phase, phase)))
        .collect::<serde_json::Map<_, _>>();
    let story = ["Phase-1", "Phase-2", "Phase-3", "Phase-4", "Phase-5"]
        .iter()
        .map(|name| (name.to_string(), phase()))
        .collect::<serde_json::Map<_, _>>();
    json!({
        "format": "jrpg",
        "lib_version": "0.1.0",
        "data_version": "1",
        "game": {"name": "Demo", "version": "1.0", "copyright": "(c) demo"},
        "map": {"preset": {"A1": {
            "data_tag": "A1",
            "view_name": view_name("Start", "はじまり"),
            "info": info,
            "metadata": {
                "name": "A1",
                "version": "1",
                "author": "someone",
                "date": "2024-01-01",
                "view": {
                    "image": {"path": {
                        "_bg": "bg.png",
                        "_composite": "composite.png",
                        "data": "data.json",
                        "Floor_OLD_Layer": "floor_old.png",
                        "Floor_New_Layer": "floor_new.png",
                        "TOBIRA_OLD_RIGHT_Layer": "right.png",
                        "TOBIRA_OLD_LEFT_Layer": "left.png",
                        "TOBIRA_OLD_SIDE_Layer": "side.png"
                    }},
                    "style": {"raw": "color: red", "content": ["color", "red"]}
                }
            }
        }}},
        "story": story,
        "free": {}
    })
}

fn mismatch(result: Result<Value, Error>) -> json_cast::TypeMismatch {
    match result {
        Err(Error::Mismatch(mismatch)) => mismatch,
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn bundled_table_lists_every_type() {
    let engine = engine();
    assert_eq!(engine.table().len(), 19);
    assert_eq!(engine.table().names().next(), Some("Jrpg"));
}

#[test]
fn full_document_round_trips() {
    let engine = engine();
    let raw = document();
    let typed = engine.decode(&raw, "Jrpg").unwrap();
    assert_eq!(typed, raw);
    assert_eq!(engine.encode(&typed, "Jrpg").unwrap(), raw);
}

#[test]
fn unknown_story_style_is_reported_on_its_owner() {
    let engine = engine();
    let mut raw = document();
    raw["story"]["Phase-3"]["A1"]["b"]["story"]["style"] = json!("manual");
    let err = mismatch(engine.decode(&raw, "Jrpg"));
    assert_eq!(err.key, "style");
    assert_eq!(err.parent, "AStory");
    assert_eq!(err.expected, "one of [auto]");
    assert_eq!(err.path().to_string(), "/story/Phase-3/A1/b/story/style");
    assert_eq!(
        err.to_string(),
        "Invalid value for key \"style\" on AStory. Expected one of [auto] but got \"manual\""
    );
}

#[test]
fn free_section_rejects_any_key() {
    let engine = engine();
    let mut raw = document();
    raw["free"] = json!({"note": "anything"});
    let err = mismatch(engine.decode(&raw, "Jrpg"));
    assert_eq!(err.key, "note");
    assert_eq!(err.parent, "Free");
}

#[test]
fn style_content_must_be_strings() {
    let engine = engine();
    let mut raw = document();
    raw["map"]["preset"]["A1"]["metadata"]["view"]["style"]["content"] = json!(["color", 3]);
    let err = mismatch(engine.decode(&raw, "Jrpg"));
    assert_eq!(err.expected, "string");
    assert_eq!(err.actual, "3");
    assert_eq!(err.path().to_string(), "/map/preset/A1/metadata/view/style/content/1");
}

#[test]
fn first_failure_in_document_order_wins() {
    let engine = engine();
    let mut raw = document();
    raw["format"] = json!(1);
    raw["free"] = json!({"late": true});
    let err = mismatch(engine.decode(&raw, "Jrpg"));
    assert_eq!(err.key, "format");
}
