// Test serialization using json

use kas_dynfont::{Config, JsonFileSettings, SettingsStore, RESOLVED_PATHS_KEY};
use serde::{de::Deserialize, ser::Serialize};
use std::cmp::PartialEq;
use std::fmt::Debug;

fn test<X: Debug + PartialEq + Serialize + for<'a> Deserialize<'a>>(x: X, t: &str) {
    match serde_json::to_string(&x) {
        Ok(text) => assert_eq!(text, t),
        Err(err) => panic!("Ser of '{x:?}' failed: {err}"),
    }

    match serde_json::from_str::<X>(t) {
        Ok(v) => assert_eq!(v, x),
        Err(err) => panic!("Deser of '{t}' failed: {err}"),
    }
}

#[test]
fn config() {
    test(
        Config::in_dir("/data"),
        "{\"font_dir\":\"/data/fonts\",\"settings_path\":\"/data/font-settings.json\",\
         \"referer\":\"http://app.wodedata.com\",\"fallback_family\":\"Helvetica\"}",
    );
}

#[test]
fn config_defaults() {
    let config: Config = serde_json::from_str("{}").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn settings_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested").join("settings.json");
    let mut store = JsonFileSettings::new(&path);
    store
        .store(RESOLVED_PATHS_KEY, br#"{"STKaiti":"/a/STKaiti.ttc"}"#)
        .unwrap();
    store.store("blob", &[0xff, 0x00]).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "blob": [255, 0],
            "resolved_font_paths": "{\"STKaiti\":\"/a/STKaiti.ttc\"}",
        })
    );

    let reopened = JsonFileSettings::new(&path);
    assert_eq!(reopened.load("blob").unwrap(), Some(vec![0xff, 0x00]));
    assert_eq!(reopened.load("missing").unwrap(), None);
}
