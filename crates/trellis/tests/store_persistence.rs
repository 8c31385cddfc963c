//! Configuration store round trips through snapshot files.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis::store::{
    ConfigStore, MapEnvironment, Permissions, Snapshot, SnapshotError, SnapshotFormat, StoreError,
    Value, ValueType,
};

fn app_settings() -> ConfigStore {
    let store = ConfigStore::new();
    let key = "Software/Trellis/Editor";
    store.create_key(key).unwrap();
    store.set_value(key, "Theme", Value::from("solarized")).unwrap();
    store.set_value(key, "FontSize", Value::Int32(13)).unwrap();
    store
        .set_value(key, "Plugins", Value::MultiString(vec!["git".into(), "lsp".into()]))
        .unwrap();
    store
        .set_value(key, "CacheDir", Value::ExpandableString("%HOME%/.cache/trellis".into()))
        .unwrap();
    store.set_value(key, "WindowState", Value::Binary(vec![1, 0, 0, 2])).unwrap();
    store.set_value(key, "LastOpened", Value::Int64(1_700_000_000_000)).unwrap();
    store.create_key("Software/Trellis/Policies").unwrap();
    store
        .set_value("Software/Trellis/Policies", "AllowUpdates", Value::Int32(0))
        .unwrap();
    store
        .set_permissions("Software/Trellis/Policies", Some(Permissions::READ_ONLY))
        .unwrap();
    store
}

fn check(store: &ConfigStore) {
    let key = "software/trellis/editor";
    assert_eq!(store.get_string(key, "theme").unwrap(), "solarized");
    assert_eq!(store.get_u32(key, "FontSize").unwrap(), 13);
    assert_eq!(store.get_multi_string(key, "Plugins").unwrap(), vec!["git", "lsp"]);
    assert_eq!(store.get_binary(key, "WindowState").unwrap(), vec![1, 0, 0, 2]);
    assert_eq!(store.get_u64(key, "LastOpened").unwrap(), 1_700_000_000_000);

    let env = MapEnvironment::new().with("HOME", "/home/ada");
    assert_eq!(store.get_expanded(key, "CacheDir", &env).unwrap(), "/home/ada/.cache/trellis");

    assert!(matches!(
        store.set_value("Software/Trellis/Policies", "AllowUpdates", Value::Int32(1)),
        Err(StoreError::AccessDenied { .. })
    ));
    assert_eq!(store.subkeys("Software/Trellis").unwrap(), vec!["Editor", "Policies"]);
}

#[test]
fn json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    app_settings().save_json(&path).unwrap();
    check(&ConfigStore::load_json(&path).unwrap());
}

#[test]
fn toml_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");

    app_settings().save_toml(&path).unwrap();
    check(&ConfigStore::load_toml(&path).unwrap());
}

#[test]
fn json_then_toml() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("settings.json");
    let toml = dir.path().join("settings.toml");

    app_settings().save_json(&json).unwrap();
    ConfigStore::load_json(&json).unwrap().save_toml(&toml).unwrap();

    let snapshot = Snapshot::read(&toml, SnapshotFormat::Toml).unwrap();
    assert_eq!(snapshot, app_settings().snapshot());
}

#[test]
fn hand_written_snapshot_loads() {
    let text = r#"
        [[keys]]
        path = "Network"
        permissions = { read = true, write = false }

        [[keys.values]]
        name = "Proxy"
        type = "string"
        data = "proxy.local:8080"

        [[keys.values]]
        name = "Retries"
        type = "int32"
        data = 5

        [[keys]]
        path = "Network/Interfaces/eth0"
    "#;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("network.toml");
    std::fs::write(&path, text).unwrap();

    let store = ConfigStore::load_toml(&path).unwrap();
    assert_eq!(store.get_string("Network", "Proxy").unwrap(), "proxy.local:8080");
    assert_eq!(store.get_u32("network", "retries").unwrap(), 5);
    assert_eq!(store.value_type("Network", "Retries").unwrap(), ValueType::Int32);
    assert_eq!(store.permissions("Network").unwrap(), Permissions::READ_ONLY);
    assert_eq!(store.subkeys("network/interfaces").unwrap(), vec!["eth0"]);
}

#[test]
fn out_of_range_snapshot_is_rejected() {
    let text = r#"{
        "keys": [
            { "path": "", "values": [ { "name": "n", "type": "int32", "data": -1 } ] }
        ]
    }"#;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, text).unwrap();

    match ConfigStore::load_json(&path) {
        Err(StoreError::Persistence {
            path: failed,
            source: SnapshotError::Invalid(_),
        }) => assert_eq!(failed, path),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn loaded_store_notifies_listeners() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    app_settings().save_json(&path).unwrap();

    let store = Arc::new(ConfigStore::load_json(&path).unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    store.changed().connect(move |key| seen_clone.lock().push(key.clone()));

    store
        .set_value("SOFTWARE/TRELLIS/EDITOR", "Theme", Value::from("light"))
        .unwrap();
    assert_eq!(*seen.lock(), vec!["Software/Trellis/Editor"]);
}
