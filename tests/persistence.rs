use jsonfile_proxy::{
    Dataset, JsonFileProxy, ProxyConfig, ProxyError, ProxyEvent, Record, RecordStore,
};
use serde_json::json;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn doctor() -> Record {
    let mut record = Record::from_value(json!({
        "firstname": "The",
        "lastname": "Doctor",
        "val": 15,
        "alive": true,
        "companions": ["Rose", "Martha", "Donna"],
        "regeneration": null,
    }))
    .unwrap();
    let pet = Record::from_value(json!({"name": "K-9", "breed": "Robodog"})).unwrap();
    record.add_relationship("pet", pet).unwrap();
    record
}

fn blank_doctor() -> Record {
    let mut record = Record::new();
    record.add_relationship("pet", Record::new()).unwrap();
    record
}

#[test]
fn model_round_trip_keeps_types_and_relationships() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested").join("dir").join("doctor.json");
    let proxy = JsonFileProxy::new(&path).unwrap();

    proxy.save(&doctor()).unwrap();
    assert!(path.exists());
    assert!(!proxy.is_locked());

    let mut loaded = blank_doctor();
    proxy.fetch(&mut loaded).unwrap();

    assert_eq!(loaded.get("lastname"), Some(&json!("Doctor")));
    assert_eq!(loaded.get("val"), Some(&json!(15)));
    assert_eq!(loaded.get("alive"), Some(&json!(true)));
    assert_eq!(loaded.get("companions"), Some(&json!(["Rose", "Martha", "Donna"])));
    assert_eq!(loaded.get("regeneration"), Some(&json!(null)));
    assert_eq!(
        loaded.related("pet").unwrap().get("breed"),
        Some(&json!("Robodog"))
    );
}

#[test]
fn file_is_a_data_envelope() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("doctor.json");
    JsonFileProxy::new(&path).unwrap().save(&doctor()).unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["data"]["lastname"], json!("Doctor"));
    assert_eq!(raw["data"]["pet"]["name"], json!("K-9"));
}

#[test]
fn store_round_trip_preserves_order() {
    let tmp = TempDir::new().unwrap();
    let proxy = JsonFileProxy::new(tmp.path().join("people.json")).unwrap();

    let mut people = RecordStore::new();
    for name in ["Doctor", "Master", "Rani"] {
        people.add(json!({"firstname": "The", "lastname": name})).unwrap();
    }
    proxy.save(&people).unwrap();

    let mut loaded = RecordStore::new();
    let envelope = proxy.fetch(&mut loaded).unwrap();

    assert_eq!(envelope.data.len(), 3);
    let order: Vec<_> = loaded
        .records()
        .iter()
        .map(|r| r.get("lastname").cloned().unwrap())
        .collect();
    assert_eq!(order, vec![json!("Doctor"), json!("Master"), json!("Rani")]);
}

#[test]
fn missing_file_fetches_as_empty() {
    let tmp = TempDir::new().unwrap();
    let proxy = JsonFileProxy::new(tmp.path().join("people.json")).unwrap();

    let mut people = RecordStore::new();
    people.add(json!({"lastname": "Doctor"})).unwrap();
    proxy.fetch(&mut people).unwrap();
    assert!(people.is_empty());
}

#[test]
fn save_refuses_while_another_process_holds_the_lock() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("doctor.json");
    let proxy = JsonFileProxy::new(&path).unwrap();
    proxy.save(&doctor()).unwrap();
    let before = fs::read_to_string(&path).unwrap();

    fs::write(proxy.target().lock_path(), "4242").unwrap();
    let mut changed = doctor();
    changed.set("lastname", json!("Master")).unwrap();

    let err = proxy.save(&changed).unwrap_err();
    assert!(matches!(err, ProxyError::LockHeld { .. }));
    assert!(err.to_string().contains("Process ID 4242 has a lock on"));
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
    assert_eq!(proxy.lock_owner().as_deref(), Some("4242"));

    fs::remove_file(proxy.target().lock_path()).unwrap();
    proxy.save(&changed).unwrap();
}

#[test]
fn encrypted_round_trip() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("sealed.json");
    let config = ProxyConfig::from(path.clone()).with_encryption_key("t3stK3y");
    let proxy = JsonFileProxy::new(config.clone()).unwrap();

    proxy.save(&doctor()).unwrap();
    let raw = fs::read_to_string(&path).unwrap();
    assert!(!raw.starts_with('{'));
    assert!(!raw.contains("Doctor"));
    assert!(raw.chars().all(|c| c.is_ascii_hexdigit()));

    let reopened = JsonFileProxy::new(config).unwrap();
    let mut loaded = blank_doctor();
    reopened.fetch(&mut loaded).unwrap();
    assert_eq!(loaded.get("lastname"), Some(&json!("Doctor")));
    assert_eq!(loaded.related("pet").unwrap().get("name"), Some(&json!("K-9")));
}

#[test]
fn encrypted_file_without_key_is_a_format_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("sealed.json");
    JsonFileProxy::new(ProxyConfig::from(path.clone()).with_encryption_key("k"))
        .unwrap()
        .save(&doctor())
        .unwrap();

    let mut loaded = doctor();
    let err = JsonFileProxy::new(&path).unwrap().fetch(&mut loaded).unwrap_err();
    assert!(err.is_format());
    assert_eq!(loaded.get("lastname"), Some(&json!("Doctor")));
}

#[test]
fn wrong_key_is_a_format_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("sealed.json");
    JsonFileProxy::new(ProxyConfig::from(path.clone()).with_encryption_key("right"))
        .unwrap()
        .save(&doctor())
        .unwrap();

    let wrong = JsonFileProxy::new(ProxyConfig::from(path).with_encryption_key("wrong")).unwrap();
    assert!(wrong.fetch(&mut blank_doctor()).unwrap_err().is_format());
}

#[test]
fn save_and_fetch_notify_listeners_then_callbacks() {
    let tmp = TempDir::new().unwrap();
    let proxy = JsonFileProxy::new(tmp.path().join("doctor.json")).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&order);
    proxy.on("save", move |_| sink.lock().unwrap().push("save event"));
    let sink = Arc::clone(&order);
    proxy.on("fetch", move |event| {
        if let ProxyEvent::Fetch(envelope) = event {
            assert_eq!(envelope.data.len(), 1);
        }
        sink.lock().unwrap().push("fetch event");
    });

    let sink = Arc::clone(&order);
    proxy
        .save_with(&doctor(), || sink.lock().unwrap().push("save callback"))
        .unwrap();
    let sink = Arc::clone(&order);
    proxy
        .fetch_with(&mut blank_doctor(), |_| {
            sink.lock().unwrap().push("fetch callback")
        })
        .unwrap();

    assert_eq!(
        *order.lock().unwrap(),
        vec!["save event", "save callback", "fetch event", "fetch callback"]
    );
}

#[test]
fn record_uses_injected_proxy() {
    let tmp = TempDir::new().unwrap();
    let proxy = JsonFileProxy::new(tmp.path().join("doctor.json")).unwrap();

    let record = doctor().with_proxy(proxy.clone());
    record.save().unwrap();

    let mut loaded = blank_doctor().with_proxy(proxy);
    loaded.fetch().unwrap();
    assert_eq!(loaded.snapshot(), record.snapshot());
}
