use serde_json::json;
use std::collections::HashSet;
use strata_types::{Error, RecordId};

// ── RecordId ──────────────────────────────────────────────────────

#[test]
fn record_id_new_is_unique() {
    let a = RecordId::new();
    let b = RecordId::new();
    assert_ne!(a, b);
}

#[test]
fn record_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = RecordId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn record_id_display_and_parse() {
    let id = RecordId::new();
    let parsed = RecordId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn record_id_parse_accepts_loose_forms() {
    let id = RecordId::new();
    let simple = id.as_uuid().simple().to_string().to_uppercase();
    let braced = format!("{{{}}}", id);
    let padded = format!("  {}  ", id);

    assert_eq!(RecordId::parse(&simple).unwrap(), id);
    assert_eq!(RecordId::parse(&braced).unwrap(), id);
    assert_eq!(RecordId::parse(&padded).unwrap(), id);
}

#[test]
fn record_id_parse_invalid() {
    assert!(matches!(RecordId::parse("not-a-uuid"), Err(Error::InvalidUuid(_))));
    assert!("garbage".parse::<RecordId>().is_err());
}

#[test]
fn record_id_value_conversion() {
    let id = RecordId::new();
    let value = id.to_value();
    assert_eq!(value, json!(id.to_string()));
    assert_eq!(RecordId::from_value(&value), Some(id));
    assert_eq!(RecordId::from_value(&json!(42)), None);
}

#[test]
fn record_id_hash_and_eq() {
    let id = RecordId::new();
    let mut set = HashSet::new();
    set.insert(id);
    set.insert(id);
    assert_eq!(set.len(), 1);
}

#[test]
fn record_id_serde_is_transparent() {
    let id = RecordId::new();
    let encoded = serde_json::to_string(&id).unwrap();
    assert_eq!(encoded, format!("\"{id}\""));
    let decoded: RecordId = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, id);
}

#[test]
fn record_ids_are_time_ordered() {
    let first = RecordId::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = RecordId::new();
    assert!(first < second);
}
