use ledgersync_types::{DeviceId, EntityId, Error};
use std::collections::HashSet;
use std::str::FromStr;

// ── EntityId ──────────────────────────────────────────────────────

#[test]
fn entity_id_generate_is_unique() {
    let a = EntityId::generate();
    let b = EntityId::generate();
    assert_ne!(a, b);
}

#[test]
fn entity_id_display_matches_input() {
    let id = EntityId::new("x1");
    assert_eq!(id.to_string(), "x1");
    assert_eq!(id.as_str(), "x1");
}

#[test]
fn entity_id_from_conversions() {
    assert_eq!(EntityId::from("acct-7"), EntityId::new("acct-7"));
    assert_eq!(EntityId::from("acct-7".to_string()), EntityId::new("acct-7"));
}

#[test]
fn entity_id_hash_and_eq() {
    let id = EntityId::new("x1");
    let mut set = HashSet::new();
    set.insert(id.clone());
    set.insert(id);
    assert_eq!(set.len(), 1);
}

#[test]
fn entity_id_serializes_as_plain_string() {
    let json = serde_json::to_string(&EntityId::new("x1")).unwrap();
    assert_eq!(json, r#""x1""#);
    let parsed: EntityId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, EntityId::new("x1"));
}

// ── DeviceId ──────────────────────────────────────────────────────

#[test]
fn device_id_generate_is_unique() {
    let ids: HashSet<_> = (0..100).map(|_| DeviceId::generate()).collect();
    assert_eq!(ids.len(), 100);
}

#[test]
fn device_id_generate_is_128_bit_uuid_string() {
    let id = DeviceId::generate();
    assert_eq!(id.as_str().len(), 36);
    assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
}

#[test]
fn device_id_orders_lexicographically() {
    assert!(DeviceId::new("A") < DeviceId::new("B"));
    assert!(DeviceId::new("b") > DeviceId::new("B"));
    assert!(DeviceId::new("A") < DeviceId::new("AA"));
}

#[test]
fn device_id_from_str_trims() {
    let id = DeviceId::from_str("  laptop-1\n").unwrap();
    assert_eq!(id.as_str(), "laptop-1");
}

#[test]
fn device_id_from_str_rejects_empty() {
    let err = DeviceId::from_str("   ").unwrap_err();
    assert!(matches!(err, Error::InvalidId(_)));
}

#[test]
fn device_id_default_is_empty() {
    assert!(DeviceId::default().is_empty());
    assert!(!DeviceId::new("A").is_empty());
}
