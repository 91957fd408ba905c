//! Tests for resolver.rs — deterministic merge of concurrent snapshots.

use ledgersync_crdt::VersionVector;
use ledgersync_model::{
    DeletePolicy, EntitySchema, FieldMergeRule, FieldSource, Record, SchemaMerge, Side,
};
use ledgersync_sync::{ConflictResolver, CoreError};
use ledgersync_types::{DeviceId, EntityId, Timestamp};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;

fn snapshot(id: &str, vector: &[(&str, u64)], at: i64, by: &str, payload: Value) -> Record<Value> {
    Record {
        id: EntityId::new(id),
        version_vector: VersionVector::from_entries(vector.iter().copied()),
        updated_at: Timestamp::from_millis(at),
        deleted_at: None,
        updated_by: DeviceId::new(by),
        payload,
    }
}

fn lww() -> ConflictResolver<Value> {
    ConflictResolver::whole_record()
}

fn with_policy(policy: DeletePolicy) -> ConflictResolver<Value> {
    ConflictResolver::new(Arc::new(ledgersync_model::WholeRecord), policy)
}

// ── Whole-record LWW ────────────────────────────────────────────

#[test]
fn alpha_beta_scenario() {
    let a = snapshot("x1", &[("A", 2)], 100, "A", json!({"fieldQ": "alpha"}));
    let b = snapshot("x1", &[("B", 1)], 150, "B", json!({"fieldQ": "beta"}));

    let resolved = lww().resolve_conflict(&a, &b).unwrap();

    assert_eq!(
        resolved.merged_vector(),
        &VersionVector::from_entries([("A", 2), ("B", 1)])
    );
    assert_eq!(resolved.record.payload, json!({"fieldQ": "beta"}));
    assert_eq!(resolved.record.updated_at, Timestamp::from_millis(150));
    assert_eq!(resolved.record.updated_by, DeviceId::new("B"));
    assert_eq!(resolved.resolution.winner, Side::Remote);
    assert!(!resolved.resolution.deleted);
}

#[test]
fn alpha_beta_is_commutative() {
    let a = snapshot("x1", &[("A", 2)], 100, "A", json!({"fieldQ": "alpha"}));
    let b = snapshot("x1", &[("B", 1)], 150, "B", json!({"fieldQ": "beta"}));

    let ab = lww().resolve_conflict(&a, &b).unwrap();
    let ba = lww().resolve_conflict(&b, &a).unwrap();

    assert_eq!(ab.record, ba.record);
    assert_eq!(ba.resolution.winner, Side::Local);
}

#[test]
fn equal_timestamps_break_ties_by_device() {
    let a = snapshot("x1", &[("A", 1)], 100, "device-a", json!({"q": "from a"}));
    let b = snapshot("x1", &[("B", 1)], 100, "device-b", json!({"q": "from b"}));

    let ab = lww().resolve_conflict(&a, &b).unwrap();
    let ba = lww().resolve_conflict(&b, &a).unwrap();

    assert_eq!(ab.record.payload, json!({"q": "from b"}));
    assert_eq!(ab.record, ba.record);
}

#[test]
fn full_stamp_tie_falls_back_to_payload() {
    let a = snapshot("x1", &[("A", 1)], 100, "same", json!({"q": "a"}));
    let b = snapshot("x1", &[("B", 1)], 100, "same", json!({"q": "b"}));

    let ab = lww().resolve_conflict(&a, &b).unwrap();
    let ba = lww().resolve_conflict(&b, &a).unwrap();

    assert_eq!(ab.record, ba.record);
    assert_eq!(ab.record.payload, json!({"q": "b"}));
}

#[test]
fn resolving_with_own_output_is_idempotent() {
    let a = snapshot("x1", &[("A", 2)], 100, "A", json!({"fieldQ": "alpha"}));
    let b = snapshot("x1", &[("B", 1)], 150, "B", json!({"fieldQ": "beta"}));

    let once = lww().resolve_conflict(&a, &b).unwrap().record;
    let again = lww().resolve_conflict(&a, &once).unwrap().record;
    let other = lww().resolve_conflict(&b, &once).unwrap().record;

    assert_eq!(again, once);
    assert_eq!(other, once);
}

#[test]
fn different_ids_are_rejected() {
    let a = snapshot("x1", &[("A", 1)], 100, "A", json!({}));
    let b = snapshot("x2", &[("B", 1)], 100, "B", json!({}));
    assert!(matches!(
        lww().resolve_conflict(&a, &b),
        Err(CoreError::IdentifierMismatch { .. })
    ));
}

// ── Tombstones ──────────────────────────────────────────────────

fn deleted_on_a() -> Record<Value> {
    let mut r = snapshot("x1", &[("A", 2)], 1_000, "A", json!({"memo": "rent"}));
    r.deleted_at = Some(Timestamp::from_millis(1_000));
    r
}

fn edited_on_b() -> Record<Value> {
    snapshot("x1", &[("B", 1)], 2_000, "B", json!({"memo": "rent (march)"}))
}

#[test]
fn later_edit_revives_under_lww() {
    let resolved = lww().resolve_conflict(&deleted_on_a(), &edited_on_b()).unwrap();
    assert!(resolved.record.is_active());
    assert!(!resolved.resolution.deleted);
    assert_eq!(resolved.record.payload, json!({"memo": "rent (march)"}));
    assert_eq!(
        resolved.merged_vector(),
        &VersionVector::from_entries([("A", 2), ("B", 1)])
    );
}

#[test]
fn later_delete_wins_under_lww() {
    let mut deleted = deleted_on_a();
    deleted.updated_at = Timestamp::from_millis(3_000);
    deleted.deleted_at = Some(Timestamp::from_millis(3_000));

    let resolved = lww().resolve_conflict(&edited_on_b(), &deleted).unwrap();
    assert!(!resolved.record.is_active());
    assert_eq!(resolved.record.deleted_at, Some(Timestamp::from_millis(3_000)));
}

#[test]
fn delete_wins_policy_keeps_tombstone() {
    let resolver = with_policy(DeletePolicy::DeleteWins);
    let resolved = resolver.resolve_conflict(&deleted_on_a(), &edited_on_b()).unwrap();
    assert_eq!(resolved.record.deleted_at, Some(Timestamp::from_millis(1_000)));
    assert!(resolved.resolution.deleted);
    // Payload still follows the LWW winner.
    assert_eq!(resolved.record.payload, json!({"memo": "rent (march)"}));
}

#[test]
fn edit_wins_policy_revives_even_when_delete_is_later() {
    let resolver = with_policy(DeletePolicy::EditWins);
    let mut deleted = deleted_on_a();
    deleted.updated_at = Timestamp::from_millis(3_000);
    deleted.deleted_at = Some(Timestamp::from_millis(3_000));

    let resolved = resolver.resolve_conflict(&edited_on_b(), &deleted).unwrap();
    assert!(resolved.record.is_active());
}

#[test]
fn two_tombstones_stay_deleted_under_every_policy() {
    let mut other = edited_on_b();
    other.deleted_at = Some(Timestamp::from_millis(2_000));
    for policy in [DeletePolicy::Lww, DeletePolicy::DeleteWins, DeletePolicy::EditWins] {
        let resolved = with_policy(policy)
            .resolve_conflict(&deleted_on_a(), &other)
            .unwrap();
        assert_eq!(resolved.record.deleted_at, Some(Timestamp::from_millis(2_000)), "{policy:?}");
    }
}

// ── Field rules ─────────────────────────────────────────────────

fn schema_resolver() -> ConflictResolver<Value> {
    let schema = EntitySchema::new("account")
        .with_rule(FieldMergeRule::counter("visits"))
        .with_rule(FieldMergeRule::union("tags"))
        .with_rule(FieldMergeRule::max("balance_high"));
    ConflictResolver::new(Arc::new(SchemaMerge::new(schema)), DeletePolicy::Lww)
}

#[test]
fn field_rules_merge_both_sides() {
    let a = snapshot(
        "acct",
        &[("A", 1)],
        100,
        "A",
        json!({
            "name": "Cash",
            "visits": {"p": {"A": 3}, "n": {}},
            "tags": ["asset"],
            "balance_high": 900
        }),
    );
    let b = snapshot(
        "acct",
        &[("B", 1)],
        200,
        "B",
        json!({
            "name": "Petty cash",
            "visits": {"p": {"B": 2}, "n": {}},
            "tags": ["cash"],
            "balance_high": 500
        }),
    );

    let resolved = schema_resolver().resolve_conflict(&a, &b).unwrap();
    let payload = &resolved.record.payload;

    assert_eq!(payload["name"], json!("Petty cash"));
    assert_eq!(payload["visits"], json!({"p": {"A": 3, "B": 2}, "n": {}}));
    assert_eq!(payload["tags"], json!(["asset", "cash"]));
    assert_eq!(payload["balance_high"], json!(900));

    let sources: Vec<_> = resolved
        .resolution
        .fields
        .iter()
        .map(|c| (c.field.as_str(), c.source))
        .collect();
    assert_eq!(
        sources,
        vec![
            ("visits", FieldSource::Both),
            ("tags", FieldSource::Both),
            ("balance_high", FieldSource::Local),
        ]
    );
}

#[test]
fn field_rules_are_commutative() {
    let a = snapshot("acct", &[("A", 1)], 100, "A", json!({"tags": ["b", "a"], "visits": {"p": {"A": 1}}}));
    let b = snapshot("acct", &[("B", 1)], 200, "B", json!({"tags": ["c"], "visits": {"p": {"B": 4}}}));

    let ab = schema_resolver().resolve_conflict(&a, &b).unwrap();
    let ba = schema_resolver().resolve_conflict(&b, &a).unwrap();
    assert_eq!(ab.record, ba.record);
}

// ── Properties ──────────────────────────────────────────────────

fn arb_snapshot(device: &'static str) -> impl Strategy<Value = Record<Value>> {
    (
        prop::collection::btree_map(prop::sample::select(vec!["A", "B", "C"]), 0u64..5, 0..3),
        1u64..5,
        0i64..5,
        prop::option::of(0i64..5),
        0i64..4,
        prop::collection::vec(0u8..4, 0..3),
    )
        .prop_map(move |(extra, own, at, deleted, q, tags)| {
            let mut vector = VersionVector::from_entries(extra);
            vector.observe(DeviceId::new(device), own + 10);
            Record {
                id: EntityId::new("x"),
                version_vector: vector,
                updated_at: Timestamp::from_millis(at),
                deleted_at: deleted.map(Timestamp::from_millis),
                updated_by: DeviceId::new(device),
                payload: json!({"q": q, "tags": tags}),
            }
        })
}

fn arb_policy() -> impl Strategy<Value = DeletePolicy> {
    prop::sample::select(vec![DeletePolicy::Lww, DeletePolicy::DeleteWins, DeletePolicy::EditWins])
}

fn resolver_for(policy: DeletePolicy) -> ConflictResolver<Value> {
    let schema = EntitySchema::new("x").with_rule(FieldMergeRule::union("tags"));
    ConflictResolver::new(Arc::new(SchemaMerge::new(schema)), policy)
}

proptest! {
    #[test]
    fn resolve_is_commutative(a in arb_snapshot("A"), b in arb_snapshot("B"), policy in arb_policy()) {
        let resolver = resolver_for(policy);
        let ab = resolver.resolve_conflict(&a, &b).unwrap();
        let ba = resolver.resolve_conflict(&b, &a).unwrap();
        prop_assert_eq!(ab.record, ba.record);
    }

    #[test]
    fn resolve_is_idempotent(a in arb_snapshot("A"), b in arb_snapshot("B"), policy in arb_policy()) {
        let resolver = resolver_for(policy);
        let merged = resolver.resolve_conflict(&a, &b).unwrap().record;
        let with_a = resolver.resolve_conflict(&a, &merged).unwrap().record;
        let with_b = resolver.resolve_conflict(&merged, &b).unwrap().record;
        prop_assert_eq!(&with_a, &merged);
        prop_assert_eq!(&with_b, &merged);
    }

    #[test]
    fn merged_vector_dominates_both(a in arb_snapshot("A"), b in arb_snapshot("B")) {
        let merged = lww().resolve_conflict(&a, &b).unwrap().record;
        prop_assert!(merged.version_vector.descends_from(&a.version_vector));
        prop_assert!(merged.version_vector.descends_from(&b.version_vector));
    }
}
