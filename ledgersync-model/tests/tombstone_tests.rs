use ledgersync_crdt::CausalOrder;
use ledgersync_model::tombstone::{
    active_only, create_tombstone, create_tombstone_at, is_active, restore_from_tombstone,
    restore_from_tombstone_at,
};
use ledgersync_model::{DeletePolicy, Record, Restore};
use ledgersync_types::{DeviceId, Error, Timestamp};
use serde_json::json;

fn dev(name: &str) -> DeviceId {
    DeviceId::new(name)
}

fn ts(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}

fn account() -> Record<serde_json::Value> {
    Record::create("acct-1", json!({"name": "Cash", "balance": 10}), &dev("A"), ts(100))
}

#[test]
fn tombstone_sets_deleted_at_and_keeps_payload() {
    let e = account();
    let t = create_tombstone_at(&e, &dev("A"), ts(1000));

    assert_eq!(t.deleted_at, Some(ts(1000)));
    assert_eq!(t.updated_at, ts(1000));
    assert_eq!(t.payload, e.payload);
    assert!(!is_active(&t));
    assert_eq!(t.version_vector.get(&dev("A")), 2);
    assert_eq!(t.version_vector.compare(&e.version_vector), CausalOrder::Dominates);
}

#[test]
fn deleting_a_tombstone_again_is_a_mutation() {
    let t = create_tombstone_at(&account(), &dev("A"), ts(1000));
    let again = create_tombstone_at(&t, &dev("B"), ts(2000));
    assert_eq!(again.deleted_at, Some(ts(2000)));
    assert_eq!(again.version_vector.get(&dev("B")), 1);
}

#[test]
fn create_tombstone_uses_current_time() {
    let t = create_tombstone(&account(), &dev("A"));
    assert!(t.deleted_at.unwrap() > ts(100));
}

#[test]
fn restore_clears_marker_and_increments() {
    let t = create_tombstone_at(&account(), &dev("A"), ts(1000));
    let restored = restore_from_tombstone_at(&t, &dev("B"), ts(1500));

    assert!(!restored.is_noop());
    let r = restored.into_record();
    assert!(r.is_active());
    assert_eq!(r.updated_at, ts(1500));
    assert_eq!(r.updated_by, dev("B"));
    assert_eq!(r.version_vector.compare(&t.version_vector), CausalOrder::Dominates);
}

#[test]
fn restore_of_active_entity_is_noop() {
    let e = account();
    let outcome = restore_from_tombstone(&e, &dev("B"));
    assert!(outcome.is_noop());
    assert_eq!(outcome.clone().into_record(), e);

    let err = outcome.strict().unwrap_err();
    assert!(matches!(err, Error::RestoreOfActiveEntity(id) if id.as_str() == "acct-1"));
}

#[test]
fn strict_passes_through_real_restore() {
    let t = create_tombstone_at(&account(), &dev("A"), ts(1000));
    let r = restore_from_tombstone(&t, &dev("A")).strict().unwrap();
    assert!(r.is_active());
}

#[test]
fn round_trip_dominates_original_at_both_devices() {
    let e = account();
    let t = create_tombstone_at(&e, &dev("D1"), ts(1000));
    let r = match restore_from_tombstone_at(&t, &dev("D2"), ts(1100)) {
        Restore::Restored(r) => r,
        Restore::AlreadyActive(_) => panic!("tombstone should restore"),
    };

    assert!(r.is_active());
    assert_eq!(r.payload, e.payload);
    assert_eq!(r.version_vector.compare(&e.version_vector), CausalOrder::Dominates);
    assert!(r.version_vector.get(&dev("D1")) > e.version_vector.get(&dev("D1")));
    assert!(r.version_vector.get(&dev("D2")) > e.version_vector.get(&dev("D2")));
}

#[test]
fn active_only_hides_tombstones() {
    let a = account();
    let b = create_tombstone_at(&Record::create("acct-2", json!({}), &dev("A"), ts(1)), &dev("A"), ts(2));
    let records = vec![a, b];
    let visible: Vec<_> = active_only(&records).map(|r| r.id.as_str()).collect();
    assert_eq!(visible, vec!["acct-1"]);
}

// ── DeletePolicy ─────────────────────────────────────────────────

#[test]
fn lww_policy_follows_winner() {
    assert_eq!(DeletePolicy::Lww.settle(None, Some(ts(5))), None);
    assert_eq!(DeletePolicy::Lww.settle(Some(ts(5)), None), Some(ts(5)));
}

#[test]
fn delete_wins_keeps_latest_delete() {
    assert_eq!(DeletePolicy::DeleteWins.settle(None, Some(ts(5))), Some(ts(5)));
    assert_eq!(DeletePolicy::DeleteWins.settle(Some(ts(3)), Some(ts(5))), Some(ts(5)));
    assert_eq!(DeletePolicy::DeleteWins.settle(None, None), None);
}

#[test]
fn edit_wins_revives_on_any_active_side() {
    assert_eq!(DeletePolicy::EditWins.settle(Some(ts(5)), None), None);
    assert_eq!(DeletePolicy::EditWins.settle(None, Some(ts(5))), None);
    assert_eq!(DeletePolicy::EditWins.settle(Some(ts(7)), Some(ts(5))), Some(ts(7)));
}

#[test]
fn default_policy_is_lww() {
    assert_eq!(DeletePolicy::default(), DeletePolicy::Lww);
}
