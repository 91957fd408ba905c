//! Schema-driven merging of JSON payloads.
//!
//! An [`EntitySchema`] lists field rules for one entity type. [`SchemaMerge`]
//! applies them on top of the whole-record winner; unlisted fields keep the
//! winner's value.

use crate::strategy::{FieldChoice, FieldSource, MergeStrategy, MergedPayload, Side, WholeRecord};
use ledgersync_crdt::PnCounter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Declares how an entity type's JSON payload is merged during sync.
///
/// Fields without a rule follow the whole-record winner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySchema {
    pub entity_type: String,
    #[serde(default)]
    pub merge_rules: Vec<FieldMergeRule>,
}

impl EntitySchema {
    /// A schema with no field rules (whole-record LWW).
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            merge_rules: Vec::new(),
        }
    }

    /// Adds a field rule.
    #[must_use]
    pub fn with_rule(mut self, rule: FieldMergeRule) -> Self {
        self.merge_rules.push(rule);
        self
    }

    /// The rule registered for a top-level field, if any.
    #[must_use]
    pub fn rule_for(&self, field: &str) -> Option<FieldRule> {
        self.merge_rules
            .iter()
            .find(|r| r.field == field)
            .map(|r| r.rule)
    }
}

/// A merge rule bound to one top-level payload field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMergeRule {
    pub field: String,
    pub rule: FieldRule,
}

impl FieldMergeRule {
    fn simple(field: &str, rule: FieldRule) -> Self {
        Self {
            field: field.into(),
            rule,
        }
    }

    /// Shorthand for a PN-counter field (`{"p": {...}, "n": {...}}`).
    pub fn counter(field: &str) -> Self {
        Self::simple(field, FieldRule::Counter)
    }

    /// Shorthand for an array field merged by set union.
    pub fn union(field: &str) -> Self {
        Self::simple(field, FieldRule::Union)
    }

    /// Shorthand for a numeric field that keeps the larger value.
    pub fn max(field: &str) -> Self {
        Self::simple(field, FieldRule::Max)
    }

    /// Shorthand for a numeric field that keeps the smaller value.
    pub fn min(field: &str) -> Self {
        Self::simple(field, FieldRule::Min)
    }

    /// Shorthand for a field that explicitly follows the record winner.
    pub fn lww(field: &str) -> Self {
        Self::simple(field, FieldRule::Lww)
    }
}

/// Field-level merge behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRule {
    /// Take the whole-record winner's value (the default for unlisted fields).
    Lww,
    /// Per-device counters merged by max; concurrent increments add up.
    Counter,
    /// Set union of array elements, in canonical order.
    Union,
    /// Larger number wins.
    Max,
    /// Smaller number wins.
    Min,
}

/// [`MergeStrategy`] for JSON object payloads driven by an [`EntitySchema`].
#[derive(Debug, Clone)]
pub struct SchemaMerge {
    schema: EntitySchema,
}

impl SchemaMerge {
    pub fn new(schema: EntitySchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }
}

impl MergeStrategy<Value> for SchemaMerge {
    fn merge_payload(&self, winner: &Value, loser: &Value, winner_side: Side) -> MergedPayload<Value> {
        let (Some(win_obj), Some(lose_obj)) = (winner.as_object(), loser.as_object()) else {
            return WholeRecord.merge_payload(winner, loser, winner_side);
        };

        let mut merged = win_obj.clone();
        let mut fields = Vec::new();

        for rule in &self.schema.merge_rules {
            let source = merge_field(
                &mut merged,
                &rule.field,
                rule.rule,
                win_obj.get(&rule.field),
                lose_obj.get(&rule.field),
                winner_side,
            );
            if let Some(source) = source {
                fields.push(FieldChoice {
                    field: rule.field.clone(),
                    source,
                });
            }
        }

        MergedPayload {
            payload: Value::Object(merged),
            fields,
        }
    }
}

/// Writes the merged value of one field into `out`. Returns where it came
/// from, or `None` if neither side has the field.
///
/// The result only depends on the set of values being merged, never on the
/// order merges happened in. A value of the wrong shape for its rule counts
/// as the rule's empty value (counter, union) or loses to any number
/// (max, min).
fn merge_field(
    out: &mut Map<String, Value>,
    field: &str,
    rule: FieldRule,
    win: Option<&Value>,
    lose: Option<&Value>,
    winner_side: Side,
) -> Option<FieldSource> {
    let winner_source = FieldSource::from(winner_side);
    let loser_source = FieldSource::from(winner_side.other());

    let present = match (win, lose) {
        (None, None) => return None,
        (Some(_), None) => winner_source,
        (None, Some(_)) => loser_source,
        (Some(_), Some(_)) => FieldSource::Both,
    };

    match rule {
        FieldRule::Lww => Some(winner_source),
        FieldRule::Counter => {
            let merged = counter_of(field, win).merged(&counter_of(field, lose));
            match serde_json::to_value(merged) {
                Ok(value) => {
                    out.insert(field.to_string(), value);
                }
                Err(e) => debug!("Failed to encode counter {field}: {e}"),
            }
            Some(present)
        }
        FieldRule::Union => {
            let merged = union(items_of(field, win), items_of(field, lose));
            out.insert(field.to_string(), Value::Array(merged));
            Some(present)
        }
        FieldRule::Max | FieldRule::Min => match (win, lose) {
            (Some(w), Some(l)) => {
                if prefer_extreme(rule, l, w) == Ordering::Greater {
                    out.insert(field.to_string(), l.clone());
                    Some(loser_source)
                } else {
                    Some(winner_source)
                }
            }
            (None, Some(l)) => {
                out.insert(field.to_string(), l.clone());
                Some(loser_source)
            }
            _ => Some(winner_source),
        },
    }
}

fn counter_of(field: &str, value: Option<&Value>) -> PnCounter {
    let Some(value) = value else {
        return PnCounter::new();
    };
    serde_json::from_value(value.clone()).unwrap_or_else(|_| {
        debug!("Field {field} is not a counter ({value}); treating as zero");
        PnCounter::new()
    })
}

fn items_of<'a>(field: &str, value: Option<&'a Value>) -> &'a [Value] {
    match value {
        None => Default::default(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            debug!("Field {field} is not an array ({other}); treating as empty");
            Default::default()
        }
    }
}

/// Orders two candidates for a max/min field: any number beats a
/// non-number, numbers compare by value (reversed for min), and remaining
/// ties go to the larger canonical JSON text.
fn prefer_extreme(rule: FieldRule, a: &Value, b: &Value) -> Ordering {
    let by_value = match (a.is_number(), b.is_number()) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) if rule == FieldRule::Min => compare_numbers(a, b).reverse(),
        (true, true) => compare_numbers(a, b),
        (false, false) => Ordering::Equal,
    };
    by_value.then_with(|| a.to_string().cmp(&b.to_string()))
}

/// Compares two JSON numbers, exactly when both are integers.
fn compare_numbers(a: &Value, b: &Value) -> Ordering {
    match (as_integer(a), as_integer(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

fn as_integer(value: &Value) -> Option<i128> {
    value
        .as_i64()
        .map(i128::from)
        .or_else(|| value.as_u64().map(i128::from))
}

/// Union of two arrays, deduplicated and sorted by canonical JSON text so
/// every replica produces the same array.
fn union(a: &[Value], b: &[Value]) -> Vec<Value> {
    let mut keyed: Vec<(String, &Value)> = a
        .iter()
        .chain(b.iter())
        .map(|v| (v.to_string(), v))
        .collect();
    keyed.sort_by(|x, y| x.0.cmp(&y.0));
    keyed.dedup_by(|x, y| x.0 == y.0);
    keyed.into_iter().map(|(_, v)| v.clone()).collect()
}

/// Entity type → schema lookup.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the schema for its entity type.
    pub fn register(&mut self, schema: EntitySchema) {
        self.schemas.insert(schema.entity_type.clone(), schema);
    }

    pub fn get(&self, entity_type: &str) -> Option<&EntitySchema> {
        self.schemas.get(entity_type)
    }

    /// The merge strategy to use for an entity type: schema-driven when a
    /// schema is registered, whole-record LWW otherwise.
    pub fn strategy_for(&self, entity_type: &str) -> Arc<dyn MergeStrategy<Value>> {
        match self.schemas.get(entity_type) {
            Some(schema) => Arc::new(SchemaMerge::new(schema.clone())),
            None => Arc::new(WholeRecord),
        }
    }
}
