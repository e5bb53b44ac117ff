//! Row diffing: decide create / update / skip per row

use log::warn;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::api::RowRecord;

/// Current target rows of one table, by id
pub type TargetRowIndex = HashMap<String, Value>;

pub fn build_index(rows: Vec<RowRecord>) -> TargetRowIndex {
    rows.into_iter().map(|row| (row.id, row.data)).collect()
}

/// Partition of one table's input rows
///
/// Every distinct input id lands in exactly one list, in input order; repeats
/// of an id are only counted. Ids only present in the target are ignored:
/// nothing is ever deleted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan<'a> {
    pub to_create: Vec<&'a RowRecord>,
    pub to_update: Vec<&'a RowRecord>,
    pub to_skip: Vec<&'a RowRecord>,
    pub duplicates: usize,
}

impl<'a> SyncPlan<'a> {
    pub fn build(rows: &'a [RowRecord], index: &TargetRowIndex) -> Self {
        let mut plan = SyncPlan::default();
        let mut seen: HashSet<&str> = HashSet::with_capacity(rows.len());

        for row in rows {
            if !seen.insert(row.id.as_str()) {
                warn!("Row id '{}' appears more than once, using the first", row.id);
                plan.duplicates += 1;
                continue;
            }
            match index.get(&row.id) {
                None => plan.to_create.push(row),
                Some(current) if same_value(current, &row.data) => plan.to_skip.push(row),
                Some(_) => plan.to_update.push(row),
            }
        }

        plan
    }
}

/// Deep JSON equality where numbers compare by value, so `1` equals `1.0`
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, x)| y.get(key).is_some_and(|y| same_value(x, y)))
        }
        _ => a == b,
    }
}

/// Number of calls needed for `rows` rows in batches of `batch_size`
pub fn batch_count(rows: usize, batch_size: usize) -> usize {
    rows.div_ceil(batch_size.max(1))
}

/// Split rows into owned, consecutive batches of at most `batch_size`
pub fn chunk_rows(rows: &[&RowRecord], batch_size: usize) -> Vec<Vec<RowRecord>> {
    rows.chunks(batch_size.max(1))
        .map(|chunk| chunk.iter().map(|row| (*row).clone()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(specs: &[(&str, Value)]) -> Vec<RowRecord> {
        specs
            .iter()
            .map(|(id, data)| RowRecord::new(*id, data.clone()))
            .collect()
    }

    fn ids(list: &[&RowRecord]) -> Vec<String> {
        list.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_classification() {
        let input = rows(&[
            ("new", json!({"a": 1})),
            ("same", json!({"a": 1, "b": [1, 2]})),
            ("changed", json!({"a": 2})),
        ]);
        let index = build_index(rows(&[
            ("same", json!({"b": [1, 2], "a": 1})),
            ("changed", json!({"a": 1})),
            ("target-only", json!({})),
        ]));

        let plan = SyncPlan::build(&input, &index);
        assert_eq!(ids(&plan.to_create), vec!["new"]);
        assert_eq!(ids(&plan.to_update), vec!["changed"]);
        assert_eq!(ids(&plan.to_skip), vec!["same"]);
    }

    #[test]
    fn test_equality_is_structural() {
        let input = rows(&[("x", json!({"nested": {"list": [{"k": null}], "n": 1.5}}))]);
        let index = build_index(rows(&[("x", json!({"nested": {"n": 1.5, "list": [{"k": null}]}}))]));

        let plan = SyncPlan::build(&input, &index);
        assert_eq!(plan.to_skip.len(), 1);
        assert!(plan.to_create.is_empty() && plan.to_update.is_empty());

        let changed = build_index(rows(&[("x", json!({"nested": {"n": 1.5, "list": []}}))]));
        assert_eq!(SyncPlan::build(&input, &changed).to_update.len(), 1);
    }

    #[test]
    fn test_integral_floats_equal_integers() {
        let input = rows(&[("x", json!({"value": 1.0, "list": [2.0, {"k": 0.0}]}))]);
        let index = build_index(rows(&[("x", json!({"value": 1, "list": [2, {"k": 0}]}))]));
        assert_eq!(SyncPlan::build(&input, &index).to_skip.len(), 1);

        assert!(same_value(&json!(u64::MAX), &json!(u64::MAX)));
        assert!(!same_value(&json!(1.5), &json!(1)));
        assert!(!same_value(&json!(1), &json!("1")));
        assert!(!same_value(&json!({"a": 1}), &json!({"a": 1, "b": 1})));
    }

    #[test]
    fn test_partition_covers_input_exactly() {
        let input: Vec<RowRecord> = (0..50)
            .map(|i| RowRecord::new(format!("r{}", i), json!({"v": i % 7})))
            .collect();
        let index: TargetRowIndex = (0..80)
            .filter(|i| i % 3 != 0)
            .map(|i| (format!("r{}", i), json!({"v": i % 5})))
            .collect();

        let plan = SyncPlan::build(&input, &index);

        let all: Vec<String> = ids(&plan.to_create)
            .into_iter()
            .chain(ids(&plan.to_update))
            .chain(ids(&plan.to_skip))
            .collect();
        let unique: HashSet<&String> = all.iter().collect();
        let expected: HashSet<String> = input.iter().map(|r| r.id.clone()).collect();

        assert_eq!(all.len(), input.len());
        assert_eq!(unique.len(), all.len());
        assert_eq!(unique.into_iter().cloned().collect::<HashSet<_>>(), expected);
        assert_eq!(plan.duplicates, 0);
    }

    #[test]
    fn test_plan_preserves_input_order() {
        let input = rows(&[("c", json!(1)), ("a", json!(1)), ("b", json!(1))]);
        let plan = SyncPlan::build(&input, &TargetRowIndex::new());
        assert_eq!(ids(&plan.to_create), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_duplicate_input_ids_counted_once() {
        let input = rows(&[("a", json!(1)), ("a", json!(2))]);
        let plan = SyncPlan::build(&input, &TargetRowIndex::new());
        assert_eq!(plan.to_create.len(), 1);
        assert_eq!(plan.to_create[0].data, json!(1));
        assert_eq!(plan.duplicates, 1);
    }

    #[test]
    fn test_batch_count_is_ceiling() {
        assert_eq!(batch_count(0, 10), 0);
        assert_eq!(batch_count(1, 10), 1);
        assert_eq!(batch_count(10, 10), 1);
        assert_eq!(batch_count(11, 10), 2);
        assert_eq!(batch_count(250, 100), 3);
        assert_eq!(batch_count(7, 1), 7);
    }

    #[test]
    fn test_chunk_rows_preserves_order() {
        let input = rows(&[("1", json!(1)), ("2", json!(2)), ("3", json!(3))]);
        let refs: Vec<&RowRecord> = input.iter().collect();
        let chunks = chunk_rows(&refs, 2);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(chunks[1][0].id, "3");
    }
}
