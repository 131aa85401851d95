//! Dimensions of a scheduling unit: several devices scheduled as one.
//!
//! The unit only exposes labels with a declared aggregation policy. Every
//! other child label is dropped.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::state::{aggregate, parse_state};
use super::{sanitize, Dimensions, LabelEnum, TRUE};

/// Child labels concatenated into the unit, with the unit key they feed.
pub const SINGLE_VALUE_LABELS: &[(&str, &str)] = &[
    ("label-board", "label-board"),
    ("label-model", "label-model"),
    ("dut_name", "label-managed_dut"),
];

/// Child labels that survive only when every child carries the value.
pub const CONJUNCTION_LABELS: &[&str] = &["label-device-stable"];

/// A named group of devices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingUnit {
    pub name: String,
    /// Hostnames of the member devices.
    pub members: Vec<String>,
    pub pools: Vec<String>,
}

impl SchedulingUnit {
    pub fn from_json(bytes: &[u8]) -> crate::error::Result<Self> {
        let decode_error = |message: String| crate::error::Error::Decode {
            message: format!("cannot decode scheduling unit: {}", message),
        };
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| decode_error(e.to_string()))?;
        if !value.is_object() {
            return Err(decode_error("expected a JSON object".to_string()));
        }
        serde_json::from_value(value).map_err(|e| decode_error(e.to_string()))
    }
}

/// Concatenate values, suffixing the i-th repeat of a value with `_i`.
///
/// A suffix already taken by a literal value, or by an earlier repeat, is
/// skipped so every child keeps a distinct entry.
fn suffix_repeats<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let values: Vec<&String> = values.into_iter().collect();
    let literals: HashSet<&str> = values.iter().map(|v| v.as_str()).collect();
    let mut taken: HashSet<String> = HashSet::new();
    let mut next: HashMap<&str, usize> = HashMap::new();

    let mut out = Vec::with_capacity(values.len());
    for value in values {
        if taken.insert(value.clone()) {
            out.push(value.clone());
            continue;
        }
        let k = next.entry(value.as_str()).or_insert(2);
        let suffixed = loop {
            let candidate = format!("{}_{}", value, k);
            *k += 1;
            if !literals.contains(candidate.as_str()) && !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(suffixed.clone());
        out.push(suffixed);
    }
    out
}

/// Values present under `key` in every child, in lexicographic order.
fn intersection(children: &[Dimensions], key: &str) -> Vec<String> {
    let mut sets = children
        .iter()
        .map(|child| child.get(key).map(|v| v.iter().cloned().collect::<BTreeSet<_>>()));
    let Some(Some(mut common)) = sets.next() else {
        return Vec::new();
    };
    for set in sets {
        match set {
            Some(set) => common.retain(|value| set.contains(value)),
            None => return Vec::new(),
        }
    }
    common.into_iter().collect()
}

/// Aggregate the dimensions of a unit's children into the unit's dimensions.
pub fn scheduling_unit_dimensions(unit: &SchedulingUnit, children: &[Dimensions]) -> Dimensions {
    let mut dims = Dimensions::new();
    dims.insert("dut_name".to_string(), vec![unit.name.clone()]);
    dims.insert("dut_id".to_string(), vec![unit.name.clone()]);
    dims.insert("label-pool".to_string(), unit.pools.clone());
    dims.insert("label-dut_count".to_string(), vec![children.len().to_string()]);
    dims.insert("label-multiduts".to_string(), vec![TRUE.to_string()]);

    let state = aggregate(children.iter().map(|child| {
        child
            .get("dut_state")
            .and_then(|values| values.first())
            .map(|value| parse_state(value))
            .unwrap_or_default()
    }));
    dims.insert("dut_state".to_string(), vec![state.as_str().to_string()]);

    for (child_key, unit_key) in SINGLE_VALUE_LABELS {
        let values = suffix_repeats(children.iter().flat_map(|child| {
            child.get(*child_key).into_iter().flatten()
        }));
        dims.insert(unit_key.to_string(), values);
    }

    for key in CONJUNCTION_LABELS {
        dims.insert(key.to_string(), intersection(children, key));
    }

    sanitize(&mut dims);
    dims
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(pairs: &[(&str, &[&str])]) -> Dimensions {
        pairs
            .iter()
            .map(|(key, values)| {
                (
                    key.to_string(),
                    values.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect()
    }

    fn unit() -> SchedulingUnit {
        SchedulingUnit {
            name: "su-nami-1".into(),
            members: vec!["host1".into(), "host2".into(), "host3".into()],
            pools: vec!["DUT_POOL_QUOTA".into()],
        }
    }

    #[test]
    fn test_unit_identity_and_counts() {
        let children = vec![child(&[("dut_name", &["host1"])]), child(&[("dut_name", &["host2"])])];
        let dims = scheduling_unit_dimensions(&unit(), &children);
        assert_eq!(dims["dut_name"], vec!["su-nami-1"]);
        assert_eq!(dims["dut_id"], vec!["su-nami-1"]);
        assert_eq!(dims["label-pool"], vec!["DUT_POOL_QUOTA"]);
        assert_eq!(dims["label-dut_count"], vec!["2"]);
        assert_eq!(dims["label-multiduts"], vec!["True"]);
        assert_eq!(dims["label-managed_dut"], vec!["host1", "host2"]);
    }

    #[test]
    fn test_single_value_labels_are_suffixed() {
        let children = vec![
            child(&[("label-board", &["coral"])]),
            child(&[("label-board", &["nami"])]),
            child(&[("label-board", &["coral"])]),
        ];
        let dims = scheduling_unit_dimensions(&unit(), &children);
        assert_eq!(dims["label-board"], vec!["coral", "nami", "coral_2"]);
    }

    #[test]
    fn test_suffixes_count_every_repeat() {
        let children = vec![
            child(&[("label-model", &["vayne"])]),
            child(&[("label-model", &["vayne"])]),
            child(&[("label-model", &["vayne"])]),
        ];
        let dims = scheduling_unit_dimensions(&unit(), &children);
        assert_eq!(dims["label-model"], vec!["vayne", "vayne_2", "vayne_3"]);
    }

    #[test]
    fn test_suffixes_skip_literal_values() {
        let children = vec![
            child(&[("label-board", &["coral"])]),
            child(&[("label-board", &["coral_2"])]),
            child(&[("label-board", &["coral"])]),
        ];
        let dims = scheduling_unit_dimensions(&unit(), &children);
        assert_eq!(dims["label-board"], vec!["coral", "coral_2", "coral_3"]);

        let children = vec![
            child(&[("label-board", &["coral"])]),
            child(&[("label-board", &["coral"])]),
            child(&[("label-board", &["coral_2"])]),
        ];
        let dims = scheduling_unit_dimensions(&unit(), &children);
        assert_eq!(dims["label-board"], vec!["coral", "coral_3", "coral_2"]);
    }

    #[test]
    fn test_state_is_most_severe() {
        let children: Vec<_> = ["ready", "reserved", "needs_deploy", "needs_repair", "repair_failed"]
            .iter()
            .map(|state| child(&[("dut_state", &[*state])]))
            .collect();
        let dims = scheduling_unit_dimensions(&unit(), &children);
        assert_eq!(dims["dut_state"], vec!["reserved"]);

        let children: Vec<_> = [
            "ready",
            "ready",
            "needs_manual_repair",
            "needs_repair",
            "repair_failed",
        ]
        .iter()
        .map(|state| child(&[("dut_state", &[*state])]))
        .collect();
        let dims = scheduling_unit_dimensions(&unit(), &children);
        assert_eq!(dims["dut_state"], vec!["needs_manual_attention"]);
    }

    #[test]
    fn test_conjunction_labels_intersect() {
        let children = vec![
            child(&[("label-device-stable", &["True", "b"])]),
            child(&[("label-device-stable", &["b", "True", "c"])]),
        ];
        let dims = scheduling_unit_dimensions(&unit(), &children);
        assert_eq!(dims["label-device-stable"], vec!["True", "b"]);
    }

    #[test]
    fn test_conjunction_missing_from_one_child() {
        let children = vec![
            child(&[("label-device-stable", &["True"])]),
            child(&[("label-board", &["nami"])]),
        ];
        let dims = scheduling_unit_dimensions(&unit(), &children);
        assert!(!dims.contains_key("label-device-stable"));
    }

    #[test]
    fn test_other_labels_are_dropped() {
        let children = vec![child(&[("label-arc", &["True"]), ("label-phase", &["PHASE_DVT"])])];
        let dims = scheduling_unit_dimensions(&unit(), &children);
        assert!(!dims.contains_key("label-arc"));
        assert!(!dims.contains_key("label-phase"));
    }

    #[test]
    fn test_zero_children() {
        let dims = scheduling_unit_dimensions(&unit(), &[]);
        assert_eq!(dims["dut_state"], vec!["unknown"]);
        assert_eq!(dims["label-dut_count"], vec!["0"]);
        assert!(!dims.contains_key("label-board"));
        assert!(!dims.contains_key("label-device-stable"));
    }

    #[test]
    fn test_unit_from_json() {
        let unit = SchedulingUnit::from_json(
            br#"{"name": "su-1", "members": ["a", "b"], "pools": ["p"]}"#,
        )
        .unwrap();
        assert_eq!(unit.members.len(), 2);
    }

    #[test]
    fn test_unit_from_json_requires_object() {
        for input in [&b"[]"[..], b"null", b"7", b"\"su-1\"", b"{"] {
            let err = SchedulingUnit::from_json(input).unwrap_err();
            assert!(
                err.to_string().contains("cannot decode scheduling unit"),
                "{:?}",
                err
            );
        }
        assert_eq!(SchedulingUnit::from_json(b"{}").unwrap(), SchedulingUnit::default());
    }
}
