//! Turns selector specifications into JSON attached to results.

use quarry_core::{GroupEntry, SelectorSpec, parse};
use serde_json::{Map, Value};

use crate::dom;
use crate::lineage::{Lineage, ResultId};

/// Apply a select stage to a single result.
///
/// Text and attribute specs always attach their value array, even an
/// empty one. Group specs merge into the nearest existing attachment
/// and only claim it for this result when at least one key produced a
/// value.
pub fn apply_select(lineage: &mut Lineage, result: ResultId, spec: &SelectorSpec) {
    match spec {
        SelectorSpec::Text(selector) => {
            let values = select_values(lineage, result, selector, None);
            lineage.attach(result, Value::Array(values.into_iter().map(Value::String).collect()));
        }
        SelectorSpec::Attr(selector, attribute) => {
            let values = select_values(lineage, result, selector, Some(attribute));
            lineage.attach(result, Value::Array(values.into_iter().map(Value::String).collect()));
        }
        SelectorSpec::Group(entries) => match lineage.current_data_id(result) {
            Some(data_id) => {
                // Take the value out so the element queries below can
                // borrow the lineage immutably.
                let mut value = std::mem::take(lineage.data_mut(data_id));
                let found = apply_group(lineage, result, entries, &mut value);
                *lineage.data_mut(data_id) = value;
                if found {
                    lineage.set_data(result, data_id);
                }
            }
            None => {
                let mut value = Value::Object(Map::new());
                let found = apply_group(lineage, result, entries, &mut value);
                if found {
                    lineage.attach(result, value);
                }
            }
        },
    }
}

/// String values a selector extracts under one result: query the base
/// selector, apply the positional filter, then read text or an
/// attribute per element. An explicit attribute name wins over a filter
/// embedded in the selector. Values are trimmed; empties are dropped.
pub fn select_values(
    lineage: &Lineage,
    result: ResultId,
    selector: &str,
    explicit_attr: Option<&str>,
) -> Vec<String> {
    let Some(element) = lineage.element(result) else {
        return Vec::new();
    };
    let parsed = parse(selector);
    let mut matches = dom::query(element, &parsed.base);
    if let Some(nth) = &parsed.nth {
        matches = nth
            .keep_indices(matches.len())
            .into_iter()
            .map(|index| matches[index])
            .collect();
    }
    matches
        .into_iter()
        .filter_map(|element| match explicit_attr {
            Some(attribute) => dom::attribute(element, &attribute.to_lowercase()),
            None => match &parsed.attr {
                Some(filter) => dom::apply_attr_filter(element, filter),
                None => Some(dom::text(element)),
            },
        })
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Returns whether any key produced at least one value.
fn apply_group(
    lineage: &Lineage,
    result: ResultId,
    entries: &[GroupEntry],
    data: &mut Value,
) -> bool {
    let mut found = false;
    for entry in entries {
        found |= apply_entry(lineage, result, entry, data);
    }
    found
}

fn apply_entry(
    lineage: &Lineage,
    result: ResultId,
    entry: &GroupEntry,
    data: &mut Value,
) -> bool {
    let mut found = false;
    let values: Vec<Value> = match &entry.spec {
        SelectorSpec::Text(selector) => {
            let values = select_values(lineage, result, selector, None);
            found = !values.is_empty();
            values.into_iter().map(Value::String).collect()
        }
        SelectorSpec::Attr(selector, attribute) => {
            let values = select_values(lineage, result, selector, Some(attribute));
            found = !values.is_empty();
            values.into_iter().map(Value::String).collect()
        }
        SelectorSpec::Group(sub) => {
            let mut child = if entry.is_array {
                Value::Array(Vec::new())
            } else {
                Value::Object(Map::new())
            };
            if apply_group(lineage, result, sub, &mut child) {
                found = true;
                match child {
                    Value::Array(rows) => rows,
                    object => vec![object],
                }
            } else {
                Vec::new()
            }
        }
    };

    merge_values(data, &entry.name, entry.is_array, values);
    found
}

/// Write one key's values into the attachment target. The write happens
/// whether or not anything was found, so missing scalar keys land as
/// null and missing array keys as empty arrays.
fn merge_values(data: &mut Value, name: &str, is_array: bool, values: Vec<Value>) {
    match data {
        // The target is an array of row objects: fill one row per
        // value, creating rows as needed.
        Value::Array(rows) => {
            for (index, value) in values.into_iter().enumerate() {
                if rows.len() <= index {
                    rows.push(Value::Object(Map::new()));
                }
                if let Value::Object(row) = &mut rows[index] {
                    row.insert(name.to_string(), value);
                }
            }
        }
        Value::Object(map) => {
            if is_array {
                let slot = map
                    .entry(name.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match slot {
                    Value::Array(existing) => existing.extend(values),
                    other => *other = Value::Array(values),
                }
            } else {
                let first = values.into_iter().next().unwrap_or(Value::Null);
                map.insert(name.to_string(), first);
            }
        }
        _ => {}
    }
}
