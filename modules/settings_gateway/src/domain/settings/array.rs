//! Array mutation semantics for array entries

use crate::contract::{ArrayAction, GatewayError, GatewayResult};
use serde_json::Value;

/// Compute the next array for `path` from the stored one
///
/// `input` holds validated elements; it carries `null` padding only for an
/// index-qualified remove, where elements count positions.
pub(crate) fn apply(
    path: &str,
    action: ArrayAction,
    index: Option<usize>,
    stored: &[Value],
    input: Vec<Value>,
) -> GatewayResult<Vec<Value>> {
    match (action, index) {
        (ArrayAction::Overwrite, _) => Ok(input),
        (ArrayAction::Add, index) => add(path, index, stored, input),
        (ArrayAction::Remove, None) => remove(path, stored, &input),
        (ArrayAction::Remove, Some(index)) => Ok(splice(stored, index, input.len(), Vec::new())),
        (ArrayAction::Auto, None) => Ok(auto(stored, input)),
        (ArrayAction::Auto, Some(index)) => {
            let count = input.len();
            Ok(splice(stored, index, count, input))
        }
    }
}

fn add(
    path: &str,
    index: Option<usize>,
    stored: &[Value],
    input: Vec<Value>,
) -> GatewayResult<Vec<Value>> {
    let mut added: Vec<Value> = Vec::with_capacity(input.len());
    for value in input {
        if stored.contains(&value) || added.contains(&value) {
            return Err(GatewayError::ArrayDuplicate {
                path: path.to_string(),
                value,
            });
        }
        added.push(value);
    }

    match index {
        None => {
            let mut next = stored.to_vec();
            next.extend(added);
            Ok(next)
        }
        Some(index) => Ok(splice(stored, index, 0, added)),
    }
}

fn remove(path: &str, stored: &[Value], input: &[Value]) -> GatewayResult<Vec<Value>> {
    let mut next = stored.to_vec();
    for value in input {
        match next.iter().position(|stored| stored == value) {
            Some(position) => {
                next.remove(position);
            }
            None => {
                return Err(GatewayError::ArrayMissing {
                    path: path.to_string(),
                    value: value.clone(),
                })
            }
        }
    }
    Ok(next)
}

/// Remove the input when all of it is stored, otherwise add what is missing
fn auto(stored: &[Value], input: Vec<Value>) -> Vec<Value> {
    if input.is_empty() {
        return stored.to_vec();
    }

    if input.iter().all(|value| stored.contains(value)) {
        return stored
            .iter()
            .filter(|value| !input.contains(value))
            .cloned()
            .collect();
    }

    let mut next = stored.to_vec();
    for value in input {
        if !next.contains(&value) {
            next.push(value);
        }
    }
    next
}

/// Replace `count` positions starting at `index` (both clamped) with `insert`
fn splice(stored: &[Value], index: usize, count: usize, insert: Vec<Value>) -> Vec<Value> {
    let start = index.min(stored.len());
    let end = start.saturating_add(count).min(stored.len());
    let mut next = stored.to_vec();
    next.splice(start..end, insert);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(value: Value) -> Vec<Value> {
        value.as_array().cloned().unwrap_or_default()
    }

    fn run(action: ArrayAction, index: Option<usize>, stored: Value, input: Value) -> GatewayResult<Value> {
        apply("uses", action, index, &values(stored), values(input)).map(Value::Array)
    }

    #[test]
    fn test_overwrite_replaces_everything() {
        let next = run(ArrayAction::Overwrite, None, json!([1, 2, 4]), json!([3])).unwrap();
        assert_eq!(next, json!([3]));
    }

    #[test]
    fn test_add_appends_and_inserts() {
        assert_eq!(
            run(ArrayAction::Add, None, json!([]), json!([1, 2])).unwrap(),
            json!([1, 2])
        );
        assert_eq!(
            run(ArrayAction::Add, Some(1), json!([1, 4]), json!([2, 3])).unwrap(),
            json!([1, 2, 3, 4])
        );
        assert_eq!(
            run(ArrayAction::Add, Some(10), json!([1]), json!([2])).unwrap(),
            json!([1, 2])
        );
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let err = run(ArrayAction::Add, None, json!([1, 2]), json!([2])).unwrap_err();
        assert!(matches!(err, GatewayError::ArrayDuplicate { ref value, .. } if value == &json!(2)));

        let err = run(ArrayAction::Add, None, json!([]), json!([3, 3])).unwrap_err();
        assert!(matches!(err, GatewayError::ArrayDuplicate { .. }));
    }

    #[test]
    fn test_remove_by_value() {
        assert_eq!(
            run(ArrayAction::Remove, None, json!([1, 2, 4]), json!([2])).unwrap(),
            json!([1, 4])
        );

        let err = run(ArrayAction::Remove, None, json!([1, 2]), json!([3])).unwrap_err();
        assert_eq!(err.to_string(), "The value 3 for the key \"uses\" does not exist.");
    }

    #[test]
    fn test_remove_by_position() {
        assert_eq!(
            run(ArrayAction::Remove, Some(1), json!([1, 2, 3, 4]), json!([null, null])).unwrap(),
            json!([1, 4])
        );
        assert_eq!(
            run(ArrayAction::Remove, Some(3), json!([1, 2, 3, 4]), json!([null, null])).unwrap(),
            json!([1, 2, 3])
        );
    }

    #[test]
    fn test_auto_adds_or_removes() {
        assert_eq!(
            run(ArrayAction::Auto, None, json!([]), json!([1, 2])).unwrap(),
            json!([1, 2])
        );
        assert_eq!(
            run(ArrayAction::Auto, None, json!([1, 2, 4]), json!([1, 2])).unwrap(),
            json!([4])
        );
        assert_eq!(
            run(ArrayAction::Auto, None, json!([1, 2]), json!([2, 3])).unwrap(),
            json!([1, 2, 3])
        );
        assert_eq!(
            run(ArrayAction::Auto, None, json!([1, 2]), json!([])).unwrap(),
            json!([1, 2])
        );
    }

    #[test]
    fn test_auto_with_index_overwrites_positions() {
        assert_eq!(
            run(ArrayAction::Auto, Some(0), json!([1, 2, 4]), json!([5, 6])).unwrap(),
            json!([5, 6, 4])
        );
        assert_eq!(
            run(ArrayAction::Auto, Some(2), json!([1, 2]), json!([3])).unwrap(),
            json!([1, 2, 3])
        );
    }

    #[test]
    fn test_add_then_remove_restores_original() {
        let original = json!([1, 2]);
        let added = run(ArrayAction::Add, None, original.clone(), json!([3, 4])).unwrap();
        let restored = run(ArrayAction::Remove, None, added, json!([3, 4])).unwrap();
        assert_eq!(restored, original);
    }
}
