//! Dot-path helpers shared by the schema tree, the settings engine and the
//! providers

use serde_json::{Map, Value};

/// Join a folder path and a relative key
pub fn join_path(prefix: &str, key: &str) -> String {
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}.{key}"),
    }
}

/// Read a value at a dot path inside a nested object
pub fn get_nested<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = map.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write a value at a dot path, creating intermediate objects
///
/// Intermediate non-object values are replaced by objects.
pub fn set_nested(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                set_nested(inner, rest, value);
            }
        }
    }
}

/// Deep-merge `patch` into `target`
///
/// Objects merge key by key; any other value (arrays included) overwrites.
pub fn merge_objects(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_objects(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "count"), "count");
        assert_eq!(join_path("messages", ""), "messages");
        assert_eq!(join_path("messages", "hello"), "messages.hello");
    }

    #[test]
    fn test_set_and_get_nested() {
        let mut map = Map::new();
        set_nested(&mut map, "messages.ignoring.amount", json!(4));
        set_nested(&mut map, "count", json!(1));

        assert_eq!(
            Value::Object(map.clone()),
            json!({"messages": {"ignoring": {"amount": 4}}, "count": 1})
        );
        assert_eq!(get_nested(&map, "messages.ignoring.amount"), Some(&json!(4)));
        assert_eq!(get_nested(&map, "count.deeper"), None);
        assert_eq!(get_nested(&map, "missing"), None);
    }

    #[test]
    fn test_merge_objects_is_deep() {
        let mut target = json!({"id": "1", "messages": {"hello": "a", "bye": "b"}, "uses": [1, 2]})
            .as_object()
            .cloned()
            .unwrap_or_default();
        let patch = json!({"messages": {"hello": null}, "uses": [3]})
            .as_object()
            .cloned()
            .unwrap_or_default();

        merge_objects(&mut target, &patch);

        assert_eq!(
            Value::Object(target),
            json!({"id": "1", "messages": {"hello": null, "bye": "b"}, "uses": [3]})
        );
    }
}
