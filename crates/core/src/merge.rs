use serde_json::Value;

/// Apply a JSON merge patch to `original` and return the merged tree.
///
/// Semantics:
/// - a null patch yields null (delete the node, handled one level up);
/// - if either side is not an object, the patch replaces the original
///   wholesale (scalars and arrays never merge);
/// - for object/object, fields present in the patch are copied over the
///   original: null removes the field, nested objects merge recursively,
///   anything else replaces. Fields absent from the patch are untouched.
///
/// Pure and deterministic; the original is never mutated.
pub fn merge(original: &Value, patch: &Value) -> Value {
    if patch.is_null() {
        return Value::Null;
    }
    let (Some(original_map), Some(patch_map)) = (original.as_object(), patch.as_object()) else {
        return patch.clone();
    };

    let mut target = original_map.clone();
    for (key, value) in patch_map {
        if value.is_null() {
            target.remove(key);
            continue;
        }
        let replacement = match target.get(key) {
            Some(existing) if existing.is_object() && value.is_object() => merge(existing, value),
            _ => value.clone(),
        };
        target.insert(key.clone(), replacement);
    }
    Value::Object(target)
}
