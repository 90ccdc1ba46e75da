use serde_json::Value as JsonValue;

const ROLE_SEPARATOR: &str = " / ";

/// Flatten a source role value into the display string stored on a role row.
///
/// Sources report a role as a plain string, as a character object (`{"name": ...}`),
/// as a list of those when an actor plays several parts, or not at all.
pub fn coerce_role_label(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Array(items) => items
            .iter()
            .map(coerce_role_label)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(ROLE_SEPARATOR),
        JsonValue::Object(map) => match map.get("name") {
            Some(name) => coerce_role_label(name),
            None => value.to_string(),
        },
        JsonValue::Bool(_) | JsonValue::Number(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_string() {
        assert_eq!(coerce_role_label(&json!("Detective")), "Detective");
        assert_eq!(coerce_role_label(&json!("  Narrator ")), "Narrator");
    }

    #[test]
    fn test_character_object() {
        assert_eq!(
            coerce_role_label(&json!({"id": "ch0001", "name": "Sam Spade"})),
            "Sam Spade"
        );
    }

    #[test]
    fn test_object_without_name_is_serialized() {
        assert_eq!(coerce_role_label(&json!({"id": 7})), r#"{"id":7}"#);
    }

    #[test]
    fn test_multiple_roles_are_joined() {
        let value = json!([{"name": "Twin A"}, "Twin B", null]);
        assert_eq!(coerce_role_label(&value), "Twin A / Twin B");
    }

    #[test]
    fn test_null_and_scalars() {
        assert_eq!(coerce_role_label(&JsonValue::Null), "");
        assert_eq!(coerce_role_label(&json!(42)), "42");
    }
}
