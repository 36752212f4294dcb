use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Trait for types used as schema-constrained provider output.
///
/// Automatically implemented for any `JsonSchema + DeserializeOwned` type.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Generate a provider-compatible JSON schema for this type.
    ///
    /// Structured-output endpoints are stricter than vanilla JSON Schema:
    /// every object needs `additionalProperties: false`, every property must
    /// be listed in `required` (nullable ones included), and `$ref`s must be
    /// fully inlined.
    fn response_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        let definitions = value.get("definitions").cloned().unwrap_or(Value::Null);
        conform(&mut value, &definitions);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    fn schema_id() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Single recursive pass: inline `#/definitions` refs, unwrap single-element
/// `allOf` wrappers, and tighten object schemas.
fn conform(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_path)) = map.get("$ref").cloned() {
                if let Some(name) = ref_path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.get(name) {
                        *value = def.clone();
                        conform(value, definitions);
                        return;
                    }
                }
            }

            if let Some(Value::Array(all_of)) = map.get("allOf").cloned() {
                if all_of.len() == 1 {
                    *value = all_of.into_iter().next().unwrap();
                    conform(value, definitions);
                    return;
                }
            }

            if map.get("type") == Some(&Value::String("object".to_string())) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let keys: Vec<Value> =
                        props.keys().map(|k| Value::String(k.clone())).collect();
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }

            for (_, v) in map.iter_mut() {
                conform(v, definitions);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                conform(item, definitions);
            }
        }
        _ => {}
    }
}
