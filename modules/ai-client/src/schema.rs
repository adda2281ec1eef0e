use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Keys Gemini's `responseSchema` rejects or ignores.
const UNSUPPORTED_KEYS: &[&str] = &[
    "$schema",
    "definitions",
    "title",
    "additionalProperties",
    "format",
    "default",
    "minimum",
    "maximum",
    "examples",
];

/// Trait for types that can be requested as Gemini structured output.
///
/// Automatically implemented for any type that implements `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Generate a Gemini-compatible response schema for this type.
    ///
    /// Gemini accepts an OpenAPI 3.0 subset:
    /// 1. upper-case type names (`OBJECT`, `STRING`, ...)
    /// 2. `nullable: true` instead of `["string", "null"]` unions
    /// 3. fully inlined schemas (no `$ref` references)
    fn gemini_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        let definitions = value.get("definitions").cloned().unwrap_or(Value::Null);
        convert(&mut value, &definitions);

        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn convert(value: &mut Value, definitions: &Value) {
    let Value::Object(map) = value else {
        return;
    };

    if let Some(Value::String(ref_path)) = map.get("$ref").cloned() {
        let type_name = ref_path.trim_start_matches("#/definitions/");
        if let Some(def) = definitions.get(type_name) {
            let description = map.get("description").cloned();
            *value = def.clone();
            if let (Some(desc), Value::Object(inlined)) = (description, &mut *value) {
                inlined.insert("description".to_string(), desc);
            }
            convert(value, definitions);
            return;
        }
    }

    if let Some(replacement) = collapse_single_variant(map) {
        *value = replacement;
        convert(value, definitions);
        return;
    }

    for key in UNSUPPORTED_KEYS {
        map.remove(*key);
    }
    normalize_type(map);

    // Only descend into sub-schemas; `properties` is a name → schema map whose
    // keys are field names, not schema keywords.
    if let Some(Value::Object(props)) = map.get_mut("properties") {
        for (_, prop) in props.iter_mut() {
            convert(prop, definitions);
        }
    }
    if let Some(items) = map.get_mut("items") {
        match items {
            Value::Array(tuple) => tuple.iter_mut().for_each(|i| convert(i, definitions)),
            other => convert(other, definitions),
        }
    }
}

/// `allOf: [X]` and `anyOf: [X, {type: null}]` both reduce to `X`,
/// the latter marked nullable. Sibling keys such as `description` are kept.
fn collapse_single_variant(map: &Map<String, Value>) -> Option<Value> {
    let (variants, nullable) = if let Some(Value::Array(all_of)) = map.get("allOf") {
        if all_of.len() != 1 {
            return None;
        }
        (all_of.clone(), false)
    } else if let Some(Value::Array(any_of)) = map.get("anyOf") {
        let non_null: Vec<Value> = any_of
            .iter()
            .filter(|v| v.get("type") != Some(&Value::String("null".to_string())))
            .cloned()
            .collect();
        if non_null.len() != 1 {
            return None;
        }
        let nullable = non_null.len() < any_of.len();
        (non_null, nullable)
    } else {
        return None;
    };

    let mut inner = variants.into_iter().next()?;
    if let Value::Object(inner_map) = &mut inner {
        for (k, v) in map {
            if k != "allOf" && k != "anyOf" {
                inner_map.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        if nullable {
            inner_map.insert("nullable".to_string(), Value::Bool(true));
        }
    }
    Some(inner)
}

fn normalize_type(map: &mut Map<String, Value>) {
    let Some(ty) = map.get("type").cloned() else {
        return;
    };

    let (name, nullable) = match ty {
        Value::String(s) => (s, false),
        Value::Array(types) => {
            let names: Vec<String> = types
                .iter()
                .filter_map(|t| t.as_str())
                .filter(|t| *t != "null")
                .map(str::to_string)
                .collect();
            let nullable = names.len() < types.len();
            match names.into_iter().next() {
                Some(name) => (name, nullable),
                None => return,
            }
        }
        _ => return,
    };

    map.insert("type".to_string(), Value::String(name.to_uppercase()));
    if nullable {
        map.insert("nullable".to_string(), Value::Bool(true));
    }
}
