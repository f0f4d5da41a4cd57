//! Parameter schema translation for remote tools.
//!
//! Remote servers publish loosely written JSON Schemas. Before a schema is
//! handed to the model it is normalized: the top level is always an object
//! and every array node has an `items` schema, which several model APIs
//! require. Per-provider defaults are folded in as optional parameters.
//! Arguments are checked against the compiled schema before a remote call.

use jsonschema::Validator;
use serde_json::{Map, Value, json};

const COMBINATORS: [&str; 3] = ["anyOf", "oneOf", "allOf"];

/// Give every array node without `items` an object item schema.
pub fn normalize_schema(schema: &mut Value) {
    let Value::Object(map) = schema else {
        return;
    };

    if declares_type(map, "array") && !map.contains_key("items") {
        map.insert("items".to_string(), json!({"type": "object"}));
    }

    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        properties.values_mut().for_each(normalize_schema);
    }

    match map.get_mut("items") {
        Some(Value::Array(tuple)) => tuple.iter_mut().for_each(normalize_schema),
        Some(items) => normalize_schema(items),
        None => {}
    }

    for keyword in COMBINATORS {
        if let Some(Value::Array(subschemas)) = map.get_mut(keyword) {
            subschemas.iter_mut().for_each(normalize_schema);
        }
    }
}

/// Normalize a tool's input schema, forcing an object at the top level.
pub fn normalize_input_schema(schema: Value) -> Value {
    let mut schema = match schema {
        Value::Object(mut map) => {
            map.entry("type").or_insert_with(|| json!("object"));
            if !map.contains_key("properties") {
                map.insert("properties".to_string(), json!({}));
            }
            Value::Object(map)
        }
        _ => json!({"type": "object", "properties": {}}),
    };
    normalize_schema(&mut schema);
    schema
}

/// Make every parameter named in `defaults` optional, advertising its default.
///
/// Defaults for parameters the schema does not declare are ignored.
pub fn apply_defaults(schema: &mut Value, defaults: &Map<String, Value>) {
    let Some(map) = schema.as_object_mut() else {
        return;
    };

    let mut applied = Vec::new();
    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        for (name, default) in defaults {
            if let Some(Value::Object(property)) = properties.get_mut(name) {
                property.insert("default".to_string(), default.clone());
                applied.push(name.as_str());
            }
        }
    }

    if let Some(Value::Array(required)) = map.get_mut("required") {
        required.retain(|r| !r.as_str().is_some_and(|name| applied.contains(&name)));
    }
}

/// Fill in defaults for declared parameters the model left out.
pub fn fill_defaults(args: &mut Value, schema: &Value, defaults: &Map<String, Value>) {
    if args.is_null() {
        *args = json!({});
    }
    let Some(args) = args.as_object_mut() else {
        return;
    };
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };

    for (name, default) in defaults {
        if properties.contains_key(name) && !args.contains_key(name) {
            args.insert(name.clone(), default.clone());
        }
    }
}

/// Compile a normalized schema into an argument validator.
pub fn argument_validator(schema: &Value) -> Result<Validator, String> {
    jsonschema::validator_for(schema).map_err(|e| e.to_string())
}

/// Check `args` against a compiled schema, reporting every violation.
pub fn validate_arguments(validator: &Validator, args: &Value) -> Result<(), String> {
    let errors: Vec<String> = validator
        .iter_errors(args)
        .map(|e| e.to_string())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

fn declares_type(map: &Map<String, Value>, name: &str) -> bool {
    match map.get("type") {
        Some(Value::String(t)) => t == name,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(name)),
        _ => false,
    }
}
