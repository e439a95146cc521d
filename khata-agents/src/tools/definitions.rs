//! Function declarations for the four tools, generated from the argument
//! types so the schema the model sees and the decoder can never drift apart.
//!
//! Function calling APIs accept only a subset of OpenAPI 3 schema. Generated
//! schemas are rewritten down to that subset before they are sent.

use super::types::{
    AddTransactionArgs, DeleteTransactionArgs, GetTransactionArgs, UpdateTransactionArgs,
};
use super::ToolName;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn for_tool(tool: ToolName) -> Self {
        let parameters = match tool {
            ToolName::AddTransaction => parameters_for::<AddTransactionArgs>(),
            ToolName::GetTransaction => parameters_for::<GetTransactionArgs>(),
            ToolName::UpdateTransaction => parameters_for::<UpdateTransactionArgs>(),
            ToolName::DeleteTransaction => parameters_for::<DeleteTransactionArgs>(),
        };

        Self {
            name: tool.as_str().to_string(),
            description: tool.description().to_string(),
            parameters,
        }
    }
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolName::ALL.into_iter().map(ToolDefinition::for_tool).collect()
}

pub fn parameters_for<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::openapi3()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator();
    let root = generator.into_root_schema_for::<T>();

    match serde_json::to_value(&root.schema) {
        Ok(schema) => sanitize_schema(schema),
        Err(e) => {
            tracing::warn!("Could not serialize schema for tool arguments: {}", e);
            json!({ "type": "object" })
        }
    }
}

const KEPT_KEYWORDS: [&str; 8] = [
    "type",
    "format",
    "description",
    "nullable",
    "enum",
    "properties",
    "required",
    "items",
];

const SUPPORTED_FORMATS: [&str; 6] = ["float", "double", "int32", "int64", "enum", "date-time"];

/// Reduces a JSON schema to the keywords function declarations accept
pub fn sanitize_schema(schema: Value) -> Value {
    let Value::Object(mut map) = schema else {
        return schema;
    };

    if let Some(Value::Array(parts)) = map.remove("allOf") {
        for part in parts {
            if let Value::Object(part) = part {
                for (key, value) in part {
                    map.entry(key).or_insert(value);
                }
            }
        }
    }

    for keyword in ["oneOf", "anyOf"] {
        if let Some(Value::Array(variants)) = map.remove(keyword) {
            merge_variants(&mut map, variants);
        }
    }

    if let Some(Value::Array(types)) = map.get("type").cloned() {
        let nullable = types.iter().any(|t| t == "null");
        match types.into_iter().find(|t| t != "null") {
            Some(first) => {
                map.insert("type".to_string(), first);
            }
            None => {
                map.remove("type");
            }
        }
        if nullable {
            map.insert("nullable".to_string(), Value::Bool(true));
        }
    }

    if let Some(Value::Array(values)) = map.get_mut("enum") {
        values.retain(|v| !v.is_null());
    }

    let unsupported_format = map
        .get("format")
        .and_then(Value::as_str)
        .is_some_and(|format| !SUPPORTED_FORMATS.contains(&format));
    if unsupported_format {
        map.remove("format");
    }

    if map.get("type").and_then(Value::as_str) == Some("string") && map.contains_key("enum") {
        map.insert("format".to_string(), json!("enum"));
    }

    map.retain(|key, _| KEPT_KEYWORDS.contains(&key.as_str()));

    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        for property in properties.values_mut() {
            *property = sanitize_schema(property.take());
        }
    }
    if let Some(items) = map.get_mut("items") {
        *items = sanitize_schema(items.take());
    }

    Value::Object(map)
}

// Enum variants documented one by one come out as `oneOf` consts
fn merge_variants(map: &mut Map<String, Value>, variants: Vec<Value>) {
    let mut values = Vec::new();
    let mut nullable = false;
    let mut fallback = None;

    for variant in variants {
        let Value::Object(variant) = variant else {
            continue;
        };
        if let Some(value) = variant.get("const") {
            values.push(value.clone());
        } else if let Some(Value::Array(listed)) = variant.get("enum") {
            values.extend(listed.iter().cloned());
        } else if variant.get("type").and_then(Value::as_str) == Some("null") {
            nullable = true;
        } else if fallback.is_none() {
            fallback = Some(variant);
        }
    }

    if !values.is_empty() {
        map.entry("type").or_insert_with(|| json!("string"));
        map.insert("enum".to_string(), Value::Array(values));
    } else if let Some(fallback) = fallback {
        for (key, value) in fallback {
            map.entry(key).or_insert(value);
        }
    }

    if nullable {
        map.insert("nullable".to_string(), Value::Bool(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property<'a>(definition: &'a ToolDefinition, name: &str) -> &'a Value {
        &definition.parameters["properties"][name]
    }

    fn assert_only_kept_keywords(schema: &Value) {
        let Value::Object(map) = schema else {
            return;
        };
        for key in map.keys() {
            assert!(KEPT_KEYWORDS.contains(&key.as_str()), "unexpected keyword {}", key);
        }
        if let Some(Value::Object(properties)) = map.get("properties") {
            properties.values().for_each(assert_only_kept_keywords);
        }
        if let Some(items) = map.get("items") {
            assert_only_kept_keywords(items);
        }
    }

    #[test]
    fn test_registry_lists_four_tools() {
        let names: Vec<_> = tool_definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "add_transaction",
                "get_transaction",
                "update_transaction",
                "delete_transaction"
            ]
        );
    }

    #[test]
    fn test_add_schema_shape() {
        let add = ToolDefinition::for_tool(ToolName::AddTransaction);

        assert_eq!(add.parameters["type"], "object");
        let required: Vec<_> = add.parameters["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"amount"));
        assert!(required.contains(&"type"));
        assert!(!required.contains(&"sub_type"));

        let kind = property(&add, "type");
        assert_eq!(kind["type"], "string");
        assert_eq!(kind["format"], "enum");
        assert_eq!(kind["enum"], json!(["income", "expense"]));
        assert_eq!(property(&add, "amount")["format"], "double");
    }

    #[test]
    fn test_schemas_only_use_supported_keywords() {
        for definition in tool_definitions() {
            assert_only_kept_keywords(&definition.parameters);
            assert!(!definition.description.is_empty());
        }

        let get = ToolDefinition::for_tool(ToolName::GetTransaction);
        assert!(property(&get, "limit").get("format").is_none());
        assert_eq!(property(&get, "amount_comparison")["enum"], json!(["above", "below", "equal"]));
    }

    #[test]
    fn test_selector_fields_are_flattened() {
        let delete = ToolDefinition::for_tool(ToolName::DeleteTransaction);
        for field in ["transaction_id", "latest", "match_type", "match_sub_type"] {
            assert!(property(&delete, field).is_object(), "missing {}", field);
        }

        let update = ToolDefinition::for_tool(ToolName::UpdateTransaction);
        assert!(property(&update, "amount").is_object());
        assert!(property(&update, "match_whom_to_paid").is_object());
    }

    #[test]
    fn test_sanitize_collapses_type_arrays_and_all_of() {
        let schema = json!({
            "type": "object",
            "title": "Args",
            "properties": {
                "note": { "type": ["string", "null"], "maxLength": 20 },
                "kind": {
                    "description": "kind of thing",
                    "allOf": [{ "type": "string", "enum": ["a", "b", null] }]
                },
                "count": { "type": "integer", "format": "uint8", "minimum": 0 }
            }
        });

        let cleaned = sanitize_schema(schema);
        assert!(cleaned.get("title").is_none());
        assert_eq!(cleaned["properties"]["note"], json!({"type": "string", "nullable": true}));
        assert_eq!(
            cleaned["properties"]["kind"],
            json!({"description": "kind of thing", "type": "string", "enum": ["a", "b"], "format": "enum"})
        );
        assert_eq!(cleaned["properties"]["count"], json!({"type": "integer"}));
    }

    #[test]
    fn test_sanitize_turns_one_of_consts_into_enum() {
        let cleaned = sanitize_schema(json!({
            "oneOf": [
                { "type": "string", "const": "income", "description": "money in" },
                { "type": "string", "const": "expense" }
            ]
        }));
        assert_eq!(
            cleaned,
            json!({"type": "string", "enum": ["income", "expense"], "format": "enum"})
        );
    }
}
