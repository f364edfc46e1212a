use serde::Deserialize;
use serde_json::Value;

use crate::database::MessageSchema;
use crate::error::{LoadError, Result};

/// JSON Schema every database document must satisfy before deserialization.
pub(crate) const DOCUMENT_SCHEMA: &str = r##"{
    "$schema": "https://json-schema.org/draft/2020-12/schema",
    "type": "object",
    "required": ["messages"],
    "properties": {
        "messages": {
            "type": "array",
            "items": { "$ref": "#/$defs/message" }
        }
    },
    "$defs": {
        "message": {
            "type": "object",
            "required": ["identifier", "name", "length"],
            "additionalProperties": false,
            "properties": {
                "identifier": { "type": "integer", "minimum": 0, "maximum": 536870911 },
                "name": { "type": "string", "minLength": 1 },
                "length": { "type": "integer", "minimum": 0, "maximum": 64 },
                "signals": {
                    "type": "array",
                    "items": { "$ref": "#/$defs/signal" }
                }
            }
        },
        "signal": {
            "type": "object",
            "required": ["name", "start_bit", "length"],
            "additionalProperties": false,
            "properties": {
                "name": { "type": "string", "minLength": 1 },
                "start_bit": { "type": "integer", "minimum": 0, "maximum": 511 },
                "length": { "type": "integer", "minimum": 1, "maximum": 64 },
                "byte_order": { "enum": ["little_endian", "big_endian"] },
                "signed": { "type": "boolean" },
                "value_type": { "enum": ["integer", "float32", "float64"] },
                "factor": { "type": "number" },
                "offset": { "type": "number" },
                "unit": { "type": ["string", "null"] },
                "choices": {
                    "type": "object",
                    "propertyNames": { "pattern": "^-?[0-9]+$" },
                    "additionalProperties": { "type": "string" }
                },
                "multiplexing": {
                    "oneOf": [
                        { "const": "multiplexer" },
                        {
                            "type": "object",
                            "required": ["multiplexed"],
                            "additionalProperties": false,
                            "properties": {
                                "multiplexed": { "type": "integer", "minimum": 0 }
                            }
                        }
                    ]
                }
            }
        }
    }
}"##;

#[derive(Deserialize)]
struct DatabaseDocument {
    messages: Vec<MessageSchema>,
}

pub(crate) fn parse(text: &str) -> Result<Vec<MessageSchema>> {
    parse_value(serde_json::from_str(text)?)
}

pub(crate) fn parse_slice(bytes: &[u8]) -> Result<Vec<MessageSchema>> {
    parse_value(serde_json::from_slice(bytes)?)
}

fn parse_value(document: Value) -> Result<Vec<MessageSchema>> {
    validate_document(&document)?;
    let document: DatabaseDocument = serde_json::from_value(document)?;
    Ok(document.messages)
}

fn validate_document(document: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(DOCUMENT_SCHEMA)?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|err| LoadError::ValidationFailed(format!("document schema: {err}")))?;

    let mut errors = validator.iter_errors(document);
    if let Some(first) = errors.next() {
        let mut message = first.to_string();
        for err in errors.take(3) {
            message.push_str("; ");
            message.push_str(&err.to_string());
        }
        return Err(LoadError::ValidationFailed(message));
    }

    Ok(())
}
