//! JSON Schema documents of the error body.
//!
//! Built from the same constants `ErrorBody::validate` uses, so the published
//! document and the validator cannot drift apart. Per-id documents narrow the
//! generic one to a single `exception_id` and its declared `data` keys.

use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

use crate::body::{EXCEPTION_ID_PATTERN, ExceptionId};

pub const SCHEMA_TITLE: &str = "HttpExceptionBody";

/// Returns the JSON Schema (draft 2020-12) describing an error body.
pub fn error_body_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_TITLE,
        "description": "An opinionated schema for the body of HTTP error responses (4xx or 5xx).",
        "type": "object",
        "properties": {
            "exception_id": {
                "type": "string",
                "pattern": EXCEPTION_ID_PATTERN,
                "description": "Identifies the cause of the error from the server's perspective. \
                    Lower camel case, 3 to 40 characters."
            },
            "description": {
                "type": "string",
                "minLength": 1,
                "description": "A human readable message explaining the cause of the error."
            },
            "data": {
                "type": "object",
                "description": "Machine readable details on the cause. All errors sharing an \
                    exception_id use the same set of properties. May be empty."
            }
        },
        "required": ["data", "description", "exception_id"],
        "additionalProperties": false
    })
}

/// Schema of the bodies emitted under one `exception_id`.
///
/// With a declared key set, `data` must carry exactly those keys. Key values
/// are unconstrained.
pub fn exception_body_schema(
    exception_id: &ExceptionId,
    data_keys: Option<&BTreeSet<String>>,
) -> Value {
    let data = match data_keys {
        Some(keys) => {
            let properties: Map<String, Value> =
                keys.iter().map(|key| (key.clone(), json!({}))).collect();
            json!({
                "type": "object",
                "properties": properties,
                "required": keys,
                "additionalProperties": false
            })
        }
        None => json!({"type": "object"}),
    };

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": format!("{exception_id} error body"),
        "type": "object",
        "properties": {
            "exception_id": {"const": exception_id.as_str()},
            "description": {"type": "string", "minLength": 1},
            "data": data
        },
        "required": ["data", "description", "exception_id"],
        "additionalProperties": false
    })
}
