//! The canonical error body and its validation.
//!
//! An `ErrorBody` can only be obtained through a validating constructor, so
//! holding one is proof that it satisfies the schema:
//!
//! ```json
//! {"exception_id": "resourceNotFound", "description": "...", "data": {}}
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{MalformedBody, SchemaViolation};

/// Pattern every `exception_id` must match.
pub const EXCEPTION_ID_PATTERN: &str = r"^[a-z][a-zA-Z0-9]{2,39}$";

/// The three properties of an error body, in emission order.
pub const BODY_FIELDS: [&str; 3] = ["exception_id", "description", "data"];

static EXCEPTION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EXCEPTION_ID_PATTERN).expect("exception id pattern compiles"));

/// Lower-camel-case identifier naming an error cause, 3 to 40 characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct ExceptionId(String);

impl ExceptionId {
    /// Validates `id` against [`EXCEPTION_ID_PATTERN`].
    pub fn parse(id: impl Into<String>) -> Result<Self, SchemaViolation> {
        let id = id.into();
        if EXCEPTION_ID_RE.is_match(&id) {
            Ok(Self(id))
        } else {
            Err(SchemaViolation::InvalidExceptionId(id))
        }
    }

    /// Wraps an identifier known to match the pattern.
    pub(crate) fn from_static(id: &'static str) -> Self {
        debug_assert!(EXCEPTION_ID_RE.is_match(id), "{id} is not a valid exception id");
        Self(id.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ExceptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExceptionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ExceptionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ExceptionId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl FromStr for ExceptionId {
    type Err = SchemaViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ExceptionId {
    type Error = SchemaViolation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl Serialize for ExceptionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Schema-valid HTTP error body.
///
/// `status_code` is not part of the body. It travels on the transport and is
/// passed alongside the body to every translation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct ErrorBody {
    exception_id: ExceptionId,
    description: String,
    data: Map<String, Value>,
}

impl ErrorBody {
    /// Builds a body from already separated parts.
    pub fn new(
        exception_id: ExceptionId,
        description: impl Into<String>,
        data: Map<String, Value>,
    ) -> Result<Self, SchemaViolation> {
        let description = description.into();
        if description.is_empty() {
            return Err(SchemaViolation::EmptyDescription);
        }
        Ok(Self {
            exception_id,
            description,
            data,
        })
    }

    /// Assembles a body from parts already known to be valid.
    pub(crate) fn from_trusted(
        exception_id: ExceptionId,
        description: &'static str,
        data: Map<String, Value>,
    ) -> Self {
        debug_assert!(!description.is_empty());
        Self {
            exception_id,
            description: description.to_owned(),
            data,
        }
    }

    /// Checks a JSON candidate against the canonical schema.
    ///
    /// Checks run in a fixed order: object shape, undeclared properties,
    /// required properties, property types, then the id pattern and the
    /// non-empty description.
    pub fn validate(candidate: &Value) -> Result<Self, SchemaViolation> {
        let Value::Object(object) = candidate else {
            return Err(SchemaViolation::NotAnObject {
                found: json_type(candidate),
            });
        };

        if let Some(extra) = object.keys().find(|key| !BODY_FIELDS.contains(&key.as_str())) {
            return Err(SchemaViolation::UnexpectedField(extra.clone()));
        }

        let exception_id = require_str(object, "exception_id")?;
        let description = require_str(object, "description")?;
        let data = match object.get("data") {
            Some(Value::Object(data)) => data,
            Some(other) => {
                return Err(SchemaViolation::WrongType {
                    field: "data",
                    expected: "an object",
                    found: json_type(other),
                });
            }
            None => return Err(SchemaViolation::MissingField("data")),
        };

        Self::new(ExceptionId::parse(exception_id)?, description, data.clone())
    }

    /// Parses and validates raw wire bytes.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, MalformedBody> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(&value)
    }

    /// Validates an already parsed JSON value.
    pub fn from_value(value: &Value) -> Result<Self, MalformedBody> {
        Ok(Self::validate(value)?)
    }

    /// The wire representation: exactly the three declared properties.
    pub fn to_wire(&self) -> Value {
        let mut object = Map::with_capacity(BODY_FIELDS.len());
        object.insert(
            "exception_id".to_owned(),
            Value::String(self.exception_id.to_string()),
        );
        object.insert(
            "description".to_owned(),
            Value::String(self.description.clone()),
        );
        object.insert("data".to_owned(), Value::Object(self.data.clone()));
        Value::Object(object)
    }

    pub fn to_wire_string(&self) -> String {
        self.to_wire().to_string()
    }

    pub fn to_wire_vec(&self) -> Vec<u8> {
        self.to_wire_string().into_bytes()
    }

    pub fn exception_id(&self) -> &ExceptionId {
        &self.exception_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_parts(self) -> (ExceptionId, String, Map<String, Value>) {
        (self.exception_id, self.description, self.data)
    }
}

impl TryFrom<Value> for ErrorBody {
    type Error = SchemaViolation;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::validate(&value)
    }
}

fn require_str<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, SchemaViolation> {
    match object.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(SchemaViolation::WrongType {
            field,
            expected: "a string",
            found: json_type(other),
        }),
        None => Err(SchemaViolation::MissingField(field)),
    }
}

/// JSON type name of `value`, as used in schema messages.
pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
