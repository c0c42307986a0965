//! Error taxonomy of the translation layer.
//!
//! Each failure class gets its own enum so callers can tell a bad payload
//! (`SchemaViolation`, `MalformedBody`) from a broken mapping declaration
//! (`ConfigurationError`, `TranslationError`) and from protocol skew between
//! server and client (`ReconstructionError`). An unmapped cause is not an
//! error on either side.

use crate::body::EXCEPTION_ID_PATTERN;

/// Boxed error returned by user-supplied factories and constructors.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

/// Ways a candidate body can fail the canonical schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaViolation {
    /// The candidate is not a JSON object.
    #[error("error body must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    /// A required property is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A property outside `exception_id`, `description` and `data`.
    #[error("unexpected field `{0}`")]
    UnexpectedField(String),

    /// A property has the wrong JSON type.
    #[error("field `{field}` must be {expected}, got {found}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// The identifier does not match the exception id pattern.
    #[error("exception_id {0:?} does not match {pattern}", pattern = EXCEPTION_ID_PATTERN)]
    InvalidExceptionId(String),

    #[error("description must not be empty")]
    EmptyDescription,
}

/// A wire payload that could not be read as an error body.
#[derive(Debug, thiserror::Error)]
pub enum MalformedBody {
    /// The bytes are not JSON at all.
    #[error("error body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON, but not the canonical shape.
    #[error("error body violates the schema: {0}")]
    Schema(#[from] SchemaViolation),
}

/// The rule table handed to `MappingRegistry::build` is inconsistent.
///
/// Rule indices refer to positions in the declaration order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("rule {index} uses status {status}, expected a 4xx or 5xx status")]
    NotAnErrorStatus { index: usize, status: u16 },

    #[error("rule {index} has an invalid exception_id: {source}")]
    InvalidExceptionId {
        index: usize,
        #[source]
        source: SchemaViolation,
    },

    #[error("rule {index} uses `{exception_id}`, which is reserved for the fallback body")]
    ReservedExceptionId { index: usize, exception_id: String },

    #[error("rule {index} (`{exception_id}`) covers no exception type and has no constructor")]
    EmptyRule { index: usize, exception_id: String },

    /// Two rules would both match one exception type at one status.
    #[error("{exception} is mapped twice for status {status} (rules {first} and {second})")]
    AmbiguousException {
        status: u16,
        exception: &'static str,
        first: usize,
        second: usize,
    },

    /// Two rules would both match one wire identifier at one status.
    #[error(
        "exception_id `{exception_id}` is declared twice for status {status} \
         (rules {first} and {second})"
    )]
    DuplicateExceptionId {
        status: u16,
        exception_id: String,
        first: usize,
        second: usize,
    },

    /// One identifier, two data shapes.
    #[error(
        "exception_id `{exception_id}` declares different data keys in rules {first} and {second}"
    )]
    DataShapeMismatch {
        exception_id: String,
        first: usize,
        second: usize,
    },

    /// A custom fallback body reuses an identifier owned by a rule.
    #[error("fallback exception_id `{0}` is already used by a mapping rule")]
    FallbackCollision(String),
}

/// A matched mapping failed to produce a valid body.
///
/// This is a defect in the mapping declaration, never an expected request
/// outcome, so it is not converted into the fallback body.
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("status {0} is not an HTTP error status")]
    NotAnErrorStatus(u16),

    #[error("data factory for `{exception_id}` failed: {source}")]
    DataFactory {
        exception_id: String,
        #[source]
        source: FactoryError,
    },

    #[error("mapping for `{exception_id}` produced an invalid body: {source}")]
    InvalidBody {
        exception_id: String,
        #[source]
        source: SchemaViolation,
    },

    #[error("mapping for `{exception_id}` produced data keys {found:?}, declared {declared:?}")]
    DataShape {
        exception_id: String,
        declared: Vec<String>,
        found: Vec<String>,
    },
}

/// A received body does not fit the constructor of its mapped type.
#[derive(Debug, thiserror::Error)]
pub enum ReconstructionError {
    #[error("status {0} is not an HTTP error status")]
    NotAnErrorStatus(u16),

    /// The data keys disagree with the declared contract, which means the
    /// server and client run different mapping versions.
    #[error(
        "`{exception_id}` data is missing keys {missing:?} \
         and carries unexpected keys {unexpected:?}"
    )]
    DataShape {
        exception_id: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("failed to reconstruct `{exception_id}`: {source}")]
    Constructor {
        exception_id: String,
        #[source]
        source: FactoryError,
    },
}

/// Failure of `ClientTranslator::translate_wire`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Malformed(#[from] MalformedBody),

    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),
}
