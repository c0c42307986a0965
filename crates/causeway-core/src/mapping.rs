//! Declarative exception mapping rules.
//!
//! A rule ties one or more concrete error types, at one HTTP status, to a
//! fixed `exception_id`. Each covered type brings its own description and
//! data factories; the rule may also carry a client-side constructor that
//! turns a received body back into a typed error.

use std::any::{TypeId, type_name};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use http::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::body::ErrorBody;
use crate::error::FactoryError;

/// A reconstructed client-side error.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Server-side error that knows how to describe itself on the wire.
///
/// Both methods have defaults: the description is the `Display` output and
/// the data object is empty.
pub trait Exception: Error + 'static {
    /// Human-readable description for the body.
    fn describe(&self) -> String {
        self.to_string()
    }

    /// The `data` object. Must return a JSON object.
    fn data(&self) -> Result<Value, FactoryError> {
        Ok(Value::Object(Map::new()))
    }
}

/// Client-side error that can be rebuilt from a received body.
///
/// `status` is the status the body arrived with.
pub trait Reconstruct: Error + Send + Sync + Sized + 'static {
    fn reconstruct(body: &ErrorBody, status: StatusCode) -> Result<Self, FactoryError>;
}

/// Serializes `value` into a `data` object.
pub fn data_from<T: Serialize>(value: &T) -> Result<Value, FactoryError> {
    Ok(serde_json::to_value(value)?)
}

/// Deserializes the body's `data` object into `T`.
///
/// Pair with `#[serde(deny_unknown_fields)]` on `T` to reject extra keys.
pub fn from_data<T: DeserializeOwned>(body: &ErrorBody) -> Result<T, FactoryError> {
    Ok(serde_json::from_value(Value::Object(body.data().clone()))?)
}

/// Identity of an error type, used as the dispatch key.
#[derive(Clone, Copy)]
pub struct ExceptionIdentity {
    type_id: TypeId,
    name: &'static str,
}

impl ExceptionIdentity {
    pub fn of<E: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            name: type_name::<E>(),
        }
    }

    /// Fully qualified type name, for diagnostics only.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ExceptionIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ExceptionIdentity {}

impl Hash for ExceptionIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ExceptionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

type DescribeFn = dyn Fn(&(dyn Error + 'static)) -> Option<String> + Send + Sync;
type DataFn = dyn Fn(&(dyn Error + 'static)) -> Option<Result<Value, FactoryError>> + Send + Sync;
type ConstructFn =
    dyn Fn(&ErrorBody, StatusCode) -> Result<BoxError, FactoryError> + Send + Sync;

fn is_type<E: Error + 'static>(err: &(dyn Error + 'static)) -> bool {
    err.is::<E>()
}

/// One error type covered by a rule, with its type-erased factories.
#[derive(Clone)]
pub struct ExceptionClass {
    identity: ExceptionIdentity,
    matches: fn(&(dyn Error + 'static)) -> bool,
    describe: Arc<DescribeFn>,
    data: Arc<DataFn>,
}

impl ExceptionClass {
    fn new<E, D, S>(describe: D, data: S) -> Self
    where
        E: Error + 'static,
        D: Fn(&E) -> String + Send + Sync + 'static,
        S: Fn(&E) -> Result<Value, FactoryError> + Send + Sync + 'static,
    {
        Self {
            identity: ExceptionIdentity::of::<E>(),
            matches: is_type::<E>,
            describe: Arc::new(move |err: &(dyn Error + 'static)| {
                err.downcast_ref::<E>().map(&describe)
            }),
            data: Arc::new(move |err: &(dyn Error + 'static)| err.downcast_ref::<E>().map(&data)),
        }
    }

    pub fn identity(&self) -> ExceptionIdentity {
        self.identity
    }

    /// Whether `err` is an instance of this class's type.
    pub fn matches(&self, err: &(dyn Error + 'static)) -> bool {
        (self.matches)(err)
    }

    /// `None` when `err` is not of this class's type.
    pub(crate) fn describe(&self, err: &(dyn Error + 'static)) -> Option<String> {
        (self.describe)(err)
    }

    pub(crate) fn data(&self, err: &(dyn Error + 'static)) -> Option<Result<Value, FactoryError>> {
        (self.data)(err)
    }
}

impl fmt::Debug for ExceptionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExceptionClass")
            .field(&self.identity)
            .finish()
    }
}

/// Client-side constructor of a rule.
#[derive(Clone)]
pub(crate) struct Constructor {
    identity: ExceptionIdentity,
    build: Arc<ConstructFn>,
}

impl Constructor {
    pub(crate) fn construct(
        &self,
        body: &ErrorBody,
        status: StatusCode,
    ) -> Result<BoxError, FactoryError> {
        (self.build)(body, status)
    }
}

/// Keys a `data` object is missing or carries beyond the declared set.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct KeyDiff {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

/// A single mapping rule. Build one with [`ExceptionMapping::builder`].
#[derive(Clone)]
pub struct ExceptionMapping {
    status_code: StatusCode,
    exception_id: String,
    classes: Vec<ExceptionClass>,
    data_keys: Option<BTreeSet<String>>,
    constructor: Option<Constructor>,
}

impl ExceptionMapping {
    /// Starts a rule. The id is validated when the registry is built.
    pub fn builder(status_code: StatusCode, exception_id: impl Into<String>) -> MappingBuilder {
        MappingBuilder {
            mapping: Self {
                status_code,
                exception_id: exception_id.into(),
                classes: Vec::new(),
                data_keys: None,
                constructor: None,
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub fn exception_id(&self) -> &str {
        &self.exception_id
    }

    pub fn classes(&self) -> &[ExceptionClass] {
        &self.classes
    }

    pub fn covers(&self, identity: ExceptionIdentity) -> bool {
        self.classes.iter().any(|c| c.identity == identity)
    }

    /// The closed `data` key set, when declared.
    pub fn data_keys(&self) -> Option<&BTreeSet<String>> {
        self.data_keys.as_ref()
    }

    /// Type the client-side constructor produces, if the rule has one.
    pub fn reconstructs(&self) -> Option<ExceptionIdentity> {
        self.constructor.as_ref().map(|c| c.identity)
    }

    pub(crate) fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }
}

/// Compares `data` against a declared key set. `None` means it fits.
pub(crate) fn key_diff(declared: &BTreeSet<String>, data: &Map<String, Value>) -> Option<KeyDiff> {
    let diff = KeyDiff {
        missing: declared
            .iter()
            .filter(|key| !data.contains_key(key.as_str()))
            .cloned()
            .collect(),
        unexpected: data
            .keys()
            .filter(|key| !declared.contains(key.as_str()))
            .cloned()
            .collect(),
    };
    (!diff.missing.is_empty() || !diff.unexpected.is_empty()).then_some(diff)
}

impl fmt::Debug for ExceptionMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionMapping")
            .field("status_code", &self.status_code)
            .field("exception_id", &self.exception_id)
            .field("classes", &self.classes)
            .field("data_keys", &self.data_keys)
            .field("reconstructs", &self.reconstructs())
            .finish()
    }
}

/// Builder for [`ExceptionMapping`].
#[must_use]
pub struct MappingBuilder {
    mapping: ExceptionMapping,
}

impl MappingBuilder {
    /// Covers `E`, using its [`Exception`] impl as the factories.
    pub fn exception<E: Exception>(self) -> Self {
        self.exception_with::<E, _, _>(|err: &E| err.describe(), |err: &E| Exception::data(err))
    }

    /// Covers `E` with explicit description and data factories.
    pub fn exception_with<E, D, S>(mut self, describe: D, data: S) -> Self
    where
        E: Error + 'static,
        D: Fn(&E) -> String + Send + Sync + 'static,
        S: Fn(&E) -> Result<Value, FactoryError> + Send + Sync + 'static,
    {
        self.mapping
            .classes
            .push(ExceptionClass::new::<E, D, S>(describe, data));
        self
    }

    /// Declares the closed set of `data` keys for this `exception_id`.
    pub fn data_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.mapping.data_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Rebuilds received bodies as `E` through its [`Reconstruct`] impl.
    pub fn reconstructs<E: Reconstruct>(self) -> Self {
        self.reconstruct_with::<E, _>(E::reconstruct)
    }

    /// Rebuilds received bodies as `E` with an explicit constructor.
    pub fn reconstruct_with<E, F>(mut self, construct: F) -> Self
    where
        E: Error + Send + Sync + 'static,
        F: Fn(&ErrorBody, StatusCode) -> Result<E, FactoryError> + Send + Sync + 'static,
    {
        self.mapping.constructor = Some(Constructor {
            identity: ExceptionIdentity::of::<E>(),
            build: Arc::new(move |body: &ErrorBody, status: StatusCode| {
                construct(body, status).map(|err| Box::new(err) as BoxError)
            }),
        });
        self
    }

    pub fn build(self) -> ExceptionMapping {
        self.mapping
    }
}
