//! Immutable, indexed collection of mapping rules.
//!
//! The registry is the only place where rule consistency is checked. Once
//! built it never changes, so it can be wrapped in an `Arc` and shared by
//! every translator and request handler without locking.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::error::Error;

use http::StatusCode;
use serde_json::{Map, Value};

use crate::body::ExceptionId;
use crate::error::ConfigurationError;
use crate::is_error_status;
use crate::mapping::{ExceptionClass, ExceptionIdentity, ExceptionMapping, KeyDiff, key_diff};
use crate::schema::exception_body_schema;
use crate::server::FALLBACK_EXCEPTION_ID;

/// A resolved server-side match.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Hit<'a> {
    pub mapping: &'a ExceptionMapping,
    pub exception_id: &'a ExceptionId,
    pub class: &'a ExceptionClass,
    pub data_keys: Option<&'a BTreeSet<String>>,
}

#[derive(Debug, Default)]
pub struct MappingRegistry {
    rules: Vec<ExceptionMapping>,
    /// Validated id of each rule, parallel to `rules`.
    ids: Vec<ExceptionId>,
    /// (status, type) -> (rule index, class index).
    by_exception: HashMap<(StatusCode, ExceptionIdentity), (usize, usize)>,
    /// Rules per status that cover at least one type, in declaration order.
    by_status: HashMap<StatusCode, Vec<usize>>,
    by_exception_id: HashMap<StatusCode, HashMap<String, usize>>,
    /// Key set of each id that any of its rules declares. Rules of the same
    /// id without their own declaration are held to it too.
    data_keys: HashMap<String, BTreeSet<String>>,
}

impl MappingRegistry {
    /// Validates and indexes `rules`, keeping their declaration order.
    pub fn build(
        rules: impl IntoIterator<Item = ExceptionMapping>,
    ) -> Result<Self, ConfigurationError> {
        let rules: Vec<ExceptionMapping> = rules.into_iter().collect();
        let mut ids = Vec::with_capacity(rules.len());
        let mut by_exception = HashMap::new();
        let mut by_status: HashMap<StatusCode, Vec<usize>> = HashMap::new();
        let mut by_exception_id: HashMap<StatusCode, HashMap<String, usize>> = HashMap::new();
        let mut shapes: HashMap<String, (usize, BTreeSet<String>)> = HashMap::new();

        for (index, rule) in rules.iter().enumerate() {
            let status = rule.status_code();
            if !is_error_status(status) {
                return Err(ConfigurationError::NotAnErrorStatus {
                    index,
                    status: status.as_u16(),
                });
            }

            let id = ExceptionId::parse(rule.exception_id())
                .map_err(|source| ConfigurationError::InvalidExceptionId { index, source })?;
            if id == FALLBACK_EXCEPTION_ID {
                return Err(ConfigurationError::ReservedExceptionId {
                    index,
                    exception_id: id.into_string(),
                });
            }
            if rule.classes().is_empty() && rule.reconstructs().is_none() {
                return Err(ConfigurationError::EmptyRule {
                    index,
                    exception_id: id.into_string(),
                });
            }

            for (class_index, class) in rule.classes().iter().enumerate() {
                match by_exception.entry((status, class.identity())) {
                    Entry::Occupied(existing) => {
                        let (first, _) = *existing.get();
                        return Err(ConfigurationError::AmbiguousException {
                            status: status.as_u16(),
                            exception: class.identity().name(),
                            first,
                            second: index,
                        });
                    }
                    Entry::Vacant(slot) => {
                        slot.insert((index, class_index));
                    }
                }
            }
            if !rule.classes().is_empty() {
                by_status.entry(status).or_default().push(index);
            }

            match by_exception_id
                .entry(status)
                .or_default()
                .entry(rule.exception_id().to_owned())
            {
                Entry::Occupied(existing) => {
                    return Err(ConfigurationError::DuplicateExceptionId {
                        status: status.as_u16(),
                        exception_id: id.into_string(),
                        first: *existing.get(),
                        second: index,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(index);
                }
            }

            if let Some(keys) = rule.data_keys() {
                match shapes.entry(rule.exception_id().to_owned()) {
                    Entry::Occupied(existing) => {
                        let (first, declared) = existing.get();
                        if declared != keys {
                            return Err(ConfigurationError::DataShapeMismatch {
                                exception_id: id.into_string(),
                                first: *first,
                                second: index,
                            });
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert((index, keys.clone()));
                    }
                }
            }

            ids.push(id);
        }

        let data_keys: HashMap<String, BTreeSet<String>> =
            shapes.into_iter().map(|(id, (_, keys))| (id, keys)).collect();

        tracing::debug!(
            rules = rules.len(),
            statuses = by_exception_id.len(),
            shaped = data_keys.len(),
            "built exception mapping registry"
        );

        Ok(Self {
            rules,
            ids,
            by_exception,
            by_status,
            by_exception_id,
            data_keys,
        })
    }

    /// The rule covering `identity` at `status`.
    pub fn lookup_by_exception(
        &self,
        identity: ExceptionIdentity,
        status: StatusCode,
    ) -> Option<&ExceptionMapping> {
        self.find_exception(identity, status).map(|hit| hit.mapping)
    }

    /// The first rule, in declaration order, with a class matching `err`.
    pub fn lookup_dyn(
        &self,
        err: &(dyn Error + 'static),
        status: StatusCode,
    ) -> Option<&ExceptionMapping> {
        self.find_dyn(err, status).map(|hit| hit.mapping)
    }

    /// The rule declaring `exception_id` at `status`.
    pub fn lookup_by_exception_id(
        &self,
        exception_id: &str,
        status: StatusCode,
    ) -> Option<&ExceptionMapping> {
        let index = *self.by_exception_id.get(&status)?.get(exception_id)?;
        self.rules.get(index)
    }

    /// Whether any rule, at any status, declares `exception_id`.
    pub fn contains_exception_id(&self, exception_id: &str) -> bool {
        self.ids.iter().any(|id| id == exception_id)
    }

    /// The key set every body with `exception_id` must carry, if any rule
    /// of that id declares one.
    pub fn data_keys_for(&self, exception_id: &str) -> Option<&BTreeSet<String>> {
        self.data_keys.get(exception_id)
    }

    /// JSON Schema of the bodies emitted under `exception_id`.
    pub fn body_schema(&self, exception_id: &str) -> Option<Value> {
        let id = self.ids.iter().find(|id| *id == exception_id)?;
        Some(exception_body_schema(id, self.data_keys_for(exception_id)))
    }

    /// One body schema per declared `exception_id`, keyed and sorted by id.
    pub fn schemas(&self) -> BTreeMap<String, Value> {
        self.ids
            .iter()
            .map(|id| {
                let schema = exception_body_schema(id, self.data_keys_for(id.as_str()));
                (id.to_string(), schema)
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExceptionMapping> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn key_diff(
        &self,
        exception_id: &str,
        data: &Map<String, Value>,
    ) -> Option<KeyDiff> {
        key_diff(self.data_keys_for(exception_id)?, data)
    }

    pub(crate) fn find_exception(
        &self,
        identity: ExceptionIdentity,
        status: StatusCode,
    ) -> Option<Hit<'_>> {
        let (rule, class) = *self.by_exception.get(&(status, identity))?;
        self.hit(rule, class)
    }

    pub(crate) fn find_dyn(
        &self,
        err: &(dyn Error + 'static),
        status: StatusCode,
    ) -> Option<Hit<'_>> {
        self.by_status.get(&status)?.iter().find_map(|&rule| {
            let classes = self.rules.get(rule)?.classes();
            let class = classes.iter().position(|c| c.matches(err))?;
            self.hit(rule, class)
        })
    }

    fn hit(&self, rule: usize, class: usize) -> Option<Hit<'_>> {
        let mapping = self.rules.get(rule)?;
        Some(Hit {
            mapping,
            exception_id: self.ids.get(rule)?,
            class: mapping.classes().get(class)?,
            data_keys: self.data_keys_for(mapping.exception_id()),
        })
    }
}
