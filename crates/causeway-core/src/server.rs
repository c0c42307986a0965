//! Server-side translation: error value to error body.

use std::any::type_name;
use std::error::Error;
use std::sync::Arc;

use http::StatusCode;
use serde_json::{Map, Value};

use crate::body::{ErrorBody, ExceptionId, json_type};
use crate::error::{ConfigurationError, FactoryError, SchemaViolation, TranslationError};
use crate::is_error_status;
use crate::mapping::{ExceptionIdentity, key_diff};
use crate::registry::{Hit, MappingRegistry};

/// Reserved identifier of the fallback body. No rule may declare it.
pub const FALLBACK_EXCEPTION_ID: &str = "unexpectedError";

pub const FALLBACK_DESCRIPTION: &str = "An unexpected error occurred.";

/// Body emitted when no rule matches. Its `data` is always empty.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackBody {
    body: ErrorBody,
}

impl FallbackBody {
    pub fn new(
        exception_id: &str,
        description: impl Into<String>,
    ) -> Result<Self, SchemaViolation> {
        let body = ErrorBody::new(ExceptionId::parse(exception_id)?, description, Map::new())?;
        Ok(Self { body })
    }

    pub fn exception_id(&self) -> &ExceptionId {
        self.body.exception_id()
    }

    pub fn to_body(&self) -> ErrorBody {
        self.body.clone()
    }
}

impl Default for FallbackBody {
    fn default() -> Self {
        Self {
            body: ErrorBody::from_trusted(
                ExceptionId::from_static(FALLBACK_EXCEPTION_ID),
                FALLBACK_DESCRIPTION,
                Map::new(),
            ),
        }
    }
}

/// Converts server-side errors into validated error bodies.
#[derive(Debug, Clone)]
pub struct ServerTranslator {
    registry: Arc<MappingRegistry>,
    fallback: FallbackBody,
}

impl ServerTranslator {
    pub fn new(registry: Arc<MappingRegistry>) -> Self {
        Self {
            registry,
            fallback: FallbackBody::default(),
        }
    }

    /// Replaces the default fallback body.
    ///
    /// # Errors
    ///
    /// Fails when a rule already declares the fallback's identifier.
    pub fn with_fallback(mut self, fallback: FallbackBody) -> Result<Self, ConfigurationError> {
        if self
            .registry
            .contains_exception_id(fallback.exception_id().as_str())
        {
            return Err(ConfigurationError::FallbackCollision(
                fallback.exception_id().to_string(),
            ));
        }
        self.fallback = fallback;
        Ok(self)
    }

    pub fn registry(&self) -> &Arc<MappingRegistry> {
        &self.registry
    }

    pub fn fallback(&self) -> &FallbackBody {
        &self.fallback
    }

    /// Translates a concrete error, dispatching on its type.
    ///
    /// # Errors
    ///
    /// Returns [`TranslationError`] when `status` is not 4xx/5xx or when the
    /// matched rule fails to produce a valid body. An unmatched error is not
    /// a failure: it yields the fallback body.
    pub fn translate<E: Error + 'static>(
        &self,
        err: &E,
        status: StatusCode,
    ) -> Result<ErrorBody, TranslationError> {
        check_status(status)?;
        match self
            .registry
            .find_exception(ExceptionIdentity::of::<E>(), status)
        {
            Some(hit) => render(hit, err),
            None => Ok(self.fall_back(type_name::<E>(), status)),
        }
    }

    /// Translates a type-erased error. The first rule of `status`, in
    /// declaration order, with a matching class wins.
    pub fn translate_dyn(
        &self,
        err: &(dyn Error + 'static),
        status: StatusCode,
    ) -> Result<ErrorBody, TranslationError> {
        check_status(status)?;
        match self.registry.find_dyn(err, status) {
            Some(hit) => render(hit, err),
            None => Ok(self.fall_back("dyn Error", status)),
        }
    }

    fn fall_back(&self, exception: &str, status: StatusCode) -> ErrorBody {
        tracing::debug!(
            exception,
            status = status.as_u16(),
            "no exception mapping matched, emitting fallback body"
        );
        self.fallback.to_body()
    }
}

fn check_status(status: StatusCode) -> Result<(), TranslationError> {
    if is_error_status(status) {
        Ok(())
    } else {
        Err(TranslationError::NotAnErrorStatus(status.as_u16()))
    }
}

fn render(hit: Hit<'_>, err: &(dyn Error + 'static)) -> Result<ErrorBody, TranslationError> {
    build_body(hit, err).inspect_err(|e| {
        tracing::error!(
            error = %e,
            exception = hit.class.identity().name(),
            status = hit.mapping.status_code().as_u16(),
            "exception mapping failed to produce a valid body"
        );
    })
}

fn build_body(hit: Hit<'_>, err: &(dyn Error + 'static)) -> Result<ErrorBody, TranslationError> {
    let exception_id = hit.exception_id;
    let factory_error = |source: FactoryError| TranslationError::DataFactory {
        exception_id: exception_id.to_string(),
        source,
    };
    let mismatch = || {
        let message = format!("error is not a {}", hit.class.identity().name());
        factory_error(message.into())
    };

    let description = hit.class.describe(err).ok_or_else(mismatch)?;
    let data = match hit.class.data(err).ok_or_else(mismatch)? {
        Ok(Value::Object(data)) => data,
        Ok(other) => {
            return Err(TranslationError::InvalidBody {
                exception_id: exception_id.to_string(),
                source: SchemaViolation::WrongType {
                    field: "data",
                    expected: "an object",
                    found: json_type(&other),
                },
            });
        }
        Err(source) => return Err(factory_error(source)),
    };

    if let Some(declared) = hit.data_keys
        && key_diff(declared, &data).is_some()
    {
        return Err(TranslationError::DataShape {
            exception_id: exception_id.to_string(),
            declared: declared.iter().cloned().collect(),
            found: data.keys().cloned().collect(),
        });
    }

    ErrorBody::new(exception_id.clone(), description, data).map_err(|source| {
        TranslationError::InvalidBody {
            exception_id: exception_id.to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{Exception, ExceptionMapping};
    use serde_json::json;

    #[derive(Debug, thiserror::Error)]
    #[error("user {0} does not exist")]
    struct MissingUser(u32);

    impl Exception for MissingUser {
        fn data(&self) -> Result<Value, FactoryError> {
            Ok(json!({"user": self.0}))
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("secret database password leaked")]
    struct Internal;

    fn translator() -> ServerTranslator {
        let registry = MappingRegistry::build([
            ExceptionMapping::builder(StatusCode::NOT_FOUND, "userNotFound")
                .exception::<MissingUser>()
                .data_keys(["user"])
                .build(),
            ExceptionMapping::builder(StatusCode::BAD_REQUEST, "blankDescription")
                .exception_with::<MissingUser, _, _>(|_| String::new(), |_| Ok(json!({})))
                .build(),
            ExceptionMapping::builder(StatusCode::CONFLICT, "wrongShape")
                .exception_with::<MissingUser, _, _>(|e| e.to_string(), |_| Ok(json!({"other": 1})))
                .data_keys(["user"])
                .build(),
            ExceptionMapping::builder(StatusCode::GONE, "notAnObject")
                .exception_with::<MissingUser, _, _>(|e| e.to_string(), |_| Ok(json!([1])))
                .build(),
            ExceptionMapping::builder(StatusCode::LOCKED, "factoryFails")
                .exception_with::<MissingUser, _, _>(|e| e.to_string(), |_| Err("boom".into()))
                .build(),
        ])
        .unwrap();
        ServerTranslator::new(Arc::new(registry))
    }

    #[test]
    fn mapped_error_uses_its_factories() {
        let body = translator()
            .translate(&MissingUser(3), StatusCode::NOT_FOUND)
            .unwrap();
        assert_eq!(body.exception_id(), "userNotFound");
        assert_eq!(body.description(), "user 3 does not exist");
        assert_eq!(body.data()["user"], 3);
    }

    #[test]
    fn unmatched_error_yields_fallback_without_leaking() {
        let translator = translator();
        let body = translator.translate(&Internal, StatusCode::INTERNAL_SERVER_ERROR).unwrap();
        assert_eq!(body.exception_id(), FALLBACK_EXCEPTION_ID);
        assert_eq!(body.description(), FALLBACK_DESCRIPTION);
        assert!(body.data().is_empty());
        assert!(!body.to_wire_string().contains("password"));

        // Mapped type, but not at this status.
        let body = translator.translate(&MissingUser(1), StatusCode::FORBIDDEN).unwrap();
        assert_eq!(body.exception_id(), FALLBACK_EXCEPTION_ID);
    }

    #[test]
    fn dyn_errors_dispatch_like_concrete_ones() {
        let translator = translator();
        let boxed: Box<dyn Error + Send + Sync> = Box::new(MissingUser(9));
        let body = translator.translate_dyn(boxed.as_ref(), StatusCode::NOT_FOUND).unwrap();
        assert_eq!(body, translator.translate(&MissingUser(9), StatusCode::NOT_FOUND).unwrap());
    }

    #[test]
    fn broken_mappings_are_errors_not_fallbacks() {
        let translator = translator();
        let err = |status| translator.translate(&MissingUser(1), status).unwrap_err();

        assert!(matches!(
            err(StatusCode::BAD_REQUEST),
            TranslationError::InvalidBody {
                source: SchemaViolation::EmptyDescription,
                ..
            }
        ));
        assert!(matches!(err(StatusCode::CONFLICT), TranslationError::DataShape { .. }));
        assert!(matches!(
            err(StatusCode::GONE),
            TranslationError::InvalidBody {
                source: SchemaViolation::WrongType { field: "data", .. },
                ..
            }
        ));
        assert!(matches!(err(StatusCode::LOCKED), TranslationError::DataFactory { .. }));
    }

    #[test]
    fn undeclared_rule_is_held_to_the_keys_of_its_id() {
        let registry = MappingRegistry::build([
            ExceptionMapping::builder(StatusCode::NOT_FOUND, "missing")
                .exception::<MissingUser>()
                .data_keys(["user"])
                .build(),
            ExceptionMapping::builder(StatusCode::GONE, "missing")
                .exception_with::<MissingUser, _, _>(|e| e.to_string(), |_| Ok(json!({"foo": 1})))
                .build(),
        ])
        .unwrap();
        let translator = ServerTranslator::new(Arc::new(registry));

        let err = translator.translate(&MissingUser(1), StatusCode::GONE).unwrap_err();
        let TranslationError::DataShape {
            declared, found, ..
        } = err
        else {
            panic!("expected a data shape error, got {err:?}");
        };
        assert_eq!(declared, ["user"]);
        assert_eq!(found, ["foo"]);

        assert!(translator.translate(&MissingUser(1), StatusCode::NOT_FOUND).is_ok());
    }

    #[test]
    fn non_error_status_is_rejected() {
        assert!(matches!(
            translator().translate(&Internal, StatusCode::OK),
            Err(TranslationError::NotAnErrorStatus(200))
        ));
    }

    #[test]
    fn custom_fallback() {
        let fallback = FallbackBody::new("internalFailure", "Something broke.").unwrap();
        let translator = translator().with_fallback(fallback).unwrap();
        let body = translator.translate(&Internal, StatusCode::BAD_GATEWAY).unwrap();
        assert_eq!(body.exception_id(), "internalFailure");
        assert_eq!(body.description(), "Something broke.");

        let colliding = FallbackBody::new("userNotFound", "x").unwrap();
        assert!(matches!(
            translator.with_fallback(colliding),
            Err(ConfigurationError::FallbackCollision(_))
        ));

        assert!(FallbackBody::new("Bad", "x").is_err());
        assert!(FallbackBody::new("fine", "").is_err());
    }
}
