//! Client-side translation: received body back to a typed error.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde_json::{Map, Value};

use crate::body::{ErrorBody, ExceptionId};
use crate::error::{ClientError, ReconstructionError};
use crate::is_error_status;
use crate::mapping::BoxError;
use crate::registry::MappingRegistry;
use crate::server::FALLBACK_EXCEPTION_ID;

/// A received error whose `exception_id` has no client-side constructor.
///
/// Carries the body exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct UnmappedError {
    status_code: StatusCode,
    exception_id: ExceptionId,
    description: String,
    data: Map<String, Value>,
}

impl UnmappedError {
    fn from_body(body: &ErrorBody, status_code: StatusCode) -> Self {
        Self {
            status_code,
            exception_id: body.exception_id().clone(),
            description: body.description().to_owned(),
            data: body.data().clone(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
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

    /// Whether the server answered with its default fallback body.
    pub fn is_unexpected(&self) -> bool {
        self.exception_id == FALLBACK_EXCEPTION_ID
    }
}

impl fmt::Display for UnmappedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.status_code.as_u16(),
            self.exception_id,
            self.description
        )
    }
}

impl Error for UnmappedError {}

/// Outcome of client-side translation.
#[derive(Debug)]
pub enum RemoteException {
    /// Rebuilt through the constructor of the matching rule.
    Mapped {
        status_code: StatusCode,
        exception_id: ExceptionId,
        error: BoxError,
    },
    /// Rebuilt by the translator's fallback constructor.
    Fallback {
        status_code: StatusCode,
        exception_id: ExceptionId,
        error: BoxError,
    },
    Unmapped(UnmappedError),
}

impl RemoteException {
    pub fn exception_id(&self) -> &ExceptionId {
        match self {
            Self::Mapped { exception_id, .. } | Self::Fallback { exception_id, .. } => {
                exception_id
            }
            Self::Unmapped(unmapped) => unmapped.exception_id(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Mapped { status_code, .. } | Self::Fallback { status_code, .. } => *status_code,
            Self::Unmapped(unmapped) => unmapped.status_code(),
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped { .. })
    }

    /// The reconstructed error as `T`. Always `None` for unmapped errors.
    pub fn downcast_ref<T: Error + 'static>(&self) -> Option<&T> {
        match self {
            Self::Mapped { error, .. } | Self::Fallback { error, .. } => error.downcast_ref(),
            Self::Unmapped(_) => None,
        }
    }

    /// Takes the reconstructed error as `T`, handing `self` back otherwise.
    pub fn downcast<T: Error + 'static>(self) -> Result<T, Self> {
        match self {
            Self::Mapped {
                status_code,
                exception_id,
                error,
            } => error.downcast::<T>().map(|err| *err).map_err(|error| Self::Mapped {
                status_code,
                exception_id,
                error,
            }),
            Self::Fallback {
                status_code,
                exception_id,
                error,
            } => error.downcast::<T>().map(|err| *err).map_err(|error| Self::Fallback {
                status_code,
                exception_id,
                error,
            }),
            unmapped @ Self::Unmapped(_) => Err(unmapped),
        }
    }

    pub fn as_unmapped(&self) -> Option<&UnmappedError> {
        match self {
            Self::Unmapped(unmapped) => Some(unmapped),
            Self::Mapped { .. } | Self::Fallback { .. } => None,
        }
    }

    /// The inner error, boxed.
    pub fn into_error(self) -> BoxError {
        match self {
            Self::Mapped { error, .. } | Self::Fallback { error, .. } => error,
            Self::Unmapped(unmapped) => Box::new(unmapped),
        }
    }
}

impl fmt::Display for RemoteException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mapped { error, .. } | Self::Fallback { error, .. } => {
                fmt::Display::fmt(error, f)
            }
            Self::Unmapped(unmapped) => fmt::Display::fmt(unmapped, f),
        }
    }
}

impl Error for RemoteException {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Mapped { error, .. } | Self::Fallback { error, .. } => Some(error.as_ref()),
            Self::Unmapped(unmapped) => Some(unmapped),
        }
    }
}

type FallbackFn = dyn Fn(&ErrorBody, StatusCode) -> BoxError + Send + Sync;

/// Rebuilds typed errors from received bodies.
#[derive(Clone)]
pub struct ClientTranslator {
    registry: Arc<MappingRegistry>,
    fallback: Option<Arc<FallbackFn>>,
}

impl ClientTranslator {
    pub fn new(registry: Arc<MappingRegistry>) -> Self {
        Self {
            registry,
            fallback: None,
        }
    }

    /// Builds bodies without a client-side constructor through `fallback`
    /// instead of returning [`RemoteException::Unmapped`].
    pub fn with_fallback<E, F>(mut self, fallback: F) -> Self
    where
        E: Error + Send + Sync + 'static,
        F: Fn(&ErrorBody, StatusCode) -> E + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(move |body: &ErrorBody, status: StatusCode| {
            Box::new(fallback(body, status)) as BoxError
        }));
        self
    }

    pub fn registry(&self) -> &Arc<MappingRegistry> {
        &self.registry
    }

    fn fall_back(&self, body: &ErrorBody, status: StatusCode) -> RemoteException {
        tracing::debug!(
            exception_id = %body.exception_id(),
            status = status.as_u16(),
            fallback = self.fallback.is_some(),
            "no client-side constructor"
        );
        match &self.fallback {
            Some(fallback) => RemoteException::Fallback {
                status_code: status,
                exception_id: body.exception_id().clone(),
                error: fallback(body, status),
            },
            None => RemoteException::Unmapped(UnmappedError::from_body(body, status)),
        }
    }

    /// Translates a validated body received with `status`.
    ///
    /// # Errors
    ///
    /// Fails when `status` is not 4xx/5xx, when the body's data keys do not
    /// match the set declared for its identifier, or when the constructor rejects the
    /// body. Unknown identifiers are not errors.
    pub fn translate(
        &self,
        body: &ErrorBody,
        status: StatusCode,
    ) -> Result<RemoteException, ReconstructionError> {
        if !is_error_status(status) {
            return Err(ReconstructionError::NotAnErrorStatus(status.as_u16()));
        }

        let exception_id = body.exception_id().as_str();
        let Some(constructor) = self
            .registry
            .lookup_by_exception_id(exception_id, status)
            .and_then(|mapping| mapping.constructor())
        else {
            return Ok(self.fall_back(body, status));
        };

        if let Some(diff) = self.registry.key_diff(exception_id, body.data()) {
            return Err(ReconstructionError::DataShape {
                exception_id: body.exception_id().to_string(),
                missing: diff.missing,
                unexpected: diff.unexpected,
            });
        }

        let error = constructor
            .construct(body, status)
            .map_err(|source| ReconstructionError::Constructor {
                exception_id: body.exception_id().to_string(),
                source,
            })?;
        Ok(RemoteException::Mapped {
            status_code: status,
            exception_id: body.exception_id().clone(),
            error,
        })
    }

    /// Parses raw bytes, then translates. Malformed payloads are never
    /// passed to a constructor.
    pub fn translate_wire(
        &self,
        bytes: &[u8],
        status: StatusCode,
    ) -> Result<RemoteException, ClientError> {
        let body = ErrorBody::from_wire(bytes)?;
        Ok(self.translate(&body, status)?)
    }

    pub fn translate_value(
        &self,
        value: &Value,
        status: StatusCode,
    ) -> Result<RemoteException, ClientError> {
        let body = ErrorBody::from_value(value)?;
        Ok(self.translate(&body, status)?)
    }
}

impl fmt::Debug for ClientTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientTranslator")
            .field("registry", &self.registry)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FactoryError, MalformedBody};
    use crate::mapping::{ExceptionMapping, Reconstruct, from_data};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Deserialize, thiserror::Error)]
    #[error("order {order} was rejected")]
    #[serde(deny_unknown_fields)]
    struct OrderRejected {
        order: String,
    }

    impl Reconstruct for OrderRejected {
        fn reconstruct(body: &ErrorBody, _status: StatusCode) -> Result<Self, FactoryError> {
            from_data(body)
        }
    }

    fn translator() -> ClientTranslator {
        let registry = MappingRegistry::build([
            ExceptionMapping::builder(StatusCode::UNPROCESSABLE_ENTITY, "orderRejected")
                .reconstructs::<OrderRejected>()
                .data_keys(["order"])
                .build(),
            ExceptionMapping::builder(StatusCode::BAD_REQUEST, "looseOrder")
                .reconstructs::<OrderRejected>()
                .build(),
        ])
        .unwrap();
        ClientTranslator::new(Arc::new(registry))
    }

    fn body(id: &str, data: Value) -> ErrorBody {
        ErrorBody::validate(&json!({"exception_id": id, "description": "desc", "data": data}))
            .unwrap()
    }

    #[test]
    fn mapped_body_is_reconstructed() {
        let remote = translator()
            .translate(
                &body("orderRejected", json!({"order": "A-1"})),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .unwrap();
        assert!(remote.is_mapped());
        assert_eq!(remote.exception_id(), "orderRejected");
        assert_eq!(remote.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            remote.downcast_ref::<OrderRejected>(),
            Some(&OrderRejected { order: "A-1".into() })
        );
        assert_eq!(remote.to_string(), "order A-1 was rejected");
        let rejected = remote.downcast::<OrderRejected>().unwrap();
        assert_eq!(rejected.order, "A-1");
    }

    #[test]
    fn unknown_id_is_unmapped_with_fields_unchanged() {
        let received = body("somethingElse", json!({"k": [1, 2]}));
        let remote = translator()
            .translate(&received, StatusCode::SERVICE_UNAVAILABLE)
            .unwrap();
        let unmapped = remote.as_unmapped().unwrap();
        assert_eq!(unmapped.exception_id(), received.exception_id());
        assert_eq!(unmapped.description(), received.description());
        assert_eq!(unmapped.data(), received.data());
        assert_eq!(unmapped.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!unmapped.is_unexpected());
        assert!(remote.downcast_ref::<OrderRejected>().is_none());
    }

    #[test]
    fn known_id_at_other_status_is_unmapped() {
        let remote = translator()
            .translate(&body("orderRejected", json!({"order": "A-1"})), StatusCode::CONFLICT)
            .unwrap();
        assert!(!remote.is_mapped());
    }

    #[test]
    fn fallback_body_is_reported_as_unexpected() {
        let remote = translator()
            .translate(
                &body(FALLBACK_EXCEPTION_ID, json!({})),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .unwrap();
        assert!(remote.as_unmapped().unwrap().is_unexpected());
        assert_eq!(remote.to_string(), "500 unexpectedError: desc");
    }

    #[test]
    fn data_shape_mismatch_is_a_reconstruction_error() {
        let err = translator()
            .translate(
                &body("orderRejected", json!({"order": "A-1", "note": "x"})),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .unwrap_err();
        match err {
            ReconstructionError::DataShape {
                missing, unexpected, ..
            } => {
                assert!(missing.is_empty());
                assert_eq!(unexpected, vec!["note".to_owned()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn constructor_failure_is_a_reconstruction_error() {
        // No declared keys, so the constructor sees the bad data.
        let err = translator()
            .translate(&body("looseOrder", json!({"order": 5})), StatusCode::BAD_REQUEST)
            .unwrap_err();
        assert!(matches!(err, ReconstructionError::Constructor { .. }));
    }

    #[test]
    fn malformed_wire_is_never_reconstructed() {
        let translator = translator();
        let err = translator
            .translate_wire(
                br#"{"exception_id":"orderRejected","description":"d"}"#,
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .unwrap_err();
        assert!(matches!(err, ClientError::Malformed(MalformedBody::Schema(_))));

        let err = translator
            .translate_wire(b"<html>", StatusCode::BAD_GATEWAY)
            .unwrap_err();
        assert!(matches!(err, ClientError::Malformed(MalformedBody::Json(_))));
    }

    #[test]
    fn non_error_status_is_rejected() {
        assert!(matches!(
            translator().translate(&body("orderRejected", json!({"order": "A"})), StatusCode::OK),
            Err(ReconstructionError::NotAnErrorStatus(200))
        ));
    }

    #[test]
    fn translate_value_validates_first() {
        let translator = translator();
        let remote = translator
            .translate_value(
                &json!({
                    "exception_id": "orderRejected",
                    "description": "d",
                    "data": {"order": "B"}
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .unwrap();
        assert_eq!(remote.downcast_ref::<OrderRejected>().unwrap().order, "B");

        let err = translator
            .translate_value(&json!({"exception_id": "orderRejected"}), StatusCode::BAD_REQUEST)
            .unwrap_err();
        assert!(matches!(err, ClientError::Malformed(MalformedBody::Schema(_))));
    }

    #[test]
    fn into_error_keeps_the_inner_error() {
        let translator = translator();
        let mapped = translator
            .translate(&body("looseOrder", json!({"order": "C"})), StatusCode::BAD_REQUEST)
            .unwrap()
            .into_error();
        assert_eq!(mapped.downcast_ref::<OrderRejected>().unwrap().order, "C");

        let unmapped = translator
            .translate(&body("otherThing", json!({})), StatusCode::BAD_GATEWAY)
            .unwrap()
            .into_error();
        let unmapped = unmapped.downcast_ref::<UnmappedError>().unwrap();
        assert_eq!(unmapped.exception_id(), "otherThing");
    }

    #[derive(Debug, thiserror::Error)]
    #[error("remote failure {status}: {exception_id}")]
    struct RemoteFailure {
        status: u16,
        exception_id: String,
    }

    #[test]
    fn fallback_constructor_replaces_unmapped() {
        let registry = MappingRegistry::build([
            ExceptionMapping::builder(StatusCode::UNPROCESSABLE_ENTITY, "orderRejected")
                .reconstructs::<OrderRejected>()
                .data_keys(["order"])
                .build(),
            // Server-only rule: no constructor.
            ExceptionMapping::builder(StatusCode::CONFLICT, "serverOnly")
                .exception_with::<RemoteFailure, _, _>(|e| e.to_string(), |_| Ok(json!({})))
                .build(),
        ])
        .unwrap();
        let translator = ClientTranslator::new(Arc::new(registry)).with_fallback(|body, status| {
            RemoteFailure {
                status: status.as_u16(),
                exception_id: body.exception_id().to_string(),
            }
        });

        for (id, status) in [("neverDeclared", 503), ("serverOnly", 409)] {
            let status = StatusCode::from_u16(status).unwrap();
            let remote = translator.translate(&body(id, json!({})), status).unwrap();
            assert!(!remote.is_mapped());
            assert!(remote.as_unmapped().is_none());
            assert_eq!(remote.exception_id(), id);
            assert_eq!(remote.status_code(), status);
            let failure = remote.downcast::<RemoteFailure>().unwrap();
            assert_eq!(failure.status, status.as_u16());
            assert_eq!(failure.exception_id, id);
        }

        // Mapped ids still go through their own constructor.
        let remote = translator
            .translate(
                &body("orderRejected", json!({"order": "D"})),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .unwrap();
        assert!(remote.is_mapped());
        assert!(format!("{translator:?}").contains("fallback: true"));
    }

    #[test]
    fn undeclared_rule_is_held_to_the_keys_of_its_id() {
        let registry = MappingRegistry::build([
            ExceptionMapping::builder(StatusCode::NOT_FOUND, "orderMissing")
                .reconstructs::<OrderRejected>()
                .data_keys(["order"])
                .build(),
            ExceptionMapping::builder(StatusCode::GONE, "orderMissing")
                .reconstructs::<OrderRejected>()
                .build(),
        ])
        .unwrap();
        let translator = ClientTranslator::new(Arc::new(registry));
        let err = translator
            .translate(&body("orderMissing", json!({"foo": 1})), StatusCode::GONE)
            .unwrap_err();
        match err {
            ReconstructionError::DataShape {
                missing, unexpected, ..
            } => {
                assert_eq!(missing, ["order"]);
                assert_eq!(unexpected, ["foo"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
