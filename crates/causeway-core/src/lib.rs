//! # causeway-core
//!
//! Transport-agnostic translation between server-side errors and a canonical
//! HTTP error body, and back again on the client.
//!
//! Rules are declared once, collected into a [`MappingRegistry`] and shared
//! by a [`ServerTranslator`] and a [`ClientTranslator`]:
//!
//! ```
//! use std::sync::Arc;
//!
//! use causeway_core::{
//!     ClientTranslator, ErrorBody, Exception, ExceptionMapping, FactoryError, MappingRegistry,
//!     Reconstruct, ServerTranslator, StatusCode, from_data,
//! };
//! use serde_json::{Value, json};
//!
//! #[derive(Debug, serde::Deserialize, thiserror::Error)]
//! #[error("no item {id}")]
//! struct NotFound {
//!     id: String,
//! }
//!
//! impl Exception for NotFound {
//!     fn data(&self) -> Result<Value, FactoryError> {
//!         Ok(json!({ "id": self.id }))
//!     }
//! }
//!
//! impl Reconstruct for NotFound {
//!     fn reconstruct(body: &ErrorBody, _status: StatusCode) -> Result<Self, FactoryError> {
//!         from_data(body)
//!     }
//! }
//!
//! let registry = Arc::new(MappingRegistry::build([
//!     ExceptionMapping::builder(StatusCode::NOT_FOUND, "resourceNotFound")
//!         .exception::<NotFound>()
//!         .reconstructs::<NotFound>()
//!         .data_keys(["id"])
//!         .build(),
//! ])?);
//!
//! let server = ServerTranslator::new(Arc::clone(&registry));
//! let client = ClientTranslator::new(registry);
//!
//! let wire = server
//!     .translate(&NotFound { id: "7".into() }, StatusCode::NOT_FOUND)?
//!     .to_wire_vec();
//! let remote = client.translate_wire(&wire, StatusCode::NOT_FOUND)?;
//! assert_eq!(remote.downcast_ref::<NotFound>().map(|e| e.id.as_str()), Some("7"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod body;
pub mod client;
pub mod error;
pub mod mapping;
pub mod registry;
pub mod schema;
pub mod server;

pub use body::{BODY_FIELDS, EXCEPTION_ID_PATTERN, ErrorBody, ExceptionId};
pub use client::{ClientTranslator, RemoteException, UnmappedError};
pub use error::{
    ClientError, ConfigurationError, FactoryError, MalformedBody, ReconstructionError,
    SchemaViolation, TranslationError,
};
pub use http::StatusCode;
pub use mapping::{
    BoxError, Exception, ExceptionClass, ExceptionIdentity, ExceptionMapping, MappingBuilder,
    Reconstruct, data_from, from_data,
};
pub use registry::MappingRegistry;
pub use schema::{error_body_schema, exception_body_schema};
pub use server::{FALLBACK_DESCRIPTION, FALLBACK_EXCEPTION_ID, FallbackBody, ServerTranslator};

/// Whether `status` is a client (4xx) or server (5xx) error.
pub fn is_error_status(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}
