//! axum side: error bodies as responses.
//!
//! Handlers either translate in place with [`Respond`], or return
//! [`Raised`] and let the [`translate_errors`] middleware do it:
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/items/{id}", get(item))
//!     .layer(axum::middleware::from_fn_with_state(translator, translate_errors));
//! ```

use std::error::Error;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use causeway_core::{
    BoxError, ErrorBody, FallbackBody, ServerTranslator, TranslationError, is_error_status,
};
use http::StatusCode;

/// An error body paired with the status it is sent with.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpException {
    status: StatusCode,
    body: ErrorBody,
}

impl HttpException {
    /// Pairs `body` with `status`.
    ///
    /// # Errors
    ///
    /// Fails when `status` is not 4xx/5xx.
    pub fn new(status: StatusCode, body: ErrorBody) -> Result<Self, TranslationError> {
        if !is_error_status(status) {
            return Err(TranslationError::NotAnErrorStatus(status.as_u16()));
        }
        Ok(Self::from_parts(status, body))
    }

    fn from_parts(status: StatusCode, body: ErrorBody) -> Self {
        debug_assert!(is_error_status(status));
        Self { status, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorBody {
        &self.body
    }

    pub fn into_body(self) -> ErrorBody {
        self.body
    }
}

impl IntoResponse for HttpException {
    fn into_response(self) -> Response {
        (self.status, Json(self.body.to_wire())).into_response()
    }
}

/// Translation straight into an [`HttpException`].
pub trait Respond {
    fn respond<E: Error + 'static>(&self, err: &E, status: StatusCode) -> HttpException;

    fn respond_dyn(&self, err: &(dyn Error + 'static), status: StatusCode) -> HttpException;
}

impl Respond for ServerTranslator {
    fn respond<E: Error + 'static>(&self, err: &E, status: StatusCode) -> HttpException {
        match self.translate(err, status) {
            Ok(body) => HttpException::from_parts(status, body),
            Err(e) => failed(self, &e),
        }
    }

    fn respond_dyn(&self, err: &(dyn Error + 'static), status: StatusCode) -> HttpException {
        match self.translate_dyn(err, status) {
            Ok(body) => HttpException::from_parts(status, body),
            Err(e) => failed(self, &e),
        }
    }
}

/// A response must still be sent: 500 with the fallback body.
fn failed(translator: &ServerTranslator, err: &TranslationError) -> HttpException {
    tracing::error!(error = %err, "error translation failed, answering with fallback body");
    HttpException::from_parts(StatusCode::INTERNAL_SERVER_ERROR, translator.fallback().to_body())
}

#[derive(Clone)]
struct RaisedError(Arc<dyn Error + Send + Sync>);

/// An error raised by a handler, translated later by [`translate_errors`].
///
/// Without the middleware the response carries the default fallback body.
#[derive(Debug, Clone)]
pub struct Raised {
    status: StatusCode,
    error: Arc<dyn Error + Send + Sync>,
}

impl Raised {
    /// `status` falls back to 500 when it is not an error status.
    pub fn new<E: Error + Send + Sync + 'static>(status: StatusCode, error: E) -> Self {
        Self {
            status,
            error: Arc::new(error),
        }
    }

    pub fn from_boxed(status: StatusCode, error: BoxError) -> Self {
        Self {
            status,
            error: Arc::from(error),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.error.as_ref()
    }
}

impl IntoResponse for Raised {
    fn into_response(self) -> Response {
        let status = if is_error_status(self.status) {
            self.status
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let mut response =
            HttpException::from_parts(status, FallbackBody::default().to_body()).into_response();
        response.extensions_mut().insert(RaisedError(self.error));
        response
    }
}

/// Middleware replacing [`Raised`] responses with their translated body.
///
/// Install with `axum::middleware::from_fn_with_state(translator, translate_errors)`.
pub async fn translate_errors(
    State(translator): State<ServerTranslator>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let raised = response.extensions_mut().remove::<RaisedError>();
    match raised {
        Some(RaisedError(error)) => translator
            .respond_dyn(&*error, response.status())
            .into_response(),
        None => response,
    }
}
