//! reqwest side: error responses to remote exceptions.

use std::sync::Arc;

use causeway_core::{
    ClientError, ClientTranslator, MalformedBody, MappingRegistry, ReconstructionError,
    RemoteException, is_error_status,
};
use reqwest::Response;

/// Failure of [`ResponseTranslator::error_for_status`].
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("failed to read response: {0}")]
    Http(#[from] reqwest::Error),

    /// The error response does not carry a valid error body.
    #[error("status {status} response has a malformed error body: {source}")]
    Malformed {
        status: u16,
        #[source]
        source: MalformedBody,
    },

    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),

    /// The server answered with a well-formed error body.
    #[error("{0}")]
    Remote(RemoteException),
}

impl ResponseError {
    pub fn remote(&self) -> Option<&RemoteException> {
        match self {
            Self::Remote(remote) => Some(remote),
            _ => None,
        }
    }

    pub fn into_remote(self) -> Option<RemoteException> {
        match self {
            Self::Remote(remote) => Some(remote),
            _ => None,
        }
    }
}

/// Reads error responses with a [`ClientTranslator`].
#[derive(Debug, Clone)]
pub struct ResponseTranslator {
    translator: ClientTranslator,
}

impl ResponseTranslator {
    pub fn new(translator: ClientTranslator) -> Self {
        Self { translator }
    }

    pub fn from_registry(registry: Arc<MappingRegistry>) -> Self {
        Self::new(ClientTranslator::new(registry))
    }

    pub fn translator(&self) -> &ClientTranslator {
        &self.translator
    }

    /// The remote exception carried by `response`, or `None` when the status
    /// is not 4xx/5xx. Consumes the body either way.
    pub async fn get_error(
        &self,
        response: Response,
    ) -> Result<Option<RemoteException>, ResponseError> {
        if !is_error_status(response.status()) {
            return Ok(None);
        }
        self.read(response).await.map(Some)
    }

    /// Passes successful responses through and turns error responses into
    /// [`ResponseError::Remote`].
    pub async fn error_for_status(&self, response: Response) -> Result<Response, ResponseError> {
        if !is_error_status(response.status()) {
            return Ok(response);
        }
        Err(ResponseError::Remote(self.read(response).await?))
    }

    async fn read(&self, response: Response) -> Result<RemoteException, ResponseError> {
        let status = response.status();
        let bytes = response.bytes().await?;
        match self.translator.translate_wire(&bytes, status) {
            Ok(remote) => Ok(remote),
            Err(ClientError::Malformed(source)) => {
                tracing::debug!(status = status.as_u16(), error = %source, "malformed error body");
                Err(ResponseError::Malformed {
                    status: status.as_u16(),
                    source,
                })
            }
            Err(ClientError::Reconstruction(e)) => Err(e.into()),
        }
    }
}
