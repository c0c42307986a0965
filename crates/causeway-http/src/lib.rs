//! causeway HTTP: transport shims around `causeway-core`.
//!
//! - `server` feature: axum responses and an error-translating middleware
//! - `client` feature: turns reqwest error responses into remote exceptions
//!
//! Both only go through the core's public contract.

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "server")]
pub mod response;

#[cfg(feature = "client")]
pub use client::{ResponseError, ResponseTranslator};
#[cfg(feature = "server")]
pub use response::{HttpException, Raised, Respond, translate_errors};
