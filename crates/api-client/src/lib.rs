//! Authenticated client for the remote workflow API.
//!
//! Implements the [`workflows::WorkflowApi`] trait over the API's GraphQL
//! endpoint.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Credential minting, header injection, HTTP transport,
//! and response decoding all live here. The `handler` crate sees only
//! [`workflows::WorkflowApi`].
//!
//! ## Request Path
//!
//! ```text
//! ApiClient::call(operation, variables)
//!   -> BearerAuth<T>      mints a fresh one-minute token, sets Authorization
//!     -> HttpTransport    POSTs the GraphQL request with reqwest
//! ```
//!
//! [`BearerAuth`] wraps any [`Transport`], so every call made through an
//! [`ApiClient`] carries its own credential. A token is never reused. If a
//! token cannot be minted the call fails with
//! [`workflows::ApiError::Credential`] and nothing is sent.
//!
//! Errors are returned to the caller unchanged; this crate never retries.

pub mod auth;
pub mod client;
pub mod credentials;
pub mod operations;
pub mod transport;

pub use auth::BearerAuth;
pub use client::{ApiClient, ApiConfig};
pub use credentials::{AdminClaims, CredentialConfig, SignedToken, TokenMinter, TOKEN_LIFETIME_SECONDS};
pub use operations::Operation;
pub use transport::{ApiRequest, GraphQlRequest, HttpTransport, Transport};
