//! Error taxonomy for the workflow trigger handler.
//!
//! Only [`ConnectionError`] is fatal: the process cannot do anything useful
//! without a broker. Every other error is scoped to one message or one
//! outbound call and is logged and absorbed by the caller.
//!
//! | Error | Scope | Handling |
//! |-------|-------|----------|
//! | [`ConnectionError`] | Process | Retried up to a bound, then the process exits |
//! | [`BrokerError`] | One broker operation | Logged; connection errors feed the retry loop |
//! | [`CredentialError`] | One outbound call | Call aborted before any request is sent |
//! | [`ApiError`] | One outbound call | Logged; the message is still acknowledged |

use thiserror::Error;

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

/// A failed broker operation.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The connection could not be opened.
    #[error("Failed to connect to broker: {0}")]
    Connect(String),

    /// A channel could not be opened or topology could not be declared.
    #[error("Broker channel error: {0}")]
    Channel(String),

    /// The delivery stream reported an error or ended.
    #[error("Broker consume error: {0}")]
    Consume(String),

    /// Acknowledging a delivery failed.
    #[error("Failed to acknowledge message: {0}")]
    Ack(String),

    /// Publishing a message failed.
    #[error("Failed to publish to '{destination}': {reason}")]
    Publish {
        destination: String,
        reason: String,
    },
}

/// Bootstrap could not produce a broker connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Every attempt failed.
    #[error("Gave up connecting to broker after {attempts} attempts: {last_error}")]
    Exhausted {
        attempts: u32,
        /// The failure reported by the final attempt.
        last_error: BrokerError,
    },

    /// Shutdown was requested while waiting to retry.
    #[error("Broker connection cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

// ---------------------------------------------------------------------------
// Remote API
// ---------------------------------------------------------------------------

/// A signed credential could not be minted.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No signing key is configured.
    #[error("Token signing key is empty")]
    MissingSigningKey,

    /// The claims could not be signed.
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// A failed call to the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The call was aborted before sending because no credential could be minted.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The request could not be sent or the response could not be read.
    #[error("API transport error: {0}")]
    Transport(String),

    /// The API answered with a non-success HTTP status.
    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The API answered with GraphQL errors.
    #[error("API returned errors: {0}")]
    GraphQl(String),

    /// The response did not have the expected shape.
    #[error("Unexpected API response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Returns `true` if the call never left the process.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, ApiError::Credential(_))
    }
}
