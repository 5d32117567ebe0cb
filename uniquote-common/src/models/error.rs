use alloy::primitives::Address;
use thiserror::Error;

use crate::models::ProtocolVersion;

/// Errors surfaced by the quoting engine and its collaborators.
///
/// A reverted call inside a batch is not an error: the executor reports it with
/// `success = false` and the route is dropped silently.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoterError {
    /// Invalid or missing setup input. Raised while building an engine, never by the pipeline.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Every candidate route was pruned, the pair has no liquidity for the request.
    #[error("No routes found for {from} > {to}")]
    RouteNotFound { from: Address, to: Address },

    /// The batch itself could not be completed. Not retried at this layer.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// A call result reached a decoder that does not understand its protocol version.
    #[error("Unsupported protocol version {version} for method {method}")]
    UnsupportedVersion { version: ProtocolVersion, method: String },

    #[error("Invalid trade amount: {0}")]
    InvalidAmount(String),
}
