//! Error types for the RPC-4 protocol.

use thiserror::Error;

/// Errors that can occur when building protocol values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Outlet number outside the unit's 1..=8 range.
    #[error("invalid outlet {0}: must be between 1 and {max}", max = crate::OUTLET_COUNT)]
    InvalidOutlet(i64),

    /// Unrecognized outlet action keyword.
    #[error("invalid outlet action '{0}': expected 'on' or 'off'")]
    InvalidAction(String),
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
