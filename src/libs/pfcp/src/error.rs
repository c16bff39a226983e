//! PFCP codec errors

use thiserror::Error;

/// Errors raised while encoding or decoding PFCP messages
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PfcpError {
    #[error("buffer too short: needed {needed} bytes, {available} available")]
    BufferTooShort { needed: usize, available: usize },

    #[error("PFCP version {0} not supported")]
    VersionNotSupported(u8),

    #[error("invalid PFCP message type: {0}")]
    InvalidMessageType(u8),

    #[error("invalid cause value: {0}")]
    InvalidCause(u8),

    #[error("invalid interface value: {0}")]
    InvalidInterfaceValue(u8),

    #[error("mandatory IE missing: {0}")]
    MissingMandatoryIe(&'static str),

    #[error("malformed IE payload: {0}")]
    MalformedIe(&'static str),
}

pub type PfcpResult<T> = Result<T, PfcpError>;
