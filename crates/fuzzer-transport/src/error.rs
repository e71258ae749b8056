use thiserror::Error;

/// Failure talking to the inference oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// Connection, DNS, TLS or client-side timeout failure.
    #[error("inference oracle unavailable: {0}")]
    Unavailable(String),
    /// The oracle answered with no usable completion.
    #[error("inference oracle returned no completion")]
    EmptyCompletion,
    /// Non-success HTTP status, with the upstream body verbatim.
    #[error("inference oracle error (status {status}): {body}")]
    Status { status: u16, body: String },
    /// The response body could not be decoded.
    #[error("malformed inference oracle response: {0}")]
    Malformed(String),
}

impl OracleError {
    /// Upstream HTTP status, when the oracle answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            OracleError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
