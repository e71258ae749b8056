use thiserror::Error;

/// Input rejected before any external call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("no contract source provided")]
    EmptySource,
    #[error("no invariants selected")]
    NoInvariants,
    #[error("invariant #{position} is empty")]
    EmptyInvariant { position: usize },
    #[error("invariant positions are 1-based, got 0")]
    ZeroPosition,
}
