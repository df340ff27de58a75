//! Internal error types.
//!
//! Client-visible rejections are `ResponseCode` data and never travel
//! as `Err`. `CollaboratorError` covers unexpected failures of the
//! outbound ports; the router downgrades it to `FailInvalid` and it
//! never crosses the gateway boundary.

use thiserror::Error;

/// Unexpected failure of an outbound collaborator.
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    /// State View failed to produce a snapshot.
    #[error("state view error: {0}")]
    StateView(String),

    /// Consensus substrate handoff failed unexpectedly.
    #[error("consensus substrate error: {0}")]
    Substrate(String),

    /// Signature service failed (not an invalid signature).
    #[error("signature verifier error: {0}")]
    Verifier(String),

    /// Fee schedule lookup failed.
    #[error("fee schedule error: {0}")]
    FeeSchedule(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CollaboratorError::StateView("snapshot unavailable".into());
        assert_eq!(err.to_string(), "state view error: snapshot unavailable");
    }
}
