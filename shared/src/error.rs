//! Engine error taxonomy
//!
//! Only `PreconditionNotMet` is fatal, and then only to the `start()` call
//! that raised it. The rest are surfaced as status lines and consume at most
//! one target each; a run reaches completion regardless.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("simulation cannot start: {0}")]
    PreconditionNotMet(String),

    #[error("partition service returned no usable partitions: {0}")]
    PartitionUnavailable(String),

    #[error("drone assignment request failed: {0}")]
    DispatchRequestFailed(String),

    #[error("no travel path available: {0}")]
    PathUnavailable(String),

    #[error("malformed target file: {0}")]
    MalformedTargetFile(String),
}

impl EngineError {
    /// Whether the run can continue past this error by skipping the current
    /// target
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::PreconditionNotMet(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_precondition_is_fatal() {
        assert!(!EngineError::PreconditionNotMet("no targets".into()).is_recoverable());
        assert!(EngineError::DispatchRequestFailed("500".into()).is_recoverable());
        assert!(EngineError::PathUnavailable("empty".into()).is_recoverable());
        assert!(EngineError::PartitionUnavailable("none".into()).is_recoverable());
        assert!(EngineError::MalformedTargetFile("junk".into()).is_recoverable());
    }
}
