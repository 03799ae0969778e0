use thiserror::Error;

use crate::types::{CourseId, EdgeId, TopicId};

/// Engine-level failures. Non-fatal domain findings (weight sums drifting
/// from 1.0) are reported as [`crate::priority::WeightValidation`] values,
/// not errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("topic not found: {0}")]
    TopicNotFound(TopicId),
    #[error("course not found: {0}")]
    CourseNotFound(CourseId),
    #[error("dependency edge not found: {0}")]
    EdgeNotFound(EdgeId),
    #[error("invalid dependency edge: {0}")]
    InvalidEdge(#[from] EdgeViolation),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Rejected dependency mutations. Every insertion is validated in full
/// before the graph commits anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EdgeViolation {
    #[error("a topic cannot be its own prerequisite")]
    SelfDependency,
    #[error("dependency already exists")]
    DuplicateEdge,
    #[error("edge would create a circular dependency")]
    CycleDetected,
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_lowercase_and_stable() {
        assert_eq!(
            EngineError::TopicNotFound(42).to_string(),
            "topic not found: 42"
        );
        assert_eq!(
            EngineError::InvalidEdge(EdgeViolation::CycleDetected).to_string(),
            "invalid dependency edge: edge would create a circular dependency"
        );
        assert_eq!(
            EdgeViolation::SelfDependency.to_string(),
            "a topic cannot be its own prerequisite"
        );
    }

    #[test]
    fn edge_violation_converts_into_engine_error() {
        let err: EngineError = EdgeViolation::DuplicateEdge.into();
        assert_eq!(err, EngineError::InvalidEdge(EdgeViolation::DuplicateEdge));
    }
}
