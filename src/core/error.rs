use thiserror::Error;

/// Errors that can occur while loading a scenario or running the cell
#[derive(Debug, Error)]
pub enum CellError {
    /// Scenario document missing, malformed, or inconsistent. Fatal before any unit runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Lookup of an unknown product, equipment, or sensor
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// No operational equipment left to run a unit
    #[error("no operational robots available for unit {unit}")]
    ResourceExhausted { unit: u32 },

    /// The orchestrator was asked to move backwards or skip a phase
    #[error("invalid orchestrator transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: crate::core::execution::orchestrator::OrchestratorPhase,
        to: crate::core::execution::orchestrator::OrchestratorPhase,
    },

    /// A production state counter would break its bounds
    #[error("production state invariant violated: {0}")]
    InvariantViolation(String),

    /// The run was stopped through its cancellation token
    #[error("run cancelled after {completed_units} unit(s)")]
    Cancelled { completed_units: u32 },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CellError {
    /// Build a `NotFound` error for the given lookup kind
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        CellError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Whether the run may continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CellError::NotFound { .. } | CellError::ResourceExhausted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(CellError::not_found("product", "Widget-Z").is_recoverable());
        assert!(CellError::ResourceExhausted { unit: 3 }.is_recoverable());
        assert!(!CellError::Configuration("missing products".into()).is_recoverable());
        assert!(!CellError::Cancelled { completed_units: 2 }.is_recoverable());
    }

    #[test]
    fn test_not_found_message() {
        let err = CellError::not_found("equipment", "robot_9");
        assert_eq!(err.to_string(), "equipment 'robot_9' not found");
    }
}
