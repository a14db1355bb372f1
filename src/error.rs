use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Errors surfaced by the engine.
///
/// Structural input problems are fatal to a load; everything else is represented in evaluation results rather than
/// raised as errors.
#[derive(Debug, Eq, PartialEq)]
pub enum EngineError {
    InvalidAction(String),
    InvalidConditionOperator(String),
    InvalidPolicyVersion(String),
    InvalidPrincipal(String),
    InvalidResource(String),
    MalformedPolicy(String),
    SnapshotLoad(String),
    CatalogUnavailable(String),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::InvalidAction(action) => write!(f, "Invalid action: {}", action),
            Self::InvalidConditionOperator(operator) => write!(f, "Invalid condition operator: {}", operator),
            Self::InvalidPolicyVersion(version) => write!(f, "Invalid policy version: {}", version),
            Self::InvalidPrincipal(principal) => write!(f, "Invalid principal: {}", principal),
            Self::InvalidResource(resource) => write!(f, "Invalid resource: {}", resource),
            Self::MalformedPolicy(detail) => write!(f, "Malformed policy document: {}", detail),
            Self::SnapshotLoad(detail) => write!(f, "Failed to load snapshot: {}", detail),
            Self::CatalogUnavailable(detail) => write!(f, "Action catalog unavailable: {}", detail),
        }
    }
}

impl Error for EngineError {}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedPolicy(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::EngineError,
        pretty_assertions::{assert_eq, assert_ne},
    };

    #[test_log::test]
    fn test_display() {
        assert_eq!(EngineError::InvalidAction("foo".to_string()).to_string(), "Invalid action: foo");
        assert_eq!(EngineError::InvalidPrincipal("foo".to_string()).to_string(), "Invalid principal: foo");
        assert_eq!(EngineError::InvalidResource("foo".to_string()).to_string(), "Invalid resource: foo");
        assert_eq!(
            EngineError::MalformedPolicy("bad".to_string()).to_string(),
            "Malformed policy document: bad"
        );
        assert_eq!(EngineError::SnapshotLoad("bad".to_string()).to_string(), "Failed to load snapshot: bad");
    }

    #[test_log::test]
    fn test_eq() {
        assert_eq!(EngineError::InvalidAction("foo".to_string()), EngineError::InvalidAction("foo".to_string()));
        assert_ne!(EngineError::InvalidAction("foo".to_string()), EngineError::InvalidAction("bar".to_string()));
        assert_ne!(EngineError::InvalidAction("foo".to_string()), EngineError::InvalidResource("foo".to_string()));
    }

    #[test_log::test]
    fn test_from_serde() {
        let e = serde_json::from_str::<u32>("[]").unwrap_err();
        let engine_error = EngineError::from(e);
        assert!(matches!(engine_error, EngineError::MalformedPolicy(_)));
    }
}
