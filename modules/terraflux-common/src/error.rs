use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum TerrafluxError {
    /// Bad input shape or value domain on a write. Carries every violated
    /// field, not just the first.
    #[error("validation failed: {}", violations.join("; "))]
    Validation { violations: Vec<String> },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    /// Delete rejected while other records still reference the target.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream provider error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl TerrafluxError {
    pub fn validation(violations: Vec<String>) -> Self {
        Self::Validation { violations }
    }

    pub fn not_found(kind: &'static str, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_violation() {
        let err = TerrafluxError::validation(vec![
            "name must not be empty".to_string(),
            "capacity_tonnes_co2 must be non-negative".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("name must not be empty"));
        assert!(msg.contains("capacity_tonnes_co2 must be non-negative"));
    }

    #[test]
    fn not_found_names_the_resource() {
        let id = Uuid::new_v4();
        let err = TerrafluxError::not_found("intervention", id);
        assert_eq!(err.to_string(), format!("intervention {id} not found"));
    }
}
