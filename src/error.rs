use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Failures of the chat and toggle core.
///
/// Duplicate toggle rows from racing requests are not represented here: the
/// store refuses them at insert time and the next toggle sees a single row.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("persistence failed: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("missing verified actor identity")]
    Unauthorized,
}

impl CoreError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Short machine-readable label used on the socket protocol.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Persistence(_) => "persistence",
            Self::Unauthorized => "unauthorized",
        }
    }
}

/// Rejects empty or whitespace-only strings.
pub(crate) fn require_non_empty(field: &'static str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(field, "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_rejected() {
        let err = require_non_empty("room", "   ").unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.to_string(), "invalid room: must not be empty");
        assert!(require_non_empty("room", "general").is_ok());
    }
}
