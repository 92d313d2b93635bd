use thiserror::Error;

use crate::value::ValueKind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("No input provided")]
    MissingInput,
    #[error("Expected {expected} argument, got {found}")]
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("Binding name must not be empty")]
    EmptyName,
    #[error("`{0}` is a reserved host identifier")]
    ReservedName(String),
    #[error("No binding registered under `{0}`")]
    UnknownBinding(String),
    #[error("Host namespace unavailable: {0}")]
    NamespaceUnavailable(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BridgeError {
    /// Short variant name, used as the `name` of errors thrown into the host.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeError::MissingInput => "MissingInput",
            BridgeError::TypeMismatch { .. } => "TypeMismatch",
            BridgeError::EmptyName => "EmptyName",
            BridgeError::ReservedName(_) => "ReservedName",
            BridgeError::UnknownBinding(_) => "UnknownBinding",
            BridgeError::NamespaceUnavailable(_) => "NamespaceUnavailable",
            BridgeError::InvalidConfig(_) => "InvalidConfig",
        }
    }

    /// The string older callers expect on the success channel.
    pub fn legacy_sentinel(&self) -> String {
        format!("Error: {self}")
    }
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_sentinel() {
        assert_eq!(
            BridgeError::MissingInput.legacy_sentinel(),
            "Error: No input provided"
        );
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = BridgeError::TypeMismatch {
            expected: ValueKind::String,
            found: ValueKind::Number,
        };
        assert_eq!(err.to_string(), "Expected string argument, got number");
        assert_eq!(err.name(), "TypeMismatch");
    }
}
