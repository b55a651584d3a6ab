//! Error types raised by the bridge itself
//!
//! Script exceptions and Python exceptions raised inside callbacks travel
//! through [`crate::exception`]; this module covers the failures the bridge
//! detects on its own (conversion, misuse, engine allocation).

use std::string::FromUtf8Error;

use pyo3::exceptions::{
    PyAttributeError, PyMemoryError, PyTypeError, PyUnicodeDecodeError, PyUnicodeError,
};
use pyo3::prelude::*;
use thiserror::Error;

use crate::exception::ScriptError;

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Failures detected by the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The engine refused to create a global context
    #[error("Context creation failed: {message}")]
    ContextCreation { message: String },

    /// Host text could not be turned into an engine string
    #[error("String encoding error: {0}")]
    Encoding(String),

    /// The engine produced bytes that are not valid UTF-8
    #[error("String decoding error: {0}")]
    Decode(#[from] FromUtf8Error),

    /// A conversion buffer could not be reserved
    #[error("Out of memory while converting a string")]
    OutOfMemory,

    /// Property access on the `null` proxy
    #[error("null has no properties")]
    NullObject,

    /// The wrapped engine object is not a function
    #[error("ScriptObject not callable")]
    NotCallable,

    /// Script functions only take positional arguments
    #[error("Keyword arguments are not supported")]
    KeywordArguments,

    /// Attribute lookup found nothing on either side
    #[error("ScriptObject has no property '{0}'")]
    MissingProperty(String),

    /// `eval()` was handed something other than text
    #[error("{0} is not a valid source value")]
    InvalidSource(String),
}

impl BridgeError {
    /// Create a context creation error
    pub fn context_creation(message: impl Into<String>) -> Self {
        Self::ContextCreation {
            message: message.into(),
        }
    }
}

impl From<BridgeError> for PyErr {
    fn from(err: BridgeError) -> Self {
        let message = err.to_string();
        match err {
            BridgeError::ContextCreation { .. } => PyErr::new::<ScriptError, _>(message),
            BridgeError::Encoding(_) => PyUnicodeError::new_err(message),
            BridgeError::Decode(source) => Python::with_gil(|py| {
                match PyUnicodeDecodeError::new_utf8_bound(py, source.as_bytes(), source.utf8_error())
                {
                    Ok(decode_error) => PyErr::from_value_bound(decode_error.into_any()),
                    Err(err) => err,
                }
            }),
            BridgeError::OutOfMemory => PyMemoryError::new_err(message),
            BridgeError::NullObject | BridgeError::NotCallable | BridgeError::KeywordArguments => {
                PyTypeError::new_err(message)
            }
            BridgeError::MissingProperty(_) => PyAttributeError::new_err(message),
            BridgeError::InvalidSource(_) => PyTypeError::new_err(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raised<T: pyo3::PyTypeInfo>(err: BridgeError) -> bool {
        Python::with_gil(|py| PyErr::from(err).is_instance_of::<T>(py))
    }

    #[test]
    fn test_context_creation_display() {
        let err = BridgeError::context_creation("engine returned null");
        assert_eq!(
            err.to_string(),
            "Context creation failed: engine returned null"
        );
        assert!(raised::<ScriptError>(err));
    }

    #[test]
    fn test_missing_property_display() {
        let err = BridgeError::MissingProperty("nope".into());
        assert_eq!(err.to_string(), "ScriptObject has no property 'nope'");
        assert!(raised::<PyAttributeError>(err));
    }

    #[test]
    fn test_call_errors_are_type_errors() {
        assert_eq!(
            BridgeError::KeywordArguments.to_string(),
            "Keyword arguments are not supported"
        );
        assert!(raised::<PyTypeError>(BridgeError::NotCallable));
        assert!(raised::<PyTypeError>(BridgeError::KeywordArguments));
        assert!(raised::<PyTypeError>(BridgeError::NullObject));
    }

    #[test]
    fn test_decode_error_from_utf8() {
        let err: BridgeError = String::from_utf8(vec![0x66, 0xff]).unwrap_err().into();
        assert!(matches!(err, BridgeError::Decode(_)));
        assert!(err.to_string().starts_with("String decoding error"));
        assert!(raised::<PyUnicodeDecodeError>(err));
    }

    #[test]
    fn test_invalid_source_display() {
        let err = BridgeError::InvalidSource("int".into());
        assert_eq!(err.to_string(), "int is not a valid source value");
        assert!(raised::<PyTypeError>(err));
    }

    #[test]
    fn test_allocation_errors() {
        assert!(raised::<PyMemoryError>(BridgeError::OutOfMemory));
        assert!(raised::<PyUnicodeError>(BridgeError::Encoding("lone surrogate".into())));
    }
}
