use std::{error, fmt};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by grainshift.
#[derive(Debug)]
pub enum Error {
    ParameterError(String),
    NotInitialized,
    BufferSizeError { expected: usize, actual: usize },
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
            Self::NotInitialized => {
                write!(f, "Processing stage is not initialized")
            }
            Self::BufferSizeError { expected, actual } => {
                write!(
                    f,
                    "Unexpected buffer size: expected {expected} samples, got {actual}"
                )
            }
        }
    }
}
