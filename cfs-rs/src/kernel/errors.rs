use crate::training::Class;
use core::fmt;

/// Validation errors raised at construction time or when reading a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required input is empty.
    EmptyInput {
        /// Name of the argument that is empty.
        arg: &'static str,
    },
    /// A configuration argument value is invalid.
    InvalidArgument {
        /// Name of the argument.
        arg: &'static str,
        /// Human readable reason.
        reason: &'static str,
    },
    /// Element count did not match the declared shape.
    LengthMismatch {
        /// Name of the argument.
        arg: &'static str,
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyInput { arg } => write!(f, "Input `{arg}` was empty."),
            ConfigError::InvalidArgument { arg, reason } => {
                write!(f, "Invalid argument `{arg}`: {reason}")
            }
            ConfigError::LengthMismatch { arg, expected, got } => {
                write!(
                    f,
                    "Length mismatch on `{arg}`. Expected {expected}, got {got}."
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Why a training signal was not accepted.
///
/// None of these leave a mark on the trainer: a rejected add never mutates
/// either training set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The signal could not be read at all.
    Input(ConfigError),
    /// The signal cannot be reduced to the canonical shape.
    ShapeInfeasible {
        /// Canonical shape of the trainer.
        expected: Vec<usize>,
        /// Shape of the rejected signal.
        got: Vec<usize>,
    },
    /// The aligned signal is already stored in one of the training sets.
    Duplicate {
        /// Set holding the matching signal.
        class: Class,
        /// Position of the matching signal within that set.
        index: usize,
    },
}

impl From<ConfigError> for Rejection {
    fn from(value: ConfigError) -> Self {
        Self::Input(value)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Input(err) => write!(f, "{err}"),
            Rejection::ShapeInfeasible { expected, got } => {
                write!(
                    f,
                    "Signal of shape {got:?} cannot be aligned to canonical shape {expected:?}."
                )
            }
            Rejection::Duplicate { class, index } => {
                write!(f, "Signal duplicates {class} example #{index}.")
            }
        }
    }
}

impl std::error::Error for Rejection {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Rejection::Input(err) => Some(err),
            Rejection::ShapeInfeasible { .. } | Rejection::Duplicate { .. } => None,
        }
    }
}

/// Failures of filter synthesis.
///
/// A failed synthesis leaves the training sets and any previously trained
/// filter untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainError {
    /// Synthesis needs at least one authentic example.
    NoAuthentic,
    /// The regularized operator or the constraint system is singular.
    IllConditioned {
        /// Human readable reason.
        reason: &'static str,
    },
    /// The frequency-domain transform rejected its input.
    Transform(cfs_rs_core::Error),
}

impl From<cfs_rs_core::Error> for TrainError {
    fn from(value: cfs_rs_core::Error) -> Self {
        Self::Transform(value)
    }
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::NoAuthentic => {
                write!(f, "Training requires at least one authentic signal.")
            }
            TrainError::IllConditioned { reason } => {
                write!(f, "Ill-conditioned filter synthesis: {reason}")
            }
            TrainError::Transform(err) => write!(f, "Transform failure: {err}"),
        }
    }
}

impl std::error::Error for TrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrainError::Transform(err) => Some(err),
            TrainError::NoAuthentic | TrainError::IllConditioned { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_messages_name_the_cause() {
        let dup = Rejection::Duplicate {
            class: Class::Impostor,
            index: 2,
        };
        assert_eq!(dup.to_string(), "Signal duplicates impostor example #2.");

        let shape = Rejection::ShapeInfeasible {
            expected: vec![4, 4],
            got: vec![3, 8],
        };
        assert_eq!(
            shape.to_string(),
            "Signal of shape [3, 8] cannot be aligned to canonical shape [4, 4]."
        );
    }

    #[test]
    fn config_error_converts_into_rejection() {
        let rejection = Rejection::from(ConfigError::EmptyInput { arg: "signal" });
        assert_eq!(rejection.to_string(), "Input `signal` was empty.");
        assert!(std::error::Error::source(&rejection).is_some());
    }
}
