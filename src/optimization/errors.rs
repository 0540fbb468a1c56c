use argmin::core::{ArgminError, Error};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

/// Result alias for the convergence-speed solver.
pub type SolverResult<T> = Result<T, SolverError>;

#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    // ---- SpeedBounds ----
    /// Speed bounds must be finite with `0 <= lower < upper <= 1`.
    InvalidBounds { lower: f64, upper: f64, reason: &'static str },

    // ---- SolverOptions ----
    /// Root tolerance needs to be positive and finite.
    InvalidTolerance { tol: f64, reason: &'static str },

    /// Maximum iterations needs to be positive.
    InvalidMaxIter { max_iter: u64, reason: &'static str },

    // ---- Target function ----
    /// Target function returned a non-finite value.
    NonFiniteTarget { speed: f64, value: f64 },

    // ---- Solver outcome ----
    /// Target stays negative at the upper bound, so no feasible speed exists.
    NoFeasibleSpeed { upper: f64, margin: f64 },

    /// Root-finder terminated without a parameter.
    MissingRoot,

    // ---- Argmin ---
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter { text: String },
    /// Wrapper for argmin::NotImplemented
    NotImplemented { text: String },
    /// Wrapper for argmin::NotInitialized
    NotInitialized { text: String },
    /// Wrapper for argmin::ConditionViolated
    ConditionViolated { text: String },
    /// Wrapper for argmin::CheckPointNotFound
    CheckPointNotFound { text: String },
    /// Wrapper for argmin::PotentialBug
    PotentialBug { text: String },
    /// Wrapper for argmin::ImpossibleError
    ImpossibleError { text: String },
    /// Wrapper for other argmin::Error types
    BackendError { text: String },

    // ---- Fallback ----
    UnknownError,
}

impl SolverError {
    /// True for errors caused by caller configuration rather than numerics.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SolverError::InvalidBounds { .. }
                | SolverError::InvalidTolerance { .. }
                | SolverError::InvalidMaxIter { .. }
        )
    }
}

impl std::error::Error for SolverError {}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- SpeedBounds ----
            SolverError::InvalidBounds { lower, upper, reason } => {
                write!(f, "Invalid speed bounds [{lower}, {upper}]: {reason}")
            }

            // ---- SolverOptions ----
            SolverError::InvalidTolerance { tol, reason } => {
                write!(f, "Invalid root tolerance {tol}: {reason}")
            }
            SolverError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }

            // ---- Target function ----
            SolverError::NonFiniteTarget { speed, value } => {
                write!(f, "Non-finite target value {value} at speed {speed}")
            }

            // ---- Solver outcome ----
            SolverError::NoFeasibleSpeed { upper, margin } => {
                write!(f, "No feasible speed up to {upper}: margin at upper bound is {margin}")
            }
            SolverError::MissingRoot => {
                write!(f, "Root-finder terminated without a parameter")
            }

            // ---- Argmin ----
            SolverError::InvalidParameter { text } => {
                write!(f, "Invalid parameter: {text}")
            }
            SolverError::NotImplemented { text } => {
                write!(f, "Not implemented: {text}")
            }
            SolverError::NotInitialized { text } => {
                write!(f, "Not initialized: {text}")
            }
            SolverError::ConditionViolated { text } => {
                write!(f, "Condition violated: {text}")
            }
            SolverError::CheckPointNotFound { text } => {
                write!(f, "Checkpoint not found: {text}")
            }
            SolverError::PotentialBug { text } => {
                write!(f, "Potential bug: {text}")
            }
            SolverError::ImpossibleError { text } => {
                write!(f, "Impossible error: {text}")
            }
            SolverError::BackendError { text } => {
                write!(f, "Backend error: {text}")
            }

            // ---- Fallback ----
            SolverError::UnknownError => {
                write!(f, "Unknown error")
            }
        }
    }
}

impl From<Error> for SolverError {
    fn from(original_err: Error) -> Self {
        let original_err = match original_err.downcast::<SolverError>() {
            Ok(solver_err) => return solver_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => SolverError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => SolverError::NotImplemented { text },
                ArgminError::NotInitialized { text } => SolverError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => SolverError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => {
                    SolverError::CheckPointNotFound { text }
                }
                ArgminError::PotentialBug { text } => SolverError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => SolverError::ImpossibleError { text },
                _ => SolverError::UnknownError,
            },
            Err(err) => SolverError::BackendError { text: err.to_string() },
        }
    }
}

#[cfg(feature = "python-bindings")]
impl std::convert::From<SolverError> for PyErr {
    fn from(err: SolverError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Verify that a `SolverError` raised inside a cost function survives the
    // round trip through `argmin::core::Error`.
    //
    // Given
    // -----
    // - `SolverError::NonFiniteTarget` converted into an argmin error.
    //
    // Expect
    // ------
    // - Converting back yields the same variant and fields.
    fn solver_error_round_trips_through_argmin() {
        // Arrange
        let original = SolverError::NonFiniteTarget { speed: 0.5, value: f64::INFINITY };
        let wrapped: Error = original.clone().into();

        // Act
        let back = SolverError::from(wrapped);

        // Assert
        assert_eq!(back, original);
    }

    #[test]
    // Purpose
    // -------
    // Ensure argmin's own error kinds map onto the wrapper variants.
    //
    // Given
    // -----
    // - An `ArgminError::InvalidParameter` wrapped in `argmin::core::Error`.
    //
    // Expect
    // ------
    // - Conversion produces `SolverError::InvalidParameter` with the same text.
    fn argmin_errors_map_to_wrappers() {
        // Arrange
        let wrapped: Error =
            ArgminError::InvalidParameter { text: "bad bracket".to_string() }.into();

        // Act
        let err = SolverError::from(wrapped);

        // Assert
        assert_eq!(err, SolverError::InvalidParameter { text: "bad bracket".to_string() });
        assert!(!err.is_configuration());
    }
}
