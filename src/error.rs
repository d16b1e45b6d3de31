use thiserror::Error;

use crate::decline::FitResult;

/// Error types for the decline-fit library.
#[derive(Error, Debug)]
pub enum DeclineError {
    /// A rate, decline rate, curvature, elapsed time or time grid outside its domain.
    #[error("Invalid parameter value: {0}")]
    InvalidParameter(String),

    /// Invalid input data or configuration.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Singular normal equations or a damping factor that ran out of range.
    ///
    /// Raised inside the solver and absorbed there; callers of the fitter only
    /// ever see it folded into [`DeclineError::FitFailed`].
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// The solver broke down or produced parameters outside the model domain.
    #[error("Fit failed: {reason}")]
    FitFailed {
        /// What went wrong
        reason: String,
        /// Best estimate the solver reached, always with `converged == false`
        estimate: Box<FitResult>,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for decline-fit operations.
pub type Result<T> = std::result::Result<T, DeclineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeclineError::InvalidParameter("decline rate must be positive".to_string());
        assert!(format!("{}", err).contains("decline rate must be positive"));

        let err = DeclineError::DimensionMismatch("expected 2 parameters, got 1".to_string());
        assert!(format!("{}", err).contains("expected 2 parameters, got 1"));
    }

    #[test]
    fn test_fit_failed_keeps_estimate() {
        let estimate = FitResult {
            decline_rate: -0.2,
            curvature: None,
            converged: false,
            iterations: 7,
            cost: 12.5,
        };
        let err = DeclineError::FitFailed {
            reason: "decline rate left its domain".to_string(),
            estimate: Box::new(estimate),
        };

        assert!(format!("{}", err).contains("decline rate left its domain"));
        match err {
            DeclineError::FitFailed { estimate, .. } => {
                assert_eq!(estimate.iterations, 7);
                assert!(!estimate.converged);
            }
            _ => panic!("Expected FitFailed variant"),
        }
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<f64>("not a number").unwrap_err();
        let err: DeclineError = json_err.into();

        match err {
            DeclineError::JsonError(_) => (),
            _ => panic!("Expected JsonError variant"),
        }
    }
}
