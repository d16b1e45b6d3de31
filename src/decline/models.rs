//! Arps decline-rate functions.
//!
//! Three rate laws of elapsed time `t` (in periods since first production):
//!
//! * Exponential: `q(t) = qi * exp(-di * t)`
//! * Harmonic: `q(t) = qi / (1 + di * t)`
//! * Hyperbolic: `q(t) = qi / (1 + b * di * t)^(1 / b)`
//!
//! All three return `qi` at `t = 0` and are non-increasing for `di > 0`. The
//! hyperbolic law tends to the exponential one as `b -> 0` and equals the
//! harmonic one at `b = 1`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DeclineError, Result};

/// The functional form of a decline curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclineModelType {
    /// Constant percentage decline
    Exponential,
    /// Hyperbolic decline with `b = 1`
    Harmonic,
    /// General Arps decline with curvature `b`
    Hyperbolic,
}

impl DeclineModelType {
    /// Every model type, in menu order.
    pub const ALL: [DeclineModelType; 3] = [
        DeclineModelType::Exponential,
        DeclineModelType::Harmonic,
        DeclineModelType::Hyperbolic,
    ];

    /// Number of parameters a fit estimates (`qi` is always held fixed).
    pub fn free_parameter_count(&self) -> usize {
        match self {
            DeclineModelType::Hyperbolic => 2,
            DeclineModelType::Exponential | DeclineModelType::Harmonic => 1,
        }
    }

    /// Whether the model uses the curvature `b`.
    pub fn uses_curvature(&self) -> bool {
        matches!(self, DeclineModelType::Hyperbolic)
    }

    /// Lowercase name, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            DeclineModelType::Exponential => "exponential",
            DeclineModelType::Harmonic => "harmonic",
            DeclineModelType::Hyperbolic => "hyperbolic",
        }
    }

    /// Rate at elapsed time `t` for validated parameters.
    pub fn rate(&self, params: &ModelParameters, t: f64) -> Result<f64> {
        match self {
            DeclineModelType::Exponential => {
                exponential_rate(params.initial_rate, params.decline_rate, t)
            }
            DeclineModelType::Harmonic => {
                harmonic_rate(params.initial_rate, params.decline_rate, t)
            }
            DeclineModelType::Hyperbolic => {
                let b = params.curvature.ok_or_else(|| {
                    DeclineError::InvalidParameter(
                        "hyperbolic decline requires a curvature b".to_string(),
                    )
                })?;
                hyperbolic_rate(params.initial_rate, params.decline_rate, b, t)
            }
        }
    }
}

impl fmt::Display for DeclineModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeclineModelType {
    type Err = DeclineError;

    fn from_str(s: &str) -> Result<Self> {
        DeclineModelType::ALL
            .into_iter()
            .find(|model| model.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DeclineError::InvalidInput(format!("Unknown decline model '{}'", s)))
    }
}

/// Parameters of a decline curve.
///
/// `curvature` is only ever present for the hyperbolic model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Rate at time zero, `qi`
    pub initial_rate: f64,
    /// Nominal decline rate per period, `di`
    pub decline_rate: f64,
    /// Arps exponent `b`
    pub curvature: Option<f64>,
}

impl ModelParameters {
    /// Validate parameters for `model_type`.
    ///
    /// A curvature passed for the exponential or harmonic model is dropped
    /// rather than carried along.
    ///
    /// # Errors
    ///
    /// * `DeclineError::InvalidParameter` if `qi` or `di` is not finite and
    ///   positive, or the hyperbolic model gets a missing or non-positive `b`
    pub fn new(
        model_type: DeclineModelType,
        initial_rate: f64,
        decline_rate: f64,
        curvature: Option<f64>,
    ) -> Result<Self> {
        ensure_positive("initial rate qi", initial_rate)?;
        ensure_positive("decline rate di", decline_rate)?;

        let curvature = if model_type.uses_curvature() {
            let b = curvature.ok_or_else(|| {
                DeclineError::InvalidParameter(
                    "hyperbolic decline requires a curvature b".to_string(),
                )
            })?;
            ensure_positive("curvature b", b)?;
            Some(b)
        } else {
            None
        };

        Ok(Self {
            initial_rate,
            decline_rate,
            curvature,
        })
    }
}

pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DeclineError::InvalidParameter(format!(
            "{} must be finite and positive, got {}",
            name, value
        )))
    }
}

fn ensure_elapsed(t: f64) -> Result<()> {
    if t.is_finite() && t >= 0.0 {
        Ok(())
    } else {
        Err(DeclineError::InvalidParameter(format!(
            "elapsed time must be finite and non-negative, got {}",
            t
        )))
    }
}

/// Exponential decline, `qi * exp(-di * t)`.
pub fn exponential_rate(qi: f64, di: f64, t: f64) -> Result<f64> {
    ensure_positive("initial rate qi", qi)?;
    ensure_positive("decline rate di", di)?;
    ensure_elapsed(t)?;
    Ok(raw_exponential(qi, di, t))
}

/// Harmonic decline, `qi / (1 + di * t)`.
pub fn harmonic_rate(qi: f64, di: f64, t: f64) -> Result<f64> {
    ensure_positive("initial rate qi", qi)?;
    ensure_positive("decline rate di", di)?;
    ensure_elapsed(t)?;
    Ok(raw_harmonic(qi, di, t))
}

/// Hyperbolic decline, `qi / (1 + b * di * t)^(1 / b)`.
pub fn hyperbolic_rate(qi: f64, di: f64, b: f64, t: f64) -> Result<f64> {
    ensure_positive("initial rate qi", qi)?;
    ensure_positive("decline rate di", di)?;
    ensure_positive("curvature b", b)?;
    ensure_elapsed(t)?;
    Ok(raw_hyperbolic(qi, di, b, t))
}

// The raw forms skip validation so the solver can probe trial points outside
// the domain; a bad point shows up as a non-finite residual.

fn raw_exponential(qi: f64, di: f64, t: f64) -> f64 {
    qi * (-di * t).exp()
}

fn raw_harmonic(qi: f64, di: f64, t: f64) -> f64 {
    qi / (1.0 + di * t)
}

fn raw_hyperbolic(qi: f64, di: f64, b: f64, t: f64) -> f64 {
    qi / (1.0 + b * di * t).powf(1.0 / b)
}

/// Rate without domain checks. `b` is ignored unless the model is hyperbolic.
pub(crate) fn unchecked_rate(
    model_type: DeclineModelType,
    qi: f64,
    di: f64,
    b: f64,
    t: f64,
) -> f64 {
    match model_type {
        DeclineModelType::Exponential => raw_exponential(qi, di, t),
        DeclineModelType::Harmonic => raw_harmonic(qi, di, t),
        DeclineModelType::Hyperbolic => raw_hyperbolic(qi, di, b, t),
    }
}
