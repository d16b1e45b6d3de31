//! Production rate time series.
//!
//! A [`TimeSeries`] is an immutable, chronologically ordered list of
//! `(time, rate)` samples. Times are whole periods (months in the usual
//! monthly-production setting) counted from first production.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{DeclineError, Result};

/// Default forecast horizon in months; the grid `0..=12` holds 13 samples.
pub const DEFAULT_HORIZON_MONTHS: u32 = 12;

/// The time grid `0, 1, ..., horizon`.
pub fn monthly_grid(horizon: u32) -> Vec<u32> {
    (0..=horizon).collect()
}

/// Check that a time grid is non-empty and strictly increasing.
pub(crate) fn validate_grid(grid: &[u32]) -> Result<()> {
    if grid.is_empty() {
        return Err(DeclineError::InvalidParameter(
            "time grid is empty".to_string(),
        ));
    }
    if let Some(pair) = grid.windows(2).find(|pair| pair[1] <= pair[0]) {
        return Err(DeclineError::InvalidParameter(format!(
            "time grid must be strictly increasing, found {} followed by {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

/// One sample of a rate series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    /// Periods since first production
    pub time: u32,
    /// Production rate
    pub rate: f64,
}

/// An ordered sequence of rate samples, observed or generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TimePoint>", into = "Vec<TimePoint>")]
pub struct TimeSeries {
    points: Vec<TimePoint>,
}

impl TimeSeries {
    /// Build a series from samples.
    ///
    /// # Errors
    ///
    /// * `DeclineError::InvalidParameter` if the times are not strictly
    ///   increasing or a rate is negative or not finite
    pub fn new(points: Vec<TimePoint>) -> Result<Self> {
        if let Some(pair) = points.windows(2).find(|pair| pair[1].time <= pair[0].time) {
            return Err(DeclineError::InvalidParameter(format!(
                "series times must be strictly increasing, found {} followed by {}",
                pair[0].time, pair[1].time
            )));
        }
        if let Some(point) = points.iter().find(|p| !(p.rate.is_finite() && p.rate >= 0.0)) {
            return Err(DeclineError::InvalidParameter(format!(
                "rate at t={} must be finite and non-negative, got {}",
                point.time, point.rate
            )));
        }
        Ok(Self { points })
    }

    /// Build a series sampled at `0, 1, 2, ...` from consecutive period rates.
    pub fn from_rates(rates: &[f64]) -> Result<Self> {
        let points = rates
            .iter()
            .zip(0u32..)
            .map(|(&rate, time)| TimePoint { time, rate })
            .collect();
        Self::new(points)
    }

    /// The samples in chronological order.
    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sample times.
    pub fn grid(&self) -> Vec<u32> {
        self.points.iter().map(|p| p.time).collect()
    }

    /// Sample times as floating point values, for the solver.
    pub fn times(&self) -> Array1<f64> {
        self.points.iter().map(|p| f64::from(p.time)).collect()
    }

    /// Sample rates.
    pub fn rates(&self) -> Array1<f64> {
        self.points.iter().map(|p| p.rate).collect()
    }

    /// Total volume under the series: the sum of `rate * period_length`.
    pub fn cumulative_volume(&self, period_length: f64) -> Result<f64> {
        if !(period_length.is_finite() && period_length >= 0.0) {
            return Err(DeclineError::InvalidParameter(format!(
                "period length must be finite and non-negative, got {}",
                period_length
            )));
        }
        Ok(self.points.iter().map(|p| p.rate * period_length).sum())
    }
}

impl TryFrom<Vec<TimePoint>> for TimeSeries {
    type Error = DeclineError;

    fn try_from(points: Vec<TimePoint>) -> Result<Self> {
        TimeSeries::new(points)
    }
}

impl From<TimeSeries> for Vec<TimePoint> {
    fn from(series: TimeSeries) -> Self {
        series.points
    }
}

/// Total volume under a series; see [`TimeSeries::cumulative_volume`].
pub fn cumulative_volume(series: &TimeSeries, period_length: f64) -> Result<f64> {
    series.cumulative_volume(period_length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_rates_uses_monthly_times() {
        let series = TimeSeries::from_rates(&[100.0, 90.0, 81.0]).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.grid(), vec![0, 1, 2]);
        assert_eq!(series.times().to_vec(), vec![0.0, 1.0, 2.0]);
        assert_eq!(series.rates().to_vec(), vec![100.0, 90.0, 81.0]);
    }

    #[test]
    fn test_invalid_series() {
        let unordered = vec![
            TimePoint { time: 0, rate: 10.0 },
            TimePoint { time: 2, rate: 9.0 },
            TimePoint { time: 2, rate: 8.0 },
        ];
        assert!(matches!(
            TimeSeries::new(unordered),
            Err(DeclineError::InvalidParameter(_))
        ));

        assert!(TimeSeries::from_rates(&[10.0, -1.0]).is_err());
        assert!(TimeSeries::from_rates(&[10.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_cumulative_volume() {
        let series = TimeSeries::from_rates(&[100.0, 80.0, 60.0]).unwrap();

        assert_relative_eq!(cumulative_volume(&series, 30.0).unwrap(), 7200.0);
        assert_relative_eq!(series.cumulative_volume(0.0).unwrap(), 0.0);
        assert!(series.cumulative_volume(-1.0).is_err());

        let empty = TimeSeries::from_rates(&[]).unwrap();
        assert_eq!(empty.cumulative_volume(30.0).unwrap(), 0.0);
    }

    #[test]
    fn test_grid_validation() {
        assert_eq!(monthly_grid(DEFAULT_HORIZON_MONTHS).len(), 13);
        assert!(validate_grid(&monthly_grid(3)).is_ok());
        assert!(validate_grid(&[0, 3, 7]).is_ok());
        assert!(validate_grid(&[]).is_err());
        assert!(validate_grid(&[0, 2, 1]).is_err());
    }

    #[test]
    fn test_serde_validates_on_the_way_in() {
        let series = TimeSeries::from_rates(&[5.0, 4.0]).unwrap();
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"[{"time":0,"rate":5.0},{"time":1,"rate":4.0}]"#);

        let bad = r#"[{"time":1,"rate":5.0},{"time":0,"rate":4.0}]"#;
        assert!(serde_json::from_str::<TimeSeries>(bad).is_err());
    }
}
