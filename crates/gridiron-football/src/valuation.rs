// Valuation engine: average, consistency, trend, and a composite 0-100 score
// from a player's recent weekly fantasy points.

use std::fmt;

use serde::Serialize;

pub use gridiron_core::config::ValuationSettings as ValuationParams;

/// Composite weights. Fixed, not configurable.
const AVERAGE_WEIGHT: f64 = 0.6;
const CONSISTENCY_WEIGHT: f64 = 0.2;
const TREND_WEIGHT: f64 = 0.2;

/// Below this the standard deviation / mean is treated as zero.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
        })
    }
}

/// Result of a least-squares fit of points over week index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendFit {
    pub trend: Trend,
    /// Points gained per week. `None` with fewer than 2 samples.
    pub slope: Option<f64>,
}

/// Everything the engine derives from one player's samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Valuation {
    pub average: Option<f64>,
    pub consistency: Option<f64>,
    pub trend: TrendFit,
    /// Composite value in 0..=100.
    pub score: f64,
    pub sample_count: usize,
    /// True when there were no samples at all.
    pub no_data: bool,
}

/// Arithmetic mean, `None` for an empty slice.
pub fn average_points(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Population standard deviation (divides by N).
fn population_stdev(samples: &[f64], mean: f64) -> f64 {
    let variance =
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    variance.sqrt()
}

/// Consistency on a 0-100 scale, 100 meaning zero variance.
///
/// Uses the coefficient of variation `stdev / |mean|`. Undefined (`None`)
/// with fewer than two samples or a zero mean.
pub fn consistency_score(samples: &[f64], params: &ValuationParams) -> Option<f64> {
    if samples.len() < 2 {
        return None;
    }
    let mean = average_points(samples)?;
    if mean.abs() < EPSILON {
        return None;
    }
    let cv = population_stdev(samples, mean) / mean.abs();
    Some((100.0 - cv * params.cv_scale).clamp(0.0, 100.0))
}

/// Ordinary least-squares slope over week index `0..n`, classified against
/// `params.trend_threshold`. Samples must be ordered oldest to newest.
pub fn fit_trend(samples: &[f64], params: &ValuationParams) -> TrendFit {
    let n = samples.len();
    if n < 2 {
        return TrendFit {
            trend: Trend::Stable,
            slope: None,
        };
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = samples.iter().sum::<f64>() / n as f64;

    let (num, den) = samples
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    let slope = num / den;

    let trend = if slope > params.trend_threshold {
        Trend::Improving
    } else if slope < -params.trend_threshold {
        Trend::Declining
    } else {
        Trend::Stable
    };

    TrendFit {
        trend,
        slope: Some(slope),
    }
}

/// Weighted composite of normalized average, consistency, and trend,
/// clamped to 0..=100.
pub fn value_score(
    average: Option<f64>,
    consistency: Option<f64>,
    trend: Trend,
    params: &ValuationParams,
) -> f64 {
    let normalized_avg = average
        .map(|avg| (avg / params.points_ceiling).clamp(0.0, 1.0) * 100.0)
        .unwrap_or(0.0);
    let trend_adj = match trend {
        Trend::Improving => params.trend_adjustment,
        Trend::Declining => -params.trend_adjustment,
        Trend::Stable => 0.0,
    };

    let score = AVERAGE_WEIGHT * normalized_avg
        + CONSISTENCY_WEIGHT * consistency.unwrap_or(0.0)
        + TREND_WEIGHT * trend_adj;
    score.clamp(0.0, 100.0)
}

/// Value a player from recent weekly points, ordered oldest to newest.
///
/// Empty input is not an error: the result has score 0 and `no_data` set.
pub fn evaluate(samples: &[f64], params: &ValuationParams) -> Valuation {
    let average = average_points(samples);
    let consistency = consistency_score(samples, params);
    let trend = fit_trend(samples, params);
    let score = if samples.is_empty() {
        0.0
    } else {
        value_score(average, consistency, trend.trend, params)
    };

    Valuation {
        average,
        consistency,
        trend,
        score,
        sample_count: samples.len(),
        no_data: samples.is_empty(),
    }
}
