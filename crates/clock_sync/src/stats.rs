//! Round-trip-time series and their statistics.

use contracts::{ContractError, RttStatistics, TimingSample};

use crate::outlier::is_outlier;

/// Device-side and host-side round trips for each fitted step
///
/// `samples.len() - 1` steps are derived from `samples.len()` round trips,
/// since the host round trip of step `i` needs the arrival of probe `i + 1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RttSeries {
    pub device: Vec<f64>,
    pub host: Vec<f64>,
}

impl RttSeries {
    ///
    /// # Errors
    /// [`ContractError::ProtocolInvariant`] when a round trip does not fit in
    /// an `i64` (nonsensical host stamps).
    pub fn from_samples(samples: &[TimingSample]) -> Result<Self, ContractError> {
        let mut series = Self {
            device: Vec::with_capacity(samples.len().saturating_sub(1)),
            host: Vec::with_capacity(samples.len().saturating_sub(1)),
        };
        for (step, pair) in samples.windows(2).enumerate() {
            let (Some(device), Some(host)) = (pair[0].device_rtt(), pair[0].host_rtt(&pair[1]))
            else {
                return Err(ContractError::ProtocolInvariant(format!(
                    "round trip of step {step} overflows"
                )));
            };
            series.device.push(device as f64);
            series.host.push(host as f64);
        }
        Ok(series)
    }

    /// Number of fitted steps
    pub fn len(&self) -> usize {
        self.device.len()
    }

    pub fn is_empty(&self) -> bool {
        self.device.is_empty()
    }
}

/// Mean and population standard deviation
pub fn raw_statistics(values: &[f64]) -> RttStatistics {
    if values.is_empty() {
        return RttStatistics::default();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    RttStatistics {
        mean,
        sigma: variance.sqrt(),
    }
}

/// First-pass statistics with the mean recomputed over non-outliers
///
/// Sigma keeps its unfiltered value.
pub fn filtered_statistics(values: &[f64], k: f64) -> RttStatistics {
    let raw = raw_statistics(values);
    let (sum, count) = values
        .iter()
        .filter(|v| !is_outlier(**v, raw.mean, raw.sigma, k))
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        return raw;
    }
    RttStatistics {
        mean: sum / count as f64,
        sigma: raw.sigma,
    }
}
