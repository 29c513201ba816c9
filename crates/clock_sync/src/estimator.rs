//! Offset fit with decaying gain.
//!
//! Each retained probe step predicts when the probe should have reached the
//! host (`device_send + transmission_delay + delta_t`) and moves `delta_t`
//! against the prediction error. Steps whose device or host round trip is an
//! upper outlier are skipped entirely and contribute no gradient step.

use contracts::{CalibrationConfig, ClockOffset, ContractError, RttStatistics, TimingSample};
use tracing::debug;

use crate::outlier::is_outlier;
use crate::stats::{filtered_statistics, RttSeries};

/// Fewest round trips that yield one fitted step
pub const MIN_ROUND_TRIPS: usize = 2;

/// Outcome of one fit
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    /// Host clock minus device clock (ms)
    pub delta_t: f64,
    /// RMS of post-warm-up errors (ms)
    pub mse: f64,
    /// Filtered device round-trip statistics
    pub device_rtt: RttStatistics,
    /// Filtered host round-trip statistics
    pub host_rtt: RttStatistics,
    /// Number of steps that took a gradient step
    pub retained: usize,
    /// Indices of skipped outlier steps
    pub rejected: Vec<usize>,
}

impl Estimate {
    pub fn offset(&self) -> ClockOffset {
        ClockOffset::calibrated(self.delta_t, self.mse)
    }
}

/// Gain applied to the `ordinal`-th retained step
///
/// The first two retained steps use the initial gain; afterwards the gain
/// decays toward the floor by `exp(-decay * (ordinal - 1))`.
///
/// Departs from a loop-index schedule: skipped outlier steps do not advance the decay.
pub fn gain(config: &CalibrationConfig, ordinal: usize) -> f64 {
    let i = ordinal.saturating_sub(1) as f64;
    config.alpha_floor + (config.alpha_initial - config.alpha_floor) * (-config.alpha_decay * i).exp()
}

/// Fit `delta_t` over one session's round trips
///
/// `samples` holds every completed round trip in order; the fit covers the
/// first `samples.len() - 1` of them.
///
/// # Errors
/// [`ContractError::InsufficientSamples`] when fewer than two round trips are
/// given or every step is rejected as an outlier.
pub fn estimate(
    samples: &[TimingSample],
    config: &CalibrationConfig,
) -> Result<Estimate, ContractError> {
    if samples.len() < MIN_ROUND_TRIPS {
        return Err(ContractError::InsufficientSamples {
            needed: MIN_ROUND_TRIPS,
            got: samples.len(),
        });
    }

    let k = config.outlier_coefficient;
    let series = RttSeries::from_samples(samples)?;
    let device_rtt = filtered_statistics(&series.device, k);
    let host_rtt = filtered_statistics(&series.host, k);

    let mut delta_t = 0.0;
    let mut errors = Vec::with_capacity(series.len());
    let mut rejected = Vec::new();

    for (i, sample) in samples.iter().take(series.len()).enumerate() {
        let d_rtt = series.device[i];
        let h_rtt = series.host[i];
        if is_outlier(d_rtt, device_rtt.mean, device_rtt.sigma, k)
            || is_outlier(h_rtt, host_rtt.mean, host_rtt.sigma, k)
        {
            debug!(step = i, device_rtt = d_rtt, host_rtt = h_rtt, "Outlier step skipped");
            rejected.push(i);
            continue;
        }

        // Quarter of the summed round trips, kept as the one-way estimate
        let transmission_delay = (d_rtt + h_rtt) / 4.0;
        // Host stamps are untrusted; subtract in f64 so extreme values cannot overflow
        let error = sample.device_send_time as f64 - sample.host_receive_time as f64
            + transmission_delay
            + delta_t;

        delta_t -= gain(config, errors.len()) * error;
        errors.push(error);
    }

    if errors.is_empty() {
        return Err(ContractError::InsufficientSamples {
            needed: 1,
            got: 0,
        });
    }

    let retained = errors.len();
    let warmup = config.warmup_discard.min(retained - 1);
    let settled = &errors[warmup..];
    let mse = (settled.iter().map(|e| e * e).sum::<f64>() / settled.len() as f64).sqrt();
    if !delta_t.is_finite() || !mse.is_finite() {
        return Err(ContractError::ProtocolInvariant(format!(
            "offset fit diverged (delta_t = {delta_t}, mse = {mse})"
        )));
    }

    Ok(Estimate {
        delta_t,
        mse,
        device_rtt,
        host_rtt,
        retained,
        rejected,
    })
}
