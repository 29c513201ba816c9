//! `calibrate` command implementation.

use anyhow::{Context, Result};
use clock_sync::mock::SimulatedHost;
use clock_sync::Calibrator;
use contracts::{Clock, ClockOffset, Connector, ManualClock, SessionConfig, SystemClock};
use observability::CalibrationAggregator;
use streamer::TcpConnector;
use tracing::{info, warn};

use crate::cli::CalibrateArgs;
use crate::config;

/// Execute the `calibrate` command
pub async fn run_calibrate(args: &CalibrateArgs) -> Result<()> {
    let fallback = args.simulate.then_some("127.0.0.1");
    let config = config::resolve(&args.session, fallback)?;

    let aggregator = if args.simulate {
        info!(
            offset_ms = args.sim_offset_ms,
            rtt_ms = args.sim_rtt_ms,
            "Calibrating against simulated host"
        );
        let clock = ManualClock::new(SystemClock.now_ms());
        let host = SimulatedHost::new(clock.clone(), args.sim_rtt_ms / 2, args.sim_offset_ms);
        run_sessions(host, clock, &config, args.repeat).await?
    } else {
        info!(addr = %config.host.calibration_addr(), "Calibrating against host");
        run_sessions(
            TcpConnector::new(&config.network),
            SystemClock,
            &config,
            args.repeat,
        )
        .await?
    };

    if args.repeat > 1 {
        println!("\n{}", aggregator.summary());
    }

    if aggregator.failed_runs == aggregator.total_runs {
        anyhow::bail!("Calibration failed");
    }
    Ok(())
}

/// Run `repeat` sessions back to back and aggregate their outcomes
async fn run_sessions<C, K>(
    connector: C,
    clock: K,
    config: &SessionConfig,
    repeat: u32,
) -> Result<CalibrationAggregator>
where
    C: Connector + 'static,
    K: Clock + 'static,
{
    let calibrator = Calibrator::new(connector, clock, config, contracts::noop_callback());
    let mut aggregator = CalibrationAggregator::new();

    for run in 1..=repeat.max(1) {
        let outcome = calibrator
            .calibrate()
            .await
            .context("Calibration task aborted")?;

        match outcome {
            Ok(estimate) => {
                println!(
                    "run {:>3}: deltaT = {:>10.3} ms   mse = {:>8.3} ms   rejected = {}",
                    run,
                    estimate.delta_t,
                    estimate.mse,
                    estimate.rejected.len()
                );
                aggregator.update(&estimate.offset(), estimate.rejected.len());
            }
            Err(e) => {
                warn!(run, error = %e, "Calibration failed");
                println!("run {:>3}: failed: {}", run, e);
                aggregator.update(&ClockOffset::NOT_READY, 0);
            }
        }
    }

    Ok(aggregator)
}
