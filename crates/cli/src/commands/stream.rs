//! `stream` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use async_channel::Receiver;
use contracts::{event_channel, SensorSample, SessionEvent, SystemClock};
use ingestion::MockAccelerometer;
use streamer::TcpConnector;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::cli::StreamArgs;
use crate::commands::shutdown_signal;
use crate::config;
use crate::session::Session;

/// How long to keep feeding samples after a stop request before forcing the sentinel
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Execute the `stream` command
pub async fn run_stream(args: &StreamArgs) -> Result<()> {
    let config = config::resolve(&args.session, None)?;
    let (callback, mut events) = event_channel();
    let mut session = Session::new(
        TcpConnector::new(&config.network),
        SystemClock,
        config,
        callback,
    )?;

    // Calibrate first; samples are dropped until an offset is published
    let estimate = session
        .start_calibration()
        .await
        .context("Calibration task aborted")?
        .context("Calibration failed")?;
    info!(
        delta_t = estimate.delta_t,
        mse = estimate.mse,
        rejected = estimate.rejected.len(),
        "Calibration complete"
    );
    println!(
        "deltaT = {:.3} ms, mse = {:.3} ms",
        estimate.delta_t, estimate.mse
    );

    session.start_streaming();
    if args.play {
        session
            .schedule_play()
            .context("Failed to schedule play command")?;
    }

    let accelerometer = MockAccelerometer::with_rate(args.rate_hz);
    let samples = accelerometer.start(SystemClock, 256);

    let deadline = async {
        if args.duration == 0 {
            std::future::pending::<()>().await;
        } else {
            tokio::time::sleep(Duration::from_secs(args.duration)).await;
        }
    };
    tokio::pin!(deadline);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!(rate_hz = args.rate_hz, duration_secs = args.duration, "Streaming...");

    loop {
        tokio::select! {
            sample = samples.recv() => match sample {
                Ok(s) => {
                    session.submit_sample(s.x, s.y, s.z, s.device_timestamp);
                }
                Err(_) => {
                    warn!("Sample source closed");
                    break;
                }
            },
            event = events.recv() => {
                if let Some(event) = event {
                    check_event(&event)?;
                }
            }
            _ = &mut deadline => {
                info!("Streaming duration reached");
                break;
            }
            _ = &mut shutdown => {
                warn!("Received shutdown signal, stopping stream...");
                break;
            }
        }
    }

    session.stop_streaming();
    let stopped = finish(&mut session, &samples, &mut events).await?;
    accelerometer.stop();

    if !stopped {
        warn!("Stop not observed in time, making sure the stop sentinel goes out");
        session.stop_now().context("Failed to send stop sentinel")?;
        wait_stopped(&mut events).await?;
    }

    session.stats().print_summary();
    info!("Accel Sync stream finished");
    Ok(())
}

/// Keep feeding samples until the next batch carries the stop sentinel
///
/// Returns whether the session stopped within [`STOP_GRACE`].
async fn finish(
    session: &mut Session<TcpConnector, SystemClock>,
    samples: &Receiver<SensorSample>,
    events: &mut UnboundedReceiver<SessionEvent>,
) -> Result<bool> {
    let grace = tokio::time::sleep(STOP_GRACE);
    tokio::pin!(grace);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::SessionStopped) => return Ok(true),
                Some(event) => check_event(&event)?,
                None => return Ok(false),
            },
            sample = samples.recv() => match sample {
                Ok(s) => {
                    session.submit_sample(s.x, s.y, s.z, s.device_timestamp);
                }
                Err(_) => return Ok(false),
            },
            _ = &mut grace => return Ok(false),
        }
    }
}

async fn wait_stopped(events: &mut UnboundedReceiver<SessionEvent>) -> Result<()> {
    let waited = tokio::time::timeout(STOP_GRACE, async {
        while let Some(event) = events.recv().await {
            if event == SessionEvent::SessionStopped {
                return Ok(());
            }
            check_event(&event)?;
        }
        Ok(())
    })
    .await;

    match waited {
        Ok(result) => result,
        Err(_) => {
            warn!("Timed out waiting for the stream to close");
            Ok(())
        }
    }
}

/// Turn network failures reported by the core into command errors
fn check_event(event: &SessionEvent) -> Result<()> {
    match event {
        SessionEvent::ConnectFailed { channel } => {
            anyhow::bail!("Server not available ({} channel)", channel)
        }
        SessionEvent::TransportFailed { channel, message } => {
            anyhow::bail!("{} connection broke: {}", channel, message)
        }
        _ => Ok(()),
    }
}
