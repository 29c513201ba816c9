//! `serve` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::SystemClock;
use host_endpoint::{HostEndpoint, HostEndpointConfig, HostEvent, SkewedClock};
use tracing::{info, warn};

use crate::cli::ServeArgs;
use crate::commands::shutdown_signal;
use crate::config;

/// Execute the `serve` command
pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    let config = config::resolve(&args.session, Some(&args.bind))?;
    let mut endpoint_config = HostEndpointConfig::from_session(&config, args.bind.clone());
    if let Some(batch_size) = args.batch_size {
        endpoint_config.batch_size = batch_size;
    }

    let clock = SkewedClock::new(SystemClock, args.skew_ms);
    let endpoint = HostEndpoint::bind(&endpoint_config, Arc::new(clock))
        .await
        .context("Failed to start host endpoint")?;

    println!("calibration: {}", endpoint.calibration_addr());
    println!("events:      {}", endpoint.event_addr());
    if let Some(play) = endpoint.play_addr() {
        println!("play:        {}", play);
    }

    let (handle, mut events) = endpoint.spawn();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => report(&event),
                None => break,
            },
            _ = &mut shutdown => {
                warn!("Received shutdown signal, stopping host endpoint...");
                break;
            }
        }
    }

    handle.shutdown().await;
    info!("Host endpoint finished");
    Ok(())
}

fn report(event: &HostEvent) {
    match event {
        HostEvent::BatchReceived { records, .. } => {
            if let (Some(first), Some(last)) = (records.first(), records.last()) {
                println!(
                    "batch  {:>3} samples  ts {}..{}",
                    records.len(),
                    first.host_timestamp,
                    last.host_timestamp
                );
            }
        }
        HostEvent::PlayReceived {
            host_scheduled_time,
            lateness_ms,
            ..
        } => {
            println!(
                "play   scheduled {}  error {} ms",
                host_scheduled_time, lateness_ms
            );
        }
        HostEvent::StopReceived { channel, peer } => {
            println!("stop   {} from {}", channel, peer);
        }
        HostEvent::ClientDisconnected {
            channel,
            peer,
            packets,
        } => {
            println!("done   {} from {} ({} packets)", channel, peer, packets);
        }
        // Per-probe traffic stays in the debug log
        _ => {}
    }
}
