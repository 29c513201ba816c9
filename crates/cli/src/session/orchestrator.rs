//! Session orchestrator - coordinates calibration, ingestion and streaming.
//!
//! This is the controlling layer: it owns one [`Calibrator`] and one
//! [`EventStreamer`], wires the calibrator's published offset into both the
//! streamer and the [`SampleIngestor`], and exposes the lifecycle commands.

use std::time::Instant;

use anyhow::{Context, Result};
use clock_sync::{Calibrator, Estimate};
use contracts::{Clock, Connector, SessionCallback, SessionConfig};
use ingestion::{SampleIngestor, SubmitOutcome};
use streamer::EventStreamer;
use tokio::task::JoinHandle;
use tracing::info;
use wire_codec::event_packet_size;

use super::StreamStats;

/// One device-side session
pub struct Session<C, K> {
    config: SessionConfig,
    clock: K,
    calibrator: Calibrator<C, K>,
    streamer: EventStreamer<C>,
    ingestor: SampleIngestor<EventStreamer<C>>,
    started_at: Instant,
}

impl<C, K> Session<C, K>
where
    C: Connector + Clone + 'static,
    K: Clock + Clone + 'static,
{
    /// Build the session; nothing connects until a lifecycle command runs
    pub fn new(
        connector: C,
        clock: K,
        config: SessionConfig,
        callback: SessionCallback,
    ) -> Result<Self> {
        let calibrator =
            Calibrator::new(connector.clone(), clock.clone(), &config, callback.clone());
        let streamer = EventStreamer::new(connector, &config, calibrator.offset_reader(), callback);
        let ingestor = SampleIngestor::new(
            config.streaming.batch_size,
            calibrator.offset_reader(),
            streamer.clone(),
        )
        .context("Failed to create sample ingestor")?;

        Ok(Self {
            config,
            clock,
            calibrator,
            streamer,
            ingestor,
            started_at: Instant::now(),
        })
    }

    /// Start a calibration session in the background
    pub fn start_calibration(&self) -> JoinHandle<clock_sync::Result<Estimate>> {
        info!(addr = %self.config.host.calibration_addr(), "Starting calibration");
        self.calibrator.calibrate()
    }

    /// Open the event (and play) connections
    pub fn start_streaming(&self) -> bool {
        info!(addr = %self.config.host.event_addr(), "Starting event stream");
        self.streamer.connect()
    }

    /// The next full batch goes out as the stop sentinel
    pub fn stop_streaming(&self) {
        self.streamer.request_stop();
    }

    /// Send the stop sentinel now, sized as one full batch
    pub fn stop_now(&self) -> streamer::Result<()> {
        self.streamer
            .stop_now(event_packet_size(self.config.streaming.batch_size))
    }

    /// Sensor acquisition entry point
    pub fn submit_sample(&mut self, x: f32, y: f32, z: f32, timestamp: i64) -> SubmitOutcome {
        self.ingestor.submit_sample(x, y, z, timestamp)
    }

    /// Schedule playback `play_delay_ms` from now
    ///
    /// Returns the scheduled time on the device clock.
    pub fn schedule_play(&self) -> streamer::Result<i64> {
        let at = self.clock.now_ms() + self.config.streaming.play_delay_ms;
        self.streamer.send_play_command(at)?;
        info!(device_time = at, "Play command scheduled");
        Ok(at)
    }

    pub fn stats(&self) -> StreamStats {
        let ingestion = self.ingestor.metrics().snapshot();
        let streaming = self.streamer.metrics().snapshot();
        StreamStats {
            samples_received: ingestion.samples_received,
            samples_dropped: ingestion.samples_dropped,
            batches_emitted: ingestion.batches_emitted,
            batches_sent: streaming.batches_sent,
            bytes_sent: streaming.bytes_sent,
            play_commands_sent: streaming.play_commands_sent,
            pending_samples: self.ingestor.pending(),
            offset: self.calibrator.offset(),
            duration: self.started_at.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clock_sync::mock::SimulatedHost;
    use contracts::{event_channel, ManualClock, SessionEvent};
    use streamer::{ConnectionState, StreamerError};

    fn session(steps: usize) -> (Session<SimulatedHost, ManualClock>, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let host = SimulatedHost::new(clock.clone(), 20, 250);
        let mut config = SessionConfig::for_host("sim");
        config.calibration.steps = steps;
        config.streaming.batch_size = 3;
        let session =
            Session::new(host, clock.clone(), config, contracts::noop_callback()).unwrap();
        (session, clock)
    }

    #[tokio::test]
    async fn test_samples_dropped_until_calibrated() {
        let (mut session, clock) = session(5);

        for i in 0..10 {
            assert_eq!(
                session.submit_sample(0.0, 0.0, 9.8, clock.now_ms() + i),
                SubmitOutcome::Dropped
            );
        }

        let estimate = session.start_calibration().await.unwrap().unwrap();
        assert!((estimate.delta_t - 250.0).abs() <= 5.0);
        assert!(session.stats().offset.is_ready());

        assert_eq!(session.submit_sample(0.0, 0.0, 9.8, 1), SubmitOutcome::Buffered);
        assert_eq!(session.submit_sample(0.0, 0.0, 9.8, 2), SubmitOutcome::Buffered);
        // Handed to the streamer, which refuses it while disconnected
        assert_eq!(
            session.submit_sample(0.0, 0.0, 9.8, 3),
            SubmitOutcome::BatchHandedOff
        );

        let stats = session.stats();
        assert_eq!(stats.samples_received, 13);
        assert_eq!(stats.samples_dropped, 10);
        assert_eq!(stats.batches_emitted, 1);
        assert_eq!(stats.batches_sent, 0);
    }

    #[tokio::test]
    async fn test_play_needs_play_channel() {
        let (session, _) = session(2);
        assert!(matches!(
            session.schedule_play(),
            Err(StreamerError::PlayChannelDisabled)
        ));
    }

    #[tokio::test]
    async fn test_stop_now_requires_connection() {
        let (session, _) = session(2);
        assert!(matches!(
            session.stop_now(),
            Err(StreamerError::NotConnected(ConnectionState::Disconnected))
        ));
    }

    #[tokio::test]
    async fn test_calibration_events_reach_callback() {
        let clock = ManualClock::new(0);
        let host = SimulatedHost::new(clock.clone(), 10, -75);
        let (callback, mut events) = event_channel();
        let mut config = SessionConfig::for_host("sim");
        config.calibration.steps = 5;
        let session = Session::new(host, clock, config, callback).unwrap();

        session.start_calibration().await.unwrap().unwrap();
        match events.recv().await {
            Some(SessionEvent::CalibrationComplete {
                success, delta_t, ..
            }) => {
                assert!(success);
                assert!((delta_t + 75.0).abs() <= 5.0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
