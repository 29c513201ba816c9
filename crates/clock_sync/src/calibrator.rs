//! Calibration session orchestration.
//!
//! One `calibrate()` call runs on its own task:
//! `Connecting -> Probing -> Computing -> Calibrated`, or `Failed` from any
//! of the first three. The probe connection is closed on every exit path and
//! the outcome is both published as a [`ClockOffset`] and reported through
//! the session callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{
    offset_cell, CalibrationConfig, Channel, Clock, ClockOffset, Connection, Connector,
    ContractError, OffsetPublisher, OffsetReader, SessionCallback, SessionConfig, SessionEvent,
    TimingSample,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use wire_codec::{ProbePacket, ProbeReply, REPLY_SIZE};

use crate::error::{CalibrationError, Result};
use crate::estimator::{estimate, Estimate};

/// Calibration lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationState {
    #[default]
    Idle,
    Connecting,
    Probing,
    Computing,
    Calibrated,
    Failed,
}

/// Clock calibrator
///
/// Owns the published [`ClockOffset`]; consumers hold [`OffsetReader`]s from
/// [`Calibrator::offset_reader`]. Cheap to clone, clones share state.
pub struct Calibrator<C, K> {
    inner: Arc<Inner<C, K>>,
}

impl<C, K> Clone for Calibrator<C, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<C, K> {
    connector: C,
    clock: K,
    addr: String,
    config: CalibrationConfig,
    publisher: OffsetPublisher,
    state: watch::Sender<CalibrationState>,
    running: AtomicBool,
    callback: SessionCallback,
}

impl<C, K> Calibrator<C, K>
where
    C: Connector + 'static,
    K: Clock + 'static,
{
    pub fn new(connector: C, clock: K, config: &SessionConfig, callback: SessionCallback) -> Self {
        let (publisher, _) = offset_cell();
        let (state, _) = watch::channel(CalibrationState::Idle);
        Self {
            inner: Arc::new(Inner {
                connector,
                clock,
                addr: config.host.calibration_addr(),
                config: config.calibration.clone(),
                publisher,
                state,
                running: AtomicBool::new(false),
                callback,
            }),
        }
    }

    /// Start a calibration session in the background
    ///
    /// Returns immediately; completion is reported through the callback and
    /// the returned handle. A call made while another session is running
    /// resolves to [`CalibrationError::AlreadyRunning`] without touching the
    /// published offset. A session that panics resolves to
    /// [`CalibrationError::TaskAborted`] after the failure is reported.
    pub fn calibrate(&self) -> JoinHandle<Result<Estimate>> {
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Calibration requested while a session is running");
            return tokio::spawn(async { Err(CalibrationError::AlreadyRunning) });
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _running = RunningGuard(&inner.running);

            // A panic inside the session must still end in a reported failure
            let session = tokio::spawn({
                let inner = Arc::clone(&inner);
                async move { inner.run_session().await }
            });
            match session.await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "Calibration task ended unexpectedly");
                    inner.report_failure(0);
                    Err(CalibrationError::TaskAborted(e.to_string()))
                }
            }
        })
    }

    /// Reader handle for the published offset
    pub fn offset_reader(&self) -> OffsetReader {
        self.inner.publisher.subscribe()
    }

    pub fn offset(&self) -> ClockOffset {
        self.inner.publisher.current()
    }

    pub fn state(&self) -> CalibrationState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CalibrationState> {
        self.inner.state.subscribe()
    }
}

/// Clears the running flag however the session task ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<C, K> Inner<C, K>
where
    C: Connector,
    K: Clock,
{
    #[instrument(
        name = "calibration_session",
        skip(self),
        fields(addr = %self.addr, steps = self.config.steps)
    )]
    async fn run_session(&self) -> Result<Estimate> {
        // Every session starts from scratch
        self.publisher.reset();
        self.set_state(CalibrationState::Connecting);

        info!("Connecting calibration channel");
        let mut conn = match self.connector.connect(Channel::Calibration, &self.addr).await {
            Ok(conn) => conn,
            Err(e) => {
                error!(error = %e, "Calibration host not available");
                (self.callback)(SessionEvent::ConnectFailed {
                    channel: Channel::Calibration,
                });
                observability::record_transport_failure(Channel::Calibration, true);
                return Err(self.fail(e, 0));
            }
        };

        self.set_state(CalibrationState::Probing);
        let probed = self.probe(&mut conn).await;
        if let Err(e) = conn.shutdown().await {
            warn!(error = %e, "Failed to close calibration connection");
        }

        let samples = match probed {
            Ok(samples) => samples,
            Err(e) => {
                error!(error = %e, "Calibration probing aborted");
                observability::record_transport_failure(Channel::Calibration, false);
                return Err(self.fail(e, 0));
            }
        };

        self.set_state(CalibrationState::Computing);
        let est = match estimate(&samples, &self.config) {
            Ok(est) => est,
            Err(e) => {
                error!(error = %e, "Offset fit failed");
                return Err(self.fail(e, samples.len().saturating_sub(1)));
            }
        };

        let offset = est.offset();
        self.publisher.publish(offset);
        self.set_state(CalibrationState::Calibrated);
        observability::record_calibration(&offset, est.rejected.len());

        info!(
            delta_t = est.delta_t,
            mse = est.mse,
            mean_device_rtt = est.device_rtt.mean,
            mean_host_rtt = est.host_rtt.mean,
            rejected = est.rejected.len(),
            "Calibration complete"
        );
        (self.callback)(SessionEvent::CalibrationComplete {
            success: true,
            delta_t: est.delta_t,
            mse: est.mse,
        });

        Ok(est)
    }

    /// Run `steps + 1` sequential probe round trips
    async fn probe(&self, conn: &mut C::Conn) -> std::result::Result<Vec<TimingSample>, ContractError> {
        let round_trips = self.config.steps + 1;
        let mut samples = Vec::with_capacity(round_trips);
        let mut probe = ProbePacket::FIRST;
        let mut reply_buf = [0u8; REPLY_SIZE];

        for step in 0..round_trips {
            let device_send_time = self.clock.now_ms();
            conn.write_all(&probe.encode()).await?;
            conn.read_exact(&mut reply_buf).await?;
            let device_receive_time = self.clock.now_ms();

            let reply = ProbeReply::decode(&reply_buf)?;
            samples.push(TimingSample {
                device_send_time,
                host_receive_time: reply.host_receive_time,
                host_send_time: reply.host_send_time,
                device_receive_time,
            });
            debug!(step, rtt = device_receive_time - device_send_time, "Probe round trip");

            probe = ProbePacket {
                prev_device_send_time: device_send_time,
                prev_device_receive_time: device_receive_time,
            };
        }

        Ok(samples)
    }

    fn fail(&self, err: ContractError, rejected: usize) -> CalibrationError {
        self.report_failure(rejected);
        err.into()
    }

    fn report_failure(&self, rejected: usize) {
        self.publisher.reset();
        self.set_state(CalibrationState::Failed);
        observability::record_calibration(&ClockOffset::NOT_READY, rejected);
        (self.callback)(SessionEvent::CalibrationComplete {
            success: false,
            delta_t: 0.0,
            mse: 0.0,
        });
    }

    fn set_state(&self, state: CalibrationState) {
        self.state.send_replace(state);
    }
}
