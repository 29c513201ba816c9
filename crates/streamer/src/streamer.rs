//! EventStreamer - owns the data connection and an ordered outbound worker

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use contracts::{
    BatchSink, Channel, Connection, Connector, ContractError, EventBatch, OffsetReader,
    SessionCallback, SessionConfig, SessionEvent,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};
use wire_codec::{
    encode_event_records, event_packet_size, stop_sentinel, EventRecord, PlayCommand, PLAY_SIZE,
};

use crate::error::{Result, StreamerError};
use crate::metrics::StreamerMetrics;
use crate::ConnectionState;

/// Work item for the outbound worker, processed strictly in order
#[derive(Debug)]
enum Outbound {
    Batch { packet: Bytes, samples: usize },
    Play(Bytes),
    /// Stop sentinel of `len` bytes on the event channel
    Stop { len: usize },
}

/// Event streamer
///
/// Cheap to clone; clones drive the same connection.
pub struct EventStreamer<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for EventStreamer<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<C> {
    connector: C,
    events_addr: String,
    play_addr: Option<String>,
    offsets: OffsetReader,
    callback: SessionCallback,
    state: watch::Sender<ConnectionState>,
    stop_requested: AtomicBool,
    /// A stop sentinel went into the queue since the last connect
    stop_queued: AtomicBool,
    /// Queue into the worker; `None` when no worker accepts work
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    metrics: Arc<StreamerMetrics>,
}

impl<C> EventStreamer<C>
where
    C: Connector + 'static,
{
    pub fn new(
        connector: C,
        config: &SessionConfig,
        offsets: OffsetReader,
        callback: SessionCallback,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                connector,
                events_addr: config.host.event_addr(),
                play_addr: config.host.play_addr(),
                offsets,
                callback,
                state,
                stop_requested: AtomicBool::new(false),
                stop_queued: AtomicBool::new(false),
                outbound: Mutex::new(None),
                metrics: Arc::new(StreamerMetrics::new()),
            }),
        }
    }

    /// Open the event (and play) connections in the background
    ///
    /// Returns `false` without doing anything while already connecting or
    /// connected. Sends issued before the connections are up wait in the
    /// outbound queue.
    pub fn connect(&self) -> bool {
        let mut outbound = self.inner.outbound();

        let started = self.inner.state.send_if_modified(|state| {
            if state.accepts_sends() {
                false
            } else {
                *state = ConnectionState::Connecting;
                true
            }
        });
        if !started {
            debug!("Not initiating another connection");
            return false;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *outbound = Some(tx);
        self.inner.stop_requested.store(false, Ordering::Release);
        self.inner.stop_queued.store(false, Ordering::Release);

        tokio::spawn(run_worker(Arc::clone(&self.inner), rx));
        true
    }

    /// Translate, encode and queue one batch
    ///
    /// A pending stop request turns this batch into a stop sentinel of the
    /// same encoded size instead.
    ///
    /// # Errors
    /// [`StreamerError::NotConnected`] outside `Connecting`/`Connected`, and
    /// [`ContractError::NotCalibrated`] while no offset is published.
    pub fn send_batch(&self, batch: EventBatch) -> Result<()> {
        self.ensure_accepting()?;

        if self.inner.stop_requested.swap(false, Ordering::AcqRel) {
            let len = event_packet_size(batch.len());
            info!(sentinel_len = len, "Stop requested, sending stop sentinel");
            return self.inner.enqueue_stop(len);
        }

        let offset = self.inner.offsets.current();
        if !offset.is_ready() {
            self.inner.metrics.inc_rejected_uncalibrated();
            debug!(batch_len = batch.len(), "Not calibrated, batch skipped");
            return Err(ContractError::NotCalibrated.into());
        }

        let records: Vec<EventRecord> = batch
            .iter()
            .map(|s| EventRecord {
                x: s.x,
                y: s.y,
                z: s.z,
                host_timestamp: offset.to_host_time(s.device_timestamp),
            })
            .collect();
        let packet = encode_event_records(&records);

        self.inner.enqueue(Outbound::Batch {
            packet,
            samples: records.len(),
        })
    }

    /// Ask the next [`EventStreamer::send_batch`] to send the stop sentinel
    ///
    /// In-flight sends are not cancelled.
    pub fn request_stop(&self) {
        info!("Stop requested");
        self.inner.stop_requested.store(true, Ordering::Release);
    }

    /// Send a stop sentinel of `sentinel_len` bytes without waiting for a batch
    ///
    /// A no-op once a sentinel is queued, including one produced by a
    /// requested stop, even after the connections have closed behind it.
    pub fn stop_now(&self, sentinel_len: usize) -> Result<()> {
        if self.inner.stop_queued.load(Ordering::Acquire) {
            debug!("Stop sentinel already queued");
            return Ok(());
        }
        self.ensure_accepting()?;
        self.inner.stop_requested.store(false, Ordering::Release);
        self.inner.enqueue_stop(sentinel_len)
    }

    /// Send a play command scheduled at `device_time` (device clock, ms)
    pub fn send_play_command(&self, device_time: i64) -> Result<()> {
        if self.inner.play_addr.is_none() {
            return Err(StreamerError::PlayChannelDisabled);
        }
        self.ensure_accepting()?;

        let offset = self.inner.offsets.current();
        if !offset.is_ready() {
            return Err(ContractError::NotCalibrated.into());
        }

        let command = PlayCommand {
            host_scheduled_time: offset.to_host_time(device_time),
        };
        debug!(host_scheduled_time = command.host_scheduled_time, "Queueing play command");
        self.inner
            .enqueue(Outbound::Play(Bytes::copy_from_slice(&command.encode())))
    }

    /// Close the connections after the queued work, without a stop sentinel
    pub fn disconnect(&self) {
        if self.inner.outbound().take().is_some() {
            debug!("Outbound queue closed");
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn metrics(&self) -> Arc<StreamerMetrics> {
        self.inner.metrics.clone()
    }

    fn ensure_accepting(&self) -> Result<()> {
        let state = self.state();
        if state.accepts_sends() {
            return Ok(());
        }
        self.inner.metrics.inc_rejected_disconnected();
        debug!(state = %state, "Send rejected");
        Err(StreamerError::NotConnected(state))
    }
}

impl<C> BatchSink for EventStreamer<C>
where
    C: Connector + 'static,
{
    fn send_batch(&self, batch: EventBatch) {
        if let Err(e) = EventStreamer::send_batch(self, batch) {
            debug!(error = %e, "Batch not sent");
        }
    }
}

impl<C> Inner<C> {
    fn outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Outbound>>> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, item: Outbound) -> Result<()> {
        let outbound = self.outbound();
        match outbound.as_ref() {
            Some(tx) if tx.send(item).is_ok() => Ok(()),
            _ => Err(StreamerError::NotConnected(self.state.borrow().clone())),
        }
    }

    /// Queue the sentinel and close the queue behind it
    fn enqueue_stop(&self, len: usize) -> Result<()> {
        let mut outbound = self.outbound();
        match outbound.take() {
            Some(tx) if tx.send(Outbound::Stop { len }).is_ok() => {
                self.stop_queued.store(true, Ordering::Release);
                Ok(())
            }
            // Lost the race against another sentinel
            _ if self.stop_queued.load(Ordering::Acquire) => Ok(()),
            _ => Err(StreamerError::NotConnected(self.state.borrow().clone())),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn on_connect_failed(&self, channel: Channel, err: &ContractError) {
        error!(channel = %channel, error = %err, "Server not available");
        self.outbound().take();
        self.set_state(ConnectionState::Failed(err.to_string()));
        observability::record_transport_failure(channel, true);
        (self.callback)(SessionEvent::ConnectFailed { channel });
    }

    fn on_transport_failed(&self, channel: Channel, err: &ContractError) {
        error!(channel = %channel, error = %err, "Write failed, connection marked broken");
        self.outbound().take();
        self.metrics.inc_write_failures();
        self.set_state(ConnectionState::Failed(err.to_string()));
        observability::record_transport_failure(channel, false);
        (self.callback)(SessionEvent::TransportFailed {
            channel,
            message: err.to_string(),
        });
    }
}

/// Open connections of one session
struct Links<T> {
    events: T,
    play: Option<T>,
}

impl<T: Connection> Links<T> {
    async fn close(&mut self) {
        if let Err(e) = self.events.shutdown().await {
            warn!(error = %e, "Failed to close event connection");
        }
        if let Some(play) = self.play.as_mut() {
            if let Err(e) = play.shutdown().await {
                warn!(error = %e, "Failed to close play connection");
            }
        }
    }
}

async fn open_links<C: Connector>(
    inner: &Inner<C>,
) -> std::result::Result<Links<C::Conn>, (Channel, ContractError)> {
    let mut events = inner
        .connector
        .connect(Channel::Events, &inner.events_addr)
        .await
        .map_err(|e| (Channel::Events, e))?;

    let play = match inner.play_addr.as_deref() {
        Some(addr) => match inner.connector.connect(Channel::Play, addr).await {
            Ok(conn) => Some(conn),
            Err(e) => {
                let _ = events.shutdown().await;
                return Err((Channel::Play, e));
            }
        },
        None => None,
    };

    Ok(Links { events, play })
}

/// Worker task: connect, then drain the outbound queue in order
#[instrument(
    name = "event_streamer_worker",
    skip(inner, rx),
    fields(addr = %inner.events_addr)
)]
async fn run_worker<C: Connector>(inner: Arc<Inner<C>>, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    let mut links = match open_links(&inner).await {
        Ok(links) => links,
        Err((channel, e)) => {
            inner.on_connect_failed(channel, &e);
            return;
        }
    };
    inner.set_state(ConnectionState::Connected);
    info!(play = links.play.is_some(), "Event stream connected");

    while let Some(item) = rx.recv().await {
        match item {
            Outbound::Batch { packet, samples } => {
                if let Err(e) = links.events.write_all(&packet).await {
                    inner.on_transport_failed(Channel::Events, &e);
                    links.close().await;
                    return;
                }
                inner.metrics.inc_batches_sent(packet.len());
                observability::record_batch_sent(samples, packet.len());
                debug!(batch_len = samples, bytes = packet.len(), "Batch sent");
            }
            Outbound::Play(packet) => {
                let Some(play) = links.play.as_mut() else {
                    warn!("Play command without play connection");
                    continue;
                };
                if let Err(e) = play.write_all(&packet).await {
                    inner.on_transport_failed(Channel::Play, &e);
                    links.close().await;
                    return;
                }
                inner.metrics.inc_play_commands_sent();
                observability::record_play_command();
            }
            Outbound::Stop { len } => {
                if let Err(e) = links.events.write_all(&stop_sentinel(len)).await {
                    inner.on_transport_failed(Channel::Events, &e);
                    links.close().await;
                    return;
                }
                observability::record_stop_sentinel(Channel::Events);

                if let Some(play) = links.play.as_mut() {
                    match play.write_all(&stop_sentinel(PLAY_SIZE)).await {
                        Ok(()) => observability::record_stop_sentinel(Channel::Play),
                        Err(e) => warn!(error = %e, "Failed to send play stop sentinel"),
                    }
                }

                links.close().await;
                inner.set_state(ConnectionState::Disconnected);
                info!("Event session stopped");
                (inner.callback)(SessionEvent::SessionStopped);
                return;
            }
        }
    }

    // Queue closed without a stop request
    links.close().await;
    inner.set_state(ConnectionState::Disconnected);
    debug!("Event stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{event_channel, offset_cell, ClockOffset, OffsetPublisher, SensorSample};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;
    use wire_codec::{decode_event_packet, decode_play_packet, EventPacket, PlayPacket};

    #[derive(Clone, Default)]
    struct MockConnector {
        written: Arc<Mutex<Vec<(Channel, Vec<u8>)>>>,
        connects: Arc<AtomicUsize>,
        shutdowns: Arc<AtomicUsize>,
        refuse: Option<Channel>,
        fail_writes_after: Option<usize>,
        connect_delay_ms: u64,
    }

    impl MockConnector {
        fn written(&self, channel: Channel) -> Vec<Vec<u8>> {
            self.written
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| *c == channel)
                .map(|(_, bytes)| bytes.clone())
                .collect()
        }
    }

    struct MockConn {
        channel: Channel,
        connector: MockConnector,
        writes: usize,
    }

    impl Connector for MockConnector {
        type Conn = MockConn;

        async fn connect(&self, channel: Channel, addr: &str) -> std::result::Result<MockConn, ContractError> {
            if self.connect_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.connect_delay_ms)).await;
            }
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.refuse == Some(channel) {
                return Err(ContractError::connect_failure(channel, addr, "refused"));
            }
            Ok(MockConn {
                channel,
                connector: self.clone(),
                writes: 0,
            })
        }
    }

    impl Connection for MockConn {
        async fn write_all(&mut self, buf: &[u8]) -> std::result::Result<(), ContractError> {
            if self.connector.fail_writes_after == Some(self.writes) {
                return Err(ContractError::transport(self.channel, "broken pipe"));
            }
            self.writes += 1;
            self.connector
                .written
                .lock()
                .unwrap()
                .push((self.channel, buf.to_vec()));
            Ok(())
        }

        async fn read_exact(&mut self, _buf: &mut [u8]) -> std::result::Result<(), ContractError> {
            Err(ContractError::Other("write-only mock".to_string()))
        }

        async fn shutdown(&mut self) -> std::result::Result<(), ContractError> {
            self.connector.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Harness {
        streamer: EventStreamer<MockConnector>,
        connector: MockConnector,
        publisher: OffsetPublisher,
        events: UnboundedReceiver<SessionEvent>,
    }

    fn harness(connector: MockConnector, play_port: Option<u16>) -> Harness {
        let mut config = SessionConfig::for_host("127.0.0.1");
        config.host.play_port = play_port;
        let (publisher, reader) = offset_cell();
        let (callback, events) = event_channel();
        let streamer = EventStreamer::new(connector.clone(), &config, reader, callback);
        Harness {
            streamer,
            connector,
            publisher,
            events,
        }
    }

    fn batch(timestamps: &[i64]) -> EventBatch {
        timestamps
            .iter()
            .map(|t| SensorSample::new(0.5, -0.5, 9.81, *t))
            .collect::<Vec<_>>()
            .into()
    }

    async fn wait_for_state(
        streamer: &EventStreamer<MockConnector>,
        pred: impl FnMut(&ConnectionState) -> bool,
    ) {
        let mut rx = streamer.subscribe_state();
        timeout(Duration::from_secs(2), rx.wait_for(pred))
            .await
            .expect("state wait timed out")
            .expect("state channel closed");
    }

    async fn next_event(events: &mut UnboundedReceiver<SessionEvent>) -> SessionEvent {
        timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("event wait timed out")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let h = harness(MockConnector::default(), None);
        assert!(h.streamer.connect());
        assert!(!h.streamer.connect());
        wait_for_state(&h.streamer, |s| *s == ConnectionState::Connected).await;
        assert!(!h.streamer.connect());
        assert_eq!(h.connector.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_uncalibrated_batch_is_skipped() {
        let h = harness(MockConnector::default(), None);
        h.streamer.connect();
        wait_for_state(&h.streamer, |s| *s == ConnectionState::Connected).await;

        let err = h.streamer.send_batch(batch(&[1, 2, 3])).unwrap_err();
        assert!(matches!(
            err,
            StreamerError::Contract(ContractError::NotCalibrated)
        ));
        assert_eq!(h.streamer.metrics().snapshot().rejected_uncalibrated, 1);
        assert!(h.connector.written(Channel::Events).is_empty());
    }

    #[tokio::test]
    async fn test_send_before_connect_is_rejected() {
        let h = harness(MockConnector::default(), None);
        h.publisher.publish(ClockOffset::calibrated(10.0, 0.0));
        let err = h.streamer.send_batch(batch(&[1])).unwrap_err();
        assert!(matches!(
            err,
            StreamerError::NotConnected(ConnectionState::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_batches_wait_for_connect_and_keep_order() {
        let connector = MockConnector {
            connect_delay_ms: 30,
            ..Default::default()
        };
        let h = harness(connector, None);
        h.publisher.publish(ClockOffset::calibrated(250.7, 0.3));

        h.streamer.connect();
        // Queued while the connect task is still running
        for base in [1_000, 2_000, 3_000] {
            h.streamer.send_batch(batch(&[base, base + 1])).unwrap();
        }
        h.streamer.disconnect();
        wait_for_state(&h.streamer, |s| *s == ConnectionState::Disconnected).await;

        let packets = h.connector.written(Channel::Events);
        assert_eq!(packets.len(), 3);
        let stamps: Vec<i64> = packets
            .iter()
            .flat_map(|p| match decode_event_packet(p).unwrap() {
                EventPacket::Batch(records) => records.into_iter().map(|r| r.host_timestamp),
                EventPacket::Stop => panic!("unexpected sentinel"),
            })
            .collect();
        assert_eq!(stamps, vec![1_250, 1_251, 2_250, 2_251, 3_250, 3_251]);
        assert_eq!(h.streamer.metrics().snapshot().batches_sent, 3);
    }

    #[tokio::test]
    async fn test_stop_replaces_next_batch_with_sentinel() {
        let mut h = harness(MockConnector::default(), Some(10002));
        h.publisher.publish(ClockOffset::calibrated(5.0, 0.0));
        h.streamer.connect();

        h.streamer.send_batch(batch(&[1, 2, 3])).unwrap();
        h.streamer.request_stop();
        h.streamer.send_batch(batch(&[4, 5, 6])).unwrap();

        assert_eq!(next_event(&mut h.events).await, SessionEvent::SessionStopped);
        assert_eq!(h.streamer.state(), ConnectionState::Disconnected);

        let packets = h.connector.written(Channel::Events);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1], vec![0xFF; 60]);
        assert_eq!(decode_event_packet(&packets[1]).unwrap(), EventPacket::Stop);

        let play = h.connector.written(Channel::Play);
        assert_eq!(play.len(), 1);
        assert_eq!(decode_play_packet(&play[0]).unwrap(), PlayPacket::Stop);

        // Both connections closed, later sends refused
        assert_eq!(h.connector.shutdowns.load(Ordering::SeqCst), 2);
        assert!(h.streamer.send_batch(batch(&[7, 8, 9])).is_err());
    }

    #[tokio::test]
    async fn test_stop_does_not_need_calibration() {
        let mut h = harness(MockConnector::default(), None);
        h.streamer.connect();
        h.streamer.request_stop();
        h.streamer.send_batch(batch(&[1, 2])).unwrap();

        assert_eq!(next_event(&mut h.events).await, SessionEvent::SessionStopped);
        assert_eq!(h.connector.written(Channel::Events), vec![vec![0xFF; 40]]);
    }

    #[tokio::test]
    async fn test_connect_failure_reported() {
        let connector = MockConnector {
            refuse: Some(Channel::Events),
            ..Default::default()
        };
        let mut h = harness(connector, None);
        h.publisher.publish(ClockOffset::calibrated(1.0, 0.0));
        h.streamer.connect();

        assert_eq!(
            next_event(&mut h.events).await,
            SessionEvent::ConnectFailed {
                channel: Channel::Events
            }
        );
        assert!(matches!(h.streamer.state(), ConnectionState::Failed(_)));
        assert!(matches!(
            h.streamer.send_batch(batch(&[1])),
            Err(StreamerError::NotConnected(ConnectionState::Failed(_)))
        ));
    }

    #[tokio::test]
    async fn test_play_connect_failure_closes_event_connection() {
        let connector = MockConnector {
            refuse: Some(Channel::Play),
            ..Default::default()
        };
        let mut h = harness(connector, Some(10002));
        h.streamer.connect();

        assert_eq!(
            next_event(&mut h.events).await,
            SessionEvent::ConnectFailed {
                channel: Channel::Play
            }
        );
        assert_eq!(h.connector.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_write_failure_marks_broken_without_reconnect() {
        let connector = MockConnector {
            fail_writes_after: Some(1),
            ..Default::default()
        };
        let mut h = harness(connector, None);
        h.publisher.publish(ClockOffset::calibrated(1.0, 0.0));
        h.streamer.connect();

        h.streamer.send_batch(batch(&[1])).unwrap();
        h.streamer.send_batch(batch(&[2])).unwrap();

        match next_event(&mut h.events).await {
            SessionEvent::TransportFailed { channel, message } => {
                assert_eq!(channel, Channel::Events);
                assert!(message.contains("broken pipe"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(h.streamer.state(), ConnectionState::Failed(_)));
        assert_eq!(h.connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(h.connector.written(Channel::Events).len(), 1);
        assert_eq!(h.streamer.metrics().snapshot().write_failures, 1);
    }

    #[tokio::test]
    async fn test_play_command_translated_to_host_time() {
        let h = harness(MockConnector::default(), Some(10002));
        h.publisher.publish(ClockOffset::calibrated(-99.9, 0.0));
        h.streamer.connect();

        h.streamer.send_play_command(10_000).unwrap();
        h.streamer.disconnect();
        wait_for_state(&h.streamer, |s| *s == ConnectionState::Disconnected).await;

        let play = h.connector.written(Channel::Play);
        assert_eq!(play.len(), 1);
        assert_eq!(
            decode_play_packet(&play[0]).unwrap(),
            PlayPacket::Play(PlayCommand {
                host_scheduled_time: 9_901
            })
        );
    }

    #[tokio::test]
    async fn test_play_requires_play_port() {
        let h = harness(MockConnector::default(), None);
        h.publisher.publish(ClockOffset::calibrated(1.0, 0.0));
        h.streamer.connect();
        assert!(matches!(
            h.streamer.send_play_command(0),
            Err(StreamerError::PlayChannelDisabled)
        ));
    }

    #[tokio::test]
    async fn test_stop_now_without_pending_batch() {
        let mut h = harness(MockConnector::default(), None);
        h.streamer.connect();
        h.streamer.stop_now(200).unwrap();

        assert_eq!(next_event(&mut h.events).await, SessionEvent::SessionStopped);
        assert_eq!(h.connector.written(Channel::Events), vec![vec![0xFF; 200]]);
    }

    #[tokio::test]
    async fn test_stop_now_after_requested_stop_went_out() {
        let mut h = harness(MockConnector::default(), None);
        h.streamer.connect();
        h.streamer.request_stop();
        h.streamer.send_batch(batch(&[1, 2, 3])).unwrap();

        assert_eq!(next_event(&mut h.events).await, SessionEvent::SessionStopped);
        assert_eq!(h.streamer.state(), ConnectionState::Disconnected);

        // The sentinel is already out; no second one and no error
        h.streamer.stop_now(60).unwrap();
        assert_eq!(h.connector.written(Channel::Events), vec![vec![0xFF; 60]]);
        assert_eq!(h.streamer.metrics().snapshot().rejected_disconnected, 0);
    }

    #[tokio::test]
    async fn test_disconnect_without_stop_still_refuses_stop_now() {
        let h = harness(MockConnector::default(), None);
        h.streamer.connect();
        h.streamer.disconnect();
        assert!(matches!(
            h.streamer.stop_now(40),
            Err(StreamerError::NotConnected(_))
        ));
    }
}
