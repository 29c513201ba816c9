//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 环回 TCP e2e 测试：校准 -> 事件流 -> 停止哨兵

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{SessionConfig, PROBE_PACKET_SIZE};

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::for_host("192.168.1.100");
        config_loader::validate(&config).unwrap();
        assert_eq!(config.calibration.probe_packet_size, PROBE_PACKET_SIZE);
    }

    #[test]
    fn test_wire_sizes_match_contracts() {
        assert_eq!(wire_codec::PROBE_SIZE, PROBE_PACKET_SIZE);
        assert_eq!(wire_codec::REPLY_SIZE, PROBE_PACKET_SIZE);
        assert_eq!(wire_codec::event_packet_size(10), 200);
    }

    #[test]
    fn test_serialized_defaults_load_back() {
        let config = SessionConfig::for_host("10.1.1.1");
        let toml = ConfigLoader::to_toml(&config).unwrap();
        let loaded = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(loaded.host.calibration_addr(), "10.1.1.1:10000");
        assert_eq!(loaded.calibration.warmup_discard, 10);
        assert_eq!(loaded.network.connect_timeout_ms, 5000);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use clock_sync::{CalibrationState, Calibrator};
    use contracts::{
        event_channel, Channel, Clock, ClockOffset, SessionConfig, SessionEvent, SystemClock,
    };
    use host_endpoint::{HostEndpoint, HostEndpointConfig, HostEvent, SkewedClock};
    use ingestion::{SampleIngestor, SubmitOutcome};
    use streamer::{ConnectionState, EventStreamer, TcpConnector};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;

    const HOST_SKEW_MS: i64 = 5_000;

    async fn next_session_event(events: &mut UnboundedReceiver<SessionEvent>) -> SessionEvent {
        timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("session event timed out")
            .expect("session event channel closed")
    }

    /// Collect host events until both stop sentinels arrived
    async fn collect_until_stopped(events: &mut UnboundedReceiver<HostEvent>) -> Vec<HostEvent> {
        let mut seen = Vec::new();
        let mut events_stopped = false;
        let mut play_stopped = false;

        while !(events_stopped && play_stopped) {
            let event = timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("host event timed out")
                .expect("host event channel closed");
            if let HostEvent::StopReceived { channel, .. } = &event {
                match channel {
                    Channel::Events => events_stopped = true,
                    Channel::Play => play_stopped = true,
                    Channel::Calibration => {}
                }
            }
            seen.push(event);
        }
        seen
    }

    /// End-to-end test: Calibrator -> SampleIngestor -> EventStreamer -> HostEndpoint
    ///
    /// 验证完整的数据流：
    /// 1. 设备对时钟超前 5s 的主机完成校准
    /// 2. 校准后的样本按批次发送，时间戳转换到主机时钟
    /// 3. 播放命令与停止哨兵到达主机
    #[tokio::test]
    async fn test_e2e_loopback_session() {
        // Setup: host endpoint with a skewed clock
        let endpoint = HostEndpoint::bind(
            &HostEndpointConfig::ephemeral(4, true),
            Arc::new(SkewedClock::new(SystemClock, HOST_SKEW_MS)),
        )
        .await
        .unwrap();
        let mut config: SessionConfig = endpoint.session_config();
        config.calibration.steps = 30;
        let (host, mut host_events) = endpoint.spawn();

        // Calibrate
        let (callback, mut events) = event_channel();
        let connector = TcpConnector::new(&config.network);
        let calibrator = Calibrator::new(connector, SystemClock, &config, callback.clone());
        let estimate = calibrator.calibrate().await.unwrap().unwrap();
        assert!(
            (estimate.delta_t - HOST_SKEW_MS as f64).abs() < 50.0,
            "delta_t = {}",
            estimate.delta_t
        );
        assert_eq!(calibrator.state(), CalibrationState::Calibrated);
        assert!(matches!(
            next_session_event(&mut events).await,
            SessionEvent::CalibrationComplete { success: true, .. }
        ));
        let offset = calibrator.offset();

        // Stream
        let streamer = EventStreamer::new(connector, &config, calibrator.offset_reader(), callback);
        let mut ingestor =
            SampleIngestor::new(4, calibrator.offset_reader(), streamer.clone()).unwrap();
        assert!(streamer.connect());
        let mut state = streamer.subscribe_state();
        timeout(
            Duration::from_secs(5),
            state.wait_for(|s| *s == ConnectionState::Connected),
        )
        .await
        .unwrap()
        .unwrap();

        let base = SystemClock.now_ms();
        let mut handed_off = 0;
        for i in 0..8 {
            let outcome = ingestor.submit_sample(i as f32, -(i as f32), 9.81, base + i);
            if outcome == SubmitOutcome::BatchHandedOff {
                handed_off += 1;
            }
        }
        assert_eq!(handed_off, 2);

        streamer.send_play_command(base + 1_000).unwrap();

        // The next full batch becomes the stop sentinel
        streamer.request_stop();
        for i in 8..12 {
            ingestor.submit_sample(0.0, 0.0, 9.81, base + i);
        }
        assert_eq!(next_session_event(&mut events).await, SessionEvent::SessionStopped);
        assert_eq!(streamer.state(), ConnectionState::Disconnected);

        // Host side
        let seen = collect_until_stopped(&mut host_events).await;
        let batches: Vec<_> = seen
            .iter()
            .filter_map(|e| match e {
                HostEvent::BatchReceived { records, .. } => Some(records.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(batches.len(), 2);
        let stamps: Vec<i64> = batches.iter().flatten().map(|r| r.host_timestamp).collect();
        let expected: Vec<i64> = (0..8).map(|i| offset.to_host_time(base + i)).collect();
        assert_eq!(stamps, expected);
        assert_eq!(batches[1][3].x, 7.0);

        let lateness = seen
            .iter()
            .find_map(|e| match e {
                HostEvent::PlayReceived { lateness_ms, .. } => Some(*lateness_ms),
                _ => None,
            })
            .expect("play command not received");
        // Sent right away for a time 1s ahead
        assert!((lateness + 1_000).abs() < 100, "lateness = {}", lateness);

        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_unreachable_host() {
        // Grab a free port, then close it again
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = SessionConfig::for_host("127.0.0.1");
        config.host.calibration_port = port;
        config.host.event_port = port;
        config.network.connect_timeout_ms = 500;

        let (callback, mut events) = event_channel();
        let connector = TcpConnector::new(&config.network);
        let calibrator = Calibrator::new(connector, SystemClock, &config, callback.clone());

        assert!(calibrator.calibrate().await.unwrap().is_err());
        assert_eq!(
            next_session_event(&mut events).await,
            SessionEvent::ConnectFailed {
                channel: Channel::Calibration
            }
        );
        assert_eq!(
            next_session_event(&mut events).await,
            SessionEvent::CalibrationComplete {
                success: false,
                delta_t: 0.0,
                mse: 0.0
            }
        );
        assert_eq!(calibrator.offset(), ClockOffset::NOT_READY);

        // Nothing is sent while uncalibrated
        let streamer = EventStreamer::new(connector, &config, calibrator.offset_reader(), callback);
        let mut ingestor = SampleIngestor::new(2, calibrator.offset_reader(), streamer).unwrap();
        for i in 0..10 {
            assert_eq!(
                ingestor.submit_sample(0.0, 0.0, 9.81, i),
                SubmitOutcome::Dropped
            );
        }
        assert_eq!(ingestor.metrics().snapshot().samples_dropped, 10);
    }
}
