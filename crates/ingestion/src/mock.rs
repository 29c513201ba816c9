//! Mock 加速度计
//!
//! 用于无真实传感器环境的测试与 CLI 演示。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_channel::{bounded, Receiver};
use contracts::{Clock, SensorSample};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

/// Mock 加速度计配置
#[derive(Debug, Clone)]
pub struct MockAccelerometerConfig {
    /// 采样频率 (Hz)
    pub rate_hz: f64,

    /// 正弦摆动幅度 (m/s²)
    pub amplitude: f32,

    /// 每轴均匀噪声幅度 (m/s²)
    pub noise: f32,

    /// 随机种子
    pub seed: u64,
}

impl Default for MockAccelerometerConfig {
    fn default() -> Self {
        Self {
            rate_hz: 50.0,
            amplitude: 2.0,
            noise: 0.05,
            seed: 7,
        }
    }
}

/// Mock 加速度计
///
/// 按固定频率生成带设备时间戳的样本。
pub struct MockAccelerometer {
    config: MockAccelerometerConfig,
    running: Arc<AtomicBool>,
}

impl MockAccelerometer {
    pub fn new(config: MockAccelerometerConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_rate(rate_hz: f64) -> Self {
        Self::new(MockAccelerometerConfig {
            rate_hz,
            ..Default::default()
        })
    }

    /// 启动采样任务，返回样本接收端
    ///
    /// 接收端被丢弃或调用 [`MockAccelerometer::stop`] 后任务退出。
    pub fn start<K>(&self, clock: K, channel_capacity: usize) -> Receiver<SensorSample>
    where
        K: Clock + 'static,
    {
        let (tx, rx) = bounded(channel_capacity.max(1));
        let config = self.config.clone();
        let running = self.running.clone();
        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let interval = Duration::from_secs_f64(1.0 / config.rate_hz.max(1e-3));
            let mut rng = StdRng::seed_from_u64(config.seed);
            let mut n: u64 = 0;

            debug!(rate_hz = config.rate_hz, "mock accelerometer started");

            while running.load(Ordering::Relaxed) {
                let sample = {
                    let phase = n as f32 * 0.1;
                    let mut jitter = || {
                        if config.noise > 0.0 {
                            rng.random_range(-config.noise..=config.noise)
                        } else {
                            0.0
                        }
                    };
                    SensorSample::new(
                        config.amplitude * phase.sin() + jitter(),
                        config.amplitude * phase.cos() + jitter(),
                        9.81 + jitter(),
                        clock.now_ms(),
                    )
                };
                n += 1;

                if tx.send(sample).await.is_err() {
                    debug!("mock accelerometer channel closed");
                    break;
                }
                trace!(n, timestamp = sample.device_timestamp, "mock sample sent");

                tokio::time::sleep(interval).await;
            }

            running.store(false, Ordering::SeqCst);
            debug!(samples = n, "mock accelerometer stopped");
        });

        rx
    }

    /// 停止采样
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
