//! 校准与事件流指标
//!
//! 通过 `metrics` facade 记录；未安装 recorder 时调用为空操作。

use contracts::{Channel, ClockOffset};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// 注册指标说明（Prometheus `# HELP`）
pub fn describe_metrics() {
    describe_counter!(
        "accel_sync_calibrations_total",
        "Finished calibration sessions by status"
    );
    describe_gauge!(
        "accel_sync_delta_t_ms",
        Unit::Milliseconds,
        "Host clock minus device clock from the last successful calibration"
    );
    describe_gauge!(
        "accel_sync_calibration_mse_ms",
        Unit::Milliseconds,
        "RMS prediction error of the last successful calibration"
    );
    describe_histogram!(
        "accel_sync_calibration_mse_ms_hist",
        Unit::Milliseconds,
        "RMS prediction error per successful calibration"
    );
    describe_counter!(
        "accel_sync_probe_steps_rejected_total",
        "Probe steps skipped as round-trip outliers"
    );
    describe_counter!(
        "accel_sync_samples_dropped_uncalibrated_total",
        "Samples discarded before a clock offset was published"
    );
    describe_counter!("accel_sync_batches_sent_total", "Event batches written");
    describe_counter!("accel_sync_samples_sent_total", "Samples written in event batches");
    describe_histogram!("accel_sync_batch_bytes", Unit::Bytes, "Encoded event batch size");
    describe_counter!("accel_sync_stop_sentinels_total", "Stop sentinels written by channel");
    describe_counter!("accel_sync_play_commands_total", "Play commands written");
    describe_counter!(
        "accel_sync_transport_failures_total",
        "Connect and transfer failures by channel"
    );
}

/// 记录一次校准结果
///
/// 成功时更新 deltaT / mse gauge，失败时只计数。
pub fn record_calibration(offset: &ClockOffset, rejected_steps: usize) {
    let status = if offset.is_ready() { "success" } else { "failure" };
    counter!("accel_sync_calibrations_total", "status" => status).increment(1);

    if offset.is_ready() {
        gauge!("accel_sync_delta_t_ms").set(offset.delta_t);
        gauge!("accel_sync_calibration_mse_ms").set(offset.mse);
        histogram!("accel_sync_calibration_mse_ms_hist").record(offset.mse);
    }

    if rejected_steps > 0 {
        counter!("accel_sync_probe_steps_rejected_total").increment(rejected_steps as u64);
    }
}

/// 未校准时丢弃的样本
pub fn record_samples_dropped(count: u64) {
    counter!("accel_sync_samples_dropped_uncalibrated_total").increment(count);
}

/// 记录批次发送
pub fn record_batch_sent(samples: usize, bytes: usize) {
    counter!("accel_sync_batches_sent_total").increment(1);
    counter!("accel_sync_samples_sent_total").increment(samples as u64);
    histogram!("accel_sync_batch_bytes").record(bytes as f64);
}

/// 记录停止哨兵发送
pub fn record_stop_sentinel(channel: Channel) {
    counter!("accel_sync_stop_sentinels_total", "channel" => channel.as_str()).increment(1);
}

pub fn record_play_command() {
    counter!("accel_sync_play_commands_total").increment(1);
}

/// 记录连接 / 传输失败
pub fn record_transport_failure(channel: Channel, connect: bool) {
    let phase = if connect { "connect" } else { "transfer" };
    counter!(
        "accel_sync_transport_failures_total",
        "channel" => channel.as_str(),
        "phase" => phase
    )
    .increment(1);
}

/// 校准结果聚合器
///
/// 在内存中聚合多次校准的 deltaT / mse，便于 CLI 输出摘要。
#[derive(Debug, Clone, Default)]
pub struct CalibrationAggregator {
    /// 总运行次数
    pub total_runs: u64,

    /// 失败次数
    pub failed_runs: u64,

    /// 被拒绝的探测步总数
    pub rejected_steps: u64,

    /// deltaT 统计 (ms)
    pub delta_t_stats: RunningStats,

    /// mse 统计 (ms)
    pub mse_stats: RunningStats,
}

impl CalibrationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, offset: &ClockOffset, rejected_steps: usize) {
        self.total_runs += 1;
        self.rejected_steps += rejected_steps as u64;

        if offset.is_ready() {
            self.delta_t_stats.push(offset.delta_t);
            self.mse_stats.push(offset.mse);
        } else {
            self.failed_runs += 1;
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> CalibrationSummary {
        CalibrationSummary {
            total_runs: self.total_runs,
            failed_runs: self.failed_runs,
            rejected_steps: self.rejected_steps,
            failure_rate: if self.total_runs > 0 {
                self.failed_runs as f64 / self.total_runs as f64 * 100.0
            } else {
                0.0
            },
            delta_t_ms: StatsSummary::from(&self.delta_t_stats),
            mse_ms: StatsSummary::from(&self.mse_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 校准摘要
#[derive(Debug, Clone, Default)]
pub struct CalibrationSummary {
    pub total_runs: u64,
    pub failed_runs: u64,
    pub rejected_steps: u64,
    pub failure_rate: f64,
    pub delta_t_ms: StatsSummary,
    pub mse_ms: StatsSummary,
}

impl std::fmt::Display for CalibrationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Calibration Summary ===")?;
        writeln!(f, "Runs: {}", self.total_runs)?;
        writeln!(
            f,
            "Failed runs: {} ({:.2}%)",
            self.failed_runs, self.failure_rate
        )?;
        writeln!(f, "Rejected probe steps: {}", self.rejected_steps)?;
        writeln!(f, "deltaT (ms): {}", self.delta_t_ms)?;
        writeln!(f, "mse (ms): {}", self.mse_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Welford 在线均值 / 方差，附带极值
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            *self = Self {
                count: 1,
                mean: value,
                m2: 0.0,
                min: value,
                max: value,
            };
            return;
        }

        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let before = value - self.mean;
        self.mean += before / self.count as f64;
        self.m2 += before * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// 0 when empty
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (n - 1), 0 below two values
    pub fn variance(&self) -> f64 {
        match self.count {
            0 | 1 => 0.0,
            n => self.m2 / (n - 1) as f64,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
