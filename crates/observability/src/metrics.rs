//! 帧流指标收集模块
//!
//! 记录发送结果、连接事件与写入失败，并提供在线统计工具。

use contracts::SensorType;
use metrics::{counter, gauge, histogram};

/// 记录一次 `send` 调用的结果
///
/// `outcome` 取值与 `SendOutcome::as_str` 一致，例如 `submitted`、
/// `pose_unavailable`、`write_in_progress`。
pub fn record_send_outcome(sensor_type: SensorType, outcome: &'static str) {
    counter!(
        "rm_streamer_send_total",
        "sensor_type" => sensor_type.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// 记录一条已写入套接字的消息
pub fn record_message_sent(bytes: usize, write_latency_ms: f64) {
    counter!("rm_streamer_messages_sent_total").increment(1);
    counter!("rm_streamer_bytes_sent_total").increment(bytes as u64);
    histogram!("rm_streamer_write_latency_ms").record(write_latency_ms);
}

/// 记录写入失败
///
/// `kind` 为 `peer_reset` 或 `io`。
pub fn record_write_failure(kind: &'static str) {
    counter!("rm_streamer_write_failures_total", "kind" => kind).increment(1);
}

/// 记录连接生命周期事件 (`accepted`、`replaced`、`reset`、`closed`)
pub fn record_connection_event(event: &'static str) {
    counter!("rm_streamer_connection_events_total", "event" => event).increment(1);
    match event {
        "accepted" => gauge!("rm_streamer_client_connected").set(1.0),
        "reset" | "closed" => gauge!("rm_streamer_client_connected").set(0.0),
        _ => {}
    }
}

/// 记录流开关状态
pub fn record_streaming_state(enabled: bool) {
    gauge!("rm_streamer_streaming_enabled").set(if enabled { 1.0 } else { 0.0 });
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

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
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

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
