use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{MetricsSource, ProviderError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    Low,
    Moderate,
    High,
}

impl UsageLevel {
    pub fn from_percent(value: u8) -> Self {
        match value {
            0..=29 => UsageLevel::Low,
            30..=69 => UsageLevel::Moderate,
            _ => UsageLevel::High,
        }
    }
}

/// Point-in-time resource usage, percentages in `0..=99`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceSnapshot {
    pub cpu: u8,
    pub memory: u8,
    pub disk: u8,
    pub network: u8,
    pub database: u8,
    pub network_speed_mbps: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub sampled_at: OffsetDateTime,
}

impl ResourceSnapshot {
    /// `(label, percent)` pairs in display order.
    pub fn readings(&self) -> [(&'static str, u8); 5] {
        [
            ("CPU Usage", self.cpu),
            ("Memory Usage", self.memory),
            ("Disk Usage", self.disk),
            ("Network Activity", self.network),
            ("Database Load", self.database),
        ]
    }
}

/// Stand-in source that draws every reading uniformly at random.
#[derive(Debug, Clone, Default)]
pub struct RandomMetrics;

impl RandomMetrics {
    pub fn snapshot() -> ResourceSnapshot {
        let mut rng = rand::thread_rng();
        ResourceSnapshot {
            cpu: rng.gen_range(0..100),
            memory: rng.gen_range(0..100),
            disk: rng.gen_range(0..100),
            network: rng.gen_range(0..100),
            database: rng.gen_range(0..100),
            network_speed_mbps: (rng.gen_range(5.0..1000.0_f64) * 10.0).round() / 10.0,
            sampled_at: OffsetDateTime::now_utc(),
        }
    }
}

#[async_trait]
impl MetricsSource for RandomMetrics {
    async fn sample(&self) -> Result<ResourceSnapshot, ProviderError> {
        Ok(Self::snapshot())
    }
}

/// Samples `source` at a fixed rate into a watch channel. The task ends once every
/// receiver is gone; failed samples are logged and skipped.
pub fn spawn_sampler(
    source: Arc<dyn MetricsSource>,
    period: Duration,
) -> (watch::Receiver<Option<ResourceSnapshot>>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(None);
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match source.sample().await {
                Ok(snapshot) => {
                    if tx.send(Some(snapshot)).is_err() {
                        debug!("metrics sampler has no receivers; stopping");
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "metrics sample failed"),
            }
        }
    });
    (rx, handle)
}
