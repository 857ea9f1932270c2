//! LivenessMonitor processor.
//!
//! The LivenessMonitor is responsible for:
//! - Pushing a keep-alive into each channel that has an empty queue and
//!   has not been read within `idle_timeout` (that channel only, never a
//!   broadcast)
//! - Evicting channels whose reader has stopped: channels stuck in
//!   `Draining` for `evict_after`, or holding unread items that nobody
//!   read for `evict_after`
//! - Picking up new settings from its [`ConfigStore`] without a restart

use crate::config::{ConfigStore, ConfigWatcher};
use crate::hub::{ChannelInfo, ChannelState, Hub};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Monitor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// How often the monitor sweeps the registry.
    pub period: Duration,
    /// A channel not read for this long gets a keep-alive.
    pub idle_timeout: Duration,
    /// A channel whose reader stalled for this long is evicted.
    pub evict_after: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(1),
            evict_after: Duration::from_secs(30),
        }
    }
}

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub keep_alives: usize,
    pub evicted: usize,
}

/// Periodic keep-alive and eviction pass over the hub's channels.
pub struct LivenessMonitor {
    hub: Hub,
}

impl LivenessMonitor {
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    /// Run until the shutdown signal flips to `true`.
    pub async fn run(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
        config_store: ConfigStore<MonitorConfig>,
        mut config_watcher: ConfigWatcher,
    ) {
        let mut config = config_store.snapshot().await;
        let mut ticker = Self::ticker(&config);
        info!(period = ?config.period, evict_after = ?config.evict_after, "LivenessMonitor started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("LivenessMonitor received shutdown signal");
                        break;
                    }
                }

                Ok(()) = config_watcher.changed() => {
                    config = config_store.snapshot().await;
                    ticker = Self::ticker(&config);
                    info!(period = ?config.period, evict_after = ?config.evict_after, "LivenessMonitor reloaded config");
                }

                _ = ticker.tick() => {
                    let report = self.sweep(&config);
                    if report != SweepReport::default() {
                        debug!(keep_alives = report.keep_alives, evicted = report.evicted, "Liveness sweep");
                    }
                }
            }
        }

        info!("LivenessMonitor shutdown complete");
    }

    /// One pass over every registered channel.
    pub fn sweep(&self, config: &MonitorConfig) -> SweepReport {
        let mut report = SweepReport::default();

        for channel in self.hub.channels() {
            if Self::is_stalled(&channel, config) {
                if self.hub.evict(channel.id) {
                    warn!(
                        channel_id = %channel.id,
                        queued = channel.queued,
                        dropped = channel.dropped,
                        "Evicted stalled subscriber"
                    );
                    report.evicted += 1;
                }
                continue;
            }

            if channel.state == ChannelState::Active
                && channel.queued == 0
                && channel.idle_for >= config.idle_timeout
                && self.hub.push_keep_alive(channel.id)
            {
                report.keep_alives += 1;
            }
        }

        report
    }

    fn is_stalled(channel: &ChannelInfo, config: &MonitorConfig) -> bool {
        match channel.draining_for {
            Some(draining_for) => draining_for >= config.evict_after,
            None => channel.queued > 0 && channel.idle_for >= config.evict_after,
        }
    }

    fn ticker(config: &MonitorConfig) -> tokio::time::Interval {
        let period = config.period.max(Duration::from_millis(10));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}
