//! Background jobs: passive production and periodic persistence.
//!
//! The two cadences are independent so a slow disk write never delays
//! production fairness across players, and either period can be tuned
//! or tested on its own.

use crate::store::StateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Cadences for the two background jobs.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Period of the passive-production sweep.
    pub production_period: Duration,
    /// Period of the durable flush.
    pub flush_period: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            production_period: Duration::from_secs(1),
            flush_period: Duration::from_secs(60),
        }
    }
}

/// Owns the two background tasks; dropping the handle aborts them.
pub struct SchedulerHandle {
    production: JoinHandle<()>,
    flush: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops both jobs. Idempotent; also invoked on drop.
    pub fn shutdown(&self) {
        self.production.abort();
        self.flush.abort();
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Starts the production and flush jobs against `store`.
pub fn spawn(store: Arc<StateStore>, config: SchedulerConfig) -> SchedulerHandle {
    info!(
        production_period_ms = config.production_period.as_millis() as u64,
        flush_period_ms = config.flush_period.as_millis() as u64,
        "scheduler starting"
    );

    let production = {
        let store = store.clone();
        let period = config.production_period;
        // Sub-second test cadences still credit whole seconds; the
        // rules engine only deals in whole elapsed seconds.
        let credit_secs = period.as_secs().max(1);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let sweep = store.tick_all(credit_secs).await;
                if sweep.skipped > 0 {
                    debug!(skipped = sweep.skipped, "players busy during production sweep");
                }
            }
        })
    };

    let flush = {
        let period = config.flush_period;
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick fires immediately; skip it so a
            // fresh server does not flush an empty cache.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let summary = store.flush_all().await;
                debug!(saved = summary.saved, failed = summary.failed, "periodic flush");
            }
        })
    };

    SchedulerHandle { production, flush }
}
