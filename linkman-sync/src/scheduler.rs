//! Periodic mirror scheduler.
//!
//! Two states: stopped, or running with a timer task. The timer fires once
//! immediately and then every period. Each tick starts a mirror pass on its
//! own task, guarded so at most one pass is in flight: a tick that arrives
//! while a pass is still applying its plan is dropped, not queued.
//!
//! Stopping cancels future ticks only. A pass that already started runs to
//! completion, since cutting it short could leave a half-applied plan.

use crate::error::SyncResult;
use crate::reconciler::{MirrorOutcome, Reconciler};
use crate::settings::{SettingsChanged, SettingsGateway, read_snapshot};
use async_trait::async_trait;
use linkman_types::SettingKey;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Default period between mirror passes.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5 * 60);

/// A single mirror pass, as invoked by the scheduler.
#[async_trait]
pub trait MirrorPass: Send + Sync + 'static {
    async fn run_mirror(&self) -> SyncResult<MirrorOutcome>;
}

#[async_trait]
impl MirrorPass for Reconciler {
    async fn run_mirror(&self) -> SyncResult<MirrorOutcome> {
        self.mirror().await
    }
}

/// Configuration for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between ticks. Zero is treated as one millisecond.
    pub period: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
        }
    }
}

/// Owns the recurring mirror timer.
pub struct Scheduler {
    pass: Arc<dyn MirrorPass>,
    config: SchedulerConfig,
    timer: Mutex<Option<JoinHandle<()>>>,
    in_flight: Arc<tokio::sync::Mutex<()>>,
}

impl Scheduler {
    pub fn new(pass: Arc<dyn MirrorPass>, config: SchedulerConfig) -> Self {
        Self {
            pass,
            config,
            timer: Mutex::new(None),
            in_flight: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        // The guarded value is a plain handle; a poisoned lock leaves it intact.
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns true while the timer is registered.
    pub fn is_running(&self) -> bool {
        self.timer().is_some()
    }

    /// Returns true while a mirror pass is executing.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Starts the timer, replacing any previous one. The first pass runs
    /// immediately. Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut timer = self.timer();
        if let Some(previous) = timer.take() {
            previous.abort();
            debug!("Replacing running mirror timer");
        }

        let pass = Arc::clone(&self.pass);
        let in_flight = Arc::clone(&self.in_flight);
        let period = self.config.period.max(Duration::from_millis(1));

        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                spawn_pass(&pass, &in_flight);
            }
        }));
        info!("Mirror scheduler started, period {:?}", period);
    }

    /// Cancels the timer. No-op when already stopped.
    pub fn stop(&self) {
        if let Some(timer) = self.timer().take() {
            timer.abort();
            info!("Mirror scheduler stopped");
        }
    }

    /// Runs one mirror pass now, unless one is already in flight.
    /// Returns `None` when the trigger was coalesced.
    pub async fn trigger_now(&self) -> Option<SyncResult<MirrorOutcome>> {
        let Ok(_guard) = Arc::clone(&self.in_flight).try_lock_owned() else {
            debug!("Mirror pass already in flight, dropping manual trigger");
            return None;
        };
        Some(self.pass.run_mirror().await)
    }

    /// Applies a settings change: starts on `autoSync = true`, stops on
    /// `autoSync = false`. Changes that did not touch `autoSync` are ignored.
    pub fn on_settings_changed(&self, event: &SettingsChanged) {
        if !event.touched(SettingKey::AutoSync) {
            return;
        }
        self.apply_auto_sync(event.settings.auto_sync);
    }

    fn apply_auto_sync(&self, enabled: bool) {
        if enabled {
            self.start();
        } else {
            self.stop();
        }
    }

    /// Startup hook: reads the persisted `autoSync` and starts if set.
    /// Returns whether the scheduler was started.
    pub fn bootstrap(&self, settings: &SettingsGateway) -> SyncResult<bool> {
        let auto_sync = settings.read()?.auto_sync;
        if auto_sync {
            self.start();
        }
        Ok(auto_sync)
    }

    /// Follows settings changes until the gateway or the scheduler is
    /// dropped. The task holds neither alive.
    pub fn follow(self: &Arc<Self>, settings: &SettingsGateway) -> JoinHandle<()> {
        let scheduler = Arc::downgrade(self);
        let backend = settings.backend();
        let mut events = settings.subscribe();

        tokio::spawn(async move {
            loop {
                let auto_sync = match events.recv().await {
                    Ok(event) if event.touched(SettingKey::AutoSync) => event.settings.auto_sync,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Missed {} settings events, re-reading settings", missed);
                        match read_snapshot(backend.as_ref()) {
                            Ok(current) => current.auto_sync,
                            Err(e) => {
                                error!("Failed to re-read settings: {}", e);
                                continue;
                            }
                        }
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(scheduler) = scheduler.upgrade() else {
                    break;
                };
                scheduler.apply_auto_sync(auto_sync);
            }
            debug!("No longer following settings changes");
        })
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Starts a pass on its own task if none is running.
fn spawn_pass(pass: &Arc<dyn MirrorPass>, in_flight: &Arc<tokio::sync::Mutex<()>>) {
    let Ok(guard) = Arc::clone(in_flight).try_lock_owned() else {
        debug!("Mirror pass still in flight, dropping tick");
        return;
    };
    let pass = Arc::clone(pass);
    tokio::spawn(async move {
        match pass.run_mirror().await {
            Ok(MirrorOutcome::Applied(report)) => debug!("Scheduled mirror applied: {:?}", report),
            Ok(MirrorOutcome::Skipped) => debug!("Scheduled mirror skipped"),
            Ok(MirrorOutcome::Busy) => debug!("Scheduled mirror skipped, lease held elsewhere"),
            Err(e) => error!("Scheduled mirror failed: {}", e),
        }
        drop(guard);
    });
}
