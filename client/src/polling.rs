//! Periodic refresh tied to a mounted screen.
//!
//! A poller runs its tick once immediately and then every period until its
//! [`PollHandle`] is stopped or dropped. Stopping never cancels a tick that
//! is already running; the loop exits once it returns.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use consume_common::identity::{User, UserId};

use crate::client::MarketClient;
use crate::counters::{CounterReport, Counters};
use crate::notifications::Notification;

/// Owner of a running poller. Dropping it stops the poller.
pub struct PollHandle {
    name: &'static str,
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Ask the poller to stop after the current tick, if any.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Stop and wait for the loop to exit.
    pub async fn stopped(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!("Poller {} ended abnormally: {err}", self.name);
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run `tick` now and then every `period` on the tokio runtime.
pub fn spawn_poller<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> PollHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    // `interval` panics on a zero period.
    let period = period.max(Duration::from_millis(1));
    let (stop, mut stopped) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!("Poller {name} started (every {}s)", period.as_secs_f32());
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = stopped.changed() => break,
            }
            if *stopped.borrow() {
                break;
            }
            tick().await;
        }
        tracing::debug!("Poller {name} stopped");
    });
    PollHandle {
        name,
        stop,
        task: Some(task),
    }
}

// ─── Counter badges ──────────────────────────────────────────────────────────

/// What the navigation badges display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BadgeState {
    pub counters: Counters,
    /// The last refresh was degraded; `counters` may be out of date.
    pub stale: bool,
    /// A complete refresh has been shown at least once.
    pub loaded: bool,
}

impl BadgeState {
    /// Fold a refresh into the displayed state. A degraded refresh keeps the
    /// last complete value; before any complete value it shows the partial
    /// counts.
    pub fn apply(&mut self, report: &CounterReport) {
        if !report.is_degraded() {
            self.counters = report.counters;
            self.stale = false;
            self.loaded = true;
        } else {
            if !self.loaded {
                self.counters = report.counters;
            }
            self.stale = true;
        }
    }
}

/// Counter badges of one signed-in user, refreshed in the background.
pub struct CounterBadges {
    state: watch::Receiver<BadgeState>,
    poller: PollHandle,
}

impl CounterBadges {
    pub fn mount(client: MarketClient, user: User) -> Self {
        let period = client.config().counters_poll;
        let (tx, state) = watch::channel(BadgeState::default());
        let tx = Arc::new(tx);
        let poller = spawn_poller("counters", period, move || {
            let client = client.clone();
            let user = user.clone();
            let tx = Arc::clone(&tx);
            async move {
                let report = client.get_counters(&user.id, user.selling_store(), false).await;
                tx.send_modify(|state| state.apply(&report));
            }
        });
        Self { state, poller }
    }

    pub fn current(&self) -> BadgeState {
        *self.state.borrow()
    }

    /// Receiver that wakes on every published refresh.
    pub fn subscribe(&self) -> watch::Receiver<BadgeState> {
        self.state.clone()
    }

    pub async fn unmount(self) {
        self.poller.stopped().await;
    }
}

// ─── Floating notification bell ──────────────────────────────────────────────

/// Unread notifications of one user, newest first, refreshed in the
/// background.
pub struct NotificationBell {
    state: watch::Receiver<Vec<Notification>>,
    poller: PollHandle,
}

impl NotificationBell {
    pub fn mount(client: MarketClient, user: UserId) -> Self {
        let period = client.config().notifications_poll;
        let pruned = client.notifications().prune();
        if pruned > 0 {
            tracing::debug!("Pruned {pruned} old notifications");
        }
        let (tx, state) = watch::channel(Vec::new());
        let tx = Arc::new(tx);
        let poller = spawn_poller("notifications", period, move || {
            let unread = client.notifications().unread_for(&user);
            let tx = Arc::clone(&tx);
            async move {
                tx.send_if_modified(|current| {
                    if *current == unread {
                        return false;
                    }
                    *current = unread;
                    true
                });
            }
        });
        Self { state, poller }
    }

    pub fn unread(&self) -> Vec<Notification> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.state.clone()
    }

    pub async fn unmount(self) {
        self.poller.stopped().await;
    }
}
