//! Plan/usage status polling.
//!
//! The dashboard shell wants a continuously fresh `{plan, used_mb, total_mb,
//! can_deploy}` view without wiring every widget to the backend. This module
//! spawns one tokio task per dashboard session that polls the status endpoint on
//! a fixed cadence and publishes the latest snapshot over a watch channel.

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::backend::GatewayState;
use crate::models::{StatusSnapshot, UserStatus};
use std::time::Duration;

/// StatusPollerHandle
///
/// Owns the polling task. Dropping the handle aborts the task, which is the
/// cancellation contract: once the owning scope is gone, no further snapshot
/// updates are observable anywhere. Receivers obtained from `subscribe` keep
/// seeing the final retained snapshot but never a new one.
pub struct StatusPollerHandle {
    rx: watch::Receiver<StatusSnapshot>,
    task: JoinHandle<()>,
}

impl StatusPollerHandle {
    /// The latest published snapshot. `loading` stays true until the first
    /// successful fetch.
    pub fn latest(&self) -> StatusSnapshot {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.rx.clone()
    }
}

impl Drop for StatusPollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// spawn_status_poller
///
/// Starts the polling task: one status fetch immediately, then one per interval
/// tick. Ticks are strictly sequential—a slow response delays the next tick
/// rather than stacking a second in-flight request, so there is never more than
/// one outstanding status call per poller.
///
/// Failure policy: a failed tick is logged and the previous snapshot retained.
/// The dashboard prefers slightly stale numbers over flashing back to zeros on
/// every transient hiccup.
pub fn spawn_status_poller(
    gateway: GatewayState,
    cookie: Option<String>,
    interval: Duration,
) -> StatusPollerHandle {
    let (tx, rx) = watch::channel(StatusSnapshot::default());

    let task = tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        // A delayed tick just shifts the cadence; catching up would burst
        // redundant requests at the backend.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match fetch_once(&gateway, cookie.as_deref()).await {
                Some(status) => {
                    let snapshot = StatusSnapshot {
                        status,
                        loading: false,
                        fetched_at: Some(Utc::now()),
                    };
                    // Receivers may all be gone; polling continues harmlessly
                    // until the handle is dropped.
                    let _ = tx.send(snapshot);
                }
                None => {
                    tracing::warn!("status poll tick failed; retaining previous snapshot");
                }
            }
        }
    });

    StatusPollerHandle { rx, task }
}

/// fetch_once
///
/// One status round-trip, folded to `Option`: transport errors, non-2xx replies
/// and undecodable bodies all count as a failed tick.
async fn fetch_once(gateway: &GatewayState, cookie: Option<&str>) -> Option<UserStatus> {
    let reply = match gateway.fetch_status(cookie).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::debug!(error = %e, "status fetch failed");
            return None;
        }
    };

    if !(200..300).contains(&reply.status) {
        return None;
    }

    serde_json::from_value::<UserStatus>(reply.body).ok()
}
