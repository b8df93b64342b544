//! Room reaper background task.
//!
//! Periodically deletes membership entries for rooms that have been empty
//! for at least the configured TTL. Reaping closes the signaling session
//! only; persisted room, source and route records are untouched.
//!
//! # Graceful Shutdown
//!
//! The task is owned through a [`RoomReaperHandle`]. Cancelling its token
//! lets the current pass finish and then exits the loop.

use crate::config::Config;
use crate::observability::metrics;
use crate::presence::MembershipTable;
use crate::types::RoomId;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Configuration for the room reaper.
#[derive(Debug, Clone)]
pub struct RoomReaperConfig {
    /// Time between passes.
    pub interval: Duration,
    /// How long a room must have been empty before it is deleted.
    pub ttl: Duration,
}

impl Default for RoomReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(crate::config::DEFAULT_REAPER_INTERVAL_SECONDS),
            ttl: Duration::from_secs(crate::config::DEFAULT_ROOM_TTL_SECONDS),
        }
    }
}

impl From<&Config> for RoomReaperConfig {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.reaper_interval(),
            ttl: config.room_ttl(),
        }
    }
}

/// Run a single reap pass and return the deleted rooms.
///
/// Exposed so tests can drive passes directly instead of waiting on the
/// interval.
pub fn reap_once(membership: &MembershipTable, ttl: Duration) -> Vec<RoomId> {
    let started = std::time::Instant::now();
    let reaped = membership.reap_expired(ttl, Instant::now());
    metrics::record_reap_pass(reaped.len(), started.elapsed());

    if reaped.is_empty() {
        debug!(target: "studio.task.room_reaper", "No rooms to reap");
    } else {
        metrics::set_rooms_active(membership.room_count());
        info!(
            target: "studio.task.room_reaper",
            reaped_count = reaped.len(),
            rooms_remaining = membership.room_count(),
            "Reaped idle rooms"
        );
        for room_id in &reaped {
            debug!(target: "studio.task.room_reaper", room_id = %room_id, "Room reaped");
        }
    }

    reaped
}

/// Reaper loop. Returns when `cancel_token` is cancelled.
#[instrument(skip_all, name = "studio.task.room_reaper")]
pub async fn start_room_reaper(
    membership: Arc<MembershipTable>,
    config: RoomReaperConfig,
    cancel_token: CancellationToken,
) {
    info!(
        target: "studio.task.room_reaper",
        interval_seconds = config.interval.as_secs(),
        ttl_seconds = config.ttl.as_secs(),
        "Starting room reaper task"
    );

    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                reap_once(&membership, config.ttl);
            }
            () = cancel_token.cancelled() => {
                info!(
                    target: "studio.task.room_reaper",
                    "Room reaper received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "studio.task.room_reaper", "Room reaper task stopped");
}

/// Owned handle to a running reaper task.
#[derive(Debug)]
pub struct RoomReaperHandle {
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl RoomReaperHandle {
    /// Spawn the reaper. Its token is a child of `parent`, so cancelling the
    /// process-wide token stops it too.
    pub fn spawn(
        membership: Arc<MembershipTable>,
        config: RoomReaperConfig,
        parent: &CancellationToken,
    ) -> Self {
        let cancel_token = parent.child_token();
        let task = tokio::spawn(start_room_reaper(
            membership,
            config,
            cancel_token.clone(),
        ));
        Self { cancel_token, task }
    }

    /// Signal the task to stop without waiting.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Signal the task to stop and wait for it to exit.
    pub async fn stop(self) {
        self.cancel_token.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(target: "studio.task.room_reaper", error = %e, "Room reaper task failed");
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
