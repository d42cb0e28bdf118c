//! Idle-room reaper — background eviction of abandoned rooms.
//!
//! DESIGN
//! ======
//! A room that still holds a drawing survives its last participant so a
//! returning client finds the canvas intact. The reaper sweeps the
//! registry on an interval and evicts rooms whose idle mark is older than
//! the TTL. Rooms with connected participants are never touched.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::state::AppState;

const DEFAULT_ROOM_IDLE_TTL_SECS: u64 = 3600;
const DEFAULT_ROOM_REAP_INTERVAL_SECS: u64 = 60;

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Spawn the background reaper task. Returns a handle for shutdown.
pub fn spawn_room_reaper(state: AppState) -> JoinHandle<()> {
    let ttl = Duration::from_secs(env_parse("ROOM_IDLE_TTL_SECS", DEFAULT_ROOM_IDLE_TTL_SECS));
    let interval =
        Duration::from_secs(env_parse("ROOM_REAP_INTERVAL_SECS", DEFAULT_ROOM_REAP_INTERVAL_SECS));
    info!(
        ttl_secs = ttl.as_secs(),
        interval_secs = interval.as_secs(),
        "room reaper configured"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            reap_idle_rooms(&state, ttl).await;
        }
    })
}

/// One sweep: evict every participant-free room whose idle mark is older
/// than `ttl`, returning the eviction count. An empty room without a mark
/// (created by a stray draw, never joined) is marked now and collected by
/// a later sweep.
async fn reap_idle_rooms(state: &AppState, ttl: Duration) -> usize {
    let mut rooms = state.rooms.write().await;
    let now = Instant::now();

    for room in rooms.values_mut() {
        if room.participants.is_empty() && room.idle_since.is_none() {
            room.idle_since = Some(now);
        }
    }

    let before = rooms.len();
    rooms.retain(|key, room| {
        let expired = room.participants.is_empty()
            && room.idle_since.is_some_and(|mark| now.duration_since(mark) >= ttl);
        if expired {
            info!(room = %key, "evicted idle room");
        }
        !expired
    });
    before - rooms.len()
}

#[cfg(test)]
#[path = "reaper_test.rs"]
mod tests;
