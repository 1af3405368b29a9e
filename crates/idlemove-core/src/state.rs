//! Cross-cycle tracker state.
//!
//! Two pieces of memory survive between polling cycles:
//!
//! - **Solo set**: clients last observed alone in their channel while over
//!   the idle threshold. A one-cycle look-back flag — consulted the cycle a
//!   co-occupant appears, then cleared.
//! - **Recent joins**: per-channel timestamp of the last detected join.
//!   Fresh for [`RECENT_JOIN_WINDOW_SECS`] by default; freshness
//!   suppresses idle evaluation for every client currently in that
//!   channel.
//!
//! Joins are detected by diffing the client→channel assignment against the
//! previous cycle. Nothing here is shared across threads; all mutation
//! happens inside a single engine invocation.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{HashMap, HashSet};

use crate::types::Client;

/// Default freshness window for a detected join.
pub const RECENT_JOIN_WINDOW_SECS: i64 = 10;

/// In-memory state carried across cycles. Reset to empty on restart.
#[derive(Debug, Clone)]
pub struct TrackerState {
    solo: HashSet<u64>,
    recent_joins: HashMap<u64, DateTime<Utc>>,
    /// Client→channel assignment from the previous cycle. `None` until the
    /// first snapshot has been observed.
    last_assignment: Option<HashMap<u64, u64>>,
    join_window: TimeDelta,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self {
            solo: HashSet::new(),
            recent_joins: HashMap::new(),
            last_assignment: None,
            join_window: TimeDelta::seconds(RECENT_JOIN_WINDOW_SECS),
        }
    }
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the join freshness window. Joins are recorded with the
    /// cycle's timestamp and consulted one poll interval later at the
    /// earliest, so a window no longer than the interval never fires;
    /// callers polling at or above [`RECENT_JOIN_WINDOW_SECS`] should
    /// widen it to span the interval.
    #[must_use]
    pub fn with_join_window(mut self, window: TimeDelta) -> Self {
        self.join_window = window;
        self
    }

    // ── Solo set ──────────────────────────────────────────────────

    pub fn is_solo(&self, client_id: u64) -> bool {
        self.solo.contains(&client_id)
    }

    pub fn mark_solo(&mut self, client_id: u64) {
        self.solo.insert(client_id);
    }

    pub fn clear_solo(&mut self, client_id: u64) {
        self.solo.remove(&client_id);
    }

    // ── Recent joins ──────────────────────────────────────────────

    pub fn record_join(&mut self, channel_id: u64, now: DateTime<Utc>) {
        self.recent_joins.insert(channel_id, now);
    }

    /// Whether a join was detected in `channel_id` within the freshness
    /// window ending at `now`.
    pub fn is_recent_join(&self, channel_id: u64, now: DateTime<Utc>) -> bool {
        self.recent_joins
            .get(&channel_id)
            .is_some_and(|joined| now.signed_duration_since(*joined) < self.join_window)
    }

    // ── Join detection ────────────────────────────────────────────

    /// Diff the snapshot's client→channel assignment against the previous
    /// cycle and record a join for every channel that gained a client
    /// (new client id, or a known client in a different channel).
    ///
    /// The first observation only seeds the assignment — recording joins
    /// for every connected client would blanket the whole server in a
    /// grace window at startup.
    pub fn observe(&mut self, clients: &[Client], now: DateTime<Utc>) {
        let assignment: HashMap<u64, u64> =
            clients.iter().map(|c| (c.id, c.channel_id)).collect();

        if let Some(previous) = &self.last_assignment {
            for client in clients {
                match previous.get(&client.id) {
                    Some(prev_channel) if *prev_channel == client.channel_id => {}
                    _ => {
                        self.recent_joins.insert(client.channel_id, now);
                    }
                }
            }
        }

        // Drop bookkeeping for clients that disconnected and join stamps
        // past the freshness window.
        self.solo.retain(|id| assignment.contains_key(id));
        let window = self.join_window;
        self.recent_joins
            .retain(|_, joined| now.signed_duration_since(*joined) < window);

        self.last_assignment = Some(assignment);
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("valid RFC3339")
            .with_timezone(&Utc)
    }

    fn t0() -> DateTime<Utc> {
        ts("2026-03-01T12:00:00Z")
    }

    fn client(id: u64, channel_id: u64) -> Client {
        Client {
            id,
            nickname: format!("c{id}"),
            channel_id,
            idle_time_ms: Some(0),
        }
    }

    // ── 1. Recent-join freshness window ─────────────────────────────

    #[test]
    fn recent_join_fresh_within_window() {
        let mut state = TrackerState::new();
        state.record_join(1, t0());
        assert!(state.is_recent_join(1, t0() + TimeDelta::seconds(3)));
        assert!(state.is_recent_join(1, t0() + TimeDelta::seconds(9)));
    }

    #[test]
    fn recent_join_expires_after_window() {
        let mut state = TrackerState::new();
        state.record_join(1, t0());
        // Exactly at the boundary the window is closed.
        assert!(!state.is_recent_join(1, t0() + TimeDelta::seconds(10)));
        assert!(!state.is_recent_join(1, t0() + TimeDelta::seconds(11)));
    }

    #[test]
    fn recent_join_unknown_channel() {
        let state = TrackerState::new();
        assert!(!state.is_recent_join(42, t0()));
    }

    #[test]
    fn widened_join_window_is_honored() {
        let mut state = TrackerState::new().with_join_window(TimeDelta::seconds(12));
        state.record_join(1, t0());
        // Past the default window but inside the widened one.
        assert!(state.is_recent_join(1, t0() + TimeDelta::seconds(11)));
        assert!(!state.is_recent_join(1, t0() + TimeDelta::seconds(12)));
    }

    // ── 2. Solo set ─────────────────────────────────────────────────

    #[test]
    fn solo_mark_and_clear() {
        let mut state = TrackerState::new();
        assert!(!state.is_solo(10));
        state.mark_solo(10);
        assert!(state.is_solo(10));
        state.clear_solo(10);
        assert!(!state.is_solo(10));
    }

    // ── 3. Join detection by diffing ────────────────────────────────

    #[test]
    fn first_observation_seeds_without_joins() {
        let mut state = TrackerState::new();
        state.observe(&[client(10, 1), client(11, 2)], t0());
        assert!(!state.is_recent_join(1, t0()));
        assert!(!state.is_recent_join(2, t0()));
    }

    #[test]
    fn new_client_records_join() {
        let mut state = TrackerState::new();
        state.observe(&[client(10, 1)], t0());

        let later = t0() + TimeDelta::seconds(10);
        state.observe(&[client(10, 1), client(11, 3)], later);
        assert!(state.is_recent_join(3, later));
        assert!(!state.is_recent_join(1, later));
    }

    #[test]
    fn channel_change_records_join_for_new_channel_only() {
        let mut state = TrackerState::new();
        state.observe(&[client(10, 1)], t0());

        let later = t0() + TimeDelta::seconds(10);
        state.observe(&[client(10, 2)], later);
        assert!(state.is_recent_join(2, later));
        assert!(!state.is_recent_join(1, later));
    }

    #[test]
    fn joins_in_several_channels_recorded_in_one_observation() {
        let mut state = TrackerState::new();
        state.observe(&[client(10, 1), client(11, 2)], t0());

        let later = t0() + TimeDelta::seconds(10);
        state.observe(&[client(10, 2), client(11, 1), client(12, 3)], later);
        assert!(state.is_recent_join(1, later));
        assert!(state.is_recent_join(2, later));
        assert!(state.is_recent_join(3, later));
    }

    #[test]
    fn unchanged_assignment_records_nothing() {
        let mut state = TrackerState::new();
        state.observe(&[client(10, 1), client(11, 1)], t0());
        let later = t0() + TimeDelta::seconds(10);
        state.observe(&[client(10, 1), client(11, 1)], later);
        assert!(!state.is_recent_join(1, later));
    }

    // ── 4. Pruning ──────────────────────────────────────────────────

    #[test]
    fn disconnected_client_loses_solo_flag() {
        let mut state = TrackerState::new();
        state.observe(&[client(10, 1)], t0());
        state.mark_solo(10);

        let later = t0() + TimeDelta::seconds(10);
        state.observe(&[client(11, 1)], later);
        assert!(!state.is_solo(10));
    }

    #[test]
    fn expired_join_stamps_are_pruned() {
        let mut state = TrackerState::new();
        state.observe(&[client(10, 1)], t0());
        state.record_join(5, t0());

        let later = t0() + TimeDelta::seconds(30);
        state.observe(&[client(10, 1)], later);
        assert!(!state.is_recent_join(5, later));
    }
}
