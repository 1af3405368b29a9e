//! Move-decision engine.
//!
//! One invocation per polling cycle. Consumes a snapshot, the immutable
//! configuration and the cross-cycle [`TrackerState`], and produces the
//! ordered move list plus a record of every suppressed move. Pure except
//! for the explicit tracker mutation; never touches the network.
//!
//! Exception cascade per idle client, first match wins:
//! recent join in channel → ignored channel → already in AFK channel →
//! solo → post-solo grace (if enabled) → move.
//!
//! Recent-join freshness is checked against joins detected in *previous*
//! cycles; the joins this snapshot reveals are recorded at the end of the
//! invocation and take effect from the next cycle. This keeps the
//! post-solo transition observable on the exact cycle a co-occupant
//! appears instead of being shadowed by that co-occupant's own join.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use crate::error::EngineError;
use crate::state::TrackerState;
use crate::types::{EngineConfig, MoveAction, Skip, SkipReason, Snapshot};

/// Output of one engine invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Moves to issue, in snapshot order.
    pub moves: Vec<MoveAction>,
    /// Suppressed moves with their reason codes, for structured logging.
    pub skips: Vec<Skip>,
}

/// Evaluate one snapshot and mutate the tracker state.
///
/// Fails with [`EngineError::AfkChannelMissing`] if no channel matches the
/// configured AFK channel name — a configuration error, not a transient one.
pub fn evaluate(
    snapshot: &Snapshot,
    config: &EngineConfig,
    state: &mut TrackerState,
    now: DateTime<Utc>,
) -> Result<Evaluation, EngineError> {
    let afk_channel_id = snapshot
        .channels
        .iter()
        .find(|ch| ch.name == config.afk_channel_name)
        .map(|ch| ch.id)
        .ok_or_else(|| EngineError::AfkChannelMissing(config.afk_channel_name.clone()))?;

    let ignored_channel_ids: HashSet<u64> = snapshot
        .channels
        .iter()
        .filter(|ch| config.ignored_channel_names.contains(&ch.name))
        .map(|ch| ch.id)
        .collect();

    let mut occupancy: HashMap<u64, u32> = HashMap::new();
    for client in &snapshot.clients {
        *occupancy.entry(client.channel_id).or_insert(0) += 1;
    }

    let mut evaluation = Evaluation::default();

    for client in &snapshot.clients {
        if state.is_recent_join(client.channel_id, now) {
            evaluation.skips.push(Skip {
                client_id: client.id,
                reason: SkipReason::RecentJoinGrace,
            });
            continue;
        }

        // Status fetch failed upstream: idleness unknown, no verdict.
        // The client still counted toward occupancy and join diffing.
        let Some(idle_time_ms) = client.idle_time_ms else {
            continue;
        };

        if idle_time_ms <= config.max_idle_time_ms {
            continue;
        }

        if ignored_channel_ids.contains(&client.channel_id) {
            evaluation.skips.push(Skip {
                client_id: client.id,
                reason: SkipReason::IgnoredChannel,
            });
            continue;
        }

        if client.channel_id == afk_channel_id {
            evaluation.skips.push(Skip {
                client_id: client.id,
                reason: SkipReason::AlreadyAfk,
            });
            continue;
        }

        let has_co_occupant = occupancy.get(&client.channel_id).copied().unwrap_or(0) > 1;
        if !has_co_occupant {
            state.mark_solo(client.id);
            evaluation.skips.push(Skip {
                client_id: client.id,
                reason: SkipReason::Solo,
            });
            continue;
        }

        // The cycle a solo client's channel gained a co-occupant.
        if state.is_solo(client.id) && config.allow_grace_period {
            state.clear_solo(client.id);
            evaluation.skips.push(Skip {
                client_id: client.id,
                reason: SkipReason::PostSoloGrace,
            });
            continue;
        }

        state.clear_solo(client.id);
        evaluation.moves.push(MoveAction {
            client_id: client.id,
            target_channel_id: afk_channel_id,
        });
    }

    state.observe(&snapshot.clients, now);

    Ok(evaluation)
}

// ─── Tests ────────────────────────────────────────────────────────
