use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Snapshot ─────────────────────────────────────────────────────

/// A voice channel as observed in one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: u64,
    pub name: String,
}

/// A connected client as observed in one snapshot. `idle_time_ms` is
/// fetched per client and may be stale by the time a decision is made;
/// `None` means the per-client status fetch failed this cycle — the
/// client still occupies its channel, it just cannot be judged idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: u64,
    pub nickname: String,
    pub channel_id: u64,
    pub idle_time_ms: Option<u64>,
}

/// One cycle's view of the server. Ephemeral; rebuilt every poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub channels: Vec<Channel>,
    pub clients: Vec<Client>,
    pub captured_at: DateTime<Utc>,
}

// ─── Configuration ────────────────────────────────────────────────

/// Immutable engine configuration, normalized to milliseconds at load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub afk_channel_name: String,
    pub max_idle_time_ms: u64,
    pub ignored_channel_names: Vec<String>,
    /// Grant a one-cycle grace skip on the cycle a solo client's channel
    /// gains a co-occupant.
    pub allow_grace_period: bool,
}

// ─── Engine output ────────────────────────────────────────────────

/// Relocate a client into the AFK channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveAction {
    pub client_id: u64,
    pub target_channel_id: u64,
}

/// Why a client over the idle threshold was left in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum SkipReason {
    /// Someone joined the client's channel within the last 10 seconds.
    RecentJoinGrace,
    /// The client's channel is exempted by configuration.
    IgnoredChannel,
    /// The client already sits in the AFK channel.
    AlreadyAfk,
    /// The client is alone in its channel.
    Solo,
    /// The client's channel just gained a co-occupant after a solo stretch.
    PostSoloGrace,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RecentJoinGrace => "recent-join-grace",
            Self::IgnoredChannel => "ignored-channel",
            Self::AlreadyAfk => "already-afk",
            Self::Solo => "solo",
            Self::PostSoloGrace => "post-solo-grace",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A suppressed move, recorded for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skip {
    pub client_id: u64,
    pub reason: SkipReason,
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_reason_serde_matches_as_str() {
        let reasons = [
            SkipReason::RecentJoinGrace,
            SkipReason::IgnoredChannel,
            SkipReason::AlreadyAfk,
            SkipReason::Solo,
            SkipReason::PostSoloGrace,
        ];
        for r in reasons {
            let json = serde_json::to_string(&r).expect("serialize");
            assert_eq!(json, format!("\"{}\"", r.as_str()));
            let back: SkipReason = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(r, back);
        }
    }

    #[test]
    fn skip_reason_display() {
        assert_eq!(SkipReason::PostSoloGrace.to_string(), "post-solo-grace");
        assert_eq!(SkipReason::AlreadyAfk.to_string(), "already-afk");
    }

    #[test]
    fn snapshot_serde_roundtrip() {
        let snap = Snapshot {
            channels: vec![Channel {
                id: 2,
                name: "AFK".into(),
            }],
            clients: vec![Client {
                id: 10,
                nickname: "A".into(),
                channel_id: 2,
                idle_time_ms: Some(120_000),
            }],
            captured_at: Utc::now(),
        };
        let json = serde_json::to_string(&snap).expect("serialize");
        let back: Snapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(snap, back);
    }
}
