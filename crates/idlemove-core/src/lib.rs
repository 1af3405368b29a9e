//! idlemove-core: idle-evaluation and move-decision engine.
//! Consumes one server snapshot per cycle plus the cross-cycle tracker
//! state, produces an ordered list of move actions. No IO, no network —
//! the ServerQuery boundary lives in idlemove-query.

pub mod engine;
pub mod error;
pub mod state;
pub mod types;

pub use engine::{Evaluation, evaluate};
pub use error::EngineError;
pub use state::{RECENT_JOIN_WINDOW_SECS, TrackerState};
pub use types::{Channel, Client, EngineConfig, MoveAction, Skip, SkipReason, Snapshot};
