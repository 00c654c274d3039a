//! Label correspondence between the two volumes.
//!
//! - `MatchStore`: committed matches and the one-to-one active index
//! - `MatchEngine`: pick/commit/undo state machine on top of the store
//! - `EngineEvent`: notifications for viewers

mod engine;
mod error;
mod events;
mod store;

pub use engine::{EngineOptions, EngineState, MatchEngine, PickOutcome, UndoOutcome};
pub use error::MatchError;
pub use events::{EngineEvent, Listeners, SubscriptionId};
pub use store::{Committed, Match, MatchStore};
