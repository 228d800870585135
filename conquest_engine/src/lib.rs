//! # Conquest Engine
//!
//! The session crate for Trainer Conquest: game lifecycle, the turn and
//! month state machine, choice tokenizing and verb dispatch, the
//! interrupt queue, players with their one-shot UI state, and the
//! suspension protocol around the external battle subsystem. The data
//! model and rules it drives live in `conquest_rules`.

pub mod battle;
pub mod error;
pub mod player;
pub mod session;

#[cfg(test)]
mod testutil;

pub use battle::{
    BattleHandle, BattleReport, BattleRequest, BattleSide, ConquestRecord, Installation,
    PendingBattle, ReportError, SabotageRecord,
};
pub use error::ChoiceError;
pub use player::Player;
pub use session::{Awaiting, GameSession, Interrupt};
