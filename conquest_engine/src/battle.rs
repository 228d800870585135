//! The hand-off boundary to the external battle subsystem.
//!
//! The engine never simulates battles. It exports packed rosters in a
//! [`BattleRequest`], suspends the dispute as a handle-keyed pending
//! record, and resumes when the room layer reports the final state back.
//! The pending record is the sole durable state bridging submission and
//! resumption.

use conquest_rules::PlayerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque identity of one requested battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleHandle(pub Uuid);

impl BattleHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BattleHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BattleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which roster a battle participant fought on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleSide {
    Attacker,
    Defender,
}

/// A roster-versus-roster battle for the external subsystem to play out.
///
/// Each side carries one packed team string per committed trainer, in
/// the same order as the pending record's trainer lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleRequest {
    pub handle: BattleHandle,
    pub attacker_teams: Vec<String>,
    pub defender_teams: Vec<String>,
}

/// The final state the engine reads back from a finished battle: the
/// winning side (if any) and which roster entries had their whole party
/// fainted, by position in the request's team lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleReport {
    pub winner: Option<BattleSide>,
    pub routed_attackers: Vec<usize>,
    pub routed_defenders: Vec<usize>,
}

impl BattleRequest {
    /// Serialize for the room layer's wire format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl BattleReport {
    /// Parse a finished battle from the room layer's wire format.
    pub fn from_json(text: &str) -> serde_json::Result<BattleReport> {
        serde_json::from_str(text)
    }
}

/// The sabotaged installation, by its stable positional identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Installation {
    Facility(usize),
    Labor(usize),
}

/// Durable state of a sabotage attempt awaiting its battle result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SabotageRecord {
    pub attacker_kingdom: usize,
    pub target_kingdom: usize,
    pub attacker_player: PlayerId,
    pub defender_player: PlayerId,
    pub installation: Installation,
    /// Attacking trainer indices in the attacker kingdom.
    pub attackers: Vec<usize>,
    /// Defending trainer indices in the target kingdom.
    pub defenders: Vec<usize>,
}

/// Durable state of an ongoing conquest, surviving across battle rounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConquestRecord {
    pub attacker_kingdom: usize,
    pub target_kingdom: usize,
    pub attacker_player: PlayerId,
    pub defender_player: PlayerId,
    /// Remaining committed attacker trainer indices.
    pub attackers: Vec<usize>,
    /// The current round's committed defender trainer indices.
    pub defenders: Vec<usize>,
    /// Defenders knocked out of the contest in earlier rounds.
    pub eliminated_defenders: Vec<usize>,
}

/// A suspended dispute keyed by its battle handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PendingBattle {
    Sabotage(SabotageRecord),
    Conquest(ConquestRecord),
}

/// Rejection of a battle result notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReportError {
    /// The handle matches no pending record: the battle was already
    /// resolved, or the game ended first.
    #[error("stale battle report for {0}")]
    Stale(BattleHandle),
}
