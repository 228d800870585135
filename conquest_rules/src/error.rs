//! Error types for rule-level actions and static configuration.

use thiserror::Error;

/// A recoverable rejection of a player-directed action.
///
/// Validation happens before mutation, so a rejected action leaves all
/// game state unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("not available: {0}")]
    NotAvailable(String),
    #[error("not ready: {0}")]
    NotReady(String),
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),
}

/// A session-fatal configuration problem.
///
/// Unlike [`ActionError`], these indicate corrupted static configuration
/// (for example a pool species the dex cannot resolve) and are surfaced
/// when the game is built, never during ordinary play.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown species '{0}'")]
    UnknownSpecies(String),
    #[error("unknown move '{0}'")]
    UnknownMove(String),
    #[error("unknown stat '{0}'")]
    UnknownStat(String),
    #[error("unknown kingdom '{0}'")]
    UnknownKingdom(String),
    #[error("unknown facility kind '{0}'")]
    UnknownFacilityKind(String),
    #[error("unknown labor kind '{0}'")]
    UnknownLaborKind(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
