//! Choice-dispatch errors.

use conquest_rules::ActionError;
use thiserror::Error;

/// Rejection of a submitted choice.
///
/// All of these are recovered at the dispatch boundary: a rejected choice
/// leaves game state unchanged and is reported to the submitting player
/// only. Session-fatal configuration problems are
/// [`conquest_rules::ConfigError`], raised at build time instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChoiceError {
    #[error("you are not in this game")]
    NotInGame,
    #[error("the game has not started")]
    NotStarted,
    #[error("it is not your turn")]
    WrongTurn,
    #[error("unrecognized choice '{0}'")]
    UnrecognizedChoice(String),
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

impl From<ActionError> for ChoiceError {
    fn from(err: ActionError) -> ChoiceError {
        match err {
            ActionError::InvalidArguments(msg) => ChoiceError::InvalidArguments(msg),
            ActionError::InvalidTarget(msg) => ChoiceError::InvalidTarget(msg),
            ActionError::NotAvailable(msg) => ChoiceError::NotAvailable(msg),
            ActionError::NotReady(msg) => ChoiceError::NotReady(msg),
            ActionError::CapacityExceeded(msg) => ChoiceError::CapacityExceeded(msg),
        }
    }
}
