//! Players and their one-shot UI state.

use conquest_rules::PlayerId;
use serde::{Deserialize, Serialize};

/// A user bound to the game.
///
/// The transient UI state is one-shot: a result banner and an optional
/// override page body, each cleared once delivered to the render layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    result_text: Option<String>,
    page_override: Option<String>,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Player {
        Player { id: PlayerId::new(), name: name.into(), result_text: None, page_override: None }
    }

    /// Queue a result banner, replacing any undelivered one.
    pub fn set_result(&mut self, text: impl Into<String>) {
        self.result_text = Some(text.into());
    }

    /// Queue an override page body, replacing any undelivered one.
    pub fn set_page(&mut self, body: impl Into<String>) {
        self.page_override = Some(body.into());
    }

    /// Consume the pending result banner. Shows only once.
    pub fn take_result(&mut self) -> Option<String> {
        self.result_text.take()
    }

    /// Consume the pending override page. Shows only once.
    pub fn take_page(&mut self) -> Option<String> {
        self.page_override.take()
    }

    /// Drop any undelivered transient state.
    pub fn reset_transient(&mut self) {
        self.result_text = None;
        self.page_override = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_banner_shows_only_once() {
        let mut player = Player::new("Alice");
        player.set_result("You caught an embercub!");
        assert_eq!(player.take_result().as_deref(), Some("You caught an embercub!"));
        assert_eq!(player.take_result(), None);
    }

    #[test]
    fn test_reset_clears_transient_state() {
        let mut player = Player::new("Alice");
        player.set_result("stale");
        player.set_page("stale page");
        player.reset_transient();
        assert_eq!(player.take_result(), None);
        assert_eq!(player.take_page(), None);
    }
}
