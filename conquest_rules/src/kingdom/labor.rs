//! The closed labor variant family.
//!
//! Labors are longer-running, rank-scaled operations advancing through
//! three sequential counters: startup, active, cooldown. Duration tables
//! are indexed by rank.

use serde::{Deserialize, Serialize};

use super::facility::{Facility, SABOTAGE_CAP};
use crate::dex::Id;
use crate::error::{ActionError, ConfigError};
use crate::mechanics::Rank;

/// Per-kind payload of a labor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LaborKind {
    /// Maintains links to a set of connected kingdoms.
    Transport { connected: Vec<usize> },
    /// Builds a temporary facility, tracked as the operation's work in
    /// progress.
    Construction { facility: Option<Facility> },
    /// Escorts goods along an ordered kingdom path.
    Convoy { path: Vec<usize> },
    /// Garrisons the kingdom against sabotage.
    Defenders,
    /// Surveils a target kingdom.
    Scout { target: Option<usize> },
}

impl LaborKind {
    /// Parse a configured kind name.
    pub fn parse(kind: &str) -> Result<LaborKind, ConfigError> {
        match Id::new(kind).as_str() {
            "transport" => Ok(LaborKind::Transport { connected: Vec::new() }),
            "construction" => Ok(LaborKind::Construction { facility: None }),
            "convoy" => Ok(LaborKind::Convoy { path: Vec::new() }),
            "defenders" => Ok(LaborKind::Defenders),
            "scout" => Ok(LaborKind::Scout { target: None }),
            other => Err(ConfigError::UnknownLaborKind(other.to_string())),
        }
    }
}

/// A kingdom installation running a multi-phase operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Labor {
    pub kind: LaborKind,
    pub rank: Rank,
    pub startup: u8,
    pub active_count: u8,
    pub cooldown: u8,
    pub sabotage_count: u8,
}

impl Labor {
    pub fn new(kind: LaborKind) -> Labor {
        Labor {
            kind,
            rank: Rank::One,
            startup: 0,
            active_count: 0,
            cooldown: 0,
            sabotage_count: 0,
        }
    }

    /// Stable display name of this labor's kind.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            LaborKind::Transport { .. } => "Transport",
            LaborKind::Construction { .. } => "Construction",
            LaborKind::Convoy { .. } => "Convoy",
            LaborKind::Defenders => "Defenders",
            LaborKind::Scout { .. } => "Scout",
        }
    }

    /// Months of startup per rank.
    pub fn startup_time(&self) -> [u8; 3] {
        match self.kind {
            LaborKind::Transport { .. } => [4, 3, 3],
            LaborKind::Construction { .. } => [0, 0, 0],
            LaborKind::Convoy { .. } => [0, 0, 0],
            LaborKind::Defenders => [0, 0, 0],
            LaborKind::Scout { .. } => [3, 2, 2],
        }
    }

    /// Months of activity per rank.
    pub fn active_time(&self) -> [u8; 3] {
        match self.kind {
            LaborKind::Transport { .. } => [5, 6, 6],
            LaborKind::Construction { .. } => [18, 14, 8],
            LaborKind::Convoy { .. } => [4, 8, 13],
            LaborKind::Defenders => [4, 6, 10],
            LaborKind::Scout { .. } => [3, 3, 3],
        }
    }

    /// Months of cooldown per rank.
    pub fn cooldown_time(&self) -> [u8; 3] {
        match self.kind {
            LaborKind::Transport { .. } => [4, 3, 3],
            LaborKind::Construction { .. } => [12, 8, 4],
            LaborKind::Convoy { .. } => [4, 3, 3],
            LaborKind::Defenders => [4, 4, 3],
            LaborKind::Scout { .. } => [4, 3, 3],
        }
    }

    /// Eligible to start a new run.
    pub fn can_activate(&self) -> bool {
        self.startup == 0 && self.active_count == 0 && self.cooldown == 0 && self.sabotage_count == 0
    }

    /// Start the countdowns for a new run.
    pub fn activate(&mut self) -> Result<(), ActionError> {
        if !self.can_activate() {
            return Err(ActionError::NotReady(format!(
                "the {} labor is not ready",
                self.kind_name()
            )));
        }
        let idx = self.rank.index();
        self.startup = self.startup_time()[idx];
        self.active_count = self.active_time()[idx];
        self.cooldown = self.cooldown_time()[idx];
        Ok(())
    }

    /// In effect right now: startup elapsed, activity remaining, and not
    /// currently sabotaged.
    pub fn is_active(&self) -> bool {
        self.startup == 0 && self.active_count > 0 && self.sabotage_count == 0
    }

    /// Whether another sabotage fits under the monthly cap.
    pub fn can_sabotage(&self) -> bool {
        self.sabotage_count < SABOTAGE_CAP
    }

    /// Record a successful sabotage.
    pub fn add_sabotage(&mut self) {
        self.sabotage_count = (self.sabotage_count + 1).min(SABOTAGE_CAP);
    }

    /// Monthly tick: drain whichever counter is in play. Sabotage drains
    /// first, then startup, activity, cooldown.
    pub fn on_next_month(&mut self) {
        if self.sabotage_count > 0 {
            self.sabotage_count -= 1;
        } else if self.startup > 0 {
            self.startup -= 1;
        } else if self.active_count > 0 {
            self.active_count -= 1;
        } else if self.cooldown > 0 {
            self.cooldown -= 1;
        }
    }

    /// The convoy's current position along its path, derived from the
    /// remaining active time.
    pub fn current_convoy_kingdom(&self) -> Option<usize> {
        match &self.kind {
            LaborKind::Convoy { path } if self.is_active() => {
                path.len().checked_sub(self.active_count as usize).and_then(|i| path.get(i)).copied()
            }
            _ => None,
        }
    }

    /// Read-only view of the operation's state.
    pub fn dialog(&self) -> String {
        let mut buf = self.kind_name().to_string();
        if self.sabotage_count > 0 {
            buf.push_str(&format!(" [sabotaged, {} months]", self.sabotage_count));
        } else if self.startup > 0 {
            buf.push_str(&format!(" [starting up, {} months]", self.startup));
        } else if self.active_count > 0 {
            buf.push_str(&format!(" [active, {} months left]", self.active_count));
        } else if self.cooldown > 0 {
            buf.push_str(&format!(" [cooling down, {} months]", self.cooldown));
        } else {
            buf.push_str(" [ready]");
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_sets_all_countdowns() {
        let mut labor = Labor::new(LaborKind::parse("transport").unwrap());
        labor.activate().unwrap();
        assert_eq!(labor.startup, 4);
        assert_eq!(labor.active_count, 5);
        assert_eq!(labor.cooldown, 4);
        assert!(!labor.is_active());
        assert!(labor.activate().is_err());
    }

    #[test]
    fn test_lifecycle_startup_active_cooldown() {
        let mut labor = Labor::new(LaborKind::parse("scout").unwrap());
        labor.activate().unwrap();
        for _ in 0..3 {
            assert!(!labor.is_active());
            labor.on_next_month();
        }
        for _ in 0..3 {
            assert!(labor.is_active());
            labor.on_next_month();
        }
        assert!(!labor.is_active());
        assert!(!labor.can_activate());
        for _ in 0..4 {
            labor.on_next_month();
        }
        assert!(labor.can_activate());
    }

    #[test]
    fn test_sabotage_suspends_activity() {
        let mut labor = Labor::new(LaborKind::parse("defenders").unwrap());
        labor.activate().unwrap();
        assert!(labor.is_active());
        labor.add_sabotage();
        assert!(!labor.is_active());
        labor.on_next_month();
        // Sabotage drained first; the active count held its ground.
        assert_eq!(labor.active_count, 4);
        assert!(labor.is_active());
    }

    #[test]
    fn test_rank_scales_durations() {
        let mut labor = Labor::new(LaborKind::parse("construction").unwrap());
        labor.rank = Rank::Three;
        labor.activate().unwrap();
        assert_eq!(labor.startup, 0);
        assert_eq!(labor.active_count, 8);
        assert_eq!(labor.cooldown, 4);
    }

    #[test]
    fn test_convoy_current_kingdom_tracks_progress() {
        let mut labor = Labor::new(LaborKind::parse("convoy").unwrap());
        if let LaborKind::Convoy { path } = &mut labor.kind {
            *path = vec![3, 1, 4, 2];
        }
        labor.activate().unwrap();
        assert_eq!(labor.current_convoy_kingdom(), Some(3));
        labor.on_next_month();
        assert_eq!(labor.current_convoy_kingdom(), Some(1));
        labor.on_next_month();
        assert_eq!(labor.current_convoy_kingdom(), Some(4));
    }

    #[test]
    fn test_unknown_kind_is_config_error() {
        assert!(LaborKind::parse("fishing").is_err());
    }
}
