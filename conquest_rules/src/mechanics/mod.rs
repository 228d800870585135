//! Game mechanics: stats, ranks, and the per-trainer action economy.

use serde::{Deserialize, Serialize};

/// Per-stat EV ceiling.
pub const EV_LIMIT: u16 = 252;
/// Ceiling on the sum of all six EVs.
pub const EV_TOTAL_LIMIT: u32 = 510;
/// Per-stat IV ceiling.
pub const IV_LIMIT: u16 = 31;
/// Friendship ceiling.
pub const FRIENDSHIP_LIMIT: u8 = 255;

/// The six battle stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stat {
    Hp,
    Atk,
    Def,
    SpA,
    SpD,
    Spe,
}

impl Stat {
    /// All six stats in canonical order.
    pub const ALL: [Stat; 6] = [Stat::Hp, Stat::Atk, Stat::Def, Stat::SpA, Stat::SpD, Stat::Spe];

    /// Parse a stat token (`hp`/`atk`/`def`/`spa`/`spd`/`spe`).
    pub fn from_token(token: &str) -> Option<Stat> {
        match token.to_ascii_lowercase().as_str() {
            "hp" => Some(Stat::Hp),
            "atk" => Some(Stat::Atk),
            "def" => Some(Stat::Def),
            "spa" => Some(Stat::SpA),
            "spd" => Some(Stat::SpD),
            "spe" => Some(Stat::Spe),
            _ => None,
        }
    }

    /// The canonical token for this stat.
    pub fn token(&self) -> &'static str {
        match self {
            Stat::Hp => "hp",
            Stat::Atk => "atk",
            Stat::Def => "def",
            Stat::SpA => "spa",
            Stat::SpD => "spd",
            Stat::Spe => "spe",
        }
    }
}

/// A six-stat value table, used for both EVs and IVs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatTable {
    pub hp: u16,
    pub atk: u16,
    pub def: u16,
    pub spa: u16,
    pub spd: u16,
    pub spe: u16,
}

impl StatTable {
    /// Get the value for one stat.
    pub fn get(&self, stat: Stat) -> u16 {
        match stat {
            Stat::Hp => self.hp,
            Stat::Atk => self.atk,
            Stat::Def => self.def,
            Stat::SpA => self.spa,
            Stat::SpD => self.spd,
            Stat::Spe => self.spe,
        }
    }

    /// Set the value for one stat.
    pub fn set(&mut self, stat: Stat, value: u16) {
        match stat {
            Stat::Hp => self.hp = value,
            Stat::Atk => self.atk = value,
            Stat::Def => self.def = value,
            Stat::SpA => self.spa = value,
            Stat::SpD => self.spd = value,
            Stat::Spe => self.spe = value,
        }
    }

    /// Sum across all six stats.
    pub fn sum(&self) -> u32 {
        Stat::ALL.iter().map(|s| u32::from(self.get(*s))).sum()
    }

    /// A table with every stat at the same value.
    pub fn uniform(value: u16) -> StatTable {
        let mut table = StatTable::default();
        for stat in Stat::ALL {
            table.set(stat, value);
        }
        table
    }
}

/// Trainer rank. Promotion is one-way; there is no demotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Rank {
    #[default]
    One,
    Two,
    Three,
}

impl Rank {
    /// Numeric rank, 1-3.
    pub fn number(&self) -> u8 {
        match self {
            Rank::One => 1,
            Rank::Two => 2,
            Rank::Three => 3,
        }
    }

    /// Zero-based index into rank-keyed duration tables.
    pub fn index(&self) -> usize {
        (self.number() - 1) as usize
    }

    /// Maximum party size at this rank.
    pub fn max_party(&self) -> usize {
        match self {
            Rank::One => 3,
            Rank::Two => 5,
            Rank::Three => 6,
        }
    }

    /// Level ceiling for creatures commanded at this rank.
    pub fn level_cap(&self) -> u8 {
        match self {
            Rank::One => 25,
            Rank::Two => 50,
            Rank::Three => 100,
        }
    }

    /// The next rank up, if any.
    pub fn next(&self) -> Option<Rank> {
        match self {
            Rank::One => Some(Rank::Two),
            Rank::Two => Some(Rank::Three),
            Rank::Three => None,
        }
    }
}

/// Per-creature rank-up chance coefficients: (level, friendship, EV total).
///
/// Returns `None` at rank three, which cannot be promoted further.
pub fn rank_up_coefficients(rank: Rank) -> Option<(f64, f64, f64)> {
    match rank {
        Rank::One => Some((0.40, 0.05, 0.010)),
        Rank::Two => Some((0.15, 0.03, 0.008)),
        Rank::Three => None,
    }
}

/// The economy class of a turn choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionClass {
    Basic,
    Faculty,
    Battle,
    /// Minor mutations that consume no economy flag.
    Free,
}

/// Per-trainer action-used flags for the current kingdom-turn.
///
/// A battle action excludes everything else for the turn; basic and
/// faculty each exclude battle but not each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActionFlags {
    pub basic_used: bool,
    pub faculty_used: bool,
    pub battle_used: bool,
}

impl ActionFlags {
    /// Whether an action of the given class is still permitted this turn.
    pub fn can_use(&self, class: ActionClass) -> bool {
        match class {
            ActionClass::Basic => !self.basic_used && !self.battle_used,
            ActionClass::Faculty => !self.faculty_used && !self.battle_used,
            ActionClass::Battle => !self.basic_used && !self.faculty_used && !self.battle_used,
            ActionClass::Free => true,
        }
    }

    /// Record that an action of the given class was taken.
    pub fn mark_used(&mut self, class: ActionClass) {
        match class {
            ActionClass::Basic => self.basic_used = true,
            ActionClass::Faculty => self.faculty_used = true,
            ActionClass::Battle => self.battle_used = true,
            ActionClass::Free => {}
        }
    }

    /// Clear all flags at the end of the owning kingdom's turn.
    pub fn reset(&mut self) {
        *self = ActionFlags::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_table_sum() {
        let mut table = StatTable::default();
        table.set(Stat::Atk, 100);
        table.set(Stat::Spe, 52);
        assert_eq!(table.sum(), 152);
    }

    #[test]
    fn test_stat_tokens_round_trip() {
        for stat in Stat::ALL {
            assert_eq!(Stat::from_token(stat.token()), Some(stat));
        }
        assert_eq!(Stat::from_token("speed"), None);
    }

    #[test]
    fn test_rank_party_and_level_caps() {
        assert_eq!(Rank::One.max_party(), 3);
        assert_eq!(Rank::Two.max_party(), 5);
        assert_eq!(Rank::Three.max_party(), 6);
        assert_eq!(Rank::One.level_cap(), 25);
        assert_eq!(Rank::Two.level_cap(), 50);
        assert_eq!(Rank::Three.level_cap(), 100);
    }

    #[test]
    fn test_rank_promotion_chain() {
        assert_eq!(Rank::One.next(), Some(Rank::Two));
        assert_eq!(Rank::Two.next(), Some(Rank::Three));
        assert_eq!(Rank::Three.next(), None);
    }

    #[test]
    fn test_battle_excludes_everything() {
        let mut flags = ActionFlags::default();
        flags.mark_used(ActionClass::Battle);
        assert!(!flags.can_use(ActionClass::Basic));
        assert!(!flags.can_use(ActionClass::Faculty));
        assert!(!flags.can_use(ActionClass::Battle));
        assert!(flags.can_use(ActionClass::Free));
    }

    #[test]
    fn test_basic_and_faculty_coexist() {
        let mut flags = ActionFlags::default();
        flags.mark_used(ActionClass::Basic);
        assert!(flags.can_use(ActionClass::Faculty));
        assert!(!flags.can_use(ActionClass::Battle));
        flags.mark_used(ActionClass::Faculty);
        assert!(!flags.can_use(ActionClass::Basic));
        assert!(!flags.can_use(ActionClass::Faculty));
    }
}
