//! A single party member: stats, moves, and evolution eligibility.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dex::{Dex, Id};
use crate::error::ActionError;
use crate::mechanics::{
    Rank, Stat, StatTable, EV_LIMIT, EV_TOTAL_LIMIT, FRIENDSHIP_LIMIT, IV_LIMIT,
};

/// Starting level for caught, bred, and recruited creatures.
pub const STARTING_LEVEL: u8 = 5;

/// A combat-capable party member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creature {
    pub species: Id,
    pub level: u8,
    pub evs: StatTable,
    pub ivs: StatTable,
    pub nature: Id,
    pub ability: Id,
    pub item: Option<Id>,
    pub friendship: u8,
    /// Moves taught by tutors; the active moveset draws from these.
    pub tutored_moves: Vec<Id>,
    /// Active moveset, at most four moves.
    pub moves: Vec<Id>,
    /// Knocked out in the last battle; recovers on the monthly tick.
    pub fainted: bool,
    /// Set when a trade or battle has armed a conditional evolution.
    pub evolution_armed: bool,
    /// Slot-zero distinguished creature of its trainer.
    pub is_signature: bool,
}

impl Creature {
    /// Create a creature of the given species at the starting level.
    ///
    /// When the species has a second natural ability one of the two is
    /// picked at random; a signature creature starts with +1 to every IV.
    pub fn new(dex: &Dex, species: Id, is_signature: bool, rng: &mut StdRng) -> Result<Creature, ActionError> {
        let data = dex
            .species(&species)
            .ok_or_else(|| ActionError::InvalidTarget(format!("species '{species}' does not exist")))?;
        let ability = match &data.ability1 {
            Some(second) if rng.random_range(0..2) == 1 => second.clone(),
            _ => data.ability0.clone(),
        };
        let natures: Vec<&Id> = dex.natures().collect();
        let nature = if natures.is_empty() {
            Id::new("hardy")
        } else {
            natures[rng.random_range(0..natures.len())].clone()
        };
        let ivs = if is_signature { StatTable::uniform(1) } else { StatTable::default() };
        Ok(Creature {
            species,
            level: STARTING_LEVEL,
            evs: StatTable::default(),
            ivs,
            nature,
            ability,
            item: None,
            friendship: 0,
            tutored_moves: Vec::new(),
            moves: Vec::new(),
            fainted: false,
            evolution_armed: false,
            is_signature,
        })
    }

    /// Level ceiling given the commanding trainer's rank and, for
    /// non-signatures, the signature creature's level.
    pub fn level_cap(&self, rank: Rank, signature_level: u8) -> u8 {
        let cap = rank.level_cap();
        if self.is_signature {
            cap
        } else {
            cap.min(signature_level)
        }
    }

    /// Gain up to `n` levels, clamped to the given ceiling.
    pub fn try_level_up(&mut self, n: u8, cap: u8) {
        self.level = self.level.saturating_add(n).min(cap.max(self.level));
    }

    /// Add EVs to one stat, honoring the per-stat and total ceilings.
    /// Returns the amount actually gained.
    pub fn add_evs(&mut self, stat: Stat, amount: u16) -> u16 {
        let per_stat_room = EV_LIMIT.saturating_sub(self.evs.get(stat));
        let total_room = EV_TOTAL_LIMIT.saturating_sub(self.evs.sum());
        let gain = amount.min(per_stat_room).min(total_room.min(u32::from(u16::MAX)) as u16);
        self.evs.set(stat, self.evs.get(stat) + gain);
        gain
    }

    /// Add IVs to one stat, honoring the per-stat ceiling.
    pub fn add_ivs(&mut self, stat: Stat, amount: u16) {
        let value = self.ivs.get(stat).saturating_add(amount).min(IV_LIMIT);
        self.ivs.set(stat, value);
    }

    /// Raise friendship, clamped to its ceiling.
    pub fn add_friendship(&mut self, amount: u8) {
        self.friendship = self
            .friendship
            .saturating_add(amount)
            .min(FRIENDSHIP_LIMIT);
    }

    /// Replace both spreads with caller-supplied values.
    ///
    /// The redistribution must be sum-preserving on EVs and IVs
    /// separately, and every stat must stay within its legal bound.
    pub fn redistribute(&mut self, evs: StatTable, ivs: StatTable) -> Result<(), ActionError> {
        for stat in Stat::ALL {
            if evs.get(stat) > EV_LIMIT {
                return Err(ActionError::InvalidArguments(format!(
                    "{} EVs exceed the per-stat limit of {EV_LIMIT}",
                    stat.token()
                )));
            }
            if ivs.get(stat) > IV_LIMIT {
                return Err(ActionError::InvalidArguments(format!(
                    "{} IVs exceed the per-stat limit of {IV_LIMIT}",
                    stat.token()
                )));
            }
        }
        if evs.sum() != self.evs.sum() {
            return Err(ActionError::InvalidArguments(
                "EV redistribution must preserve the current total".into(),
            ));
        }
        if ivs.sum() != self.ivs.sum() {
            return Err(ActionError::InvalidArguments(
                "IV redistribution must preserve the current total".into(),
            ));
        }
        self.evs = evs;
        self.ivs = ivs;
        Ok(())
    }

    /// Export in the packed team format consumed by the battle subsystem.
    ///
    /// Fields: `name|species|item|ability|moves|nature|evs|gender|ivs|shiny|level|friendship`.
    pub fn packed(&self, dex: &Dex) -> String {
        let name = dex
            .species(&self.species)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| self.species.to_string());
        let moves = self
            .moves
            .iter()
            .map(Id::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let evs = Stat::ALL
            .iter()
            .map(|s| self.evs.get(*s).to_string())
            .collect::<Vec<_>>()
            .join(",");
        let ivs = Stat::ALL
            .iter()
            .map(|s| self.ivs.get(*s).to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{name}|{}|{}|{}|{moves}|{}|{evs}||{ivs}||{}|{}",
            self.species,
            self.item.as_ref().map(Id::as_str).unwrap_or(""),
            self.ability,
            self.nature,
            self.level,
            self.friendship,
        )
    }
}
