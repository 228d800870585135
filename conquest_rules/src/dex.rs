//! The read-only creature rules lookup.
//!
//! The engine treats species, move, and nature identifiers as opaque until
//! resolved here. Lookups return `Option`; an unresolvable identifier is a
//! validation failure for player input and a [`ConfigError`] when it comes
//! from static configuration, never a panic.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::config::{DexData, SpeciesConfig};
use crate::error::ConfigError;

/// A normalized identifier: lowercase, alphanumeric only.
///
/// Species, moves, abilities, items, and natures all use this form, so
/// player-typed tokens like `Ember-Cub` and configured `embercub` compare
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// Normalize a raw token into an identifier.
    pub fn new(raw: &str) -> Id {
        Id(raw
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Id {
    fn from(raw: &str) -> Id {
        Id::new(raw)
    }
}

/// How a species evolves, if it does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evolution {
    /// Species the creature becomes.
    pub into: Id,
    /// Minimum level, if level-triggered.
    pub level: Option<u8>,
    /// Minimum friendship, if friendship-triggered.
    pub friendship: Option<u8>,
    /// Whether the trigger must be armed by a trade first.
    pub trade: bool,
    /// Whether the trigger must be armed by surviving a battle first.
    pub battle: bool,
}

/// Static definition of one species.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesData {
    pub name: String,
    pub types: Vec<Id>,
    /// Primary natural ability.
    pub ability0: Id,
    /// Secondary natural ability, if the species has one.
    pub ability1: Option<Id>,
    /// Hidden ability, granted only by the Hidden Dojo.
    pub hidden_ability: Option<Id>,
    pub evolution: Option<Evolution>,
}

impl SpeciesData {
    /// Whether an ability is one of the species' two natural abilities.
    pub fn has_natural_ability(&self, ability: &Id) -> bool {
        *ability == self.ability0 || self.ability1.as_ref() == Some(ability)
    }
}

/// The 25 standard natures.
pub const STANDARD_NATURES: [&str; 25] = [
    "hardy", "lonely", "brave", "adamant", "naughty", "bold", "docile", "relaxed", "impish",
    "lax", "timid", "hasty", "serious", "jolly", "naive", "modest", "mild", "quiet", "bashful",
    "rash", "calm", "gentle", "sassy", "careful", "quirky",
];

/// The species/move/nature lookup service.
#[derive(Debug, Clone, Default)]
pub struct Dex {
    species: HashMap<Id, SpeciesData>,
    moves: HashSet<Id>,
    natures: HashSet<Id>,
}

impl Dex {
    /// Build a dex from deserialized configuration.
    ///
    /// Evolution targets must themselves resolve; natures default to the
    /// standard 25 when the configuration names none.
    pub fn from_data(data: &DexData) -> Result<Dex, ConfigError> {
        let mut dex = Dex::default();
        for entry in &data.species {
            let (id, species) = build_species(entry)?;
            dex.species.insert(id, species);
        }
        for entry in &data.species {
            if let Some(target) = &entry.evolves_into {
                let target = Id::new(target);
                if !dex.species.contains_key(&target) {
                    return Err(ConfigError::UnknownSpecies(target.to_string()));
                }
            }
        }
        for m in &data.moves {
            dex.moves.insert(Id::new(m));
        }
        if data.natures.is_empty() {
            dex.natures = STANDARD_NATURES.iter().map(|n| Id::new(n)).collect();
        } else {
            dex.natures = data.natures.iter().map(|n| Id::new(n)).collect();
        }
        Ok(dex)
    }

    /// Resolve a species id.
    pub fn species(&self, id: &Id) -> Option<&SpeciesData> {
        self.species.get(id)
    }

    /// Whether a move id resolves.
    pub fn move_exists(&self, id: &Id) -> bool {
        self.moves.contains(id)
    }

    /// Whether a nature id resolves.
    pub fn nature_exists(&self, id: &Id) -> bool {
        self.natures.contains(id)
    }

    /// All known natures, for random assignment.
    pub fn natures(&self) -> impl Iterator<Item = &Id> {
        self.natures.iter()
    }
}

fn build_species(entry: &SpeciesConfig) -> Result<(Id, SpeciesData), ConfigError> {
    let id = Id::new(&entry.name);
    if id.is_empty() {
        return Err(ConfigError::Invalid("species with empty name".into()));
    }
    let mut abilities = entry.abilities.iter().map(|a| Id::new(a));
    let ability0 = abilities
        .next()
        .ok_or_else(|| ConfigError::Invalid(format!("species '{id}' has no abilities")))?;
    let ability1 = abilities.next();
    let evolution = entry.evolves_into.as_ref().map(|target| Evolution {
        into: Id::new(target),
        level: entry.evolve_level,
        friendship: entry.evolve_friendship,
        trade: entry.evolve_trade,
        battle: entry.evolve_battle,
    });
    let species = SpeciesData {
        name: entry.name.clone(),
        types: entry.types.iter().map(|t| Id::new(t)).collect(),
        ability0,
        ability1,
        hidden_ability: entry.hidden_ability.as_ref().map(|a| Id::new(a)),
        evolution,
    };
    Ok((id, species))
}
