//! Static game configuration.
//!
//! A game is created from two TOML documents: the species database
//! ([`DexData`]) and the map ([`GameConfig`]). Everything is validated at
//! build time; an identifier that does not resolve here is corrupted
//! configuration and fails the whole setup rather than surfacing later
//! during play.

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};

use crate::dex::{Dex, Id};
use crate::error::ConfigError;
use crate::kingdom::{Facility, FacilityKind, Kingdom, Labor, LaborKind};
use crate::mechanics::Stat;

/// Deserialized species database.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DexData {
    #[serde(default)]
    pub species: Vec<SpeciesConfig>,
    #[serde(default)]
    pub moves: Vec<String>,
    /// Defaults to the 25 standard natures when empty.
    #[serde(default)]
    pub natures: Vec<String>,
}

/// One configured species.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    /// Natural abilities in slot order; one or two entries.
    pub abilities: Vec<String>,
    pub hidden_ability: Option<String>,
    pub evolves_into: Option<String>,
    pub evolve_level: Option<u8>,
    pub evolve_friendship: Option<u8>,
    #[serde(default)]
    pub evolve_trade: bool,
    #[serde(default)]
    pub evolve_battle: bool,
}

impl DexData {
    pub fn from_toml(text: &str) -> Result<DexData, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Deserialized map configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    pub kingdoms: Vec<KingdomConfig>,
}

/// One configured kingdom.
#[derive(Debug, Clone, Deserialize)]
pub struct KingdomConfig {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    pub training_stats: Vec<String>,
    #[serde(default)]
    pub wild_pool: Vec<String>,
    #[serde(default)]
    pub starter_pool: Vec<String>,
    /// Adjacent kingdoms by name; adjacency is symmetrized.
    #[serde(default)]
    pub neighbors: Vec<String>,
    #[serde(default)]
    pub facilities: Vec<FacilityConfig>,
    #[serde(default)]
    pub labors: Vec<String>,
}

/// One configured facility slot.
#[derive(Debug, Clone, Deserialize)]
pub struct FacilityConfig {
    pub kind: String,
    /// Monthly stock for shops and tutors.
    #[serde(default)]
    pub stock: Vec<String>,
}

impl GameConfig {
    pub fn from_toml(text: &str) -> Result<GameConfig, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Build the kingdom arena from configuration, resolving every name and
/// identifier against the dex up front.
pub fn build_kingdoms(config: &GameConfig, dex: &Dex) -> Result<Vec<Kingdom>, ConfigError> {
    let index_by_name: HashMap<Id, usize> = config
        .kingdoms
        .iter()
        .enumerate()
        .map(|(i, k)| (Id::new(&k.name), i))
        .collect();
    if index_by_name.len() != config.kingdoms.len() {
        return Err(ConfigError::Invalid("duplicate kingdom names".into()));
    }

    let mut kingdoms = Vec::with_capacity(config.kingdoms.len());
    for entry in &config.kingdoms {
        let mut training_stats = Vec::with_capacity(entry.training_stats.len());
        for raw in &entry.training_stats {
            let stat = Stat::from_token(raw).ok_or_else(|| ConfigError::UnknownStat(raw.clone()))?;
            training_stats.push(stat);
        }

        let wild_pool = resolve_species_pool(&entry.wild_pool, dex)?;
        let starter_pool = resolve_species_pool(&entry.starter_pool, dex)?;

        let mut neighbors = BTreeSet::new();
        for name in &entry.neighbors {
            let idx = *index_by_name
                .get(&Id::new(name))
                .ok_or_else(|| ConfigError::UnknownKingdom(name.clone()))?;
            neighbors.insert(idx);
        }

        let mut facilities = Vec::with_capacity(entry.facilities.len());
        for facility in &entry.facilities {
            let stock = resolve_stock(facility, dex)?;
            facilities.push(Facility::new(FacilityKind::parse(&facility.kind, stock)?));
        }

        let mut labors = Vec::with_capacity(entry.labors.len());
        for labor in &entry.labors {
            labors.push(Labor::new(LaborKind::parse(labor)?));
        }

        kingdoms.push(Kingdom {
            name: entry.name.clone(),
            types: entry.types.iter().map(|t| Id::new(t)).collect(),
            training_stats,
            trainers: Vec::new(),
            facilities,
            labors,
            neighbors,
            owner: None,
            forced_capture: None,
            wild_pool,
            starter_pool,
        });
    }

    // Symmetrize adjacency: the map graph is undirected.
    for i in 0..kingdoms.len() {
        let neighbors: Vec<usize> = kingdoms[i].neighbors.iter().copied().collect();
        for j in neighbors {
            if j == i {
                return Err(ConfigError::Invalid(format!(
                    "kingdom '{}' lists itself as a neighbor",
                    kingdoms[i].name
                )));
            }
            kingdoms[j].neighbors.insert(i);
        }
    }

    Ok(kingdoms)
}

fn resolve_species_pool(pool: &[String], dex: &Dex) -> Result<Vec<Id>, ConfigError> {
    let mut out = Vec::with_capacity(pool.len());
    for raw in pool {
        let id = Id::new(raw);
        if dex.species(&id).is_none() {
            return Err(ConfigError::UnknownSpecies(raw.clone()));
        }
        out.push(id);
    }
    Ok(out)
}

/// Tutor stock must name known moves; item stock is opaque to the dex.
fn resolve_stock(facility: &FacilityConfig, dex: &Dex) -> Result<Vec<Id>, ConfigError> {
    let is_tutor = matches!(Id::new(&facility.kind).as_str(), "tutor" | "relicclass");
    let mut out = Vec::with_capacity(facility.stock.len());
    for raw in &facility.stock {
        let id = Id::new(raw);
        if is_tutor && !dex.move_exists(&id) {
            return Err(ConfigError::UnknownMove(raw.clone()));
        }
        out.push(id);
    }
    Ok(out)
}
