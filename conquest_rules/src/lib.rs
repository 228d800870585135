//! # Conquest Rules
//!
//! The "World Bible" crate - the data model and game rules for Trainer
//! Conquest: creatures, trainers, kingdoms, the facility and labor
//! variant families, the read-only species lookup, and static game
//! configuration. This crate is the single source of truth for game
//! state and contains no session or turn logic.

pub mod args;
pub mod config;
pub mod dex;
pub mod entities;
pub mod error;
pub mod kingdom;
pub mod mechanics;

pub use args::Args;
pub use config::{DexData, FacilityConfig, GameConfig, KingdomConfig, SpeciesConfig};
pub use dex::{Dex, Evolution, Id, SpeciesData};
pub use entities::{Creature, PlayerId, Trainer, STARTING_LEVEL};
pub use error::{ActionError, ConfigError};
pub use kingdom::{
    Egg, Enrollment, Facility, FacilityEvent, FacilityKind, Kingdom, Labor, LaborKind,
    EGG_HATCH_MONTHS, SABOTAGE_CAP, SHELTER_PENDING_CAP, TRAINER_CAP,
};
pub use mechanics::{
    rank_up_coefficients, ActionClass, ActionFlags, Rank, Stat, StatTable, EV_LIMIT,
    EV_TOTAL_LIMIT, FRIENDSHIP_LIMIT, IV_LIMIT,
};
