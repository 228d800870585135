//! Kingdoms: owned map nodes holding trainers, facilities, and labors.

mod facility;
mod labor;

pub use facility::*;
pub use labor::*;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::dex::Id;
use crate::entities::{PlayerId, Trainer};
use crate::error::ActionError;
use crate::mechanics::Stat;

/// Most trainers a kingdom can roster.
pub const TRAINER_CAP: usize = 6;

/// An owned map node, the unit of territorial conquest.
///
/// The facility and labor lists are fixed at creation; a member's
/// positional index is its stable public identifier for the lifetime of
/// the game. The trainer list is ordered but may grow and shrink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kingdom {
    pub name: String,
    /// Elemental type affinities.
    pub types: Vec<Id>,
    /// Stats trained by the `train` action here.
    pub training_stats: Vec<Stat>,
    pub trainers: Vec<Trainer>,
    pub facilities: Vec<Facility>,
    pub labors: Vec<Labor>,
    /// Undirected adjacency, by kingdom index.
    pub neighbors: BTreeSet<usize>,
    pub owner: Option<PlayerId>,
    /// One-shot override for the next capture.
    pub forced_capture: Option<Id>,
    /// Species available to `catch` here.
    pub wild_pool: Vec<Id>,
    /// Species granted to newly recruited trainers.
    pub starter_pool: Vec<Id>,
}

impl Kingdom {
    /// Add a trainer, honoring the roster cap.
    pub fn add_trainer(&mut self, trainer: Trainer) -> Result<usize, ActionError> {
        if self.trainers.len() >= TRAINER_CAP {
            return Err(ActionError::CapacityExceeded(format!(
                "{} already rosters {TRAINER_CAP} trainers",
                self.name
            )));
        }
        self.trainers.push(trainer);
        Ok(self.trainers.len() - 1)
    }

    /// Borrow a trainer by index.
    pub fn trainer(&self, idx: usize) -> Result<&Trainer, ActionError> {
        self.trainers
            .get(idx)
            .ok_or_else(|| ActionError::InvalidTarget(format!("{} has no trainer {idx}", self.name)))
    }

    /// Mutably borrow a trainer by index.
    pub fn trainer_mut(&mut self, idx: usize) -> Result<&mut Trainer, ActionError> {
        let name = self.name.clone();
        self.trainers
            .get_mut(idx)
            .ok_or_else(|| ActionError::InvalidTarget(format!("{name} has no trainer {idx}")))
    }

    /// Borrow a facility by its stable index.
    pub fn facility(&self, idx: usize) -> Result<&Facility, ActionError> {
        self.facilities
            .get(idx)
            .ok_or_else(|| ActionError::InvalidTarget(format!("{} has no facility {idx}", self.name)))
    }

    /// Mutably borrow a facility by its stable index.
    pub fn facility_mut(&mut self, idx: usize) -> Result<&mut Facility, ActionError> {
        let name = self.name.clone();
        self.facilities
            .get_mut(idx)
            .ok_or_else(|| ActionError::InvalidTarget(format!("{name} has no facility {idx}")))
    }

    /// Borrow a labor by its stable index.
    pub fn labor(&self, idx: usize) -> Result<&Labor, ActionError> {
        self.labors
            .get(idx)
            .ok_or_else(|| ActionError::InvalidTarget(format!("{} has no labor {idx}", self.name)))
    }

    /// Mutably borrow a labor by its stable index.
    pub fn labor_mut(&mut self, idx: usize) -> Result<&mut Labor, ActionError> {
        let name = self.name.clone();
        self.labors
            .get_mut(idx)
            .ok_or_else(|| ActionError::InvalidTarget(format!("{name} has no labor {idx}")))
    }

    /// Whether another kingdom is adjacent to this one.
    pub fn is_adjacent(&self, idx: usize) -> bool {
        self.neighbors.contains(&idx)
    }

    /// Trainer indices currently able to act, with at least one creature
    /// still standing.
    pub fn available_trainers(&self) -> Vec<usize> {
        self.trainers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.available() && t.party.iter().any(|c| !c.fainted))
            .map(|(i, _)| i)
            .collect()
    }

    /// Take the forced-capture override, if set.
    pub fn take_forced_capture(&mut self) -> Option<Id> {
        self.forced_capture.take()
    }

    /// Draw a random species from the wild pool.
    pub fn draw_wild(&self, rng: &mut StdRng) -> Option<Id> {
        if self.wild_pool.is_empty() {
            None
        } else {
            Some(self.wild_pool[rng.random_range(0..self.wild_pool.len())].clone())
        }
    }

    /// Draw a random starter species for a new recruit.
    pub fn draw_starter(&self, rng: &mut StdRng) -> Option<Id> {
        if self.starter_pool.is_empty() {
            None
        } else {
            Some(self.starter_pool[rng.random_range(0..self.starter_pool.len())].clone())
        }
    }

    /// Monthly cascade: tick every facility and labor, then apply the
    /// events they reported (trial completions promote their trainer and
    /// return them to availability).
    pub fn on_next_month(&mut self, rng: &mut StdRng) {
        let mut events = Vec::new();
        for facility in &mut self.facilities {
            if let Some(event) = facility.on_next_month(&self.wild_pool, rng) {
                events.push(event);
            }
        }
        for labor in &mut self.labors {
            labor.on_next_month();
        }
        // Parties knocked out in battle recover over the month.
        for trainer in &mut self.trainers {
            for creature in &mut trainer.party {
                creature.fainted = false;
            }
        }
        for event in events {
            match event {
                FacilityEvent::TrialCompleted { trainer } => {
                    if let Some(trainer) = self.trainers.get_mut(trainer) {
                        trainer.away = false;
                        // Enrollment rejects rank three, so this cannot fail.
                        let _ = trainer.promote();
                    }
                }
            }
        }
    }
}
