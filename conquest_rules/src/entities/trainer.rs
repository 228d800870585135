//! A roster member commanding a party of creatures.

use serde::{Deserialize, Serialize};

use super::PlayerId;
use crate::dex::{Dex, Id};
use crate::entities::Creature;
use crate::error::ActionError;
use crate::mechanics::{ActionClass, ActionFlags, Rank};

/// A kingdom roster member.
///
/// Slot zero of the party is the distinguished signature creature; once
/// set it is never removed while other slots are occupied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trainer {
    pub name: String,
    /// Index of the owning kingdom.
    pub kingdom: usize,
    /// Player that owned the kingdom when this trainer was created. May
    /// diverge from the kingdom's current owner after a conquest.
    pub player: Option<PlayerId>,
    pub party: Vec<Creature>,
    pub rank: Rank,
    pub items: Vec<Id>,
    pub actions: ActionFlags,
    /// Permanently removed from play.
    pub lost: bool,
    /// Temporarily unavailable (enrolled in a trial).
    pub away: bool,
}

impl Trainer {
    /// Create a fresh rank-one trainer for a kingdom.
    pub fn new(name: impl Into<String>, kingdom: usize, player: Option<PlayerId>) -> Trainer {
        Trainer {
            name: name.into(),
            kingdom,
            player,
            party: Vec::new(),
            rank: Rank::One,
            items: Vec::new(),
            actions: ActionFlags::default(),
            lost: false,
            away: false,
        }
    }

    /// The signature creature, if the party is non-empty.
    pub fn signature(&self) -> Option<&Creature> {
        self.party.first()
    }

    /// Maximum party size at the current rank.
    pub fn max_party(&self) -> usize {
        self.rank.max_party()
    }

    /// Whether this trainer can currently act at all.
    pub fn available(&self) -> bool {
        !self.lost && !self.away
    }

    /// Whether an action of the given economy class is still permitted.
    pub fn can_use(&self, class: ActionClass) -> bool {
        self.actions.can_use(class)
    }

    /// Add a creature to the party, honoring the rank capacity.
    pub fn add_creature(&mut self, mut creature: Creature) -> Result<usize, ActionError> {
        if self.party.len() >= self.max_party() {
            return Err(ActionError::CapacityExceeded(format!(
                "{} already commands {} creatures",
                self.name,
                self.party.len()
            )));
        }
        creature.is_signature = self.party.is_empty();
        self.party.push(creature);
        Ok(self.party.len() - 1)
    }

    /// Remove a creature by slot. The signature creature cannot be
    /// removed while other slots are occupied.
    pub fn remove_creature(&mut self, slot: usize) -> Result<Creature, ActionError> {
        if slot >= self.party.len() {
            return Err(ActionError::InvalidTarget(format!("no creature in slot {slot}")));
        }
        if slot == 0 && self.party.len() > 1 {
            return Err(ActionError::InvalidTarget(
                "the signature creature cannot leave while the party has others".into(),
            ));
        }
        Ok(self.party.remove(slot))
    }

    /// Borrow a creature by slot.
    pub fn creature(&self, slot: usize) -> Result<&Creature, ActionError> {
        self.party
            .get(slot)
            .ok_or_else(|| ActionError::InvalidTarget(format!("no creature in slot {slot}")))
    }

    /// Mutably borrow a creature by slot.
    pub fn creature_mut(&mut self, slot: usize) -> Result<&mut Creature, ActionError> {
        self.party
            .get_mut(slot)
            .ok_or_else(|| ActionError::InvalidTarget(format!("no creature in slot {slot}")))
    }

    /// Level ceiling for the creature in the given slot.
    pub fn level_cap_for(&self, slot: usize) -> u8 {
        let signature_level = self.signature().map_or(0, |c| c.level);
        match self.party.get(slot) {
            Some(creature) => creature.level_cap(self.rank, signature_level),
            None => self.rank.level_cap(),
        }
    }

    /// Promote to the next rank. Rank only ever increases.
    pub fn promote(&mut self) -> Result<Rank, ActionError> {
        match self.rank.next() {
            Some(next) => {
                self.rank = next;
                Ok(next)
            }
            None => Err(ActionError::NotAvailable(format!(
                "{} is already at the highest rank",
                self.name
            ))),
        }
    }

    /// Remove one item from the inventory by id.
    pub fn take_item(&mut self, item: &Id) -> Result<Id, ActionError> {
        match self.items.iter().position(|i| i == item) {
            Some(pos) => Ok(self.items.remove(pos)),
            None => Err(ActionError::InvalidTarget(format!(
                "{} does not carry '{item}'",
                self.name
            ))),
        }
    }

    /// Export the whole party for the battle subsystem, one packed
    /// creature per `]`-separated segment.
    pub fn packed_team(&self, dex: &Dex) -> String {
        self.party
            .iter()
            .map(|c| c.packed(dex))
            .collect::<Vec<_>>()
            .join("]")
    }
}
