//! The closed facility variant family.
//!
//! Facilities are per-kingdom installations identified by their position
//! in the kingdom's fixed facility list. Each kind is one case of
//! [`FacilityKind`] dispatched through the shared capability surface:
//! monthly refresh, `do_action`, and a read-only dialog.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::args::Args;
use crate::dex::{Dex, Id};
use crate::entities::{Creature, Trainer};
use crate::error::{ActionError, ConfigError};
use crate::mechanics::{Rank, Stat};

/// Monthly ceiling on a single installation's sabotage counter.
pub const SABOTAGE_CAP: u8 = 6;

/// Months a day-care egg takes to hatch.
pub const EGG_HATCH_MONTHS: u8 = 3;

/// Most wild creatures a shelter holds at once.
pub const SHELTER_PENDING_CAP: usize = 3;

/// A pending day-care egg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Egg {
    pub species: Id,
    pub months_left: u8,
}

/// A trainer enrolled in the trial.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Enrollment {
    pub trainer: usize,
    pub months_left: u8,
}

/// Per-kind payload of a facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FacilityKind {
    /// Farmers market: general item shop.
    Market { stock: Vec<Id>, available: Vec<Id> },
    /// Technique tutor: teaches moves.
    Tutor { stock: Vec<Id>, available: Vec<Id> },
    /// Bonus shrine: friendship blessing.
    Shrine,
    /// Trade center: swaps creatures and arms trade evolutions.
    TradeCenter,
    /// Communications: reports on an adjacent kingdom (engine-resolved).
    Communications,
    /// Tomb: relic item shop.
    Tomb { stock: Vec<Id>, available: Vec<Id> },
    /// Mystic forest: rewrites ability and nature.
    Forest,
    /// Hidden dojo: grants the hidden ability.
    Dojo,
    /// Power gym: sum-preserving EV/IV redistribution.
    Gym,
    /// Weapons shop: held-item shop.
    Shop { stock: Vec<Id>, available: Vec<Id> },
    /// Relic class: ancient move tutor.
    RelicClass { stock: Vec<Id>, available: Vec<Id> },
    /// Day care: breeding and egg hatching.
    DayCare { egg: Option<Egg> },
    /// Festival: kingdom-wide friendship boost.
    Festival,
    /// Item shop: consumable shop.
    ItemShop { stock: Vec<Id>, available: Vec<Id> },
    /// Hermitage trial: time-boxed rank promotion.
    Trial { enrollee: Option<Enrollment> },
    /// Recruitment center: hires a new trainer (engine-resolved).
    RecruitmentCenter,
    /// Recon: reports installation readiness abroad (engine-resolved).
    Recon,
    /// Shelter: releases pending wild creatures.
    Shelter { pending: Vec<Id> },
    /// Park: rank-scaled friendship and IV boosts.
    Park,
}

impl FacilityKind {
    /// Parse a configured kind name, attaching shop/tutor stock.
    pub fn parse(kind: &str, stock: Vec<Id>) -> Result<FacilityKind, ConfigError> {
        let kind = match Id::new(kind).as_str() {
            "market" => FacilityKind::Market { available: stock.clone(), stock },
            "tutor" => FacilityKind::Tutor { available: stock.clone(), stock },
            "shrine" => FacilityKind::Shrine,
            "tradecenter" => FacilityKind::TradeCenter,
            "communications" => FacilityKind::Communications,
            "tomb" => FacilityKind::Tomb { available: stock.clone(), stock },
            "forest" => FacilityKind::Forest,
            "dojo" => FacilityKind::Dojo,
            "gym" => FacilityKind::Gym,
            "shop" => FacilityKind::Shop { available: stock.clone(), stock },
            "relicclass" => FacilityKind::RelicClass { available: stock.clone(), stock },
            "daycare" => FacilityKind::DayCare { egg: None },
            "festival" => FacilityKind::Festival,
            "itemshop" => FacilityKind::ItemShop { available: stock.clone(), stock },
            "trial" => FacilityKind::Trial { enrollee: None },
            "recruitmentcenter" => FacilityKind::RecruitmentCenter,
            "recon" => FacilityKind::Recon,
            "shelter" => FacilityKind::Shelter { pending: Vec::new() },
            "park" => FacilityKind::Park,
            other => return Err(ConfigError::UnknownFacilityKind(other.to_string())),
        };
        Ok(kind)
    }
}

/// Something a facility's monthly tick asks its kingdom to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacilityEvent {
    /// The enrolled trainer finished the trial and should be promoted.
    TrialCompleted { trainer: usize },
}

/// A kingdom installation offering a faculty-class action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub kind: FacilityKind,
    pub cooldown: u8,
    pub sabotage_count: u8,
}

impl Facility {
    pub fn new(kind: FacilityKind) -> Facility {
        Facility { kind, cooldown: 0, sabotage_count: 0 }
    }

    /// Stable display name of this facility's kind.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            FacilityKind::Market { .. } => "Farmers Market",
            FacilityKind::Tutor { .. } => "Technique Tutor",
            FacilityKind::Shrine => "Bonus Shrine",
            FacilityKind::TradeCenter => "Trade Center",
            FacilityKind::Communications => "Communications",
            FacilityKind::Tomb { .. } => "Tomb",
            FacilityKind::Forest => "Mystic Forest",
            FacilityKind::Dojo => "Hidden Dojo",
            FacilityKind::Gym => "Power Gym",
            FacilityKind::Shop { .. } => "Weapons Shop",
            FacilityKind::RelicClass { .. } => "Relic Class",
            FacilityKind::DayCare { .. } => "Day Care",
            FacilityKind::Festival => "Festival",
            FacilityKind::ItemShop { .. } => "Item Shop",
            FacilityKind::Trial { .. } => "Hermitage",
            FacilityKind::RecruitmentCenter => "Recruitment Center",
            FacilityKind::Recon => "Recon",
            FacilityKind::Shelter { .. } => "Shelter",
            FacilityKind::Park => "Park",
        }
    }

    /// Usable right now: neither sabotaged nor cooling down.
    pub fn available(&self) -> bool {
        self.sabotage_count == 0 && self.cooldown == 0
    }

    /// Whether another sabotage fits under the monthly cap.
    pub fn can_sabotage(&self) -> bool {
        self.sabotage_count < SABOTAGE_CAP
    }

    /// Record a successful sabotage.
    pub fn add_sabotage(&mut self) {
        self.sabotage_count = (self.sabotage_count + 1).min(SABOTAGE_CAP);
    }

    /// Monthly tick: restock, advance eggs and trials, and drain one
    /// counter unit. Sabotage drains before cooldown.
    pub fn on_next_month(&mut self, wild_pool: &[Id], rng: &mut StdRng) -> Option<FacilityEvent> {
        let mut event = None;
        match &mut self.kind {
            FacilityKind::Market { stock, available }
            | FacilityKind::Tutor { stock, available }
            | FacilityKind::Tomb { stock, available }
            | FacilityKind::Shop { stock, available }
            | FacilityKind::RelicClass { stock, available }
            | FacilityKind::ItemShop { stock, available } => {
                *available = stock.clone();
            }
            FacilityKind::DayCare { egg: Some(egg) } => {
                egg.months_left = egg.months_left.saturating_sub(1);
            }
            FacilityKind::Trial { enrollee } => {
                if let Some(enrollment) = enrollee {
                    enrollment.months_left -= 1;
                    if enrollment.months_left == 0 {
                        event = Some(FacilityEvent::TrialCompleted { trainer: enrollment.trainer });
                        *enrollee = None;
                    }
                }
            }
            FacilityKind::Shelter { pending } => {
                if pending.len() < SHELTER_PENDING_CAP && !wild_pool.is_empty() {
                    pending.push(wild_pool[rng.random_range(0..wild_pool.len())].clone());
                }
            }
            _ => {}
        }
        if self.sabotage_count > 0 {
            self.sabotage_count -= 1;
        } else if self.cooldown > 0 {
            self.cooldown -= 1;
        }
        event
    }

    /// Read-only view of the actionable state.
    pub fn dialog(&self) -> String {
        let mut buf = format!("{}", self.kind_name());
        if self.sabotage_count > 0 {
            buf.push_str(&format!(" [sabotaged, {} months]", self.sabotage_count));
        } else if self.cooldown > 0 {
            buf.push_str(&format!(" [cooling down, {} months]", self.cooldown));
        }
        match &self.kind {
            FacilityKind::Market { available, .. }
            | FacilityKind::Tomb { available, .. }
            | FacilityKind::Shop { available, .. }
            | FacilityKind::ItemShop { available, .. } => {
                buf.push_str(&format!(": items {}", join_ids(available)));
            }
            FacilityKind::Tutor { available, .. } | FacilityKind::RelicClass { available, .. } => {
                buf.push_str(&format!(": moves {}", join_ids(available)));
            }
            FacilityKind::DayCare { egg: Some(egg) } => {
                if egg.months_left == 0 {
                    buf.push_str(&format!(": a {} egg is ready to hatch", egg.species));
                } else {
                    buf.push_str(&format!(
                        ": a {} egg needs {} more months",
                        egg.species, egg.months_left
                    ));
                }
            }
            FacilityKind::DayCare { egg: None } => buf.push_str(": no egg"),
            FacilityKind::Trial { enrollee: Some(e) } => {
                buf.push_str(&format!(
                    ": trainer {} in seclusion for {} more months",
                    e.trainer, e.months_left
                ));
            }
            FacilityKind::Trial { enrollee: None } => buf.push_str(": accepting a challenger"),
            FacilityKind::Shelter { pending } => {
                buf.push_str(&format!(": sheltering {}", join_ids(pending)));
            }
            _ => {}
        }
        buf
    }

    /// Perform this facility's unique effect for a trainer.
    ///
    /// Cross-kingdom kinds (communications, recon, recruitment center)
    /// are resolved by the session, which has the whole map in scope.
    pub fn do_action(
        &mut self,
        dex: &Dex,
        trainers: &mut [Trainer],
        tidx: usize,
        args: &mut Args,
        rng: &mut StdRng,
    ) -> Result<String, ActionError> {
        if tidx >= trainers.len() {
            return Err(ActionError::InvalidTarget(format!("no trainer {tidx}")));
        }
        match &mut self.kind {
            FacilityKind::Market { available, .. }
            | FacilityKind::Tomb { available, .. }
            | FacilityKind::Shop { available, .. }
            | FacilityKind::ItemShop { available, .. } => {
                let item = args.expect_id("item")?;
                let pos = available.iter().position(|i| *i == item).ok_or_else(|| {
                    ActionError::NotAvailable(format!("'{item}' is not in stock this month"))
                })?;
                available.remove(pos);
                let trainer = &mut trainers[tidx];
                trainer.items.push(item.clone());
                Ok(format!("{} acquired {item}.", trainer.name))
            }
            FacilityKind::Tutor { available, .. } | FacilityKind::RelicClass { available, .. } => {
                let mv = args.expect_id("move")?;
                let slot = args.expect_index("party slot")?;
                let pos = available.iter().position(|m| *m == mv).ok_or_else(|| {
                    ActionError::NotAvailable(format!("'{mv}' cannot be taught this month"))
                })?;
                let creature = trainers[tidx].creature(slot)?;
                if creature.tutored_moves.contains(&mv) {
                    return Err(ActionError::NotAvailable(format!(
                        "that creature already knows {mv}"
                    )));
                }
                available.remove(pos);
                let creature = trainers[tidx].creature_mut(slot)?;
                creature.tutored_moves.push(mv.clone());
                if creature.moves.len() < 4 {
                    creature.moves.push(mv.clone());
                }
                Ok(format!("Slot {slot} learned {mv}."))
            }
            FacilityKind::Shrine => {
                let slot = args.expect_index("party slot")?;
                let creature = trainers[tidx].creature_mut(slot)?;
                creature.add_friendship(16);
                self.cooldown = 1;
                Ok(format!("The shrine blessed slot {slot}."))
            }
            FacilityKind::TradeCenter => {
                let slot_a = args.expect_index("party slot")?;
                let other = args.expect_index("other trainer")?;
                let slot_b = args.expect_index("other party slot")?;
                trade_creatures(dex, trainers, tidx, slot_a, other, slot_b)
            }
            FacilityKind::Forest => {
                let slot = args.expect_index("party slot")?;
                let ability = args.expect_id("ability")?;
                let nature = args.expect_id("nature")?;
                let creature = trainers[tidx].creature(slot)?;
                let species = dex.species(&creature.species).ok_or_else(|| {
                    ActionError::InvalidTarget(format!("species '{}' does not exist", creature.species))
                })?;
                if !species.has_natural_ability(&ability) {
                    return Err(ActionError::InvalidArguments(format!(
                        "'{ability}' is not a natural ability of {}",
                        species.name
                    )));
                }
                if !dex.nature_exists(&nature) {
                    return Err(ActionError::InvalidArguments(format!("'{nature}' is not a nature")));
                }
                if creature.ability == ability && creature.nature == nature {
                    return Err(ActionError::NotAvailable("nothing would change".into()));
                }
                let creature = trainers[tidx].creature_mut(slot)?;
                creature.ability = ability;
                creature.nature = nature;
                self.cooldown = 1;
                Ok(format!("The forest reshaped slot {slot}."))
            }
            FacilityKind::Dojo => {
                let slot = args.expect_index("party slot")?;
                let creature = trainers[tidx].creature(slot)?;
                let species = dex.species(&creature.species).ok_or_else(|| {
                    ActionError::InvalidTarget(format!("species '{}' does not exist", creature.species))
                })?;
                let hidden = species.hidden_ability.clone().ok_or_else(|| {
                    ActionError::InvalidTarget(format!("{} has no hidden ability", species.name))
                })?;
                if creature.ability == hidden {
                    return Err(ActionError::NotAvailable("that creature already mastered it".into()));
                }
                trainers[tidx].creature_mut(slot)?.ability = hidden.clone();
                Ok(format!("Slot {slot} awakened {hidden}."))
            }
            FacilityKind::Gym => {
                let slot = args.expect_index("party slot")?;
                let mut evs = crate::mechanics::StatTable::default();
                for stat in Stat::ALL {
                    evs.set(stat, args.expect_u16("EV value")?);
                }
                let mut ivs = crate::mechanics::StatTable::default();
                for stat in Stat::ALL {
                    ivs.set(stat, args.expect_u16("IV value")?);
                }
                trainers[tidx].creature_mut(slot)?.redistribute(evs, ivs)?;
                self.cooldown = 1;
                Ok(format!("Slot {slot} retrained its spreads."))
            }
            FacilityKind::DayCare { egg } => match args.expect("daycare action")? {
                "breed" => {
                    if egg.is_some() {
                        return Err(ActionError::NotAvailable("an egg is already being tended".into()));
                    }
                    let slot_a = args.expect_index("party slot")?;
                    let slot_b = args.expect_index("party slot")?;
                    if slot_a == slot_b {
                        return Err(ActionError::InvalidArguments("breeding takes two creatures".into()));
                    }
                    let species = trainers[tidx].creature(slot_a)?.species.clone();
                    trainers[tidx].creature(slot_b)?;
                    *egg = Some(Egg { species: species.clone(), months_left: EGG_HATCH_MONTHS });
                    Ok(format!("The day care is tending a {species} egg."))
                }
                "take" => {
                    let ready = match egg {
                        None => return Err(ActionError::NotAvailable("there is no egg".into())),
                        Some(e) if e.months_left > 0 => {
                            return Err(ActionError::NotReady(format!(
                                "the egg needs {} more months",
                                e.months_left
                            )))
                        }
                        Some(e) => e.species.clone(),
                    };
                    let trainer = &mut trainers[tidx];
                    if trainer.party.len() >= trainer.max_party() {
                        return Err(ActionError::CapacityExceeded(format!(
                            "{}'s party is full",
                            trainer.name
                        )));
                    }
                    let hatched = Creature::new(dex, ready.clone(), false, rng)?;
                    trainer.add_creature(hatched)?;
                    *egg = None;
                    Ok(format!("A {ready} hatched and joined {}.", trainers[tidx].name))
                }
                other => Err(ActionError::InvalidArguments(format!(
                    "'{other}' is not a day care action"
                ))),
            },
            FacilityKind::Festival => {
                for trainer in trainers.iter_mut() {
                    for creature in &mut trainer.party {
                        creature.add_friendship(8);
                    }
                }
                self.cooldown = 2;
                Ok("The festival lifted the whole kingdom's spirits.".into())
            }
            FacilityKind::Trial { enrollee } => {
                if enrollee.is_some() {
                    return Err(ActionError::NotAvailable("the hermitage has a challenger".into()));
                }
                let trainer = &mut trainers[tidx];
                let months = match trainer.rank {
                    Rank::One => 5,
                    Rank::Two => 12,
                    Rank::Three => {
                        return Err(ActionError::NotAvailable(format!(
                            "{} is already at the highest rank",
                            trainer.name
                        )))
                    }
                };
                *enrollee = Some(Enrollment { trainer: tidx, months_left: months });
                trainer.away = true;
                Ok(format!("{} entered seclusion for {months} months.", trainer.name))
            }
            FacilityKind::Shelter { pending } => {
                if pending.is_empty() {
                    return Err(ActionError::NotAvailable("no creature is sheltering here".into()));
                }
                let trainer = &mut trainers[tidx];
                if trainer.party.len() >= trainer.max_party() {
                    return Err(ActionError::CapacityExceeded(format!(
                        "{}'s party is full",
                        trainer.name
                    )));
                }
                let species = pending.remove(0);
                let rescued = Creature::new(dex, species.clone(), false, rng)?;
                trainer.add_creature(rescued)?;
                Ok(format!("{} took in a {species}.", trainer.name))
            }
            FacilityKind::Park => {
                let trainer = &mut trainers[tidx];
                let (iv_gain, friendship_gain, chosen) = match trainer.rank {
                    Rank::One => {
                        let mut stats = Vec::with_capacity(3);
                        for _ in 0..3 {
                            let stat = args.expect_stat()?;
                            if stats.contains(&stat) {
                                return Err(ActionError::InvalidArguments(
                                    "the three stats must be distinct".into(),
                                ));
                            }
                            stats.push(stat);
                        }
                        (1, 10, stats)
                    }
                    Rank::Two => (1, 20, Stat::ALL.to_vec()),
                    Rank::Three => (2, 30, Stat::ALL.to_vec()),
                };
                for creature in &mut trainer.party {
                    for stat in &chosen {
                        creature.add_ivs(*stat, iv_gain);
                    }
                    creature.add_friendship(friendship_gain);
                }
                self.cooldown = 1;
                Ok(format!("{}'s party enjoyed the park.", trainer.name))
            }
            FacilityKind::Communications | FacilityKind::Recon | FacilityKind::RecruitmentCenter => {
                Err(ActionError::InvalidTarget(
                    "this facility is handled by the session".into(),
                ))
            }
        }
    }
}

/// Swap two creatures between trainers of the same kingdom, arming the
/// trade-evolution trigger on species that evolve by trade.
fn trade_creatures(
    dex: &Dex,
    trainers: &mut [Trainer],
    a: usize,
    slot_a: usize,
    b: usize,
    slot_b: usize,
) -> Result<String, ActionError> {
    let (first, second) = pair_mut(trainers, a, b)?;
    if slot_a == 0 && first.party.len() > 1 || slot_b == 0 && second.party.len() > 1 {
        return Err(ActionError::InvalidTarget(
            "a signature creature cannot be traded away".into(),
        ));
    }
    first.creature(slot_a)?;
    second.creature(slot_b)?;
    std::mem::swap(&mut first.party[slot_a], &mut second.party[slot_b]);
    for (trainer, slot) in [(&mut *first, slot_a), (&mut *second, slot_b)] {
        let creature = &mut trainer.party[slot];
        creature.is_signature = slot == 0;
        if let Some(species) = dex.species(&creature.species) {
            if species.evolution.as_ref().is_some_and(|e| e.trade) {
                creature.evolution_armed = true;
            }
        }
    }
    Ok(format!("{} and {} completed a trade.", first.name, second.name))
}

/// Disjoint mutable borrows of two different trainers.
fn pair_mut(
    trainers: &mut [Trainer],
    a: usize,
    b: usize,
) -> Result<(&mut Trainer, &mut Trainer), ActionError> {
    if a == b {
        return Err(ActionError::InvalidArguments("two different trainers are required".into()));
    }
    if a >= trainers.len() || b >= trainers.len() {
        return Err(ActionError::InvalidTarget("no such trainer".into()));
    }
    if a < b {
        let (left, right) = trainers.split_at_mut(b);
        Ok((&mut left[a], &mut right[0]))
    } else {
        let (left, right) = trainers.split_at_mut(a);
        Ok((&mut right[0], &mut left[b]))
    }
}

fn join_ids(ids: &[Id]) -> String {
    if ids.is_empty() {
        "(none)".to_string()
    } else {
        ids.iter().map(Id::as_str).collect::<Vec<_>>().join(", ")
    }
}
