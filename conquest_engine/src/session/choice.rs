//! Verb handlers for submitted choices.
//!
//! Every handler validates completely before mutating anything, so a
//! rejected choice leaves the session untouched. Action economy is
//! checked first: basic and faculty actions coexist within a turn, a
//! battle action excludes everything else.

use conquest_rules::{
    rank_up_coefficients, ActionClass, Args, Creature, FacilityKind, Id, Kingdom, LaborKind,
    PlayerId, Stat, Trainer, EV_LIMIT, EV_TOTAL_LIMIT, TRAINER_CAP,
};
use rand::Rng;
use tracing::{debug, info};

use crate::battle::{ConquestRecord, Installation, SabotageRecord};
use crate::error::ChoiceError;
use crate::session::{Awaiting, GameSession, Interrupt};

/// EVs gained on each designated training stat per rank number.
const TRAIN_EV_STEP: u16 = 8;

/// EVs granted by one vitamin dose.
const VITAMIN_EV: u16 = 10;

impl GameSession {
    pub(crate) fn dispatch(&mut self, player: PlayerId, text: &str) -> Result<String, ChoiceError> {
        if self.interrupt_pending() {
            if self.interrupts.front().map(|i| i.target) != Some(player) {
                return Err(ChoiceError::WrongTurn);
            }
            return self.resolve_interrupt(text);
        }
        let active = self.kingdoms.get(self.active_kingdom).ok_or(ChoiceError::NotStarted)?;
        if active.owner != Some(player) {
            return Err(ChoiceError::WrongTurn);
        }
        let mut args = Args::tokenize(text);
        let verb = args
            .next()
            .ok_or_else(|| ChoiceError::UnrecognizedChoice(String::new()))?;
        debug!(verb, kingdom = self.active_kingdom, "dispatching choice");
        match verb {
            "train" => self.choose_train(&mut args),
            "catch" => self.choose_catch(&mut args),
            "recruit" => self.choose_recruit(&mut args),
            "facility" => self.choose_facility(&mut args),
            "labor" => self.choose_labor(&mut args),
            "movepokemon" => self.choose_move_creature(&mut args),
            "moveitem" => self.choose_move_item(&mut args),
            "move" => self.choose_move_trainer(&mut args),
            "sabotage" => self.choose_sabotage(player, &mut args),
            "conquer" => self.choose_conquer(player, &mut args),
            "rankup" => self.choose_rank_up(&mut args),
            "useskill" => self.choose_use_skill(&mut args),
            "moveset" => self.choose_moveset(&mut args),
            "giveitem" => self.choose_give_item(&mut args),
            "takeitem" => self.choose_take_item(&mut args),
            "evolve" => self.choose_evolve(&mut args),
            "done" => self.choose_done(),
            other => Err(ChoiceError::UnrecognizedChoice(other.to_string())),
        }
    }

    /// The named trainer exists, can act, and has the economy class free.
    fn check_economy(&self, tidx: usize, class: ActionClass) -> Result<(), ChoiceError> {
        let kingdom = self.kingdoms.get(self.active_kingdom).ok_or(ChoiceError::NotStarted)?;
        let trainer = kingdom.trainer(tidx)?;
        if !trainer.available() {
            return Err(ChoiceError::NotAvailable(format!(
                "{} cannot act right now",
                trainer.name
            )));
        }
        if !trainer.can_use(class) {
            return Err(ChoiceError::NotReady(format!(
                "{} has no {} action left this turn",
                trainer.name,
                class_word(class)
            )));
        }
        Ok(())
    }

    /// Resolve a kingdom by index or by normalized name.
    fn resolve_kingdom(&self, token: &str) -> Result<usize, ChoiceError> {
        if let Ok(idx) = token.parse::<usize>() {
            if idx < self.kingdoms.len() {
                return Ok(idx);
            }
            return Err(ChoiceError::InvalidTarget(format!("no kingdom {idx}")));
        }
        let wanted = Id::new(token);
        self.kingdoms
            .iter()
            .position(|k| Id::new(&k.name) == wanted)
            .ok_or_else(|| ChoiceError::InvalidTarget(format!("no kingdom named '{token}'")))
    }

    /// The target is a different kingdom adjacent to the active one.
    fn check_adjacent(&self, target: usize) -> Result<(), ChoiceError> {
        if target == self.active_kingdom {
            return Err(ChoiceError::InvalidTarget("that is your own kingdom".into()));
        }
        if !self.kingdoms[self.active_kingdom].is_adjacent(target) {
            return Err(ChoiceError::InvalidTarget(format!(
                "{} is not adjacent",
                self.kingdoms[target].name
            )));
        }
        Ok(())
    }

    fn choose_train(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let tidx = args.expect_index("trainer")?;
        self.check_economy(tidx, ActionClass::Basic)?;
        let kingdom = &mut self.kingdoms[self.active_kingdom];
        let stats = kingdom.training_stats.clone();
        let trainer = kingdom.trainer_mut(tidx)?;
        if trainer.party.is_empty() {
            return Err(ChoiceError::NotAvailable(format!(
                "{} has no party to train",
                trainer.name
            )));
        }
        let rank = trainer.rank;
        let gain = TRAIN_EV_STEP * u16::from(rank.number());
        // Slot zero first: non-signatures are capped by the signature's
        // level as it stands after its own gain.
        for slot in 0..trainer.party.len() {
            let signature_level = trainer.party[0].level;
            let creature = &mut trainer.party[slot];
            let cap = creature.level_cap(rank, signature_level);
            creature.try_level_up(1, cap);
            for stat in &stats {
                creature.add_evs(*stat, gain);
            }
        }
        trainer.actions.mark_used(ActionClass::Basic);
        Ok(format!("{}'s party trained hard.", trainer.name))
    }

    fn choose_catch(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let tidx = args.expect_index("trainer")?;
        self.check_economy(tidx, ActionClass::Basic)?;
        {
            let kingdom = &self.kingdoms[self.active_kingdom];
            let trainer = kingdom.trainer(tidx)?;
            if trainer.party.len() >= trainer.max_party() {
                return Err(ChoiceError::CapacityExceeded(format!(
                    "{}'s party is full",
                    trainer.name
                )));
            }
            if let Some(species) = &kingdom.forced_capture {
                if self.dex.species(species).is_none() {
                    return Err(ChoiceError::InvalidTarget(format!(
                        "species '{species}' does not exist"
                    )));
                }
            } else if kingdom.wild_pool.is_empty() {
                return Err(ChoiceError::NotAvailable(format!(
                    "nothing wild roams {}",
                    kingdom.name
                )));
            }
        }
        let kingdom = &mut self.kingdoms[self.active_kingdom];
        let species = match kingdom.take_forced_capture() {
            Some(species) => species,
            None => kingdom
                .draw_wild(&mut self.rng)
                .ok_or_else(|| ChoiceError::NotAvailable("nothing to catch".into()))?,
        };
        let creature = Creature::new(&self.dex, species.clone(), false, &mut self.rng)?;
        let trainer = self.kingdoms[self.active_kingdom].trainer_mut(tidx)?;
        trainer.add_creature(creature)?;
        trainer.actions.mark_used(ActionClass::Basic);
        Ok(format!("{} caught a {species}!", trainer.name))
    }

    fn choose_recruit(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let tidx = args.expect_index("trainer")?;
        let name = args.expect("recruit name")?.to_string();
        self.check_economy(tidx, ActionClass::Basic)?;
        let (owner, species) = {
            let kingdom = &self.kingdoms[self.active_kingdom];
            if kingdom.trainers.len() >= TRAINER_CAP {
                return Err(ChoiceError::CapacityExceeded(format!(
                    "{} already rosters {TRAINER_CAP} trainers",
                    kingdom.name
                )));
            }
            let species = kingdom.draw_starter(&mut self.rng).ok_or_else(|| {
                ChoiceError::NotAvailable(format!("{} has no starters to offer", kingdom.name))
            })?;
            (kingdom.owner, species)
        };
        let creature = Creature::new(&self.dex, species.clone(), true, &mut self.rng)?;
        let mut recruit = Trainer::new(name.clone(), self.active_kingdom, owner);
        recruit.add_creature(creature)?;
        let kingdom = &mut self.kingdoms[self.active_kingdom];
        kingdom.add_trainer(recruit)?;
        kingdom.trainer_mut(tidx)?.actions.mark_used(ActionClass::Basic);
        Ok(format!("{name} joined {} with a {species}.", kingdom.name))
    }

    fn choose_facility(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let fidx = args.expect_index("facility")?;
        let tidx = args.expect_index("trainer")?;
        self.check_economy(tidx, ActionClass::Faculty)?;
        let special = {
            let facility = self.kingdoms[self.active_kingdom].facility(fidx)?;
            if !facility.available() {
                return Err(ChoiceError::NotAvailable(format!(
                    "the {} is not open this month",
                    facility.kind_name()
                )));
            }
            match facility.kind {
                FacilityKind::Communications => Some(Special::Communications),
                FacilityKind::Recon => Some(Special::Recon),
                FacilityKind::RecruitmentCenter => Some(Special::Recruitment),
                _ => None,
            }
        };
        let msg = match special {
            Some(Special::Communications) => self.facility_communications(args)?,
            Some(Special::Recon) => self.facility_recon(fidx, args)?,
            Some(Special::Recruitment) => self.facility_recruit(fidx, args)?,
            None => {
                let Kingdom { facilities, trainers, .. } =
                    &mut self.kingdoms[self.active_kingdom];
                facilities[fidx].do_action(&self.dex, trainers, tidx, args, &mut self.rng)?
            }
        };
        self.kingdoms[self.active_kingdom]
            .trainer_mut(tidx)?
            .actions
            .mark_used(ActionClass::Faculty);
        Ok(msg)
    }

    /// Summary of an adjacent kingdom: ruler, roster, readiness.
    fn facility_communications(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let target = self.resolve_kingdom(args.expect("kingdom")?)?;
        self.check_adjacent(target)?;
        let kingdom = &self.kingdoms[target];
        let ruler = kingdom
            .owner
            .and_then(|id| self.players.iter().find(|p| p.id == id))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "no one".into());
        let ready = kingdom.facilities.iter().filter(|f| f.available()).count();
        Ok(format!(
            "{}: ruled by {ruler}, {} trainers, {ready}/{} facilities ready.",
            kingdom.name,
            kingdom.trainers.len(),
            kingdom.facilities.len()
        ))
    }

    /// Full installation report on an adjacent kingdom.
    fn facility_recon(&mut self, fidx: usize, args: &mut Args) -> Result<String, ChoiceError> {
        let target = self.resolve_kingdom(args.expect("kingdom")?)?;
        self.check_adjacent(target)?;
        let kingdom = &self.kingdoms[target];
        let mut lines = vec![format!("Recon report on {}:", kingdom.name)];
        lines.extend(kingdom.facilities.iter().map(|f| f.dialog()));
        lines.extend(kingdom.labors.iter().map(|l| l.dialog()));
        let report = lines.join(" | ");
        self.kingdoms[self.active_kingdom].facility_mut(fidx)?.cooldown = 2;
        Ok(report)
    }

    /// Hire a named trainer with a starter signature, on a long cooldown.
    fn facility_recruit(&mut self, fidx: usize, args: &mut Args) -> Result<String, ChoiceError> {
        let name = args.expect("recruit name")?.to_string();
        let (owner, species) = {
            let kingdom = &self.kingdoms[self.active_kingdom];
            if kingdom.trainers.len() >= TRAINER_CAP {
                return Err(ChoiceError::CapacityExceeded(format!(
                    "{} already rosters {TRAINER_CAP} trainers",
                    kingdom.name
                )));
            }
            let species = kingdom.draw_starter(&mut self.rng).ok_or_else(|| {
                ChoiceError::NotAvailable(format!("{} has no starters to offer", kingdom.name))
            })?;
            (kingdom.owner, species)
        };
        let creature = Creature::new(&self.dex, species.clone(), true, &mut self.rng)?;
        let mut recruit = Trainer::new(name.clone(), self.active_kingdom, owner);
        recruit.add_creature(creature)?;
        let kingdom = &mut self.kingdoms[self.active_kingdom];
        kingdom.add_trainer(recruit)?;
        kingdom.facility_mut(fidx)?.cooldown = 3;
        Ok(format!("The recruitment center enlisted {name} with a {species}."))
    }

    fn choose_labor(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let lidx = args.expect_index("labor")?;
        let tidx = args.expect_index("trainer")?;
        self.check_economy(tidx, ActionClass::Faculty)?;
        let (kind_name, rank) = {
            let kingdom = &self.kingdoms[self.active_kingdom];
            let labor = kingdom.labor(lidx)?;
            if !labor.can_activate() {
                return Err(ChoiceError::NotReady(format!(
                    "the {} labor is not ready",
                    labor.kind_name()
                )));
            }
            (labor.kind_name(), kingdom.trainer(tidx)?.rank)
        };
        let msg = match kind_name {
            "Transport" => {
                let mut connected = Vec::new();
                while let Some(token) = args.next() {
                    let target = self.resolve_kingdom(token)?;
                    self.check_adjacent(target)?;
                    if !connected.contains(&target) {
                        connected.push(target);
                    }
                }
                if connected.is_empty() {
                    return Err(ChoiceError::InvalidArguments(
                        "name at least one adjacent kingdom".into(),
                    ));
                }
                let count = connected.len();
                let labor = self.kingdoms[self.active_kingdom].labor_mut(lidx)?;
                labor.rank = rank;
                if let LaborKind::Transport { connected: links } = &mut labor.kind {
                    *links = connected;
                }
                labor.activate()?;
                format!("Transport routes are opening to {count} kingdom(s).")
            }
            "Construction" => {
                let raw = args.expect("facility kind")?;
                let built = FacilityKind::parse(raw, Vec::new()).map_err(|_| {
                    ChoiceError::InvalidArguments(format!("'{raw}' is not a facility kind"))
                })?;
                let built = conquest_rules::Facility::new(built);
                let label = built.kind_name();
                let labor = self.kingdoms[self.active_kingdom].labor_mut(lidx)?;
                labor.rank = rank;
                if let LaborKind::Construction { facility } = &mut labor.kind {
                    *facility = Some(built);
                }
                labor.activate()?;
                format!("Construction began on a temporary {label}.")
            }
            "Convoy" => {
                let mut path = Vec::new();
                let mut prev = self.active_kingdom;
                while let Some(token) = args.next() {
                    let hop = self.resolve_kingdom(token)?;
                    if !self.kingdoms[prev].is_adjacent(hop) {
                        return Err(ChoiceError::InvalidTarget(format!(
                            "{} does not border {}",
                            self.kingdoms[prev].name, self.kingdoms[hop].name
                        )));
                    }
                    path.push(hop);
                    prev = hop;
                }
                if path.is_empty() {
                    return Err(ChoiceError::InvalidArguments(
                        "name the kingdoms along the route".into(),
                    ));
                }
                let hops = path.len();
                let labor = self.kingdoms[self.active_kingdom].labor_mut(lidx)?;
                labor.rank = rank;
                if let LaborKind::Convoy { path: route } = &mut labor.kind {
                    *route = path;
                }
                labor.activate()?;
                format!("A convoy set out along {hops} hop(s).")
            }
            "Defenders" => {
                let labor = self.kingdoms[self.active_kingdom].labor_mut(lidx)?;
                labor.rank = rank;
                labor.activate()?;
                "The garrison mustered.".to_string()
            }
            "Scout" => {
                let target = self.resolve_kingdom(args.expect("kingdom")?)?;
                self.check_adjacent(target)?;
                let name = self.kingdoms[target].name.clone();
                let labor = self.kingdoms[self.active_kingdom].labor_mut(lidx)?;
                labor.rank = rank;
                if let LaborKind::Scout { target: watched } = &mut labor.kind {
                    *watched = Some(target);
                }
                labor.activate()?;
                format!("Scouts slipped toward {name}.")
            }
            other => return Err(ChoiceError::UnrecognizedChoice(other.to_string())),
        };
        self.kingdoms[self.active_kingdom]
            .trainer_mut(tidx)?
            .actions
            .mark_used(ActionClass::Faculty);
        Ok(msg)
    }

    fn choose_move_creature(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let from = args.expect_index("trainer")?;
        let slot = args.expect_index("party slot")?;
        let to = args.expect_index("receiving trainer")?;
        self.check_economy(from, ActionClass::Faculty)?;
        {
            let kingdom = &self.kingdoms[self.active_kingdom];
            if from == to {
                return Err(ChoiceError::InvalidArguments(
                    "two different trainers are required".into(),
                ));
            }
            let giver = kingdom.trainer(from)?;
            giver.creature(slot)?;
            if slot == 0 && giver.party.len() > 1 {
                return Err(ChoiceError::InvalidTarget(
                    "the signature creature cannot leave while the party has others".into(),
                ));
            }
            let receiver = kingdom.trainer(to)?;
            if !receiver.available() {
                return Err(ChoiceError::NotAvailable(format!(
                    "{} cannot receive a creature right now",
                    receiver.name
                )));
            }
            if receiver.party.len() >= receiver.max_party() {
                return Err(ChoiceError::CapacityExceeded(format!(
                    "{}'s party is full",
                    receiver.name
                )));
            }
        }
        let kingdom = &mut self.kingdoms[self.active_kingdom];
        let mut creature = kingdom.trainers[from].party.remove(slot);
        creature.is_signature = kingdom.trainers[to].party.is_empty();
        kingdom.trainers[to].party.push(creature);
        kingdom.trainers[from].actions.mark_used(ActionClass::Faculty);
        Ok(format!(
            "{} handed a creature to {}.",
            kingdom.trainers[from].name, kingdom.trainers[to].name
        ))
    }

    fn choose_move_item(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let from = args.expect_index("trainer")?;
        let item = args.expect_id("item")?;
        let to = args.expect_index("receiving trainer")?;
        self.check_economy(from, ActionClass::Faculty)?;
        {
            let kingdom = &self.kingdoms[self.active_kingdom];
            if from == to {
                return Err(ChoiceError::InvalidArguments(
                    "two different trainers are required".into(),
                ));
            }
            let giver = kingdom.trainer(from)?;
            if !giver.items.contains(&item) {
                return Err(ChoiceError::InvalidTarget(format!(
                    "{} does not carry '{item}'",
                    giver.name
                )));
            }
            let receiver = kingdom.trainer(to)?;
            if !receiver.available() {
                return Err(ChoiceError::NotAvailable(format!(
                    "{} cannot receive an item right now",
                    receiver.name
                )));
            }
        }
        let kingdom = &mut self.kingdoms[self.active_kingdom];
        let item = kingdom.trainers[from].take_item(&item)?;
        kingdom.trainers[to].items.push(item.clone());
        kingdom.trainers[from].actions.mark_used(ActionClass::Faculty);
        Ok(format!(
            "{} passed {item} to {}.",
            kingdom.trainers[from].name, kingdom.trainers[to].name
        ))
    }

    fn choose_move_trainer(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let tidx = args.expect_index("trainer")?;
        let target = self.resolve_kingdom(args.expect("kingdom")?)?;
        self.check_economy(tidx, ActionClass::Faculty)?;
        self.check_adjacent(target)?;
        if self.kingdoms[target].owner != self.kingdoms[self.active_kingdom].owner {
            return Err(ChoiceError::InvalidTarget(format!(
                "{} belongs to another ruler",
                self.kingdoms[target].name
            )));
        }
        if self.kingdoms[target].trainers.len() >= TRAINER_CAP {
            return Err(ChoiceError::CapacityExceeded(format!(
                "{} already rosters {TRAINER_CAP} trainers",
                self.kingdoms[target].name
            )));
        }
        if self.kingdom_in_dispute(self.active_kingdom) {
            return Err(ChoiceError::NotAvailable(format!(
                "{}'s roster is frozen while a battle is pending",
                self.kingdoms[self.active_kingdom].name
            )));
        }
        let mut trainer = self.kingdoms[self.active_kingdom].trainers.remove(tidx);
        trainer.actions.mark_used(ActionClass::Faculty);
        trainer.kingdom = target;
        let name = trainer.name.clone();
        self.kingdoms[target].trainers.push(trainer);
        Ok(format!("{name} traveled to {}.", self.kingdoms[target].name))
    }

    fn choose_sabotage(&mut self, player: PlayerId, args: &mut Args) -> Result<String, ChoiceError> {
        let target = self.resolve_kingdom(args.expect("kingdom")?)?;
        let class = args.expect("'facility' or 'labor'")?;
        let idx = args.expect_index("installation")?;
        let attackers = collect_attackers(args)?;
        self.check_adjacent(target)?;
        let defender_player = self.kingdoms[target].owner.ok_or_else(|| {
            ChoiceError::InvalidTarget(format!("{} is unruled", self.kingdoms[target].name))
        })?;
        if defender_player == player {
            return Err(ChoiceError::InvalidTarget("you cannot raid your own domain".into()));
        }
        let installation = match class {
            "facility" => {
                let facility = self.kingdoms[target].facility(idx)?;
                if !facility.can_sabotage() {
                    return Err(ChoiceError::NotAvailable(format!(
                        "the {} cannot be disrupted further this month",
                        facility.kind_name()
                    )));
                }
                Installation::Facility(idx)
            }
            "labor" => {
                let labor = self.kingdoms[target].labor(idx)?;
                if !labor.can_sabotage() {
                    return Err(ChoiceError::NotAvailable(format!(
                        "the {} labor cannot be disrupted further this month",
                        labor.kind_name()
                    )));
                }
                Installation::Labor(idx)
            }
            other => {
                return Err(ChoiceError::InvalidArguments(format!(
                    "'{other}' is not an installation class"
                )))
            }
        };
        self.check_war_party(&attackers)?;
        let defenders = self.kingdoms[target].available_trainers();
        for &a in &attackers {
            self.kingdoms[self.active_kingdom].trainers[a]
                .actions
                .mark_used(ActionClass::Battle);
        }
        let kingdom_name = self.kingdoms[target].name.clone();
        if defenders.is_empty() {
            let installation_name = self.apply_sabotage(target, installation);
            info!(kingdom = %kingdom_name, installation = %installation_name, "unopposed sabotage");
            self.notify(
                defender_player,
                format!("{kingdom_name}'s {installation_name} was sabotaged unopposed!"),
            );
            return Ok(format!(
                "Your saboteurs crippled {kingdom_name}'s {installation_name} unopposed."
            ));
        }
        let needed = attackers.len().min(defenders.len());
        self.prompt_defense(defender_player, &kingdom_name, needed, &defenders, "Saboteurs strike");
        let record = SabotageRecord {
            attacker_kingdom: self.active_kingdom,
            target_kingdom: target,
            attacker_player: player,
            defender_player,
            installation,
            attackers,
            defenders: Vec::new(),
        };
        self.interrupts.push_back(Interrupt {
            target: defender_player,
            awaiting: Awaiting::SabotageDefense { record, needed },
        });
        Ok(format!("{kingdom_name} must now commit defenders."))
    }

    fn choose_conquer(&mut self, player: PlayerId, args: &mut Args) -> Result<String, ChoiceError> {
        let target = self.resolve_kingdom(args.expect("kingdom")?)?;
        let attackers = collect_attackers(args)?;
        self.check_adjacent(target)?;
        let defender_player = self.kingdoms[target].owner.ok_or_else(|| {
            ChoiceError::InvalidTarget(format!("{} is unruled", self.kingdoms[target].name))
        })?;
        if defender_player == player {
            return Err(ChoiceError::InvalidTarget("you already rule that kingdom".into()));
        }
        self.check_war_party(&attackers)?;
        let defenders = self.kingdoms[target].available_trainers();
        for &a in &attackers {
            self.kingdoms[self.active_kingdom].trainers[a]
                .actions
                .mark_used(ActionClass::Battle);
        }
        let kingdom_name = self.kingdoms[target].name.clone();
        if defenders.is_empty() {
            self.kingdoms[target].owner = Some(player);
            info!(kingdom = %kingdom_name, "unopposed conquest; ownership transferred");
            self.notify(defender_player, format!("{kingdom_name} has fallen!"));
            return Ok(format!("{kingdom_name} has fallen to you unopposed!"));
        }
        let needed = attackers.len().min(defenders.len());
        self.prompt_defense(defender_player, &kingdom_name, needed, &defenders, "Invasion");
        let record = ConquestRecord {
            attacker_kingdom: self.active_kingdom,
            target_kingdom: target,
            attacker_player: player,
            defender_player,
            attackers,
            defenders: Vec::new(),
            eliminated_defenders: Vec::new(),
        };
        self.interrupts.push_back(Interrupt {
            target: defender_player,
            awaiting: Awaiting::ConquestDefense { record, needed },
        });
        Ok(format!("{kingdom_name} must now commit defenders."))
    }

    /// Every named attacker can fight and still has its battle action.
    fn check_war_party(&self, attackers: &[usize]) -> Result<(), ChoiceError> {
        let kingdom = &self.kingdoms[self.active_kingdom];
        for &a in attackers {
            let trainer = kingdom.trainer(a)?;
            if !trainer.available() || trainer.party.iter().all(|c| c.fainted) {
                return Err(ChoiceError::NotAvailable(format!(
                    "{} cannot fight",
                    trainer.name
                )));
            }
            if !trainer.can_use(ActionClass::Battle) {
                return Err(ChoiceError::NotReady(format!(
                    "{} has already acted this turn",
                    trainer.name
                )));
            }
        }
        Ok(())
    }

    fn choose_rank_up(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let tidx = args.expect_index("trainer")?;
        self.check_economy(tidx, ActionClass::Battle)?;
        let chance = {
            let trainer = self.kingdoms[self.active_kingdom].trainer(tidx)?;
            if trainer.party.is_empty() {
                return Err(ChoiceError::NotAvailable(format!(
                    "{} has no party to prove",
                    trainer.name
                )));
            }
            let (per_level, per_friendship, per_ev) = rank_up_coefficients(trainer.rank)
                .ok_or_else(|| {
                    ChoiceError::NotAvailable(format!(
                        "{} is already at the highest rank",
                        trainer.name
                    ))
                })?;
            let score: f64 = trainer
                .party
                .iter()
                .map(|c| {
                    f64::from(c.level) * per_level
                        + f64::from(c.friendship) * per_friendship
                        + f64::from(c.evs.sum()) * per_ev
                })
                .sum();
            score.min(100.0)
        };
        let roll = self.rng.random_range(0.0..100.0);
        let trainer = self.kingdoms[self.active_kingdom].trainer_mut(tidx)?;
        trainer.actions.mark_used(ActionClass::Battle);
        if roll < chance {
            let next = trainer.promote()?;
            info!(trainer = %trainer.name, rank = next.number(), "rank-up trial passed");
            Ok(format!("{} passed the trial and reached rank {}!", trainer.name, next.number()))
        } else {
            Ok(format!("{} failed the rank-up trial.", trainer.name))
        }
    }

    fn choose_use_skill(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let tidx = args.expect_index("trainer")?;
        let slot = args.expect_index("party slot")?;
        let item = args.expect_id("item")?;
        {
            let trainer = self.kingdoms[self.active_kingdom].trainer(tidx)?;
            if !trainer.available() {
                return Err(ChoiceError::NotAvailable(format!(
                    "{} cannot act right now",
                    trainer.name
                )));
            }
            trainer.creature(slot)?;
            if !trainer.items.contains(&item) {
                return Err(ChoiceError::InvalidTarget(format!(
                    "{} does not carry '{item}'",
                    trainer.name
                )));
            }
        }
        if item.as_str() == "rarecandy" {
            let trainer = self.kingdoms[self.active_kingdom].trainer_mut(tidx)?;
            let cap = trainer.level_cap_for(slot);
            if trainer.party[slot].level >= cap {
                return Err(ChoiceError::NotAvailable(format!(
                    "slot {slot} is already at its level cap"
                )));
            }
            trainer.take_item(&item)?;
            trainer.party[slot].try_level_up(1, cap);
            let level = trainer.party[slot].level;
            Ok(format!("Slot {slot} grew to level {level}."))
        } else {
            let stat = vitamin_stat(&item).ok_or_else(|| {
                ChoiceError::InvalidTarget(format!("'{item}' is not a training item"))
            })?;
            let trainer = self.kingdoms[self.active_kingdom].trainer_mut(tidx)?;
            let creature = &trainer.party[slot];
            let room = EV_LIMIT
                .saturating_sub(creature.evs.get(stat))
                .min(EV_TOTAL_LIMIT.saturating_sub(creature.evs.sum()) as u16);
            if room == 0 {
                return Err(ChoiceError::NotAvailable(format!(
                    "slot {slot} has no room for more {} EVs",
                    stat.token()
                )));
            }
            trainer.take_item(&item)?;
            let gained = trainer.party[slot].add_evs(stat, VITAMIN_EV);
            Ok(format!("Slot {slot} gained {gained} {} EVs.", stat.token()))
        }
    }

    fn choose_moveset(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let tidx = args.expect_index("trainer")?;
        let slot = args.expect_index("party slot")?;
        let mut moves = Vec::new();
        while let Some(token) = args.next() {
            let mv = Id::new(token);
            if moves.contains(&mv) {
                return Err(ChoiceError::InvalidArguments(format!("'{mv}' is listed twice")));
            }
            moves.push(mv);
        }
        if moves.is_empty() || moves.len() > 4 {
            return Err(ChoiceError::InvalidArguments(
                "a moveset holds between one and four moves".into(),
            ));
        }
        {
            let trainer = self.kingdoms[self.active_kingdom].trainer(tidx)?;
            if !trainer.available() {
                return Err(ChoiceError::NotAvailable(format!(
                    "{} cannot act right now",
                    trainer.name
                )));
            }
            let creature = trainer.creature(slot)?;
            for mv in &moves {
                if !creature.tutored_moves.contains(mv) {
                    return Err(ChoiceError::NotAvailable(format!(
                        "slot {slot} has not learned {mv}"
                    )));
                }
            }
        }
        let creature = self.kingdoms[self.active_kingdom]
            .trainer_mut(tidx)?
            .creature_mut(slot)?;
        creature.moves = moves;
        Ok(format!("Slot {slot}'s moveset was rearranged."))
    }

    fn choose_give_item(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let tidx = args.expect_index("trainer")?;
        let slot = args.expect_index("party slot")?;
        let item = args.expect_id("item")?;
        {
            let trainer = self.kingdoms[self.active_kingdom].trainer(tidx)?;
            if !trainer.available() {
                return Err(ChoiceError::NotAvailable(format!(
                    "{} cannot act right now",
                    trainer.name
                )));
            }
            trainer.creature(slot)?;
            if !trainer.items.contains(&item) {
                return Err(ChoiceError::InvalidTarget(format!(
                    "{} does not carry '{item}'",
                    trainer.name
                )));
            }
        }
        let trainer = self.kingdoms[self.active_kingdom].trainer_mut(tidx)?;
        let item = trainer.take_item(&item)?;
        // Any previously held item returns to the inventory.
        if let Some(held) = trainer.party[slot].item.replace(item.clone()) {
            trainer.items.push(held);
        }
        Ok(format!("Slot {slot} now holds {item}."))
    }

    fn choose_take_item(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let tidx = args.expect_index("trainer")?;
        let slot = args.expect_index("party slot")?;
        let trainer = self.kingdoms[self.active_kingdom].trainer_mut(tidx)?;
        if !trainer.available() {
            return Err(ChoiceError::NotAvailable(format!(
                "{} cannot act right now",
                trainer.name
            )));
        }
        let item = trainer
            .creature_mut(slot)?
            .item
            .take()
            .ok_or_else(|| ChoiceError::NotAvailable(format!("slot {slot} holds nothing")))?;
        trainer.items.push(item.clone());
        Ok(format!("{} pocketed {item}.", trainer.name))
    }

    fn choose_evolve(&mut self, args: &mut Args) -> Result<String, ChoiceError> {
        let tidx = args.expect_index("trainer")?;
        let slot = args.expect_index("party slot")?;
        let (next_species, remap) = {
            let trainer = self.kingdoms[self.active_kingdom].trainer(tidx)?;
            if !trainer.available() {
                return Err(ChoiceError::NotAvailable(format!(
                    "{} cannot act right now",
                    trainer.name
                )));
            }
            let creature = trainer.creature(slot)?;
            let species = self.dex.species(&creature.species).ok_or_else(|| {
                ChoiceError::InvalidTarget(format!("species '{}' does not exist", creature.species))
            })?;
            let evolution = species.evolution.as_ref().ok_or_else(|| {
                ChoiceError::NotAvailable(format!("{} does not evolve", species.name))
            })?;
            let eligible = creature.evolution_armed
                || evolution.level.is_some_and(|lv| creature.level >= lv)
                || evolution.friendship.is_some_and(|f| creature.friendship >= f);
            if !eligible {
                return Err(ChoiceError::NotReady(
                    "the conditions for evolution are not met".into(),
                ));
            }
            let next = self.dex.species(&evolution.into).ok_or_else(|| {
                ChoiceError::InvalidTarget(format!("species '{}' does not exist", evolution.into))
            })?;
            // An ability the new form cannot carry resets to its primary.
            let keeps = next.has_natural_ability(&creature.ability)
                || next.hidden_ability.as_ref() == Some(&creature.ability);
            (evolution.into.clone(), if keeps { None } else { Some(next.ability0.clone()) })
        };
        let creature = self.kingdoms[self.active_kingdom]
            .trainer_mut(tidx)?
            .creature_mut(slot)?;
        let old = std::mem::replace(&mut creature.species, next_species.clone());
        if let Some(ability) = remap {
            creature.ability = ability;
        }
        creature.evolution_armed = false;
        Ok(format!("{old} evolved into {next_species}!"))
    }

    fn choose_done(&mut self) -> Result<String, ChoiceError> {
        self.next_kingdom();
        let name = self
            .kingdoms
            .get(self.active_kingdom)
            .map(|k| k.name.clone())
            .unwrap_or_default();
        Ok(format!("Month {}: it is {name}'s turn.", self.month))
    }
}

enum Special {
    Communications,
    Recon,
    Recruitment,
}

fn class_word(class: ActionClass) -> &'static str {
    match class {
        ActionClass::Basic => "basic",
        ActionClass::Faculty => "faculty",
        ActionClass::Battle => "battle",
        ActionClass::Free => "free",
    }
}

/// The trailing tokens of a war declaration: distinct trainer indices.
fn collect_attackers(args: &mut Args) -> Result<Vec<usize>, ChoiceError> {
    let mut attackers = Vec::new();
    while !args.is_empty() {
        let idx = args.expect_index("attacking trainer")?;
        if attackers.contains(&idx) {
            return Err(ChoiceError::InvalidArguments(
                "each attacker may be named once".into(),
            ));
        }
        attackers.push(idx);
    }
    if attackers.is_empty() {
        return Err(ChoiceError::InvalidArguments(
            "name at least one attacking trainer".into(),
        ));
    }
    Ok(attackers)
}

fn vitamin_stat(item: &Id) -> Option<Stat> {
    match item.as_str() {
        "hpup" => Some(Stat::Hp),
        "protein" => Some(Stat::Atk),
        "iron" => Some(Stat::Def),
        "calcium" => Some(Stat::SpA),
        "zinc" => Some(Stat::SpD),
        "carbos" => Some(Stat::Spe),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::{BattleReport, BattleSide};
    use crate::testutil::{fixture, three_kingdom_fixture, two_kingdom_fixture_with_extra_defender};
    use conquest_rules::{Rank, SABOTAGE_CAP, STARTING_LEVEL};

    #[test]
    fn test_unknown_verb_is_rejected() {
        let mut fx = fixture();
        assert_eq!(
            fx.session.submit_choice(fx.alice, "dance"),
            Err(ChoiceError::UnrecognizedChoice("dance".into()))
        );
    }

    #[test]
    fn test_train_levels_party_and_consumes_basic() {
        let mut fx = fixture();
        fx.session.submit_choice(fx.alice, "train 0").unwrap();
        let creature = &fx.session.kingdoms[0].trainers[0].party[0];
        assert_eq!(creature.level, STARTING_LEVEL + 1);
        for stat in &fx.session.kingdoms[0].training_stats {
            assert_eq!(creature.evs.get(*stat), 8);
        }
        assert!(fx.session.kingdoms[0].trainers[0].actions.basic_used);
        assert!(matches!(
            fx.session.submit_choice(fx.alice, "train 0"),
            Err(ChoiceError::NotReady(_))
        ));
    }

    #[test]
    fn test_basic_action_excludes_battle_same_turn() {
        let mut fx = fixture();
        fx.session.submit_choice(fx.alice, "train 0").unwrap();
        assert!(matches!(
            fx.session.submit_choice(fx.alice, "rankup 0"),
            Err(ChoiceError::NotReady(_))
        ));
        // The flags clear when the kingdom's turn ends.
        fx.session.submit_choice(fx.alice, "done").unwrap();
        assert!(!fx.session.kingdoms[0].trainers[0].actions.basic_used);
    }

    #[test]
    fn test_catch_respects_party_cap() {
        let mut fx = fixture();
        let dex = fx.session.dex().clone();
        let mut extras = Vec::new();
        for _ in 0..2 {
            extras.push(Creature::new(&dex, Id::new("embercub"), false, fx.rng()).unwrap());
        }
        let rowan = &mut fx.session.kingdoms[0].trainers[0];
        assert_eq!(rowan.max_party(), 3);
        rowan.party.extend(extras);
        assert!(matches!(
            fx.session.submit_choice(fx.alice, "catch 0"),
            Err(ChoiceError::CapacityExceeded(_))
        ));
        // The rejection did not spend the basic action.
        assert!(!fx.session.kingdoms[0].trainers[0].actions.basic_used);
    }

    #[test]
    fn test_catch_honors_forced_capture_first() {
        let mut fx = fixture();
        fx.session.kingdoms[0].forced_capture = Some(Id::new("aquarin"));
        fx.session.submit_choice(fx.alice, "catch 0").unwrap();
        let party = &fx.session.kingdoms[0].trainers[0].party;
        assert_eq!(party[1].species, Id::new("aquarin"));
        assert!(fx.session.kingdoms[0].forced_capture.is_none());
    }

    #[test]
    fn test_recruit_adds_trainer_with_signature_starter() {
        let mut fx = fixture();
        fx.session.submit_choice(fx.alice, "recruit 0 Sage").unwrap();
        let kingdom = &fx.session.kingdoms[0];
        let recruit = kingdom.trainers.last().unwrap();
        assert_eq!(recruit.name, "Sage");
        assert_eq!(recruit.rank, Rank::One);
        assert!(recruit.party[0].is_signature);
        assert!(kingdom.trainers[0].actions.basic_used);
    }

    #[test]
    fn test_facility_action_marks_faculty() {
        let mut fx = fixture();
        // Kingdom 0's facility 0 is a shrine; bless the signature slot.
        fx.session.submit_choice(fx.alice, "facility 0 0 0").unwrap();
        let kingdom = &fx.session.kingdoms[0];
        assert_eq!(kingdom.trainers[0].party[0].friendship, 16);
        assert_eq!(kingdom.facilities[0].cooldown, 1);
        assert!(kingdom.trainers[0].actions.faculty_used);
        // Economy check comes first; with the flag cleared the cooldown
        // still blocks a second visit.
        assert!(matches!(
            fx.session.submit_choice(fx.alice, "facility 0 0 0"),
            Err(ChoiceError::NotReady(_))
        ));
        fx.session.kingdoms[0].trainers[0].actions.reset();
        assert!(matches!(
            fx.session.submit_choice(fx.alice, "facility 0 0 0"),
            Err(ChoiceError::NotAvailable(_))
        ));
    }

    #[test]
    fn test_labor_activation_sets_countdowns() {
        let mut fx = fixture();
        fx.session.submit_choice(fx.alice, "labor 0 0").unwrap();
        let labor = &fx.session.kingdoms[0].labors[0];
        assert_eq!(labor.active_count, 4);
        assert!(fx.session.kingdoms[0].trainers[0].actions.faculty_used);
    }

    #[test]
    fn test_move_trainer_requires_same_ruler() {
        let mut fx = fixture();
        assert!(matches!(
            fx.session.submit_choice(fx.alice, "move 0 southvale"),
            Err(ChoiceError::InvalidTarget(_))
        ));
        fx.session.kingdoms[1].owner = Some(fx.alice);
        fx.session.submit_choice(fx.alice, "move 0 southvale").unwrap();
        assert!(fx.session.kingdoms[0].trainers.is_empty());
        assert_eq!(fx.session.kingdoms[1].trainers.last().unwrap().name, "Rowan");
        assert_eq!(fx.session.kingdoms[1].trainers.last().unwrap().kingdom, 1);
    }

    #[test]
    fn test_move_creature_transfers_within_kingdom() {
        let mut fx = two_kingdom_fixture_with_extra_defender();
        let dex = fx.session.dex().clone();
        let extra = Creature::new(&dex, Id::new("aquarin"), false, fx.rng()).unwrap();
        fx.session.kingdoms[0].trainers[0].party.push(extra);
        fx.session.submit_choice(fx.alice, "movepokemon 0 1 1").unwrap();
        assert_eq!(fx.session.kingdoms[0].trainers[0].party.len(), 1);
        assert_eq!(fx.session.kingdoms[0].trainers[1].party.len(), 2);
        assert!(!fx.session.kingdoms[0].trainers[1].party[1].is_signature);
    }

    #[test]
    fn test_sabotage_at_cap_is_rejected() {
        let mut fx = fixture();
        fx.session.kingdoms[1].facilities[0].sabotage_count = SABOTAGE_CAP;
        assert!(matches!(
            fx.session.submit_choice(fx.alice, "sabotage 1 facility 0 0"),
            Err(ChoiceError::NotAvailable(_))
        ));
        assert_eq!(fx.session.kingdoms[1].facilities[0].sabotage_count, SABOTAGE_CAP);
        assert!(!fx.session.kingdoms[0].trainers[0].actions.battle_used);
    }

    #[test]
    fn test_sabotage_unopposed_applies_immediately() {
        let mut fx = fixture();
        fx.session.kingdoms[1].trainers[0].away = true;
        fx.session.submit_choice(fx.alice, "sabotage 1 facility 0 0").unwrap();
        assert_eq!(fx.session.kingdoms[1].facilities[0].sabotage_count, 1);
        assert!(!fx.session.interrupt_pending());
        assert_eq!(fx.session.pending_battle_count(), 0);
        assert!(fx.session.kingdoms[0].trainers[0].actions.battle_used);
    }

    #[test]
    fn test_sabotage_battle_victory_increments_counter() {
        let mut fx = fixture();
        fx.session.submit_choice(fx.alice, "sabotage 1 facility 0 0").unwrap();
        fx.session.submit_choice(fx.bob, "0").unwrap();
        let request = fx.session.take_battle_requests().pop().unwrap();
        assert_eq!(request.attacker_teams.len(), 1);
        assert_eq!(request.defender_teams.len(), 1);
        let report = BattleReport {
            winner: Some(BattleSide::Attacker),
            routed_attackers: vec![],
            routed_defenders: vec![0],
        };
        fx.session.on_battle_report(request.handle, &report).unwrap();
        assert_eq!(fx.session.kingdoms[1].facilities[0].sabotage_count, 1);
        // A duplicate delivery of the same report is stale.
        assert!(fx.session.on_battle_report(request.handle, &report).is_err());
        assert_eq!(fx.session.kingdoms[1].facilities[0].sabotage_count, 1);
    }

    #[test]
    fn test_sabotage_repelled_leaves_counter_unchanged() {
        let mut fx = fixture();
        fx.session.submit_choice(fx.alice, "sabotage 1 facility 0 0").unwrap();
        fx.session.submit_choice(fx.bob, "0").unwrap();
        let request = fx.session.take_battle_requests().pop().unwrap();
        let report = BattleReport {
            winner: Some(BattleSide::Defender),
            routed_attackers: vec![0],
            routed_defenders: vec![],
        };
        fx.session.on_battle_report(request.handle, &report).unwrap();
        assert_eq!(fx.session.kingdoms[1].facilities[0].sabotage_count, 0);
    }

    #[test]
    fn test_conquest_eliminating_all_defenders_transfers_ownership() {
        let mut fx = fixture();
        fx.session.submit_choice(fx.alice, "conquer 1 0").unwrap();
        fx.session.submit_choice(fx.bob, "0").unwrap();
        let request = fx.session.take_battle_requests().pop().unwrap();
        let report = BattleReport {
            winner: Some(BattleSide::Attacker),
            routed_attackers: vec![],
            routed_defenders: vec![0],
        };
        fx.session.on_battle_report(request.handle, &report).unwrap();
        assert_eq!(fx.session.kingdoms[1].owner, Some(fx.alice));
        assert_eq!(fx.session.pending_battle_count(), 0);
        assert!(!fx.session.interrupt_pending());
    }

    #[test]
    fn test_conquest_routed_attackers_end_the_invasion() {
        let mut fx = fixture();
        fx.session.submit_choice(fx.alice, "conquer 1 0").unwrap();
        fx.session.submit_choice(fx.bob, "0").unwrap();
        let request = fx.session.take_battle_requests().pop().unwrap();
        let report = BattleReport {
            winner: Some(BattleSide::Defender),
            routed_attackers: vec![0],
            routed_defenders: vec![],
        };
        fx.session.on_battle_report(request.handle, &report).unwrap();
        assert_eq!(fx.session.kingdoms[1].owner, Some(fx.bob));
        assert!(!fx.session.interrupt_pending());
    }

    #[test]
    fn test_roster_is_frozen_while_battle_pending() {
        let mut fx = three_kingdom_fixture();
        fx.session.submit_choice(fx.alice, "conquer 1 0").unwrap();
        // Bob commits Wren (index 1) and the battle goes out.
        fx.session.submit_choice(fx.bob, "1").unwrap();
        let request = fx.session.take_battle_requests().pop().unwrap();
        fx.session.submit_choice(fx.alice, "done").unwrap();
        // On his own turn Bob cannot reshuffle the contested roster.
        assert!(matches!(
            fx.session.submit_choice(fx.bob, "move 0 eastreach"),
            Err(ChoiceError::NotAvailable(_))
        ));
        assert_eq!(fx.session.kingdoms[1].trainers[0].name, "Briar");
        // Routing position 0 of the committed list eliminates Wren.
        let report = BattleReport {
            winner: Some(BattleSide::Attacker),
            routed_attackers: vec![],
            routed_defenders: vec![0],
        };
        fx.session.on_battle_report(request.handle, &report).unwrap();
        assert!(fx.session.kingdoms[1].trainers[1].party[0].fainted);
        // Briar fights the next round and falls; the kingdom follows.
        fx.session.submit_choice(fx.bob, "0").unwrap();
        let request = fx.session.take_battle_requests().pop().unwrap();
        fx.session.on_battle_report(request.handle, &report).unwrap();
        assert_eq!(fx.session.kingdoms[1].owner, Some(fx.alice));
        // With no battle pending, the fallen kingdom's new ruler may
        // reshuffle the roster freely.
        fx.session.submit_choice(fx.alice, "move 0 northmarch").unwrap();
        assert_eq!(fx.session.kingdoms[0].trainers.last().unwrap().name, "Briar");
    }

    #[test]
    fn test_battle_rout_faints_party_and_arms_survivors() {
        let mut fx = fixture();
        fx.session.submit_choice(fx.alice, "sabotage 1 facility 0 0").unwrap();
        fx.session.submit_choice(fx.bob, "0").unwrap();
        let request = fx.session.take_battle_requests().pop().unwrap();
        let report = BattleReport {
            winner: Some(BattleSide::Defender),
            routed_attackers: vec![0],
            routed_defenders: vec![],
        };
        fx.session.on_battle_report(request.handle, &report).unwrap();
        // Rowan's party fainted with him; Briar's aquarin came home armed.
        assert!(fx.session.kingdoms[0].trainers[0].party[0].fainted);
        assert!(fx.session.kingdoms[1].trainers[0].party[0].evolution_armed);
        // A routed trainer cannot raise a new war party this month.
        assert!(matches!(
            fx.session.submit_choice(fx.alice, "conquer 1 0"),
            Err(ChoiceError::NotAvailable(_))
        ));
        // The armed trigger satisfies `evolve` well below the level gate.
        fx.session.submit_choice(fx.alice, "done").unwrap();
        fx.session.submit_choice(fx.bob, "evolve 0 0").unwrap();
        assert_eq!(fx.session.kingdoms[1].trainers[0].party[0].species, Id::new("embercub"));
    }

    #[test]
    fn test_conquer_unopposed_transfers_ownership() {
        let mut fx = fixture();
        fx.session.kingdoms[1].trainers[0].lost = true;
        fx.session.submit_choice(fx.alice, "conquer 1 0").unwrap();
        assert_eq!(fx.session.kingdoms[1].owner, Some(fx.alice));
    }

    #[test]
    fn test_rank_up_succeeds_with_saturated_chance() {
        let mut fx = fixture();
        {
            let trainer = &mut fx.session.kingdoms[0].trainers[0];
            for creature in &mut trainer.party {
                creature.level = 100;
                creature.friendship = 255;
                creature.add_evs(Stat::Atk, 252);
                creature.add_evs(Stat::Spe, 252);
            }
        }
        fx.session.submit_choice(fx.alice, "rankup 0").unwrap();
        let trainer = &fx.session.kingdoms[0].trainers[0];
        // level 100 * 0.40 + friendship 255 * 0.05 + 504 EVs * 0.010
        // saturates past 100, so the promotion cannot miss.
        assert_eq!(trainer.rank, Rank::Two);
        assert!(trainer.actions.battle_used);
    }

    #[test]
    fn test_rank_up_at_top_rank_is_rejected_without_spending() {
        let mut fx = fixture();
        fx.session.kingdoms[0].trainers[0].rank = Rank::Three;
        assert!(matches!(
            fx.session.submit_choice(fx.alice, "rankup 0"),
            Err(ChoiceError::NotAvailable(_))
        ));
        assert!(!fx.session.kingdoms[0].trainers[0].actions.battle_used);
    }

    #[test]
    fn test_useskill_rare_candy_and_vitamin() {
        let mut fx = fixture();
        {
            let trainer = &mut fx.session.kingdoms[0].trainers[0];
            trainer.items.push(Id::new("rarecandy"));
            trainer.items.push(Id::new("protein"));
        }
        fx.session.submit_choice(fx.alice, "useskill 0 0 rarecandy").unwrap();
        fx.session.submit_choice(fx.alice, "useskill 0 0 protein").unwrap();
        let trainer = &fx.session.kingdoms[0].trainers[0];
        assert_eq!(trainer.party[0].level, STARTING_LEVEL + 1);
        assert_eq!(trainer.party[0].evs.get(Stat::Atk), 10);
        assert!(trainer.items.is_empty());
        // Free actions never touch the turn economy.
        assert!(!trainer.actions.basic_used && !trainer.actions.faculty_used);
    }

    #[test]
    fn test_moveset_limited_to_tutored_moves() {
        let mut fx = fixture();
        fx.session.kingdoms[0].trainers[0].party[0].tutored_moves =
            vec![Id::new("tackle"), Id::new("ember")];
        assert!(matches!(
            fx.session.submit_choice(fx.alice, "moveset 0 0 surge"),
            Err(ChoiceError::NotAvailable(_))
        ));
        fx.session.submit_choice(fx.alice, "moveset 0 0 ember tackle").unwrap();
        let creature = &fx.session.kingdoms[0].trainers[0].party[0];
        assert_eq!(creature.moves, vec![Id::new("ember"), Id::new("tackle")]);
    }

    #[test]
    fn test_give_item_swaps_held_item_back() {
        let mut fx = fixture();
        {
            let trainer = &mut fx.session.kingdoms[0].trainers[0];
            trainer.items.push(Id::new("charcoal"));
            trainer.party[0].item = Some(Id::new("berry"));
        }
        fx.session.submit_choice(fx.alice, "giveitem 0 0 charcoal").unwrap();
        let trainer = &fx.session.kingdoms[0].trainers[0];
        assert_eq!(trainer.party[0].item, Some(Id::new("charcoal")));
        assert_eq!(trainer.items, vec![Id::new("berry")]);
    }

    #[test]
    fn test_evolve_by_level_remaps_foreign_ability() {
        let mut fx = fixture();
        {
            let creature = &mut fx.session.kingdoms[0].trainers[0].party[0];
            creature.species = Id::new("aquarin");
            creature.ability = Id::new("torrent");
            creature.level = 9;
        }
        assert!(matches!(
            fx.session.submit_choice(fx.alice, "evolve 0 0"),
            Err(ChoiceError::NotReady(_))
        ));
        fx.session.kingdoms[0].trainers[0].party[0].level = 10;
        fx.session.submit_choice(fx.alice, "evolve 0 0").unwrap();
        let creature = &fx.session.kingdoms[0].trainers[0].party[0];
        assert_eq!(creature.species, Id::new("embercub"));
        // Torrent is not an embercub ability, so it falls back to the
        // species' primary.
        assert_eq!(creature.ability, Id::new("flareup"));
    }

    #[test]
    fn test_evolve_by_friendship() {
        let mut fx = fixture();
        {
            let creature = &mut fx.session.kingdoms[0].trainers[0].party[0];
            creature.species = Id::new("aquarin");
            creature.ability = Id::new("flareup");
            creature.friendship = 159;
        }
        assert!(matches!(
            fx.session.submit_choice(fx.alice, "evolve 0 0"),
            Err(ChoiceError::NotReady(_))
        ));
        fx.session.kingdoms[0].trainers[0].party[0].friendship = 160;
        fx.session.submit_choice(fx.alice, "evolve 0 0").unwrap();
        let creature = &fx.session.kingdoms[0].trainers[0].party[0];
        assert_eq!(creature.species, Id::new("embercub"));
        // Flareup is natural to embercub and survives the change.
        assert_eq!(creature.ability, Id::new("flareup"));
    }
}
