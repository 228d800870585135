//! The game session: lifecycle, the turn/month state machine, and the
//! suspension points around the external battle subsystem.

mod choice;
mod interrupt;

pub use interrupt::{Awaiting, Interrupt};

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, VecDeque};
use tracing::info;

use conquest_rules::config::build_kingdoms;
use conquest_rules::{ConfigError, Creature, Dex, GameConfig, Id, Kingdom, PlayerId, Trainer};

use crate::battle::{
    BattleHandle, BattleReport, BattleRequest, BattleSide, ConquestRecord, Installation,
    PendingBattle, ReportError, SabotageRecord,
};
use crate::error::ChoiceError;
use crate::player::Player;

/// One persistent match: all kingdoms, all players, and everything that
/// must survive between submitted choices.
///
/// A session is a single logical thread of control: exactly one choice is
/// processed to completion before the next is accepted. The only
/// asynchronous suspension point is the battle hand-off, bridged by the
/// handle-keyed pending records.
#[derive(Debug)]
pub struct GameSession {
    dex: Dex,
    kingdoms: Vec<Kingdom>,
    players: Vec<Player>,
    month: u32,
    active_kingdom: usize,
    interrupts: VecDeque<Interrupt>,
    pending_battles: HashMap<BattleHandle, PendingBattle>,
    battle_outbox: Vec<BattleRequest>,
    started: bool,
    ended: bool,
    rng: StdRng,
}

impl GameSession {
    /// Build a session from static configuration. Every identifier in
    /// the configuration must resolve; failure here is session-fatal.
    pub fn new(dex: Dex, config: &GameConfig, seed: u64) -> Result<GameSession, ConfigError> {
        let kingdoms = build_kingdoms(config, &dex)?;
        Ok(GameSession {
            dex,
            kingdoms,
            players: Vec::new(),
            month: 0,
            active_kingdom: 0,
            interrupts: VecDeque::new(),
            pending_battles: HashMap::new(),
            battle_outbox: Vec::new(),
            started: false,
            ended: false,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Join a user to the game. Only possible before the start.
    pub fn add_player(&mut self, name: &str) -> Result<PlayerId, ChoiceError> {
        if self.started || self.ended {
            return Err(ChoiceError::NotAvailable("the game has already started".into()));
        }
        let player = Player::new(name);
        let id = player.id;
        self.players.push(player);
        Ok(id)
    }

    /// Give a player a kingdom during setup.
    pub fn assign_kingdom(&mut self, player: PlayerId, kingdom: usize) -> Result<(), ChoiceError> {
        if !self.players.iter().any(|p| p.id == player) {
            return Err(ChoiceError::NotInGame);
        }
        let kingdom = self
            .kingdoms
            .get_mut(kingdom)
            .ok_or_else(|| ChoiceError::InvalidTarget(format!("no kingdom {kingdom}")))?;
        kingdom.owner = Some(player);
        Ok(())
    }

    /// Roster a trainer with a signature creature, for initial setup.
    pub fn add_trainer(
        &mut self,
        kingdom: usize,
        name: &str,
        species: &str,
    ) -> Result<usize, ChoiceError> {
        let owner = self
            .kingdoms
            .get(kingdom)
            .ok_or_else(|| ChoiceError::InvalidTarget(format!("no kingdom {kingdom}")))?
            .owner;
        let creature = Creature::new(&self.dex, Id::new(species), true, &mut self.rng)?;
        let mut trainer = Trainer::new(name, kingdom, owner);
        trainer.add_creature(creature)?;
        Ok(self.kingdoms[kingdom].add_trainer(trainer)?)
    }

    /// Transition `Created -> Started`. Requires at least two players;
    /// resets every player's transient UI state.
    pub fn start(&mut self) -> Result<(), ChoiceError> {
        if self.started || self.ended {
            return Err(ChoiceError::NotAvailable("the game has already started".into()));
        }
        if self.players.len() < 2 {
            return Err(ChoiceError::NotReady("at least two players are required".into()));
        }
        for player in &mut self.players {
            player.reset_transient();
        }
        self.started = true;
        if self.kingdoms.get(self.active_kingdom).is_none_or(|k| k.owner.is_none()) {
            if let Some(first) = self.kingdoms.iter().position(|k| k.owner.is_some()) {
                self.active_kingdom = first;
            }
        }
        info!(players = self.players.len(), kingdoms = self.kingdoms.len(), "game started");
        Ok(())
    }

    /// Terminal transition: destroy all kingdoms (releasing their
    /// trainers, facilities, and labors) and stop accepting choices.
    pub fn end(&mut self) {
        self.kingdoms.clear();
        self.interrupts.clear();
        self.pending_battles.clear();
        self.battle_outbox.clear();
        self.ended = true;
        info!("game ended");
    }

    /// The choice-dispatch boundary.
    ///
    /// The submission is validated per the dispatch contract: membership,
    /// game started, interrupt routing, then ordinary turn ownership.
    /// Success and rejection are both reported to the submitting player's
    /// result banner; rejections leave all game state unchanged.
    pub fn submit_choice(&mut self, player: PlayerId, text: &str) -> Result<String, ChoiceError> {
        if !self.players.iter().any(|p| p.id == player) {
            return Err(ChoiceError::NotInGame);
        }
        if !self.started || self.ended {
            return Err(ChoiceError::NotStarted);
        }
        let result = self.dispatch(player, text);
        let banner = match &result {
            Ok(msg) => msg.clone(),
            Err(err) => err.to_string(),
        };
        self.notify(player, banner);
        result
    }

    /// Advance to the next kingdom's turn, clearing the finished
    /// kingdom's action flags, wrapping into a new month past the end of
    /// the list, and skipping ownerless kingdoms.
    pub fn next_kingdom(&mut self) {
        if let Some(kingdom) = self.kingdoms.get_mut(self.active_kingdom) {
            for trainer in &mut kingdom.trainers {
                trainer.actions.reset();
            }
        }
        self.advance_active();
        let mut hops = 0;
        while self
            .kingdoms
            .get(self.active_kingdom)
            .is_some_and(|k| k.owner.is_none())
            && hops < self.kingdoms.len()
        {
            self.advance_active();
            hops += 1;
        }
    }

    fn advance_active(&mut self) {
        self.active_kingdom += 1;
        if self.active_kingdom >= self.kingdoms.len() {
            self.next_month();
            self.active_kingdom = 0;
        }
    }

    /// Increment the month counter and cascade the monthly tick through
    /// every kingdom.
    fn next_month(&mut self) {
        self.month += 1;
        for kingdom in &mut self.kingdoms {
            kingdom.on_next_month(&mut self.rng);
        }
        info!(month = self.month, "month advanced");
    }

    /// Resume a suspended dispute from the battle subsystem's report.
    ///
    /// Idempotent: a handle that matches no pending record (already
    /// resolved, or the game ended first) is rejected as stale.
    pub fn on_battle_report(
        &mut self,
        handle: BattleHandle,
        report: &BattleReport,
    ) -> Result<(), ReportError> {
        if self.ended {
            return Err(ReportError::Stale(handle));
        }
        let pending = self
            .pending_battles
            .remove(&handle)
            .ok_or(ReportError::Stale(handle))?;
        info!(%handle, winner = ?report.winner, "battle resolved");
        match pending {
            PendingBattle::Sabotage(record) => self.finish_sabotage(&record, report),
            PendingBattle::Conquest(record) => self.finish_conquest(record, report),
        }
        Ok(())
    }

    fn finish_sabotage(&mut self, record: &SabotageRecord, report: &BattleReport) {
        self.settle_battle(
            record.attacker_kingdom,
            &record.attackers,
            record.target_kingdom,
            &record.defenders,
            report,
        );
        let kingdom_name = self
            .kingdoms
            .get(record.target_kingdom)
            .map(|k| k.name.clone())
            .unwrap_or_default();
        if report.winner == Some(BattleSide::Attacker) {
            let installation_name = self.apply_sabotage(record.target_kingdom, record.installation);
            info!(kingdom = %kingdom_name, installation = %installation_name, "sabotage succeeded");
            self.notify(
                record.attacker_player,
                format!("Your saboteurs crippled {kingdom_name}'s {installation_name}."),
            );
            self.notify(
                record.defender_player,
                format!("{kingdom_name}'s {installation_name} was sabotaged!"),
            );
        } else {
            self.notify(record.attacker_player, format!("{kingdom_name} repelled your saboteurs."));
            self.notify(record.defender_player, format!("{kingdom_name} repelled the saboteurs."));
        }
    }

    /// Increment the installation's sabotage counter, returning its name.
    pub(crate) fn apply_sabotage(&mut self, kingdom: usize, installation: Installation) -> String {
        let Some(kingdom) = self.kingdoms.get_mut(kingdom) else {
            return "installation".into();
        };
        match installation {
            Installation::Facility(idx) => match kingdom.facility_mut(idx) {
                Ok(facility) => {
                    facility.add_sabotage();
                    facility.kind_name().to_string()
                }
                Err(_) => "facility".into(),
            },
            Installation::Labor(idx) => match kingdom.labor_mut(idx) {
                Ok(labor) => {
                    labor.add_sabotage();
                    labor.kind_name().to_string()
                }
                Err(_) => "labor".into(),
            },
        }
    }

    fn finish_conquest(&mut self, mut record: ConquestRecord, report: &BattleReport) {
        self.settle_battle(
            record.attacker_kingdom,
            &record.attackers,
            record.target_kingdom,
            &record.defenders,
            report,
        );
        record.attackers = keep_unrouted(&record.attackers, &report.routed_attackers);
        let routed: Vec<usize> = report
            .routed_defenders
            .iter()
            .filter_map(|&pos| record.defenders.get(pos).copied())
            .collect();
        record.eliminated_defenders.extend(routed);

        let kingdom_name = self
            .kingdoms
            .get(record.target_kingdom)
            .map(|k| k.name.clone())
            .unwrap_or_default();
        let eligible = self.eligible_defenders(&record);

        if record.attackers.is_empty() {
            info!(kingdom = %kingdom_name, "conquest repelled");
            self.notify(record.attacker_player, format!("Your invasion of {kingdom_name} failed."));
            self.notify(record.defender_player, format!("{kingdom_name} stands: the invasion failed."));
        } else if eligible.is_empty() {
            info!(kingdom = %kingdom_name, "conquest succeeded; ownership transferred");
            if let Some(kingdom) = self.kingdoms.get_mut(record.target_kingdom) {
                kingdom.owner = Some(record.attacker_player);
            }
            self.notify(record.attacker_player, format!("{kingdom_name} has fallen to you!"));
            self.notify(record.defender_player, format!("{kingdom_name} has fallen!"));
        } else {
            record.defenders.clear();
            let needed = record.attackers.len().min(eligible.len());
            self.prompt_defense(
                record.defender_player,
                &kingdom_name,
                needed,
                &eligible,
                "The invasion continues",
            );
            self.interrupts.push_back(Interrupt {
                target: record.defender_player,
                awaiting: Awaiting::ConquestDefense { record, needed },
            });
        }
    }

    /// Write a finished battle back into the participating creatures on
    /// both sides.
    fn settle_battle(
        &mut self,
        attacker_kingdom: usize,
        attackers: &[usize],
        target_kingdom: usize,
        defenders: &[usize],
        report: &BattleReport,
    ) {
        let GameSession { dex, kingdoms, .. } = self;
        settle_side(dex, kingdoms.get_mut(attacker_kingdom), attackers, &report.routed_attackers);
        settle_side(dex, kingdoms.get_mut(target_kingdom), defenders, &report.routed_defenders);
    }

    /// Whether a suspended battle still references this kingdom's roster.
    ///
    /// Pending records address trainers by positional index, so trainer
    /// removal is frozen for the kingdoms they name until the battle
    /// resolves.
    pub(crate) fn kingdom_in_dispute(&self, idx: usize) -> bool {
        self.pending_battles.values().any(|pending| match pending {
            PendingBattle::Sabotage(r) => r.attacker_kingdom == idx || r.target_kingdom == idx,
            PendingBattle::Conquest(r) => r.attacker_kingdom == idx || r.target_kingdom == idx,
        })
    }

    /// Defenders still able to fight another conquest round.
    pub(crate) fn eligible_defenders(&self, record: &ConquestRecord) -> Vec<usize> {
        self.kingdoms
            .get(record.target_kingdom)
            .map(|k| {
                k.available_trainers()
                    .into_iter()
                    .filter(|idx| !record.eliminated_defenders.contains(idx))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Export both rosters and queue the battle for the room layer.
    pub(crate) fn request_battle(
        &mut self,
        attacker_kingdom: usize,
        attackers: &[usize],
        target_kingdom: usize,
        defenders: &[usize],
    ) -> BattleHandle {
        let handle = BattleHandle::new();
        let attacker_teams = pack_teams(&self.dex, &self.kingdoms[attacker_kingdom], attackers);
        let defender_teams = pack_teams(&self.dex, &self.kingdoms[target_kingdom], defenders);
        info!(%handle, attackers = attacker_teams.len(), defenders = defender_teams.len(), "battle requested");
        self.battle_outbox.push(BattleRequest { handle, attacker_teams, defender_teams });
        handle
    }

    /// Push the defender's selection dialog as a one-shot override page.
    pub(crate) fn prompt_defense(
        &mut self,
        player: PlayerId,
        kingdom_name: &str,
        needed: usize,
        eligible: &[usize],
        headline: &str,
    ) {
        let roster = eligible
            .iter()
            .map(|idx| idx.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.set_page(
            player,
            format!(
                "{headline}: {kingdom_name} is under attack! \
                 Name {needed} defending trainer(s), one per message. Available: {roster}."
            ),
        );
    }

    pub(crate) fn notify(&mut self, player: PlayerId, text: impl Into<String>) {
        if let Some(player) = self.players.iter_mut().find(|p| p.id == player) {
            player.set_result(text);
        }
    }

    pub(crate) fn set_page(&mut self, player: PlayerId, body: impl Into<String>) {
        if let Some(player) = self.players.iter_mut().find(|p| p.id == player) {
            player.set_page(body);
        }
    }

    // Accessors for the room layer and tests.

    pub fn dex(&self) -> &Dex {
        &self.dex
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn active_kingdom(&self) -> usize {
        self.active_kingdom
    }

    pub fn kingdoms(&self) -> &[Kingdom] {
        &self.kingdoms
    }

    pub fn kingdom(&self, idx: usize) -> Option<&Kingdom> {
        self.kingdoms.get(idx)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Whether an interrupt is blocking ordinary turn dispatch.
    pub fn interrupt_pending(&self) -> bool {
        !self.interrupts.is_empty()
    }

    /// Number of disputes suspended on the battle subsystem.
    pub fn pending_battle_count(&self) -> usize {
        self.pending_battles.len()
    }

    /// Drain the queued battle requests for the room layer to launch.
    pub fn take_battle_requests(&mut self) -> Vec<BattleRequest> {
        std::mem::take(&mut self.battle_outbox)
    }

    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

/// Committed trainers that were not routed, preserving order. Routed
/// positions index the roster order at request time.
fn keep_unrouted(committed: &[usize], routed_positions: &[usize]) -> Vec<usize> {
    committed
        .iter()
        .enumerate()
        .filter(|(pos, _)| !routed_positions.contains(pos))
        .map(|(_, idx)| *idx)
        .collect()
}

/// Write one side's outcome into its trainers: a routed trainer's whole
/// party faints, survivors arm battle-trigger evolutions.
fn settle_side(
    dex: &Dex,
    kingdom: Option<&mut Kingdom>,
    committed: &[usize],
    routed_positions: &[usize],
) {
    let Some(kingdom) = kingdom else { return };
    for (pos, &tidx) in committed.iter().enumerate() {
        let Some(trainer) = kingdom.trainers.get_mut(tidx) else { continue };
        let routed = routed_positions.contains(&pos);
        for creature in &mut trainer.party {
            if routed {
                creature.fainted = true;
            } else if dex
                .species(&creature.species)
                .and_then(|s| s.evolution.as_ref())
                .is_some_and(|e| e.battle)
            {
                creature.evolution_armed = true;
            }
        }
    }
}

fn pack_teams(dex: &Dex, kingdom: &Kingdom, trainers: &[usize]) -> Vec<String> {
    trainers
        .iter()
        .filter_map(|&idx| kingdom.trainers.get(idx))
        .map(|t| t.packed_team(dex))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fixture, two_kingdom_fixture_with_extra_defender};

    #[test]
    fn test_start_requires_two_players() {
        let mut fx = fixture();
        let mut session = GameSession::new(
            fx.session.dex().clone(),
            &crate::testutil::config(),
            1,
        )
        .unwrap();
        session.add_player("Loner").unwrap();
        assert!(matches!(session.start(), Err(ChoiceError::NotReady(_))));
        // The started fixture accepts no further joiners.
        assert!(fx.session.add_player("Latecomer").is_err());
    }

    #[test]
    fn test_start_resets_transient_ui_state() {
        let mut session = GameSession::new(
            crate::testutil::dex(),
            &crate::testutil::config(),
            1,
        )
        .unwrap();
        let a = session.add_player("Alice").unwrap();
        session.add_player("Bob").unwrap();
        session.player_mut(a).unwrap().set_result("stale");
        session.start().unwrap();
        assert_eq!(session.player_mut(a).unwrap().take_result(), None);
    }

    #[test]
    fn test_next_kingdom_full_cycle_increments_month_once() {
        let mut fx = fixture();
        let len = fx.session.kingdoms().len();
        assert_eq!(fx.session.active_kingdom(), 0);
        assert_eq!(fx.session.month(), 0);
        for _ in 0..len {
            fx.session.next_kingdom();
        }
        assert_eq!(fx.session.active_kingdom(), 0);
        assert_eq!(fx.session.month(), 1);
    }

    #[test]
    fn test_next_kingdom_skips_ownerless() {
        let mut fx = two_kingdom_fixture_with_extra_defender();
        // Orphan the second kingdom; the cycle must skip straight back.
        fx.session.kingdoms[1].owner = None;
        fx.session.next_kingdom();
        assert_eq!(fx.session.active_kingdom(), 0);
        assert_eq!(fx.session.month(), 1);
    }

    #[test]
    fn test_submit_choice_requires_membership_and_start() {
        let mut session = GameSession::new(
            crate::testutil::dex(),
            &crate::testutil::config(),
            1,
        )
        .unwrap();
        let a = session.add_player("Alice").unwrap();
        session.add_player("Bob").unwrap();
        let stranger = PlayerId::new();
        assert_eq!(session.submit_choice(stranger, "done"), Err(ChoiceError::NotInGame));
        assert_eq!(session.submit_choice(a, "done"), Err(ChoiceError::NotStarted));
    }

    #[test]
    fn test_done_by_non_active_owner_is_wrong_turn() {
        let mut fx = fixture();
        assert_eq!(fx.session.submit_choice(fx.bob, "done"), Err(ChoiceError::WrongTurn));
        assert!(fx.session.submit_choice(fx.alice, "done").is_ok());
        // The turn has advanced; repeating the same submission no longer
        // belongs to Alice and cannot double-advance.
        let month = fx.session.month();
        assert_eq!(fx.session.submit_choice(fx.alice, "done"), Err(ChoiceError::WrongTurn));
        assert_eq!(fx.session.month(), month);
    }

    #[test]
    fn test_ended_session_rejects_everything() {
        let mut fx = fixture();
        fx.session.end();
        assert!(fx.session.is_ended());
        assert!(fx.session.kingdoms().is_empty());
        assert_eq!(fx.session.submit_choice(fx.alice, "done"), Err(ChoiceError::NotStarted));
    }

    #[test]
    fn test_stale_battle_report_is_rejected() {
        let mut fx = fixture();
        let handle = BattleHandle::new();
        let report =
            BattleReport { winner: Some(BattleSide::Attacker), routed_attackers: vec![], routed_defenders: vec![] };
        assert_eq!(fx.session.on_battle_report(handle, &report), Err(ReportError::Stale(handle)));
    }

    #[test]
    fn test_fainted_parties_recover_next_month() {
        let mut fx = fixture();
        fx.session.kingdoms[0].trainers[0].party[0].fainted = true;
        assert!(fx.session.kingdoms[0].available_trainers().is_empty());
        let len = fx.session.kingdoms().len();
        for _ in 0..len {
            fx.session.next_kingdom();
        }
        assert!(!fx.session.kingdoms[0].trainers[0].party[0].fainted);
        assert_eq!(fx.session.kingdoms[0].available_trainers(), vec![0]);
    }

    #[test]
    fn test_month_cascade_reaches_kingdoms() {
        let mut fx = fixture();
        // Put a facility on cooldown and let the month tick drain it.
        fx.session.kingdoms[0].facilities[0].cooldown = 1;
        let len = fx.session.kingdoms().len();
        for _ in 0..len {
            fx.session.next_kingdom();
        }
        assert_eq!(fx.session.kingdoms[0].facilities[0].cooldown, 0);
    }
}
