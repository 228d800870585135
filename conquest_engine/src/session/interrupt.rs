//! The interrupt queue: mid-turn questions for a specific player.
//!
//! While any interrupt is queued, ordinary turn dispatch is blocked and
//! only the head interrupt's target may submit. A rejected or partial
//! submission leaves the interrupt at the head of the queue.

use conquest_rules::{Args, Kingdom, PlayerId};
use tracing::debug;

use crate::battle::{ConquestRecord, PendingBattle, SabotageRecord};
use crate::error::ChoiceError;
use crate::session::GameSession;

/// A queued question, delivered FIFO and exclusively to its target.
#[derive(Debug, Clone)]
pub struct Interrupt {
    pub target: PlayerId,
    pub awaiting: Awaiting,
}

/// What the target player's next submissions are expected to answer.
#[derive(Debug, Clone)]
pub enum Awaiting {
    /// Defender selection for a contested sabotage.
    SabotageDefense { record: SabotageRecord, needed: usize },
    /// Defender selection for a conquest round.
    ConquestDefense { record: ConquestRecord, needed: usize },
}

enum Progress {
    /// The interrupt is fully answered and leaves the queue.
    Resolved(String),
    /// More submissions are needed; the interrupt stays at the head.
    MoreNeeded(String),
}

impl GameSession {
    /// Feed one submission from the head interrupt's target into it.
    ///
    /// Each submission names one defending trainer by index. The
    /// interrupt is popped for the duration of the call and pushed back
    /// to the front unless it resolved.
    pub(crate) fn resolve_interrupt(&mut self, text: &str) -> Result<String, ChoiceError> {
        let Some(mut interrupt) = self.interrupts.pop_front() else {
            return Err(ChoiceError::WrongTurn);
        };
        match self.advance_interrupt(&mut interrupt, text) {
            Ok(Progress::Resolved(msg)) => Ok(msg),
            Ok(Progress::MoreNeeded(msg)) => {
                self.interrupts.push_front(interrupt);
                Ok(msg)
            }
            Err(err) => {
                self.interrupts.push_front(interrupt);
                Err(err)
            }
        }
    }

    fn advance_interrupt(
        &mut self,
        interrupt: &mut Interrupt,
        text: &str,
    ) -> Result<Progress, ChoiceError> {
        let mut args = Args::tokenize(text);
        let idx = args.expect_index("defending trainer")?;
        match &mut interrupt.awaiting {
            Awaiting::SabotageDefense { record, needed } => {
                let kingdom = kingdom_of(&self.kingdoms, record.target_kingdom)?;
                check_defender(kingdom, idx, &record.defenders, &[])?;
                record.defenders.push(idx);
                debug!(
                    kingdom = %kingdom.name,
                    defender = idx,
                    committed = record.defenders.len(),
                    "sabotage defender committed"
                );
                if record.defenders.len() < *needed {
                    return Ok(Progress::MoreNeeded(more_needed(*needed - record.defenders.len())));
                }
                let handle = self.request_battle(
                    record.attacker_kingdom,
                    &record.attackers,
                    record.target_kingdom,
                    &record.defenders,
                );
                self.pending_battles.insert(handle, PendingBattle::Sabotage(record.clone()));
                Ok(Progress::Resolved("The defense is set; the raid begins.".into()))
            }
            Awaiting::ConquestDefense { record, needed } => {
                let kingdom = kingdom_of(&self.kingdoms, record.target_kingdom)?;
                check_defender(kingdom, idx, &record.defenders, &record.eliminated_defenders)?;
                record.defenders.push(idx);
                debug!(
                    kingdom = %kingdom.name,
                    defender = idx,
                    committed = record.defenders.len(),
                    "conquest defender committed"
                );
                if record.defenders.len() < *needed {
                    return Ok(Progress::MoreNeeded(more_needed(*needed - record.defenders.len())));
                }
                let handle = self.request_battle(
                    record.attacker_kingdom,
                    &record.attackers,
                    record.target_kingdom,
                    &record.defenders,
                );
                self.pending_battles.insert(handle, PendingBattle::Conquest(record.clone()));
                Ok(Progress::Resolved("The defense is set; the invasion battle begins.".into()))
            }
        }
    }
}

fn kingdom_of(kingdoms: &[Kingdom], idx: usize) -> Result<&Kingdom, ChoiceError> {
    kingdoms
        .get(idx)
        .ok_or_else(|| ChoiceError::InvalidTarget(format!("no kingdom {idx}")))
}

fn check_defender(
    kingdom: &Kingdom,
    idx: usize,
    chosen: &[usize],
    eliminated: &[usize],
) -> Result<(), ChoiceError> {
    let trainer = kingdom.trainer(idx)?;
    if !trainer.available() || trainer.party.iter().all(|c| c.fainted) {
        return Err(ChoiceError::NotAvailable(format!("{} cannot defend right now", trainer.name)));
    }
    if chosen.contains(&idx) {
        return Err(ChoiceError::InvalidTarget(format!("{} is already committed", trainer.name)));
    }
    if eliminated.contains(&idx) {
        return Err(ChoiceError::NotAvailable(format!(
            "{} was already driven from this contest",
            trainer.name
        )));
    }
    Ok(())
}

fn more_needed(left: usize) -> String {
    format!("Defender committed; name {left} more.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::{BattleReport, BattleSide};
    use crate::testutil::two_kingdom_fixture_with_extra_defender;

    #[test]
    fn test_interrupt_queue_is_exclusive_to_target() {
        let mut fx = two_kingdom_fixture_with_extra_defender();
        fx.session.submit_choice(fx.alice, "sabotage 1 facility 0 0").unwrap();
        assert!(fx.session.interrupt_pending());
        // The attacker cannot answer the defender's question, and cannot
        // take ordinary turn actions while the queue is non-empty.
        assert_eq!(fx.session.submit_choice(fx.alice, "0"), Err(ChoiceError::WrongTurn));
        assert_eq!(fx.session.submit_choice(fx.alice, "done"), Err(ChoiceError::WrongTurn));
        assert!(fx.session.submit_choice(fx.bob, "0").is_ok());
        assert!(!fx.session.interrupt_pending());
        assert_eq!(fx.session.pending_battle_count(), 1);
    }

    #[test]
    fn test_rejected_answer_keeps_interrupt_at_head() {
        let mut fx = two_kingdom_fixture_with_extra_defender();
        fx.session.submit_choice(fx.alice, "sabotage 1 facility 0 0").unwrap();
        assert!(matches!(
            fx.session.submit_choice(fx.bob, "99"),
            Err(ChoiceError::InvalidTarget(_))
        ));
        assert!(fx.session.interrupt_pending());
        assert!(fx.session.submit_choice(fx.bob, "0").is_ok());
    }

    #[test]
    fn test_partial_defense_stays_pending_until_count_reached() {
        let mut fx = two_kingdom_fixture_with_extra_defender();
        // Two attackers against a kingdom with two able defenders.
        fx.session.submit_choice(fx.alice, "sabotage 1 facility 0 0 1").unwrap();
        assert!(fx.session.submit_choice(fx.bob, "0").is_ok());
        assert!(fx.session.interrupt_pending());
        // The same trainer cannot be committed twice.
        assert!(matches!(
            fx.session.submit_choice(fx.bob, "0"),
            Err(ChoiceError::InvalidTarget(_))
        ));
        assert!(fx.session.submit_choice(fx.bob, "1").is_ok());
        assert!(!fx.session.interrupt_pending());
        assert_eq!(fx.session.pending_battle_count(), 1);
    }

    #[test]
    fn test_conquest_defense_excludes_eliminated_trainers() {
        let mut fx = two_kingdom_fixture_with_extra_defender();
        fx.session.submit_choice(fx.alice, "conquer 1 0 1").unwrap();
        fx.session.submit_choice(fx.bob, "0").unwrap();
        fx.session.submit_choice(fx.bob, "1").unwrap();
        let request = fx.session.take_battle_requests().pop().unwrap();
        // Defender 0 is routed; the contest continues with one defender.
        let report = BattleReport {
            winner: Some(BattleSide::Attacker),
            routed_attackers: vec![],
            routed_defenders: vec![0],
        };
        fx.session.on_battle_report(request.handle, &report).unwrap();
        assert!(fx.session.interrupt_pending());
        assert!(matches!(
            fx.session.submit_choice(fx.bob, "0"),
            Err(ChoiceError::NotAvailable(_))
        ));
        assert!(fx.session.submit_choice(fx.bob, "1").is_ok());
    }
}
