use tracing::info;

use crate::errors::ActionRejection;
use crate::models::{
    event::Death,
    game::GameState,
    player::{DeathReason, PlayerId},
    role::{DayAbility, ExileAbility, Team},
};

/// Living players in seat order, rotated so the first speaker moves one
/// seat each round.
pub fn speaking_order(state: &GameState) -> Vec<PlayerId> {
    let mut order = state.alive_in_seat_order();
    if !order.is_empty() {
        let offset = (state.round.saturating_sub(1) as usize) % order.len();
        order.rotate_left(offset);
    }
    order
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExileResolution {
    /// The idiot flipped their card: alive, but voteless from now on.
    Revealed(PlayerId),
    Exiled(PlayerId),
}

pub fn apply_exile(state: &mut GameState, target: &str) -> ExileResolution {
    if let Some(player) = state.player_mut(target) {
        if player.role.exile_ability() == Some(ExileAbility::Reveal) && !player.idiot_revealed {
            player.idiot_revealed = true;
            player.can_vote = false;
            info!(player = target, "idiot revealed instead of exile");
            return ExileResolution::Revealed(target.to_string());
        }
    }
    state.kill(target, DeathReason::Exiled);
    ExileResolution::Exiled(target.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuelOutcome {
    pub knight: PlayerId,
    pub target: PlayerId,
    pub death: Death,
    /// A wolf was caught: discussion ends and night falls.
    pub unmasked_werewolf: bool,
}

/// The knight challenges `target`. A wolf dies; anyone else costs the
/// knight their life. Usable once per game.
pub fn duel(
    state: &mut GameState,
    knight: &str,
    target: &str,
) -> Result<DuelOutcome, ActionRejection> {
    let challenger = state
        .player(knight)
        .ok_or_else(|| ActionRejection::actor(format!("unknown player {}", knight)))?;
    if !challenger.alive || challenger.role.day_ability() != Some(DayAbility::Duel) {
        return Err(ActionRejection::actor(format!("{} cannot duel", knight)));
    }
    if challenger.ability_used {
        return Err(ActionRejection::actor("duel already used"));
    }
    if knight == target {
        return Err(ActionRejection::target("cannot duel yourself"));
    }
    let defender = state
        .player(target)
        .ok_or_else(|| ActionRejection::target(format!("unknown player {}", target)))?;
    if !defender.alive {
        return Err(ActionRejection::target(format!("{} is dead", target)));
    }

    let unmasked_werewolf = defender.team() == Team::Werewolves;
    let loser = if unmasked_werewolf { target } else { knight };

    if let Some(p) = state.player_mut(knight) {
        p.ability_used = true;
    }
    state.kill(loser, DeathReason::Dueled);
    info!(game_id = %state.game_id, knight, target, loser, "duel resolved");

    Ok(DuelOutcome {
        knight: knight.to_string(),
        target: target.to_string(),
        death: Death {
            player_id: loser.to_string(),
            reason: DeathReason::Dueled,
        },
        unmasked_werewolf,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{game::tests::state_with, role::Role};

    #[test]
    fn speaking_order_rotates_by_round() {
        let mut state = state_with(&[Role::Werewolf, Role::Villager, Role::Seer, Role::Villager]);
        state.round = 1;
        assert_eq!(speaking_order(&state), vec!["p1", "p2", "p3", "p4"]);
        state.round = 2;
        state.kill("p3", DeathReason::Killed);
        assert_eq!(speaking_order(&state), vec!["p2", "p4", "p1"]);
    }

    #[test]
    fn idiot_survives_first_exile_only() {
        let mut state = state_with(&[Role::Werewolf, Role::Idiot, Role::Villager, Role::Villager]);
        assert_eq!(apply_exile(&mut state, "p2"), ExileResolution::Revealed("p2".into()));
        let idiot = state.player("p2").unwrap();
        assert!(idiot.alive);
        assert!(!idiot.can_vote);
        assert!(idiot.idiot_revealed);

        assert_eq!(apply_exile(&mut state, "p2"), ExileResolution::Exiled("p2".into()));
        assert!(!state.is_alive("p2"));
    }

    #[test]
    fn knight_kills_a_wolf() {
        let mut state = state_with(&[Role::Knight, Role::Werewolf, Role::Villager, Role::Villager]);
        let outcome = duel(&mut state, "p1", "p2").unwrap();
        assert!(outcome.unmasked_werewolf);
        assert_eq!(outcome.death.player_id, "p2");
        assert!(!state.is_alive("p2"));
        assert!(matches!(duel(&mut state, "p1", "p3"), Err(ActionRejection::InvalidActor(_))));
    }

    #[test]
    fn knight_dies_on_a_wrong_guess() {
        let mut state = state_with(&[Role::Knight, Role::Werewolf, Role::Villager, Role::Villager]);
        let outcome = duel(&mut state, "p1", "p3").unwrap();
        assert!(!outcome.unmasked_werewolf);
        assert!(!state.is_alive("p1"));
        assert!(state.is_alive("p3"));
        assert!(matches!(duel(&mut state, "p3", "p2"), Err(ActionRejection::InvalidActor(_))));
    }
}
