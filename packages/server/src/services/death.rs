use rand::{seq::SliceRandom, Rng};
use tracing::info;

use crate::models::{
    event::Death,
    game::{GameState, WitchAction},
    player::DeathReason,
    role::{Passive, Team},
};

#[derive(Debug, Clone, PartialEq)]
pub struct NightResolution {
    /// Shuffled before being handed back.
    pub deaths: Vec<Death>,
    pub bear_growled: bool,
}

/// Turns the night's actions into deaths and applies them.
///
/// The wolves' victim dies unless the guard protected them or the witch
/// healed them. The poison target always dies. When the poison lands on the
/// unsaved victim the death counts as a poisoning.
pub fn resolve_night<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) -> NightResolution {
    let actions = state.night_actions.clone();
    let mut deaths: Vec<Death> = Vec::new();

    let poison_target = match actions.witch_action {
        Some(WitchAction::Poison) => actions.witch_poison_target.clone(),
        _ => None,
    };
    if let Some(target) = &poison_target {
        deaths.push(Death {
            player_id: target.clone(),
            reason: DeathReason::Poisoned,
        });
    }

    if let Some(victim) = &actions.werewolf_kill {
        let protected = actions.guard_protect.as_ref() == Some(victim);
        let healed = actions.witch_action == Some(WitchAction::Antidote)
            && actions.witch_antidote_target.as_ref() == Some(victim);
        if !protected && !healed && poison_target.as_ref() != Some(victim) {
            deaths.push(Death {
                player_id: victim.clone(),
                reason: DeathReason::Killed,
            });
        }
    }

    deaths.retain(|d| state.is_alive(&d.player_id));
    for death in &deaths {
        state.kill(&death.player_id, death.reason);
    }
    state.guard_last_protect = actions.guard_protect;

    deaths.shuffle(rng);
    let bear_growled = bear_growls(state);

    info!(
        game_id = %state.game_id,
        round = state.round,
        deaths = deaths.len(),
        bear_growled,
        "night resolved"
    );

    NightResolution {
        deaths,
        bear_growled,
    }
}

/// A living bear growls when either nearest living neighbour is a wolf.
pub fn bear_growls(state: &GameState) -> bool {
    state
        .alive_players()
        .filter(|p| p.role.passive() == Some(Passive::Alarm))
        .any(|bear| {
            state
                .living_neighbours(&bear.id)
                .iter()
                .any(|n| n.team() == Team::Werewolves)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{game::tests::state_with, role::Role};
    use rand::{rngs::StdRng, SeedableRng};

    // p1 wolf, p2 guard, p3 witch, p4 villager, p5 villager
    fn night() -> GameState {
        let mut state = state_with(&[
            Role::Werewolf,
            Role::Guard,
            Role::Witch,
            Role::Villager,
            Role::Villager,
        ]);
        state.begin_night();
        state
    }

    fn ids(resolution: &NightResolution) -> Vec<String> {
        let mut ids: Vec<_> = resolution.deaths.iter().map(|d| d.player_id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn unprotected_victim_dies() {
        let mut state = night();
        state.night_actions.werewolf_kill = Some("p4".into());
        let res = resolve_night(&mut state, &mut StdRng::seed_from_u64(1));
        assert_eq!(ids(&res), vec!["p4"]);
        let victim = state.player("p4").unwrap();
        assert!(!victim.alive);
        assert_eq!(victim.death_round, Some(1));
        assert_eq!(victim.death_reason, Some(DeathReason::Killed));
    }

    #[test]
    fn guard_or_antidote_saves_the_victim() {
        let mut state = night();
        state.night_actions.werewolf_kill = Some("p4".into());
        state.night_actions.guard_protect = Some("p4".into());
        let res = resolve_night(&mut state, &mut StdRng::seed_from_u64(1));
        assert!(res.deaths.is_empty());
        assert_eq!(state.guard_last_protect.as_deref(), Some("p4"));

        state.begin_night();
        state.night_actions.werewolf_kill = Some("p5".into());
        state.night_actions.witch_action = Some(WitchAction::Antidote);
        state.night_actions.witch_antidote_target = Some("p5".into());
        let res = resolve_night(&mut state, &mut StdRng::seed_from_u64(1));
        assert!(res.deaths.is_empty());
        assert_eq!(state.guard_last_protect, None);
    }

    #[test]
    fn poison_kills_regardless() {
        let mut state = night();
        state.night_actions.werewolf_kill = Some("p4".into());
        state.night_actions.guard_protect = Some("p5".into());
        state.night_actions.witch_action = Some(WitchAction::Poison);
        state.night_actions.witch_poison_target = Some("p5".into());
        let res = resolve_night(&mut state, &mut StdRng::seed_from_u64(7));
        assert_eq!(ids(&res), vec!["p4", "p5"]);
        assert_eq!(state.player("p5").unwrap().death_reason, Some(DeathReason::Poisoned));
    }

    #[test]
    fn poisoned_victim_dies_once_as_poisoned() {
        let mut state = night();
        state.night_actions.werewolf_kill = Some("p4".into());
        state.night_actions.witch_action = Some(WitchAction::Poison);
        state.night_actions.witch_poison_target = Some("p4".into());
        let res = resolve_night(&mut state, &mut StdRng::seed_from_u64(3));
        assert_eq!(res.deaths.len(), 1);
        assert_eq!(res.deaths[0].reason, DeathReason::Poisoned);
    }

    #[test]
    fn bear_growls_next_to_a_wolf() {
        let mut state = state_with(&[
            Role::Villager,
            Role::Bear,
            Role::Villager,
            Role::Werewolf,
            Role::Villager,
        ]);
        assert!(!bear_growls(&state));
        state.kill("p3", DeathReason::Killed);
        assert!(bear_growls(&state));
        state.kill("p2", DeathReason::Exiled);
        assert!(!bear_growls(&state));
    }
}
