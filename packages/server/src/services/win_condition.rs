use crate::models::{
    game::{GameResult, GameState},
    role::Team,
};

/// Decides whether the game is over.
///
/// Villagers win once no werewolf is alive; werewolves win once the living
/// villagers no longer outnumber them. A result already recorded on the state
/// is returned unchanged, so later deaths can never flip a finished game.
pub fn evaluate(state: &GameState) -> GameResult {
    if state.result.is_terminal() {
        return state.result;
    }

    let wolves = state.count_alive(Team::Werewolves);
    let villagers = state.count_alive(Team::Villagers);

    if wolves == 0 {
        GameResult::VillagerWin
    } else if villagers <= wolves {
        GameResult::WerewolfWin
    } else {
        GameResult::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{game::tests::state_with, player::DeathReason, role::Role};

    #[test]
    fn in_progress_while_villagers_outnumber() {
        let state = state_with(&[Role::Werewolf, Role::Villager, Role::Seer]);
        assert_eq!(evaluate(&state), GameResult::InProgress);
    }

    #[test]
    fn werewolves_win_at_parity() {
        let mut state = state_with(&[Role::Werewolf, Role::Villager, Role::Seer]);
        state.kill("p2", DeathReason::Killed);
        assert_eq!(evaluate(&state), GameResult::WerewolfWin);
    }

    #[test]
    fn villagers_win_when_no_wolf_lives() {
        let mut state = state_with(&[
            Role::WolfKing,
            Role::Werewolf,
            Role::Villager,
            Role::Seer,
            Role::Witch,
        ]);
        state.kill("p1", DeathReason::Exiled);
        assert_eq!(evaluate(&state), GameResult::InProgress);
        state.kill("p2", DeathReason::Poisoned);
        assert_eq!(evaluate(&state), GameResult::VillagerWin);
    }

    #[test]
    fn recorded_result_is_sticky() {
        let mut state = state_with(&[Role::Werewolf, Role::Villager, Role::Villager]);
        state.kill("p2", DeathReason::Killed);
        let result = evaluate(&state);
        assert_eq!(result, GameResult::WerewolfWin);
        state.finish(result);

        // a later death would otherwise hand the win to the villagers
        state.kill("p1", DeathReason::Shot);
        assert_eq!(evaluate(&state), GameResult::WerewolfWin);
    }
}
