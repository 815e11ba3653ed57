use tracing::info;

use crate::errors::ActionRejection;
use crate::models::{
    event::Death,
    game::GameState,
    player::{DeathReason, PlayerId},
    role::DeathAbility,
    window::TargetOption,
};

/// Players from `deaths` who get to shoot, in death-list order. Poison
/// takes the gun away.
pub fn eligible_shooters(state: &GameState, deaths: &[Death]) -> Vec<PlayerId> {
    deaths
        .iter()
        .filter(|d| d.reason != DeathReason::Poisoned)
        .filter(|d| {
            state
                .player(&d.player_id)
                .map(|p| p.role.death_ability() == Some(DeathAbility::Shoot))
                .unwrap_or(false)
        })
        .map(|d| d.player_id.clone())
        .collect()
}

pub fn shoot_targets(state: &GameState, shooter: &str) -> Vec<TargetOption> {
    state.target_options(|p| p.id != shooter)
}

/// Fires the shooter's gun. `None` means they held fire. Shot players die
/// with `DeathReason::Shot`, which never feeds back into the chain.
pub fn shoot(
    state: &mut GameState,
    shooter: &str,
    target: Option<&str>,
) -> Result<Option<Death>, ActionRejection> {
    let Some(target) = target else {
        info!(game_id = %state.game_id, shooter, "shooter held fire");
        return Ok(None);
    };
    if target == shooter {
        return Err(ActionRejection::target("cannot shoot yourself"));
    }
    match state.player(target) {
        None => return Err(ActionRejection::target(format!("unknown player {}", target))),
        Some(p) if !p.alive => return Err(ActionRejection::target(format!("{} is dead", target))),
        Some(_) => {}
    }

    state.kill(target, DeathReason::Shot);
    info!(game_id = %state.game_id, shooter, target, "player shot");
    Ok(Some(Death {
        player_id: target.to_string(),
        reason: DeathReason::Shot,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{game::tests::state_with, role::Role};

    fn death(id: &str, reason: DeathReason) -> Death {
        Death {
            player_id: id.into(),
            reason,
        }
    }

    #[test]
    fn poisoned_hunter_is_left_out() {
        // p1 hunter, p2 wolf king, p3 villager, p4 wolf
        let state = state_with(&[Role::Hunter, Role::WolfKing, Role::Villager, Role::Werewolf]);
        let deaths = vec![
            death("p1", DeathReason::Poisoned),
            death("p2", DeathReason::Exiled),
            death("p3", DeathReason::Killed),
        ];
        assert_eq!(eligible_shooters(&state, &deaths), vec!["p2"]);
    }

    #[test]
    fn killed_hunter_keeps_order() {
        let state = state_with(&[Role::Hunter, Role::WolfKing, Role::Villager]);
        let deaths = vec![death("p2", DeathReason::Dueled), death("p1", DeathReason::Killed)];
        assert_eq!(eligible_shooters(&state, &deaths), vec!["p2", "p1"]);
    }

    #[test]
    fn shot_kills_with_distinct_reason() {
        let mut state = state_with(&[Role::Hunter, Role::Werewolf, Role::Villager]);
        state.round = 2;
        let shot = shoot(&mut state, "p1", Some("p2")).unwrap().unwrap();
        assert_eq!(shot.reason, DeathReason::Shot);
        assert!(!state.is_alive("p2"));
        assert_eq!(state.player("p2").unwrap().death_round, Some(2));

        assert!(matches!(
            shoot(&mut state, "p1", Some("p2")),
            Err(ActionRejection::InvalidTarget(_))
        ));
        assert!(matches!(
            shoot(&mut state, "p1", Some("p1")),
            Err(ActionRejection::InvalidTarget(_))
        ));
        assert_eq!(shoot(&mut state, "p1", None), Ok(None));
    }
}
