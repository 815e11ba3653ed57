//! Night role handlers. Each submission is validated against the current
//! state and, if accepted, written into `night_actions`. All of them may be
//! overwritten until the window closes, except the seer's which locks on
//! first use.

use tracing::debug;

use crate::errors::ActionRejection;
use crate::models::{
    action::PlayerAction,
    event::GameEvent,
    game::{GameState, WitchAction},
    player::PlayerState,
    role::{NightAction, Team},
    window::TargetOption,
};

#[derive(Debug, Clone, PartialEq)]
pub struct NightSubmission {
    pub message: String,
    /// Private result for the actor, if the action produces one.
    pub event: Option<GameEvent>,
}

impl NightSubmission {
    fn ack(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            event: None,
        }
    }
}

pub fn window_actors(state: &GameState, action: NightAction) -> Vec<String> {
    state.living_holders(action)
}

/// Target list shown when the window opens.
pub fn window_targets(state: &GameState, action: NightAction) -> Vec<TargetOption> {
    match action {
        NightAction::Protect => {
            let last = state.guard_last_protect.clone();
            state.target_options(|p| last.as_deref() != Some(p.id.as_str()))
        }
        NightAction::Kill => state.target_options(|p| p.team() != Team::Werewolves),
        NightAction::Inspect | NightAction::Support => {
            state.target_options(|p| p.role.night_action() != Some(action))
        }
    }
}

pub fn submit(
    state: &mut GameState,
    window: NightAction,
    actor: &str,
    action: &PlayerAction,
) -> Result<NightSubmission, ActionRejection> {
    let expected = match action {
        PlayerAction::Protect { .. } => NightAction::Protect,
        PlayerAction::Kill { .. } => NightAction::Kill,
        PlayerAction::Inspect { .. } => NightAction::Inspect,
        PlayerAction::Heal | PlayerAction::Poison { .. } | PlayerAction::SkipPotion => {
            NightAction::Support
        }
        _ => return Err(ActionRejection::StaleWindow),
    };
    if expected != window {
        return Err(ActionRejection::StaleWindow);
    }
    if !state.living_holders(window).iter().any(|id| id == actor) {
        return Err(ActionRejection::actor(format!(
            "{} does not hold the {:?} action",
            actor, window
        )));
    }

    match action {
        PlayerAction::Protect { target } => protect(state, target),
        PlayerAction::Kill { target } => kill(state, target),
        PlayerAction::Inspect { target } => inspect(state, actor, target),
        PlayerAction::Heal => heal(state, actor),
        PlayerAction::Poison { target } => poison(state, actor, target),
        PlayerAction::SkipPotion => skip_potion(state, actor),
        _ => Err(ActionRejection::StaleWindow),
    }
}

fn living_target<'a>(
    state: &'a GameState,
    target: &str,
) -> Result<&'a PlayerState, ActionRejection> {
    let player = state
        .player(target)
        .ok_or_else(|| ActionRejection::target(format!("unknown player {}", target)))?;
    if !player.alive {
        return Err(ActionRejection::target(format!("{} is dead", target)));
    }
    Ok(player)
}

fn protect(state: &mut GameState, target: &str) -> Result<NightSubmission, ActionRejection> {
    living_target(state, target)?;
    if state.guard_last_protect.as_deref() == Some(target) {
        return Err(ActionRejection::target(
            "cannot protect the same player two nights in a row",
        ));
    }
    state.night_actions.guard_protect = Some(target.to_string());
    debug!(target, "guard protection recorded");
    Ok(NightSubmission::ack(format!("protecting {}", target)))
}

fn kill(state: &mut GameState, target: &str) -> Result<NightSubmission, ActionRejection> {
    if living_target(state, target)?.team() == Team::Werewolves {
        return Err(ActionRejection::target("werewolves cannot attack their own team"));
    }
    // last submission before the window closes wins for the whole pack
    state.night_actions.werewolf_kill = Some(target.to_string());
    debug!(target, "werewolf kill recorded");
    Ok(NightSubmission::ack(format!("attacking {}", target)))
}

fn inspect(
    state: &mut GameState,
    seer: &str,
    target: &str,
) -> Result<NightSubmission, ActionRejection> {
    if state.night_actions.seer_check.is_some() {
        return Err(ActionRejection::actor("already inspected tonight"));
    }
    if seer == target {
        return Err(ActionRejection::target("cannot inspect yourself"));
    }
    let team = living_target(state, target)?.team();

    state.night_actions.seer_check = Some(target.to_string());
    state.night_actions.seer_result = Some(team);
    Ok(NightSubmission {
        message: format!("inspected {}", target),
        event: Some(GameEvent::InspectionResult {
            seer: seer.to_string(),
            target: target.to_string(),
            team,
        }),
    })
}

/// Gives back whatever potion the witch picked earlier in this window.
fn refund(state: &mut GameState, witch: &str) {
    let potions = state.witch_potions.entry(witch.to_string()).or_default();
    let actions = &mut state.night_actions;
    match actions.witch_action {
        Some(WitchAction::Antidote) => {
            potions.antidote = true;
            actions.witch_antidote_target = None;
        }
        Some(WitchAction::Poison) => {
            potions.poison = true;
            actions.witch_poison_target = None;
        }
        Some(WitchAction::Skip) | None => {}
    }
    actions.witch_action = None;
}

fn heal(state: &mut GameState, witch: &str) -> Result<NightSubmission, ActionRejection> {
    let victim = state
        .night_actions
        .werewolf_kill
        .clone()
        .ok_or_else(|| ActionRejection::target("nobody was attacked tonight"))?;
    if state.night_actions.witch_action == Some(WitchAction::Antidote) {
        return Ok(NightSubmission::ack(format!("saving {}", victim)));
    }
    if !state.witch_potions.get(witch).copied().unwrap_or_default().antidote {
        return Err(ActionRejection::target("antidote already used"));
    }

    // antidote beats a poison picked earlier tonight
    refund(state, witch);
    state.witch_potions.entry(witch.to_string()).or_default().antidote = false;
    state.night_actions.witch_action = Some(WitchAction::Antidote);
    state.night_actions.witch_antidote_target = Some(victim.clone());
    Ok(NightSubmission::ack(format!("saving {}", victim)))
}

fn poison(
    state: &mut GameState,
    witch: &str,
    target: &str,
) -> Result<NightSubmission, ActionRejection> {
    if state.night_actions.witch_action == Some(WitchAction::Antidote) {
        return Err(ActionRejection::target("antidote already chosen tonight"));
    }
    if witch == target {
        return Err(ActionRejection::target("cannot poison yourself"));
    }
    living_target(state, target)?;

    if state.night_actions.witch_action != Some(WitchAction::Poison) {
        if !state.witch_potions.get(witch).copied().unwrap_or_default().poison {
            return Err(ActionRejection::target("poison already used"));
        }
        refund(state, witch);
        state.witch_potions.entry(witch.to_string()).or_default().poison = false;
        state.night_actions.witch_action = Some(WitchAction::Poison);
    }
    state.night_actions.witch_poison_target = Some(target.to_string());
    Ok(NightSubmission::ack(format!("poisoning {}", target)))
}

fn skip_potion(state: &mut GameState, witch: &str) -> Result<NightSubmission, ActionRejection> {
    refund(state, witch);
    state.night_actions.witch_action = Some(WitchAction::Skip);
    Ok(NightSubmission::ack("no potion tonight"))
}
