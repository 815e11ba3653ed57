use std::collections::{BTreeMap, HashMap};

use crate::errors::ActionRejection;
use crate::models::{
    game::{GameState, VoteChoice},
    player::PlayerId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Nobody received a vote; the day ends peacefully.
    NoVotes,
    Exile(PlayerId),
    Tie(Vec<PlayerId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTally {
    pub counts: BTreeMap<PlayerId, usize>,
    pub abstentions: usize,
    pub outcome: VoteOutcome,
}

/// Counts the ballots. Only votes for a player in `candidates` are counted;
/// tied players come back in `candidates` order.
pub fn resolve(votes: &HashMap<PlayerId, VoteChoice>, candidates: &[PlayerId]) -> VoteTally {
    let mut counts: BTreeMap<PlayerId, usize> = BTreeMap::new();
    let mut abstentions = 0;

    for choice in votes.values() {
        match choice {
            VoteChoice::Abstain => abstentions += 1,
            VoteChoice::Player(target) if candidates.contains(target) => {
                *counts.entry(target.clone()).or_insert(0) += 1;
            }
            VoteChoice::Player(_) => {}
        }
    }

    let max = counts.values().copied().max().unwrap_or(0);
    let leaders: Vec<PlayerId> = candidates
        .iter()
        .filter(|c| max > 0 && counts.get(*c) == Some(&max))
        .cloned()
        .collect();

    let outcome = match leaders.len() {
        0 => VoteOutcome::NoVotes,
        1 => VoteOutcome::Exile(leaders[0].clone()),
        _ => VoteOutcome::Tie(leaders),
    };

    VoteTally {
        counts,
        abstentions,
        outcome,
    }
}

/// Living players allowed to vote. During a runoff the tied players sit out.
pub fn eligible_voters(state: &GameState) -> Vec<PlayerId> {
    state
        .alive_in_seat_order()
        .into_iter()
        .filter(|id| state.player(id).map(|p| p.can_vote).unwrap_or(false))
        .filter(|id| !state.pk_players.contains(id))
        .collect()
}

/// Records (or overwrites) a ballot. `candidates` restricts the targets.
pub fn cast(
    state: &mut GameState,
    voter: &str,
    choice: VoteChoice,
    candidates: &[PlayerId],
) -> Result<(), ActionRejection> {
    if !eligible_voters(state).iter().any(|v| v == voter) {
        return Err(ActionRejection::actor(format!("{} cannot vote now", voter)));
    }
    if let VoteChoice::Player(target) = &choice {
        if !candidates.contains(target) {
            return Err(ActionRejection::target(format!(
                "{} is not a valid vote target",
                target
            )));
        }
    }
    state.day_votes.insert(voter.to_string(), choice);
    Ok(())
}

/// True once every eligible voter has a ballot in.
pub fn all_voted(state: &GameState) -> bool {
    eligible_voters(state)
        .iter()
        .all(|v| state.day_votes.contains_key(v))
}
