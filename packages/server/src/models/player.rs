use serde::{Deserialize, Serialize};

use super::role::{Role, Team};

pub type PlayerId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathReason {
    Killed,   // 人狼の襲撃
    Poisoned, // 魔女の毒
    Shot,
    Dueled,
    Exiled, // 追放
}

impl DeathReason {
    /// Deaths that happen in the open. Night deaths only say who died.
    pub fn is_announced(self) -> bool {
        matches!(self, DeathReason::Shot | DeathReason::Dueled | DeathReason::Exiled)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub role: Role,
    pub alive: bool,
    pub can_vote: bool,
    pub has_spoken: bool,
    pub death_round: Option<u32>,
    pub death_reason: Option<DeathReason>,
    pub idiot_revealed: bool,
    // once-per-game day ability (knight duel)
    #[serde(default)]
    pub ability_used: bool,
}

impl PlayerState {
    pub fn new(id: impl Into<PlayerId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            alive: true,
            can_vote: true,
            has_spoken: false,
            death_round: None,
            death_reason: None,
            idiot_revealed: false,
            ability_used: false,
        }
    }

    pub fn team(&self) -> Team {
        self.role.team()
    }

    /// Marks the player dead. Returns false if they were already dead.
    pub fn kill(&mut self, round: u32, reason: DeathReason) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        self.death_round = Some(round);
        self.death_reason = Some(reason);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn death_is_monotone() {
        let mut player = PlayerState::new("p1", Role::Hunter);
        assert!(player.kill(2, DeathReason::Killed));
        assert!(!player.kill(3, DeathReason::Exiled));
        assert!(!player.alive);
        assert_eq!(player.death_round, Some(2));
        assert_eq!(player.death_reason, Some(DeathReason::Killed));
    }
}
