use serde::{Deserialize, Serialize};

use super::{game::VoteChoice, player::PlayerId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerAction {
    Protect { target: PlayerId },
    Kill { target: PlayerId },
    Inspect { target: PlayerId },
    Heal,
    Poison { target: PlayerId },
    SkipPotion,
    Shoot { target: Option<PlayerId> },
    Duel { target: PlayerId },
    Vote { choice: VoteChoice },
    EndSpeech,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub actor_id: PlayerId,
    pub action: PlayerAction,
    /// Pins the request to one window; a mismatch is rejected as stale.
    #[serde(default)]
    pub window_id: Option<u64>,
}

impl ActionRequest {
    pub fn new(actor_id: impl Into<PlayerId>, action: PlayerAction) -> Self {
        Self {
            actor_id: actor_id.into(),
            action,
            window_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionAck {
    pub window_id: u64,
    pub message: String,
}
