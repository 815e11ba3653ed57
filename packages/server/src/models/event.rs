use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    game::{GameResult, RosterEntry},
    player::{DeathReason, PlayerId},
    role::Team,
    window::WindowInfo,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Death {
    pub player_id: PlayerId,
    pub reason: DeathReason,
}

/// Phase transitions and results published to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum GameEvent {
    NightStarted {
        round: u32,
    },
    /// Public: concealed windows arrive without actors or targets.
    ActionWindowOpened {
        window: WindowInfo,
    },
    // 手番通知 (private, one per actor of a concealed window)
    ActionPrompt {
        player: PlayerId,
        window: WindowInfo,
    },
    // 占い結果 (private)
    InspectionResult {
        seer: PlayerId,
        target: PlayerId,
        team: Team,
    },
    // 襲撃対象 (private, witch only)
    KillTargetRevealed {
        witch: PlayerId,
        target: Option<PlayerId>,
    },
    DayStarted {
        round: u32,
        /// Shuffled; never reveals which ability caused which death.
        deaths: Vec<PlayerId>,
        bear_growled: bool,
    },
    SpeakingReminder {
        player: PlayerId,
        remaining_ticks: u32,
    },
    PlayerShot {
        shooter: PlayerId,
        target: Option<PlayerId>,
    },
    DuelResolved {
        knight: PlayerId,
        target: PlayerId,
        loser: PlayerId,
    },
    VoteTallied {
        counts: BTreeMap<PlayerId, usize>,
        abstentions: usize,
        tie: Vec<PlayerId>,
    },
    PkStarted {
        players: Vec<PlayerId>,
    },
    IdiotRevealed {
        player: PlayerId,
    },
    ExileResolved {
        target: Option<PlayerId>,
    },
    GameEnded {
        result: GameResult,
        roster: Vec<RosterEntry>,
    },
    GameAborted {
        reason: String,
    },
}

impl GameEvent {
    /// The only player allowed to see this event, if it is private.
    pub fn recipient(&self) -> Option<&str> {
        match self {
            GameEvent::InspectionResult { seer, .. } => Some(seer),
            GameEvent::KillTargetRevealed { witch, .. } => Some(witch),
            GameEvent::ActionPrompt { player, .. } => Some(player),
            _ => None,
        }
    }
}

/// What the websocket layer actually sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub game_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: GameEvent,
}

impl EventEnvelope {
    pub fn new(game_id: impl Into<String>, event: GameEvent) -> Self {
        Self {
            game_id: game_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_events_name_their_recipient() {
        let event = GameEvent::InspectionResult {
            seer: "p3".into(),
            target: "p8".into(),
            team: Team::Werewolves,
        };
        assert_eq!(event.recipient(), Some("p3"));

        let prompt = GameEvent::ActionPrompt {
            player: "p5".into(),
            window: WindowInfo {
                id: 1,
                round: 1,
                kind: crate::models::window::WindowKind::Shoot,
                actors: vec!["p5".into()],
                targets: Vec::new(),
                deadline_ticks: 30,
            },
        };
        assert_eq!(prompt.recipient(), Some("p5"));
        assert_eq!(GameEvent::NightStarted { round: 1 }.recipient(), None);
    }

    #[test]
    fn envelope_flattens_the_event_tag() {
        let envelope = EventEnvelope::new("g1", GameEvent::NightStarted { round: 2 });
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["message_type"], "night_started");
        assert_eq!(json["round"], 2);
        assert_eq!(json["game_id"], "g1");
    }
}
