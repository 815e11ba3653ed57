use serde::{Deserialize, Serialize};

use super::{player::PlayerId, role::NightAction};

/// What the currently open window accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WindowKind {
    Night { action: NightAction },
    /// The shooter is only named to themselves until the shot is fired.
    Shoot,
    Speech { speaker: PlayerId },
    PkSpeech { speaker: PlayerId },
    LastWords { player: PlayerId },
    Vote,
    PkVote,
}

impl WindowKind {
    /// Windows whose actors and target list would give away a hidden role.
    pub fn is_concealed(&self) -> bool {
        matches!(self, WindowKind::Night { .. } | WindowKind::Shoot)
    }
}

/// A selectable target with its stable seat ordinal (1-based position in the
/// fixed speaking order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOption {
    pub ordinal: usize,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: u64,
    pub round: u32,
    pub kind: WindowKind,
    pub actors: Vec<PlayerId>,
    pub targets: Vec<TargetOption>,
    pub deadline_ticks: u32,
}

impl WindowInfo {
    pub fn allows_actor(&self, actor_id: &str) -> bool {
        self.actors.iter().any(|a| a == actor_id)
    }

    /// What everyone at the table may see. Concealed windows keep their
    /// kind and deadline but drop who acts and whom they may pick.
    pub fn public_view(&self) -> WindowInfo {
        if !self.kind.is_concealed() {
            return self.clone();
        }
        WindowInfo {
            actors: Vec::new(),
            targets: Vec::new(),
            ..self.clone()
        }
    }

    /// The full window for its actors, the public view for everyone else.
    pub fn view_for(&self, player_id: Option<&str>) -> WindowInfo {
        match player_id {
            Some(id) if self.allows_actor(id) => self.clone(),
            _ => self.public_view(),
        }
    }
}
