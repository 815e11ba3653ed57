use super::{player::PlayerId, role::Role};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum RoomStatus {
    Open,
    InProgress,
    Closed,
}

/// Lobby in which players gather before a game starts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Room {
    pub room_id: String,
    pub name: Option<String>,
    pub players: Vec<PlayerId>,
    pub max_players: usize,
    pub status: RoomStatus,
    /// Fixed lineup; `None` falls back to `Role::default_lineup`.
    pub roles: Option<Vec<Role>>,
}

impl Room {
    pub fn new(room_id: String, name: Option<String>, max_players: Option<usize>) -> Self {
        Room {
            room_id,
            name,
            players: Vec::new(),
            max_players: max_players.unwrap_or(12),
            status: RoomStatus::Open,
            roles: None,
        }
    }
}
