use std::collections::HashMap;
use tracing::info;

use crate::{
    models::{
        player::PlayerId,
        room::{Room, RoomStatus},
    },
    state::AppState,
};

pub async fn create_room(state: AppState) -> u32 {
    let mut rooms = state.rooms.lock().await;
    let new_id = rooms
        .keys()
        .filter_map(|k| k.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    let new_room = Room::new(new_id.to_string(), None, None);
    rooms.insert(new_id.to_string(), new_room);
    info!(room_id = new_id, "room created");
    new_id
}

pub async fn join_room(state: AppState, room_id: &str, player_id: PlayerId) -> bool {
    let mut rooms = state.rooms.lock().await;

    let Some(room) = rooms.get_mut(room_id) else {
        return false;
    };
    if room.status != RoomStatus::Open {
        return false;
    }
    if room.players.len() >= room.max_players {
        return false;
    }
    if room.players.contains(&player_id) {
        return false;
    }

    info!(room_id, player = %player_id, "player joined");
    room.players.push(player_id);
    true
}

/// Players can only leave while the room is still gathering.
pub async fn leave_room(state: AppState, room_id: &str, player_id: &str) -> bool {
    let mut rooms = state.rooms.lock().await;

    let Some(room) = rooms.get_mut(room_id) else {
        return false;
    };
    if room.status != RoomStatus::Open {
        return false;
    }
    match room.players.iter().position(|p| p == player_id) {
        Some(index) => {
            room.players.remove(index);
            info!(room_id, player = player_id, "player left");
            true
        }
        None => false,
    }
}

pub async fn get_rooms(state: &AppState) -> HashMap<String, Room> {
    state.rooms.lock().await.clone()
}

pub async fn get_room_info(state: &AppState, room_id: &str) -> Option<Room> {
    let rooms = state.rooms.lock().await;
    rooms.get(room_id).cloned()
}

pub async fn delete_room(state: AppState, room_id: &str) -> bool {
    let mut rooms = state.rooms.lock().await;
    rooms.remove(room_id).is_some()
}
