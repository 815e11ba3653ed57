use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

use crate::{services::room_service, state::AppState};

pub fn routes(state: AppState) -> Router {
    Router::new()
        // curl -X POST http://localhost:8080/api/room/create
        .route("/create", post(create_room))
        // curl http://localhost:8080/api/room/rooms
        .route("/rooms", get(get_rooms))
        // curl http://localhost:8080/api/room/{roomid}
        .route("/:roomid", get(get_room_info))
        // curl -X POST http://localhost:8080/api/room/{roomid}/join/{playerid}
        .route("/:roomid/join/:playerid", post(join_room))
        // curl -X POST http://localhost:8080/api/room/{roomid}/leave/{playerid}
        .route("/:roomid/leave/:playerid", post(leave_room))
        // curl -X DELETE http://localhost:8080/api/room/{roomid}/delete
        .route("/:roomid/delete", delete(delete_room))
        .with_state(state)
}

pub async fn create_room(State(state): State<AppState>) -> impl IntoResponse {
    let room_id = room_service::create_room(state).await;
    (
        StatusCode::OK,
        Json(format!("Room created with ID: {}", room_id)),
    )
}

async fn get_rooms(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = room_service::get_rooms(&state).await;
    (StatusCode::OK, Json(rooms))
}

async fn get_room_info(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    match room_service::get_room_info(&state, &room_id).await {
        Some(room) => (StatusCode::OK, Json(json!(room))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("room {} not found", room_id) })),
        ),
    }
}

pub async fn join_room(
    State(state): State<AppState>,
    Path((room_id, player_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let success = room_service::join_room(state, &room_id, player_id).await;
    if success {
        (StatusCode::OK, Json("Successfully joined room"))
    } else {
        (StatusCode::BAD_REQUEST, Json("Failed to join room"))
    }
}

pub async fn leave_room(
    State(state): State<AppState>,
    Path((room_id, player_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let success = room_service::leave_room(state, &room_id, &player_id).await;
    if success {
        (StatusCode::OK, Json("Successfully left room"))
    } else {
        (StatusCode::BAD_REQUEST, Json("Failed to leave room"))
    }
}

async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    let success = room_service::delete_room(state, &room_id).await;
    if success {
        (
            StatusCode::OK,
            Json(format!("Room {} deleted successfully", room_id)),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(format!("Failed to delete room {}", room_id)),
        )
    }
}
