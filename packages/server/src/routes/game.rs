use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    errors::GameError,
    models::{
        action::{ActionAck, ActionRequest},
        game::{GameResult, PublicGameState},
        room::RoomStatus,
        window::WindowInfo,
    },
    services::{
        game_service::{self, GameSetup},
        win_condition,
    },
    state::AppState,
    utils::websocket,
};

#[derive(Debug, Default, Deserialize)]
pub struct AbortRequest {
    reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewerParams {
    player_id: Option<String>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest(
            "/:roomid",
            Router::new()
                // curl -X POST http://localhost:8080/api/game/{roomid}/start
                .route("/start", post(start_game))
                .route("/abort", post(abort_game))
                .route("/pause", post(pause_game))
                .route("/resume", post(resume_game))
                .route("/state", get(get_game_state))
                // whose turn it is; actors of a night window see their targets
                // curl http://localhost:8080/api/game/{roomid}/window?player_id=p1
                .route("/window", get(get_window))
                .route("/actions", post(submit_action))
                .route("/check-winner", get(check_winner_handler))
                // websocat ws://localhost:8080/api/game/{roomid}/ws?player_id=p1
                .route("/ws", get(websocket::handler)),
        )
        .with_state(state)
}

/// Without a body the room's players and lineup are used.
pub async fn start_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    setup: Option<Json<GameSetup>>,
) -> Result<Json<PublicGameState>, GameError> {
    let game = match setup {
        Some(Json(setup)) => state.games.start_game(&room_id, setup).await?,
        None => game_service::start_room_game(&state, &room_id).await?,
    };
    Ok(Json(game.public_view()))
}

pub async fn get_game_state(
    Path(room_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PublicGameState>, GameError> {
    Ok(Json(state.games.public_state(&room_id).await?))
}

async fn get_window(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(viewer): Query<ViewerParams>,
) -> Result<Json<Option<WindowInfo>>, GameError> {
    let window = state
        .games
        .current_window(&room_id, viewer.player_id.as_deref())
        .await?;
    Ok(Json(window))
}

async fn submit_action(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionAck>, GameError> {
    Ok(Json(state.games.submit_action(&room_id, request).await?))
}

async fn abort_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    request: Option<Json<AbortRequest>>,
) -> Result<Json<String>, GameError> {
    let reason = request
        .and_then(|Json(r)| r.reason)
        .unwrap_or_else(|| "aborted by host".to_string());
    state.games.abort_game(&room_id, reason).await?;
    if let Some(room) = state.rooms.lock().await.get_mut(&room_id) {
        room.status = RoomStatus::Closed;
    }
    Ok(Json(format!("Game {} aborted", room_id)))
}

async fn pause_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<String>, GameError> {
    state.games.pause_game(&room_id).await?;
    Ok(Json(format!("Game {} paused", room_id)))
}

async fn resume_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<String>, GameError> {
    state.games.resume_game(&room_id).await?;
    Ok(Json(format!("Game {} resumed", room_id)))
}

async fn check_winner_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<GameResult>, GameError> {
    let snapshot = state.games.snapshot(&room_id).await?;
    Ok(Json(win_condition::evaluate(&snapshot)))
}
