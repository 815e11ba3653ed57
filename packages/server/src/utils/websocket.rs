use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    action::{ActionAck, ActionRequest},
    event::{EventEnvelope, GameEvent},
    player::PlayerId,
};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    /// Private events are only forwarded to the connection that names their
    /// recipient.
    pub player_id: Option<PlayerId>,
}

/// Direct answer to an action sent over the socket.
#[derive(Debug, Serialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
enum Reply {
    ActionAccepted(ActionAck),
    ActionRejected { error: String },
}

pub async fn handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let events = match state.games.subscribe(&room_id).await {
        Ok(events) => events,
        Err(e) => return e.into_response(),
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, params.player_id, events))
}

pub async fn handle_socket(
    ws: WebSocket,
    state: AppState,
    room_id: String,
    player_id: Option<PlayerId>,
    mut events: broadcast::Receiver<GameEvent>,
) {
    let connection_id = Uuid::new_v4();
    info!(room_id, %connection_id, player = ?player_id, "websocket connected");
    let (mut sender, mut receiver) = ws.split();
    let (reply_tx, mut replies) = mpsc::channel::<Reply>(16);

    let room_id_for_receive = room_id.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let Message::Text(text) = msg else {
                continue;
            };
            let reply = match serde_json::from_str::<ActionRequest>(&text) {
                Ok(request) => {
                    let verdict = state
                        .games
                        .submit_action(&room_id_for_receive, request)
                        .await;
                    match verdict {
                        Ok(ack) => Reply::ActionAccepted(ack),
                        Err(e) => Reply::ActionRejected {
                            error: e.to_string(),
                        },
                    }
                }
                Err(e) => Reply::ActionRejected {
                    error: format!("malformed action: {}", e),
                },
            };
            if reply_tx.send(reply).await.is_err() {
                break;
            }
        }
    });

    let room_id_for_send = room_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => {
                        if event.recipient().is_some_and(|r| Some(r) != player_id.as_deref()) {
                            continue;
                        }
                        serde_json::to_string(&EventEnvelope::new(&room_id_for_send, event))
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(
                            room_id = %room_id_for_send,
                            skipped,
                            "websocket lagging behind events"
                        );
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(reply) = replies.recv() => serde_json::to_string(&reply),
            };
            let text = match text {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "failed to encode websocket message");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // whichever side finishes first takes the other down with it
    tokio::select! {
        _ = &mut receive_task => send_task.abort(),
        _ = &mut send_task => receive_task.abort(),
    }
    info!(room_id, %connection_id, "websocket closed");
}
