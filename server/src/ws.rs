use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, oneshot};

use billiards_shared::context::PlayerId;
use billiards_shared::protocol::{ClientMsg, JoinAuth, ServerMsg};
use billiards_shared::room_id::{is_valid_room_id, normalize_room_id};

use crate::lobby::{Lobby, RoomHandle};
use crate::room::{RoomBroadcast, RoomCommand};

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub lobby: Lobby,
}

/// HTTP handler for the lobby socket: serves room creation only.
pub async fn lobby_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_lobby_socket(socket, app_state))
}

async fn handle_lobby_socket(mut socket: WebSocket, app_state: AppState) {
    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else {
            continue; // Ignore ping/pong/binary; Close ends the stream.
        };
        match serde_json::from_str::<ClientMsg>(&text) {
            Ok(ClientMsg::CreateRoom) => {
                let id = app_state.lobby.create_room().await;
                tracing::info!(room = %id, "room created");
                let Ok(json) = serde_json::to_string(&ServerMsg::RoomReady { id }) else {
                    break;
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Ok(_) | Err(_) => {} // Not a lobby request
        }
    }
}

/// HTTP handler for a room socket. The room id comes from the path and the
/// join credentials from the query string.
pub async fn room_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    Query(auth): Query<JoinAuth>,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_room_socket(socket, app_state, room_id, auth))
}

async fn handle_room_socket(socket: WebSocket, app_state: AppState, room_id: String, auth: JoinAuth) {
    let room_id = normalize_room_id(&room_id);
    if !is_valid_room_id(&room_id) {
        tracing::debug!(room = %room_id, "rejecting malformed room id");
        return;
    }
    let Some(room) = app_state.lobby.room(&room_id).await else {
        tracing::debug!(room = %room_id, "rejecting join: no such room");
        return;
    };

    // Subscribe before joining so the join-triggered snapshot is not missed.
    let broadcast_rx = room.broadcast_tx.subscribe();

    let (resp_tx, resp_rx) = oneshot::channel();
    let join = RoomCommand::Join { auth, respond: resp_tx };
    if room.cmd_tx.send(join).await.is_err() {
        return;
    }
    let Ok(Some(player)) = resp_rx.await else {
        // Rejected joins get no explanation, just a closed socket.
        return;
    };
    tracing::info!(room = %room_id, player = %player.0, "player joined");

    pump_room_socket(socket, room, broadcast_rx, player.clone()).await;
    tracing::info!(room = %room_id, player = %player.0, "connection ended");
}

async fn pump_room_socket(
    socket: WebSocket,
    room: RoomHandle,
    mut broadcast_rx: broadcast::Receiver<RoomBroadcast>,
    player: PlayerId,
) {
    let (mut sink, mut stream) = socket.split();
    let mut exited = false;

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(client_msg) = serde_json::from_str::<ClientMsg>(&text) else {
                            continue;
                        };
                        match client_msg {
                            ClientMsg::CueShot { ball, impulse } => {
                                let _ = room.cmd_tx.send(RoomCommand::CueShot {
                                    player: player.clone(),
                                    ball,
                                    impulse,
                                }).await;
                            }
                            ClientMsg::ExitRoom => {
                                let _ = room.cmd_tx.send(RoomCommand::ExitRoom {
                                    player: player.clone(),
                                }).await;
                                exited = true;
                                break;
                            }
                            ClientMsg::CreateRoom => {} // Lobby-only request
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Server -> Client (broadcast)
            result = broadcast_rx.recv() => {
                match result {
                    Ok(RoomBroadcast::Update(json)) => {
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(RoomBroadcast::Closed) => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Snapshots are absolute, so dropped ones are fine.
                        tracing::warn!(player = %player.0, "lagged by {n} updates");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    if !exited {
        let _ = room
            .cmd_tx
            .send(RoomCommand::Disconnect { player: player.clone() })
            .await;
    }
}
