//! One room: an authoritative game session plus the task that owns it.
//!
//! The room task owns the runtime and all session state. Connections talk to
//! it over an mpsc command channel and listen on a broadcast channel, so the
//! runtime itself is never shared across tasks.

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;

use billiards_shared::context::{BallId, BilliardContext, Player, PlayerId, Point};
use billiards_shared::events::GameEvent;
use billiards_shared::physics::Physics;
use billiards_shared::protocol::{JoinAuth, RoomUpdate, ServerMsg};
use billiards_shared::rack::Rack;
use billiards_shared::rules::EightBallVersus;
use billiards_shared::runtime::{Effects, Middleware, Node, Runtime};
use billiards_shared::table::PoolTable;
use billiards_shared::turn::TurnBased;

use crate::config::ServerConfig;

/// Commands from client connections to the room task.
pub enum RoomCommand {
    Join {
        auth: JoinAuth,
        respond: oneshot::Sender<Option<PlayerId>>,
    },
    CueShot {
        player: PlayerId,
        ball: BallId,
        impulse: Point,
    },
    /// Deliberate departure; frees the seat.
    ExitRoom { player: PlayerId },
    /// Socket went away; the seat stays bound for reconnection.
    Disconnect { player: PlayerId },
}

/// Broadcasts from the room task to every connection in the room.
#[derive(Debug, Clone)]
pub enum RoomBroadcast {
    /// Pre-serialized `ServerMsg::RoomUpdate` JSON.
    Update(String),
    Closed,
}

/// The sync unit at the root of the room's session tree. It watches the
/// session for state changes and pushes partial snapshots out: the fixed
/// tier when structure or roster changes, the moving tier per tick while a
/// shot is in flight.
pub struct RoomServer {
    broadcast_tx: broadcast::Sender<RoomBroadcast>,
}

impl RoomServer {
    pub fn new(broadcast_tx: broadcast::Sender<RoomBroadcast>) -> Self {
        Self { broadcast_tx }
    }

    fn send(&self, update: RoomUpdate) {
        match serde_json::to_string(&ServerMsg::RoomUpdate(update)) {
            // Send fails only without subscribers, which is fine.
            Ok(json) => {
                let _ = self.broadcast_tx.send(RoomBroadcast::Update(json));
            }
            Err(err) => tracing::error!("failed to serialize room update: {err}"),
        }
    }
}

impl Middleware<BilliardContext, GameEvent> for RoomServer {
    fn on_event(
        &mut self,
        ctx: &mut BilliardContext,
        event: &GameEvent,
        fx: &mut Effects<GameEvent>,
    ) {
        match event {
            GameEvent::Update => {
                self.send(RoomUpdate::fixed(ctx));
                self.send(RoomUpdate::moving(ctx));
            }
            GameEvent::FrameLoop { .. } => {
                if ctx.shot_in_progress {
                    self.send(RoomUpdate::moving(ctx));
                }
            }
            GameEvent::UserEnter { player } => {
                if ctx.player(player).is_none() {
                    ctx.players.push(Player::new(player.clone()));
                }
                self.send(RoomUpdate::fixed(ctx));
                self.send(RoomUpdate::moving(ctx));
                let seats = ctx.turn.turns.len();
                if !ctx.game_started && seats > 0 && ctx.players.len() == seats {
                    fx.emit(GameEvent::GameStart);
                }
            }
            GameEvent::UserExit { player } => {
                ctx.players.retain(|p| &p.id != player);
                self.send(RoomUpdate::fixed(ctx));
                self.send(RoomUpdate::moving(ctx));
            }
            GameEvent::TerminateRoom => {
                let _ = self.broadcast_tx.send(RoomBroadcast::Closed);
            }
            _ => {}
        }
    }
}

/// Run one room to completion. Owns the runtime; exits on lease expiry, on
/// the last player leaving, or when the command channel closes.
pub async fn run_room(
    room_id: String,
    mut cmd_rx: mpsc::Receiver<RoomCommand>,
    broadcast_tx: broadcast::Sender<RoomBroadcast>,
    config: ServerConfig,
) {
    let (rack, turn) = match config.rng_seed {
        Some(seed) => (Rack::seeded(seed), TurnBased::seeded(seed)),
        None => (Rack::new(), TurnBased::new()),
    };
    let root = Node::new(RoomServer::new(broadcast_tx))
        .mount(Node::new(PoolTable::new()))
        .mount(Node::new(rack))
        .mount(Node::new(turn))
        .mount(Node::new(EightBallVersus))
        .mount(Node::new(Physics::new()));
    let mut runtime = Runtime::activate(root, BilliardContext::default());

    let tick = config.tick_duration();
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut lease_deadline = Instant::now() + config.room_lease;
    let mut seats: Vec<JoinAuth> = Vec::new();

    tracing::info!(room = %room_id, "room opened");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                runtime.emit(GameEvent::FrameLoop { dt_ms: tick.as_secs_f32() * 1000.0 });
                runtime.advance_timers(tick);
            }

            _ = tokio::time::sleep_until(lease_deadline) => {
                tracing::info!(room = %room_id, "room lease expired");
                break;
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(RoomCommand::Join { auth, respond }) => {
                        let _ = respond.send(join(&mut runtime, &mut seats, auth));
                    }
                    Some(RoomCommand::CueShot { player, ball, impulse }) => {
                        if runtime.context().is_turn_of(&player) {
                            lease_deadline = Instant::now() + config.room_lease;
                            runtime.emit(GameEvent::CueShot { ball, impulse });
                        } else {
                            tracing::debug!(room = %room_id, player = %player.0,
                                "dropping shot: not this player's turn");
                        }
                    }
                    Some(RoomCommand::ExitRoom { player }) => {
                        seats.retain(|seat| seat.id != player.0);
                        runtime.emit(GameEvent::UserExit { player });
                        if runtime.context().players.is_empty() {
                            tracing::info!(room = %room_id, "last player left");
                            break;
                        }
                    }
                    Some(RoomCommand::Disconnect { player }) => {
                        // The roster entry survives; the player may reconnect
                        // with the same id and secret.
                        tracing::debug!(room = %room_id, player = %player.0, "client disconnected");
                    }
                    None => break,
                }
            }
        }
    }

    runtime.emit(GameEvent::TerminateRoom);
    runtime.deactivate();
    tracing::info!(room = %room_id, "room closed");
}

/// Resolve a join request against the seat ledger. The first presenter of an
/// id binds its secret; later joins with that id must present the same
/// secret. Rejections are silent apart from a closed socket.
fn join(
    runtime: &mut Runtime<BilliardContext, GameEvent>,
    seats: &mut Vec<JoinAuth>,
    auth: JoinAuth,
) -> Option<PlayerId> {
    let capacity = runtime.context().turn.turns.len();
    match seats.iter().find(|seat| seat.id == auth.id) {
        Some(seat) if seat.secret == auth.secret => {}
        Some(_) => {
            tracing::debug!(player = %auth.id, "join rejected: secret mismatch");
            return None;
        }
        None if seats.len() < capacity => seats.push(auth.clone()),
        None => {
            tracing::debug!(player = %auth.id, "join rejected: room full");
            return None;
        }
    }
    let player = PlayerId(auth.id);
    runtime.emit(GameEvent::UserEnter { player: player.clone() });
    Some(player)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (
        Runtime<BilliardContext, GameEvent>,
        broadcast::Receiver<RoomBroadcast>,
    ) {
        let (tx, rx) = broadcast::channel(64);
        let root = Node::new(RoomServer::new(tx))
            .mount(Node::new(PoolTable::new()))
            .mount(Node::new(Rack::seeded(7)))
            .mount(Node::new(TurnBased::seeded(7)))
            .mount(Node::new(EightBallVersus))
            .mount(Node::new(Physics::new()));
        (Runtime::activate(root, BilliardContext::default()), rx)
    }

    fn drain(rx: &mut broadcast::Receiver<RoomBroadcast>) -> Vec<RoomBroadcast> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn updates(msgs: &[RoomBroadcast]) -> Vec<RoomUpdate> {
        msgs.iter()
            .filter_map(|msg| match msg {
                RoomBroadcast::Update(json) => match serde_json::from_str(json) {
                    Ok(ServerMsg::RoomUpdate(update)) => Some(update),
                    _ => None,
                },
                RoomBroadcast::Closed => None,
            })
            .collect()
    }

    #[test]
    fn second_join_starts_the_game() {
        let (mut runtime, mut rx) = session();
        drain(&mut rx);

        runtime.emit(GameEvent::UserEnter { player: PlayerId("p1".into()) });
        assert!(!runtime.context().game_started);

        runtime.emit(GameEvent::UserEnter { player: PlayerId("p2".into()) });
        let ctx = runtime.context();
        assert!(ctx.game_started);
        assert!(ctx.cue_ball().is_some());
        assert!(ctx.turn.current.is_some());

        // The post-start update must carry the started flag out.
        let sent = updates(&drain(&mut rx));
        assert!(sent.iter().any(|u| u.game_started == Some(true)));
    }

    #[test]
    fn duplicate_user_enter_keeps_one_roster_entry() {
        let (mut runtime, _rx) = session();
        runtime.emit(GameEvent::UserEnter { player: PlayerId("p1".into()) });
        runtime.emit(GameEvent::UserEnter { player: PlayerId("p1".into()) });
        assert_eq!(runtime.context().players.len(), 1);
        assert!(!runtime.context().game_started);
    }

    #[test]
    fn frame_loop_broadcasts_motion_only_during_a_shot() {
        let (mut runtime, mut rx) = session();
        drain(&mut rx);

        runtime.emit(GameEvent::FrameLoop { dt_ms: 50.0 });
        assert!(updates(&drain(&mut rx)).is_empty());

        runtime.context_mut().shot_in_progress = true;
        runtime.emit(GameEvent::FrameLoop { dt_ms: 50.0 });
        let sent = updates(&drain(&mut rx));
        assert!(sent.iter().all(|u| u.balls.is_some() && u.table.is_none()));
        assert!(!sent.is_empty());
    }

    #[test]
    fn update_event_broadcasts_both_tiers() {
        let (mut runtime, mut rx) = session();
        drain(&mut rx);

        runtime.emit(GameEvent::Update);
        let sent = updates(&drain(&mut rx));
        assert_eq!(sent.len(), 2);
        assert!(sent[0].table.is_some() && sent[0].balls.is_none());
        assert!(sent[1].balls.is_some() && sent[1].table.is_none());
    }

    #[test]
    fn user_exit_broadcasts_both_tiers() {
        let (mut runtime, mut rx) = session();
        runtime.emit(GameEvent::UserEnter { player: PlayerId("p1".into()) });
        runtime.emit(GameEvent::UserEnter { player: PlayerId("p2".into()) });
        drain(&mut rx);

        runtime.emit(GameEvent::UserExit { player: PlayerId("p2".into()) });
        let sent = updates(&drain(&mut rx));
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].players.as_ref().map(Vec::len), Some(1));
        assert!(sent[1].balls.is_some() && sent[1].turn.is_some());
    }

    #[test]
    fn terminate_room_broadcasts_closed() {
        let (mut runtime, mut rx) = session();
        drain(&mut rx);
        runtime.emit(GameEvent::TerminateRoom);
        assert!(matches!(rx.try_recv(), Ok(RoomBroadcast::Closed)));
    }

    #[test]
    fn join_binds_secret_to_first_presenter() {
        let (mut runtime, _rx) = session();
        let mut seats = Vec::new();
        let auth = |id: &str, secret: &str| JoinAuth { id: id.into(), secret: secret.into() };

        assert!(join(&mut runtime, &mut seats, auth("p1", "s1")).is_some());
        // Reconnect with the bound secret.
        assert!(join(&mut runtime, &mut seats, auth("p1", "s1")).is_some());
        assert_eq!(runtime.context().players.len(), 1);
        // Same id, different secret.
        assert!(join(&mut runtime, &mut seats, auth("p1", "evil")).is_none());

        assert!(join(&mut runtime, &mut seats, auth("p2", "s2")).is_some());
        // Two seats taken; a third identity is turned away.
        assert!(join(&mut runtime, &mut seats, auth("p3", "s3")).is_none());
    }
}
