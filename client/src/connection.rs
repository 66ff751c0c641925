//! Online play: keeps a local context in sync with server snapshots and
//! drives shots through the aiming unit, forwarding them to the room.

use std::error::Error;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use billiards_shared::context::{BilliardContext, PlayerId, Point};
use billiards_shared::cue::CueAim;
use billiards_shared::events::GameEvent;
use billiards_shared::protocol::{ClientMsg, ServerMsg};
use billiards_shared::room_id::normalize_room_id;
use billiards_shared::runtime::{Effects, Middleware, Node, Runtime};

use crate::auth::ClientAuth;
use crate::bot;

/// Local frame cadence. Snapshots arrive on their own schedule; this only
/// paces aiming decisions.
const LOCAL_TICK: Duration = Duration::from_millis(100);
/// Minimum pause between shot attempts, so a dropped request is not spammed.
const SHOT_COOLDOWN: Duration = Duration::from_secs(1);

/// Terminal unit of the online session tree: accepted shots leave the local
/// runtime here and go to the server instead of a local simulation.
struct ShotForwarder {
    tx: mpsc::UnboundedSender<ClientMsg>,
}

impl Middleware<BilliardContext, GameEvent> for ShotForwarder {
    fn on_event(
        &mut self,
        _ctx: &mut BilliardContext,
        event: &GameEvent,
        _fx: &mut Effects<GameEvent>,
    ) {
        if let GameEvent::CueShot { ball, impulse } = event {
            let _ = self.tx.send(ClientMsg::CueShot { ball: *ball, impulse: *impulse });
        }
    }
}

/// Ask the lobby for a fresh room and return its id.
pub async fn create_room(server: &str) -> Result<String, Box<dyn Error>> {
    let (mut ws, _) = connect_async(format!("ws://{server}/ws")).await?;
    let json = serde_json::to_string(&ClientMsg::CreateRoom)?;
    ws.send(Message::Text(json.into())).await?;
    while let Some(msg) = ws.next().await {
        if let Message::Text(text) = msg? {
            if let Ok(ServerMsg::RoomReady { id }) = serde_json::from_str(&text) {
                return Ok(id);
            }
        }
    }
    Err("lobby closed before the room was ready".into())
}

/// Join `room` and play until the game ends or the room closes.
pub async fn play(
    server: &str,
    room: &str,
    auth: &ClientAuth,
    seed: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let room = normalize_room_id(room);
    let url = format!(
        "ws://{server}/rooms/{room}?id={}&secret={}",
        auth.id, auth.secret
    );
    let (mut ws, _) = connect_async(url).await?;
    tracing::info!(room = %room, id = %auth.id, "joined");

    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let (shot_tx, mut shot_rx) = mpsc::unbounded_channel();

    let mut ctx = BilliardContext::default();
    ctx.local_player = Some(PlayerId(auth.id.clone()));
    let root = Node::new(CueAim::default()).mount(Node::new(ShotForwarder { tx: shot_tx }));
    let mut runtime = Runtime::activate(root, ctx);

    let mut ticker = tokio::time::interval(LOCAL_TICK);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut next_shot_at = tokio::time::Instant::now();
    let mut seen_start = false;

    loop {
        tokio::select! {
            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(ServerMsg::RoomUpdate(update)) = serde_json::from_str(&text) else {
                            continue;
                        };
                        update.apply(runtime.context_mut());
                        let ctx = runtime.context();
                        if ctx.game_started && !seen_start {
                            seen_start = true;
                            println!("Game on: {} players", ctx.players.len());
                        }
                        if ctx.game_over {
                            match &ctx.winner {
                                Some(winner) if Some(winner) == ctx.local_player.as_ref() => {
                                    println!("You win!");
                                }
                                Some(winner) => println!("{} wins.", winner.0),
                                None => println!("Game over."),
                            }
                            let json = serde_json::to_string(&ClientMsg::ExitRoom)?;
                            let _ = ws.send(Message::Text(json.into())).await;
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        println!("Room closed.");
                        break;
                    }
                    Some(Err(e)) => return Err(e.into()),
                    _ => {} // Ignore ping/pong/binary
                }
            }

            Some(msg) = shot_rx.recv() => {
                let json = serde_json::to_string(&msg)?;
                ws.send(Message::Text(json.into())).await?;
            }

            _ = ticker.tick() => {
                runtime.emit(GameEvent::FrameLoop {
                    dt_ms: LOCAL_TICK.as_secs_f32() * 1000.0,
                });
                runtime.advance_timers(LOCAL_TICK);

                let now = tokio::time::Instant::now();
                if runtime.context().is_my_turn() && now >= next_shot_at {
                    if let Some((anchor, release)) = bot::plan_shot(runtime.context(), &mut rng) {
                        aim(&mut runtime, anchor, release);
                        next_shot_at = now + SHOT_COOLDOWN;
                    }
                }
            }
        }
    }
    Ok(())
}

fn aim(runtime: &mut Runtime<BilliardContext, GameEvent>, anchor: Point, release: Point) {
    runtime.emit(GameEvent::AimStart { point: anchor });
    runtime.emit(GameEvent::AimMove { point: release });
    runtime.emit(GameEvent::AimEnd { point: release });
}
