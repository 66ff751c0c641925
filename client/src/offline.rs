//! Offline practice: the whole session runs locally, single player, solo
//! rules. Frames are stepped as fast as they come, not in real time.

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use billiards_shared::context::{BilliardContext, Player, PlayerId};
use billiards_shared::cue::CueAim;
use billiards_shared::events::GameEvent;
use billiards_shared::physics::Physics;
use billiards_shared::rack::Rack;
use billiards_shared::rules::EightBallSolo;
use billiards_shared::runtime::{Node, Runtime};
use billiards_shared::table::PoolTable;
use billiards_shared::turn::TurnBased;

use crate::bot;

/// Matches the fixed simulation step.
const TICK: Duration = Duration::from_millis(50);
const TICK_MS: f32 = 50.0;

/// Hard stop against a practice session that never sinks the eight ball.
const MAX_FRAMES: u32 = 500_000;

#[derive(Debug)]
pub struct SoloReport {
    pub shots: u32,
    pub pocketed: usize,
    pub finished: bool,
}

/// Run one solo practice game to completion (or to the shot budget) and
/// report how it went.
pub fn play_offline(seed: Option<u64>, max_shots: u32) -> SoloReport {
    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let rack = match seed {
        Some(seed) => Rack::seeded(seed),
        None => Rack::new(),
    };

    let me = PlayerId("solo".into());
    let mut ctx = BilliardContext::default();
    ctx.players = vec![Player::new(me.clone())];
    ctx.local_player = Some(me);

    let root = Node::new(PoolTable::new())
        .mount(Node::new(rack))
        .mount(Node::new(TurnBased::seeded(seed.unwrap_or(0))))
        .mount(Node::new(EightBallSolo))
        .mount(Node::new(Physics::new()))
        .mount(Node::new(CueAim::default()));
    let mut runtime = Runtime::activate(root, ctx);
    runtime.emit(GameEvent::GameStart);

    let mut shots = 0;
    for _ in 0..MAX_FRAMES {
        runtime.emit(GameEvent::FrameLoop { dt_ms: TICK_MS });
        runtime.advance_timers(TICK);

        let ctx = runtime.context();
        if ctx.game_over || (shots >= max_shots && !ctx.shot_in_progress) {
            break;
        }
        if shots >= max_shots {
            continue;
        }
        // The cue ball may be gone while a respot is pending; wait it out.
        if !ctx.shot_in_progress && ctx.cue_ball().is_some() {
            if let Some((anchor, release)) = bot::plan_shot(ctx, &mut rng) {
                runtime.emit(GameEvent::AimStart { point: anchor });
                runtime.emit(GameEvent::AimEnd { point: release });
                shots += 1;
            }
        }
    }

    let ctx = runtime.context();
    let remaining = ctx.balls.iter().filter(|b| !b.color.is_cue()).count();
    let report = SoloReport {
        shots,
        pocketed: 15 - remaining,
        finished: ctx.game_over,
    };
    runtime.deactivate();
    report
}
