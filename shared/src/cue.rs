//! Cue-stick aiming: turns pointer gestures into shot impulses.

use crate::context::{BilliardContext, CueStick, Point};
use crate::events::GameEvent;
use crate::runtime::{Effects, Middleware};

/// Pull-back multiplier for the drawn stick, relative to the pointer drag.
const DRAW_SCALE: f32 = 1.5;
/// Impulse per meter of pull, opposing the drag direction.
const IMPULSE_SCALE: f32 = 0.05;

/// Maintains the transient [`CueStick`] between aim-start and aim-release and
/// emits `CueShot` on release. Only reacts while the local player holds the
/// turn.
#[derive(Default)]
pub struct CueAim;

impl CueAim {
    fn stick_end(start: Point, point: Point) -> Point {
        let dx = point.x - start.x;
        let dy = point.y - start.y;
        Point::new(start.x - DRAW_SCALE * dx, start.y - DRAW_SCALE * dy)
    }
}

impl Middleware<BilliardContext, GameEvent> for CueAim {
    fn on_event(
        &mut self,
        ctx: &mut BilliardContext,
        event: &GameEvent,
        fx: &mut Effects<GameEvent>,
    ) {
        match event {
            GameEvent::FrameLoop { .. } => {
                // Keep the stick anchored to the (possibly moving) cue ball.
                let Some(cue) = ctx.cue else { return };
                if let Some(ball) = ctx.ball(cue.ball) {
                    let position = ball.position;
                    if let Some(cue) = ctx.cue.as_mut() {
                        cue.start = position;
                    }
                }
            }
            GameEvent::AimStart { point } => {
                if !ctx.is_my_turn() {
                    return;
                }
                let Some(ball) = ctx.cue_ball() else { return };
                let start = ball.position;
                ctx.cue = Some(CueStick {
                    ball: ball.id,
                    start,
                    end: Self::stick_end(start, *point),
                });
            }
            GameEvent::AimMove { point } => {
                if let Some(cue) = ctx.cue.as_mut() {
                    cue.end = Self::stick_end(cue.start, *point);
                }
            }
            GameEvent::AimEnd { point } => {
                let Some(cue) = ctx.cue.take() else { return };
                let dx = point.x - cue.start.x;
                let dy = point.y - cue.start.y;
                if !ctx.is_my_turn() {
                    return;
                }
                fx.emit(GameEvent::CueShot {
                    ball: cue.ball,
                    impulse: Point::new(dx * -IMPULSE_SCALE, dy * -IMPULSE_SCALE),
                });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Ball, BallColor, BallId, Player, PlayerId, Turn, TurnToken};
    use crate::runtime::{Node, Runtime};
    use std::sync::{Arc, Mutex};

    struct ShotProbe(Arc<Mutex<Vec<GameEvent>>>);

    impl Middleware<BilliardContext, GameEvent> for ShotProbe {
        fn on_event(
            &mut self,
            _ctx: &mut BilliardContext,
            event: &GameEvent,
            _fx: &mut Effects<GameEvent>,
        ) {
            if matches!(event, GameEvent::CueShot { .. }) {
                self.0.lock().unwrap().push(event.clone());
            }
        }
    }

    fn my_turn_context() -> BilliardContext {
        let mut ctx = BilliardContext::default();
        let token = TurnToken("turn-one".into());
        let mut player = Player::new(PlayerId("me".into()));
        player.turn = Some(token.clone());
        ctx.players = vec![player];
        ctx.turn = Turn { turns: vec![token.clone()], current: Some(token) };
        ctx.local_player = Some(PlayerId("me".into()));
        ctx.game_started = true;
        ctx.balls.push(Ball {
            id: BallId(1),
            color: BallColor::White,
            position: Point::new(0.0, 0.0),
            radius: 0.031,
        });
        ctx
    }

    #[test]
    fn release_emits_shot_opposing_the_drag() {
        let shots = Arc::new(Mutex::new(Vec::new()));
        let root = Node::new(CueAim::default()).mount(Node::new(ShotProbe(shots.clone())));
        let mut runtime = Runtime::activate(root, my_turn_context());

        runtime.emit(GameEvent::AimStart { point: Point::new(0.2, 0.1) });
        assert!(runtime.context().cue.is_some());
        runtime.emit(GameEvent::AimEnd { point: Point::new(0.2, 0.1) });

        assert!(runtime.context().cue.is_none(), "stick is transient");
        let shots = shots.lock().unwrap();
        assert_eq!(shots.len(), 1);
        match &shots[0] {
            GameEvent::CueShot { ball, impulse } => {
                assert_eq!(*ball, BallId(1));
                assert!((impulse.x - (-0.01)).abs() < 1e-6);
                assert!((impulse.y - (-0.005)).abs() < 1e-6);
            }
            other => panic!("expected CueShot, got {other:?}"),
        }
    }

    #[test]
    fn aiming_is_ignored_when_not_my_turn() {
        let shots = Arc::new(Mutex::new(Vec::new()));
        let root = Node::new(CueAim::default()).mount(Node::new(ShotProbe(shots.clone())));
        let mut ctx = my_turn_context();
        ctx.shot_in_progress = true;
        let mut runtime = Runtime::activate(root, ctx);

        runtime.emit(GameEvent::AimStart { point: Point::new(0.2, 0.1) });
        assert!(runtime.context().cue.is_none());
        runtime.emit(GameEvent::AimEnd { point: Point::new(0.2, 0.1) });
        assert!(shots.lock().unwrap().is_empty());
    }

    #[test]
    fn stick_mirrors_the_drag_by_one_and_a_half() {
        let root = Node::new(CueAim::default());
        let mut runtime = Runtime::activate(root, my_turn_context());
        runtime.emit(GameEvent::AimStart { point: Point::new(0.1, 0.0) });
        runtime.emit(GameEvent::AimMove { point: Point::new(0.2, 0.0) });
        let cue = runtime.context().cue.unwrap();
        assert!((cue.end.x - (-0.3)).abs() < 1e-6);
        assert_eq!(cue.end.y, 0.0);
    }
}
