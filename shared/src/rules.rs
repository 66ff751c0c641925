//! Rule engines: they interpret shot outcomes into game-state transitions.
//! Both variants are driven entirely by `ShotEnd` events.

use std::time::Duration;

use crate::context::{Ball, BilliardContext, Group};
use crate::events::GameEvent;
use crate::runtime::{Effects, Middleware};

/// Delay before a pocketed cue ball is respotted.
const RESPOT_DELAY: Duration = Duration::from_millis(400);

fn contains_cue(pocketed: &[Ball]) -> bool {
    pocketed.iter().any(|ball| ball.color.is_cue())
}

fn contains_eight(pocketed: &[Ball]) -> bool {
    pocketed.iter().any(|ball| ball.color.is_eight())
}

/// Two-player eight-ball: groups, turn passing, win/loss on the eight ball.
#[derive(Default)]
pub struct EightBallVersus;

impl Middleware<BilliardContext, GameEvent> for EightBallVersus {
    fn activate(&mut self, _ctx: &mut BilliardContext, fx: &mut Effects<GameEvent>) {
        fx.emit(GameEvent::InitTable);
        fx.emit(GameEvent::RackBalls);
    }

    fn on_event(
        &mut self,
        ctx: &mut BilliardContext,
        event: &GameEvent,
        fx: &mut Effects<GameEvent>,
    ) {
        match event {
            GameEvent::GameStart => {
                fx.emit(GameEvent::InitCueBall);
                // Group assignment is fixed for the rest of the game.
                if let Some(player) = ctx.players.get_mut(0) {
                    player.group = Some(Group::Stripe);
                }
                if let Some(player) = ctx.players.get_mut(1) {
                    player.group = Some(Group::Solid);
                }
                ctx.game_started = true;
                fx.emit(GameEvent::Update);
            }
            GameEvent::ShotEnd { pocketed } => self.shot_end(ctx, pocketed, fx),
            _ => {}
        }
    }
}

impl EightBallVersus {
    fn shot_end(&self, ctx: &mut BilliardContext, pocketed: &[Ball], fx: &mut Effects<GameEvent>) {
        if ctx.game_over {
            return;
        }
        let Some(shooter) = ctx.current_player() else {
            // Shot settled before the game had players; nothing to rule on.
            fx.emit(GameEvent::Update);
            return;
        };
        let shooter_id = shooter.id.clone();
        let group = shooter.group;

        let has_cue = contains_cue(pocketed);
        let has_eight = contains_eight(pocketed);
        let has_own = group
            .map(|g| pocketed.iter().any(|ball| ball.color.in_group(g)))
            .unwrap_or(false);

        if has_eight {
            let own_left = group
                .map(|g| ctx.balls.iter().any(|ball| ball.color.in_group(g)))
                .unwrap_or(false);
            let winner = if own_left {
                ctx.players
                    .iter()
                    .find(|player| player.id != shooter_id)
                    .map(|player| player.id.clone())
            } else {
                Some(shooter_id)
            };
            ctx.game_over = true;
            ctx.winner = winner;
            fx.emit(GameEvent::GameOver);
        } else if has_cue {
            fx.emit(GameEvent::PassTurn);
            fx.schedule(RESPOT_DELAY, GameEvent::InitCueBall);
        } else if has_own {
            // Shooter keeps the table.
        } else {
            fx.emit(GameEvent::PassTurn);
        }
        fx.emit(GameEvent::Update);
    }
}

/// Single-player practice rules: only the cue and eight ball matter.
#[derive(Default)]
pub struct EightBallSolo;

impl Middleware<BilliardContext, GameEvent> for EightBallSolo {
    fn activate(&mut self, _ctx: &mut BilliardContext, fx: &mut Effects<GameEvent>) {
        fx.emit(GameEvent::InitTable);
        fx.emit(GameEvent::RackBalls);
    }

    fn on_event(
        &mut self,
        ctx: &mut BilliardContext,
        event: &GameEvent,
        fx: &mut Effects<GameEvent>,
    ) {
        match event {
            GameEvent::GameStart => {
                fx.emit(GameEvent::InitCueBall);
                ctx.game_started = true;
                fx.emit(GameEvent::Update);
            }
            GameEvent::ShotEnd { pocketed } => {
                if ctx.game_over {
                    return;
                }
                if contains_eight(pocketed) {
                    ctx.game_over = true;
                    fx.emit(GameEvent::GameOver);
                } else if contains_cue(pocketed) {
                    fx.schedule(RESPOT_DELAY, GameEvent::InitCueBall);
                }
                fx.emit(GameEvent::Update);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BallColor, BallId, Hue, Player, PlayerId, Point, Turn, TurnToken};
    use crate::runtime::{Node, Runtime};
    use crate::table::PoolTable;
    use std::sync::{Arc, Mutex};

    type Events = Arc<Mutex<Vec<GameEvent>>>;

    struct Probe(Events);

    impl Middleware<BilliardContext, GameEvent> for Probe {
        fn on_event(
            &mut self,
            _ctx: &mut BilliardContext,
            event: &GameEvent,
            _fx: &mut Effects<GameEvent>,
        ) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    fn ball(id: u32, color: BallColor) -> Ball {
        Ball {
            id: BallId(id),
            color,
            position: Point::new(0.0, 0.0),
            radius: 0.031,
        }
    }

    fn solid(id: u32) -> Ball {
        ball(id, BallColor::Object { hue: Hue::Red, group: Group::Solid })
    }

    fn stripe(id: u32) -> Ball {
        ball(id, BallColor::Object { hue: Hue::Blue, group: Group::Stripe })
    }

    /// Two players mid-game; p1 shoots stripes and holds the turn.
    fn versus_context() -> BilliardContext {
        let mut ctx = BilliardContext::default();
        let one = TurnToken("turn-one".into());
        let two = TurnToken("turn-two".into());
        let mut p1 = Player::new(PlayerId("p1".into()));
        p1.turn = Some(one.clone());
        p1.group = Some(Group::Stripe);
        let mut p2 = Player::new(PlayerId("p2".into()));
        p2.turn = Some(two.clone());
        p2.group = Some(Group::Solid);
        ctx.players = vec![p1, p2];
        ctx.turn = Turn { turns: vec![one.clone(), two], current: Some(one) };
        ctx.game_started = true;
        ctx
    }

    fn versus_runtime(ctx: BilliardContext) -> (Runtime<BilliardContext, GameEvent>, Events) {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let root = Node::new(EightBallVersus)
            .mount(Node::new(crate::turn::TurnBased::seeded(1)))
            .mount(Node::new(Probe(events.clone())));
        // TurnBased::activate resets the turn state, so restore the fixture.
        let turn = ctx.turn.clone();
        let mut runtime = Runtime::activate(root, ctx);
        runtime.context_mut().turn = turn;
        events.lock().unwrap().clear();
        (runtime, events)
    }

    fn emitted(events: &Events, pred: fn(&GameEvent) -> bool) -> usize {
        events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn own_ball_pocketed_keeps_the_turn() {
        let mut ctx = versus_context();
        ctx.balls = vec![stripe(10), solid(11)];
        let (mut runtime, events) = versus_runtime(ctx);

        runtime.emit(GameEvent::ShotEnd { pocketed: vec![stripe(12)] });

        assert_eq!(
            runtime.context().turn.current,
            Some(TurnToken("turn-one".into()))
        );
        assert_eq!(emitted(&events, |e| matches!(e, GameEvent::PassTurn)), 0);
        assert_eq!(emitted(&events, |e| matches!(e, GameEvent::Update)), 1);
    }

    #[test]
    fn pocketing_nothing_passes_the_turn() {
        let mut ctx = versus_context();
        ctx.balls = vec![stripe(10), solid(11)];
        let (mut runtime, _) = versus_runtime(ctx);

        runtime.emit(GameEvent::ShotEnd { pocketed: vec![] });
        assert_eq!(
            runtime.context().turn.current,
            Some(TurnToken("turn-two".into()))
        );
    }

    #[test]
    fn opponent_ball_only_passes_the_turn() {
        let mut ctx = versus_context();
        ctx.balls = vec![stripe(10)];
        let (mut runtime, _) = versus_runtime(ctx);

        runtime.emit(GameEvent::ShotEnd { pocketed: vec![solid(11)] });
        assert_eq!(
            runtime.context().turn.current,
            Some(TurnToken("turn-two".into()))
        );
    }

    #[test]
    fn scratch_passes_turn_and_schedules_one_respot() {
        let mut ctx = versus_context();
        ctx.table = Some(crate::context::Table {
            width: 2.24,
            height: 1.12,
            ball_radius: 0.031,
            pocket_radius: 0.05,
        });
        ctx.balls = vec![stripe(10)];
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let root = Node::new(EightBallVersus)
            .mount(Node::new(crate::turn::TurnBased::seeded(1)))
            .mount(Node::new(PoolTable::new()))
            .mount(Node::new(Probe(events.clone())));
        let turn = ctx.turn.clone();
        let table = ctx.table;
        let mut runtime = Runtime::activate(root, ctx);
        runtime.context_mut().turn = turn;
        runtime.context_mut().table = table;
        events.lock().unwrap().clear();

        runtime.emit(GameEvent::ShotEnd { pocketed: vec![ball(1, BallColor::White)] });
        assert_eq!(
            runtime.context().turn.current,
            Some(TurnToken("turn-two".into()))
        );
        assert!(runtime.context().cue_ball().is_none(), "respot is delayed");

        runtime.advance_timers(RESPOT_DELAY);
        assert!(runtime.context().cue_ball().is_some());

        // A second scratch cycle still yields exactly one live cue ball.
        runtime.context_mut().balls.retain(|b| !b.color.is_cue());
        runtime.emit(GameEvent::ShotEnd { pocketed: vec![ball(2, BallColor::White)] });
        runtime.advance_timers(RESPOT_DELAY);
        runtime.advance_timers(RESPOT_DELAY);
        let whites = runtime
            .context()
            .balls
            .iter()
            .filter(|b| b.color.is_cue())
            .count();
        assert_eq!(whites, 1);
    }

    #[test]
    fn eight_ball_with_own_group_cleared_wins_for_shooter() {
        let mut ctx = versus_context();
        // Only opponent solids remain on the table.
        ctx.balls = vec![solid(10), solid(11)];
        let (mut runtime, events) = versus_runtime(ctx);

        runtime.emit(GameEvent::ShotEnd { pocketed: vec![ball(1, BallColor::Black)] });

        let ctx = runtime.context();
        assert!(ctx.game_over);
        assert_eq!(ctx.winner, Some(PlayerId("p1".into())));
        assert_eq!(emitted(&events, |e| matches!(e, GameEvent::GameOver)), 1);
    }

    #[test]
    fn eight_ball_with_own_group_remaining_loses_to_opponent() {
        let mut ctx = versus_context();
        ctx.balls = vec![stripe(10), solid(11)];
        let (mut runtime, _) = versus_runtime(ctx);

        runtime.emit(GameEvent::ShotEnd { pocketed: vec![ball(1, BallColor::Black)] });

        let ctx = runtime.context();
        assert!(ctx.game_over);
        assert_eq!(ctx.winner, Some(PlayerId("p2".into())));
    }

    #[test]
    fn game_over_is_terminal_for_further_shot_ends() {
        let mut ctx = versus_context();
        ctx.balls = vec![stripe(10)];
        let (mut runtime, events) = versus_runtime(ctx);
        runtime.emit(GameEvent::ShotEnd { pocketed: vec![ball(1, BallColor::Black)] });
        let winner = runtime.context().winner.clone();

        runtime.emit(GameEvent::ShotEnd { pocketed: vec![ball(2, BallColor::Black)] });
        assert_eq!(runtime.context().winner, winner, "winner never changes");
        assert_eq!(emitted(&events, |e| matches!(e, GameEvent::GameOver)), 1);
    }

    #[test]
    fn game_start_assigns_disjoint_groups() {
        let ctx = versus_context();
        let (mut runtime, _) = versus_runtime(ctx);
        // Clear fixture groups; GameStart must assign them.
        for player in &mut runtime.context_mut().players {
            player.group = None;
        }
        runtime.emit(GameEvent::GameStart);
        let groups: Vec<_> = runtime
            .context()
            .players
            .iter()
            .map(|p| p.group.unwrap())
            .collect();
        assert_eq!(groups.len(), 2);
        assert_ne!(groups[0], groups[1]);
    }

    #[test]
    fn solo_eight_ball_ends_the_game_without_winner() {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let root = Node::new(EightBallSolo).mount(Node::new(Probe(events.clone())));
        let mut ctx = BilliardContext::default();
        ctx.game_started = true;
        let mut runtime = Runtime::activate(root, ctx);
        events.lock().unwrap().clear();

        runtime.emit(GameEvent::ShotEnd { pocketed: vec![ball(1, BallColor::Black)] });
        assert!(runtime.context().game_over);
        assert!(runtime.context().winner.is_none());
        assert_eq!(emitted(&events, |e| matches!(e, GameEvent::GameOver)), 1);
    }

    #[test]
    fn solo_neutral_pocket_only_notifies() {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let root = Node::new(EightBallSolo).mount(Node::new(Probe(events.clone())));
        let mut ctx = BilliardContext::default();
        ctx.game_started = true;
        let mut runtime = Runtime::activate(root, ctx);
        events.lock().unwrap().clear();

        runtime.emit(GameEvent::ShotEnd { pocketed: vec![solid(5)] });
        assert!(!runtime.context().game_over);
        assert_eq!(emitted(&events, |e| matches!(e, GameEvent::Update)), 1);
    }
}
