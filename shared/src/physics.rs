//! Rigid-body simulation of balls, rails and pockets. No game rules here;
//! the physics engine only reports shot boundaries and pocketed balls.

use std::collections::HashMap;

use rapier2d::prelude::*;

use crate::context::{Ball, BallId, BilliardContext};
use crate::events::GameEvent;
use crate::runtime::{Effects, Middleware};

/// Fixed simulation step, 20 Hz.
const TIME_STEP_MS: f32 = 1000.0 / 20.0;

const BALL_LINEAR_DAMPING: f32 = 1.5;
const BALL_ANGULAR_DAMPING: f32 = 1.0;
const BALL_FRICTION: f32 = 0.1;
const BALL_RESTITUTION: f32 = 0.99;
const RAIL_FRICTION: f32 = 0.1;
const RAIL_RESTITUTION: f32 = 0.9;

/// Steps a rapier world from variable-length frame ticks through a time
/// accumulator, applies cue-shot impulses, and detects pocketing and shot
/// completion.
pub struct Physics {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    gravity: Vector<Real>,

    ball_bodies: HashMap<BallId, RigidBodyHandle>,
    pocket_colliders: Vec<ColliderHandle>,
    statics_built: bool,

    accumulator_ms: f32,
    asleep: bool,
    /// Balls pocketed since the shot began; drained into one `ShotEnd`.
    pocketed: Vec<Ball>,
}

impl Physics {
    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = TIME_STEP_MS / 1000.0;
        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity: vector![0.0, 0.0],
            ball_bodies: HashMap::new(),
            pocket_colliders: Vec::new(),
            statics_built: false,
            accumulator_ms: 0.0,
            asleep: true,
            pocketed: Vec::new(),
        }
    }

    fn build_statics(&mut self, ctx: &BilliardContext) {
        for rail in &ctx.rails {
            let body = self.bodies.insert(RigidBodyBuilder::fixed().build());
            let points: Vec<_> = rail
                .vertices
                .iter()
                .map(|v| point![v.x, v.y])
                .collect();
            let Some(builder) = ColliderBuilder::convex_hull(&points) else {
                tracing::warn!("degenerate rail polygon, skipping");
                continue;
            };
            self.colliders.insert_with_parent(
                builder
                    .friction(RAIL_FRICTION)
                    .restitution(RAIL_RESTITUTION)
                    .build(),
                body,
                &mut self.bodies,
            );
        }
        for pocket in &ctx.pockets {
            let body = self.bodies.insert(
                RigidBodyBuilder::fixed()
                    .translation(vector![pocket.position.x, pocket.position.y])
                    .build(),
            );
            let collider = self.colliders.insert_with_parent(
                ColliderBuilder::ball(pocket.radius).sensor(true).build(),
                body,
                &mut self.bodies,
            );
            self.pocket_colliders.push(collider);
        }
        self.statics_built = true;
    }

    /// Mirror the context's ball collection into the world: create bodies for
    /// new balls, drop bodies whose ball has left the context.
    fn sync_balls(&mut self, ctx: &BilliardContext) {
        for ball in &ctx.balls {
            if self.ball_bodies.contains_key(&ball.id) {
                continue;
            }
            let body = self.bodies.insert(
                RigidBodyBuilder::dynamic()
                    .translation(vector![ball.position.x, ball.position.y])
                    .linear_damping(BALL_LINEAR_DAMPING)
                    .angular_damping(BALL_ANGULAR_DAMPING)
                    .ccd_enabled(true)
                    .build(),
            );
            self.colliders.insert_with_parent(
                ColliderBuilder::ball(ball.radius)
                    .friction(BALL_FRICTION)
                    .restitution(BALL_RESTITUTION)
                    .density(1.0)
                    .user_data(ball.id.0 as u128)
                    .build(),
                body,
                &mut self.bodies,
            );
            self.ball_bodies.insert(ball.id, body);
        }

        let live: Vec<BallId> = self.ball_bodies.keys().copied().collect();
        for id in live {
            if ctx.ball(id).is_none() {
                self.remove_ball_body(id);
            }
        }
    }

    fn remove_ball_body(&mut self, id: BallId) {
        if let Some(handle) = self.ball_bodies.remove(&id) {
            self.bodies.remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }
    }

    fn step(&mut self, ctx: &mut BilliardContext) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
        self.collect_pocketed(ctx);
    }

    /// Record balls overlapping a pocket sensor. The context entry goes away
    /// immediately; world bodies are removed in a batch after the narrow
    /// phase has been fully read, never while iterating it.
    fn collect_pocketed(&mut self, ctx: &mut BilliardContext) {
        let mut dropped: Vec<BallId> = Vec::new();
        for &pocket in &self.pocket_colliders {
            for (a, b, intersecting) in self.narrow_phase.intersection_pairs_with(pocket) {
                if !intersecting {
                    continue;
                }
                let other = if a == pocket { b } else { a };
                let Some(collider) = self.colliders.get(other) else {
                    continue;
                };
                let id = BallId(collider.user_data as u32);
                if collider.user_data != 0 && !dropped.contains(&id) {
                    dropped.push(id);
                }
            }
        }
        for id in dropped {
            if let Some(index) = ctx.balls.iter().position(|ball| ball.id == id) {
                let ball = ctx.balls.remove(index);
                tracing::debug!(ball = %ball.color, "pocketed");
                self.pocketed.push(ball);
            }
            self.remove_ball_body(id);
        }
    }

    fn write_back_positions(&self, ctx: &mut BilliardContext) {
        for ball in &mut ctx.balls {
            let Some(&handle) = self.ball_bodies.get(&ball.id) else {
                continue;
            };
            let Some(body) = self.bodies.get(handle) else {
                continue;
            };
            let position = body.translation();
            // Millimeter precision is enough outside the simulation.
            ball.position.x = (position.x * 1000.0).trunc() / 1000.0;
            ball.position.y = (position.y * 1000.0).trunc() / 1000.0;
        }
    }

    fn frame(&mut self, ctx: &mut BilliardContext, dt_ms: f32, fx: &mut Effects<GameEvent>) {
        if ctx.table.is_none() {
            return;
        }
        if !self.statics_built && !ctx.rails.is_empty() {
            self.build_statics(ctx);
        }
        self.sync_balls(ctx);

        self.accumulator_ms += dt_ms;
        while self.accumulator_ms >= TIME_STEP_MS {
            self.accumulator_ms -= TIME_STEP_MS;
            if self.asleep {
                continue;
            }
            self.step(ctx);
        }

        self.write_back_positions(ctx);

        if !self.asleep {
            let all_sleeping = self
                .bodies
                .iter()
                .all(|(_, body)| !body.is_dynamic() || body.is_sleeping());
            if all_sleeping {
                self.asleep = true;
                if ctx.shot_in_progress {
                    ctx.shot_in_progress = false;
                    let pocketed = std::mem::take(&mut self.pocketed);
                    fx.emit(GameEvent::ShotEnd { pocketed });
                }
            }
        }
    }

    fn cue_shot(
        &mut self,
        ctx: &mut BilliardContext,
        ball: BallId,
        impulse: crate::context::Point,
        fx: &mut Effects<GameEvent>,
    ) {
        if ctx.shot_in_progress || ctx.game_over {
            return;
        }
        let Some(&handle) = self.ball_bodies.get(&ball) else {
            tracing::debug!(?ball, "cue shot for unknown ball ignored");
            return;
        };
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        body.apply_impulse(vector![impulse.x, impulse.y], true);
        self.asleep = false;
        ctx.shot_in_progress = true;
        fx.emit(GameEvent::ShotStart { ball });
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware<BilliardContext, GameEvent> for Physics {
    fn on_event(
        &mut self,
        ctx: &mut BilliardContext,
        event: &GameEvent,
        fx: &mut Effects<GameEvent>,
    ) {
        match event {
            GameEvent::FrameLoop { dt_ms } => self.frame(ctx, *dt_ms, fx),
            GameEvent::CueShot { ball, impulse } => self.cue_shot(ctx, *ball, *impulse, fx),
            _ => {}
        }
    }
}
