//! A minimal autopilot: picks a target ball and produces the pointer drag
//! that shoots the cue ball at it.

use rand::Rng;

use billiards_shared::context::{Ball, BilliardContext, Point};

/// How far the bot pulls the virtual pointer back, in meters.
const PULL_MIN: f32 = 0.06;
const PULL_MAX: f32 = 0.14;
/// Aim error, radians.
const JITTER: f32 = 0.05;

/// Plan the next shot as a drag gesture: the anchor point and the release
/// point. Returns `None` when there is nothing to shoot at.
pub fn plan_shot(ctx: &BilliardContext, rng: &mut impl Rng) -> Option<(Point, Point)> {
    let cue = ctx.cue_ball()?;
    let target = choose_target(ctx, cue)?;

    let dx = target.position.x - cue.position.x;
    let dy = target.position.y - cue.position.y;
    let len = (dx * dx + dy * dy).sqrt();
    let (ux, uy) = if len > f32::EPSILON {
        (dx / len, dy / len)
    } else {
        // Target sits on top of the cue ball; shoot anywhere.
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        (angle.cos(), angle.sin())
    };

    let jitter = rng.gen_range(-JITTER..JITTER);
    let (sin, cos) = jitter.sin_cos();
    let (ux, uy) = (ux * cos - uy * sin, ux * sin + uy * cos);

    // Dragging away from the target makes the release impulse point at it.
    let pull = rng.gen_range(PULL_MIN..PULL_MAX);
    let release = Point::new(cue.position.x - ux * pull, cue.position.y - uy * pull);
    Some((cue.position, release))
}

/// The closest own-group ball, or the closest object ball before groups are
/// assigned or once the own group is cleared.
fn choose_target<'a>(ctx: &'a BilliardContext, cue: &Ball) -> Option<&'a Ball> {
    let group = ctx
        .local_player
        .as_ref()
        .and_then(|id| ctx.player(id))
        .and_then(|player| player.group);

    let nearest = |mut balls: Vec<&'a Ball>| {
        balls.sort_by(|a, b| {
            distance_sq(cue, a)
                .partial_cmp(&distance_sq(cue, b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        balls.into_iter().next()
    };

    if let Some(group) = group {
        let own: Vec<_> = ctx
            .balls
            .iter()
            .filter(|ball| ball.color.in_group(group))
            .collect();
        if !own.is_empty() {
            return nearest(own);
        }
    }
    nearest(ctx.balls.iter().filter(|ball| !ball.color.is_cue()).collect())
}

fn distance_sq(from: &Ball, to: &Ball) -> f32 {
    let dx = to.position.x - from.position.x;
    let dy = to.position.y - from.position.y;
    dx * dx + dy * dy
}
