//! Triangular opening rack: fifteen balls in five rows, eight ball in the
//! middle of the third row.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::context::{Ball, BallColor, BilliardContext, Point};
use crate::events::GameEvent;
use crate::runtime::{Effects, Middleware};

pub struct Rack {
    rng: ChaCha8Rng,
}

impl Rack {
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn rack_balls(&mut self, ctx: &mut BilliardContext) {
        let Some(table) = ctx.table else {
            return;
        };
        let r = table.ball_radius;
        let cx = table.width / 4.0;
        let cy = 0.0;

        let mut colors = BallColor::all_objects();
        colors.shuffle(&mut self.rng);
        colors.insert(4, BallColor::Black);

        let mut balls = Vec::with_capacity(colors.len());
        for (point, color) in triangle(r).into_iter().zip(colors) {
            let jitter_x = self.rng.gen::<f32>() * r * 0.02;
            let jitter_y = self.rng.gen::<f32>() * r * 0.02;
            let id = ctx.new_ball_id();
            balls.push(Ball {
                id,
                color,
                position: Point::new(cx + point.x + jitter_x, cy + point.y + jitter_y),
                radius: r,
            });
        }
        ctx.balls = balls;
    }
}

impl Default for Rack {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware<BilliardContext, GameEvent> for Rack {
    fn on_event(
        &mut self,
        ctx: &mut BilliardContext,
        event: &GameEvent,
        fx: &mut Effects<GameEvent>,
    ) {
        if let GameEvent::RackBalls = event {
            self.rack_balls(ctx);
            fx.emit(GameEvent::Update);
        }
    }
}

/// Row-major positions of a five-row triangle with ball radius `r`, apex at
/// the origin, opening toward +x.
fn triangle(r: f32) -> Vec<Point> {
    let spi3 = std::f32::consts::FRAC_PI_3.sin();
    let n = 5;
    let d = r * 2.0;
    let l = spi3 * d;
    let mut points = Vec::new();
    for i in 0..n {
        for j in 0..=i {
            points.push(Point::new(
                i as f32 * l,
                (j as f32 - i as f32 * 0.5) * d,
            ));
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{Node, Runtime};
    use crate::table::PoolTable;

    fn racked_runtime() -> Runtime<BilliardContext, GameEvent> {
        let root = Node::new(PoolTable::new()).mount(Node::new(Rack::seeded(7)));
        let mut runtime = Runtime::activate(root, BilliardContext::default());
        runtime.emit(GameEvent::InitTable);
        runtime.emit(GameEvent::RackBalls);
        runtime
    }

    #[test]
    fn rack_contains_fifteen_balls_with_one_eight_ball() {
        let runtime = racked_runtime();
        let balls = &runtime.context().balls;
        assert_eq!(balls.len(), 15);
        assert_eq!(balls.iter().filter(|b| b.color.is_eight()).count(), 1);
        assert_eq!(balls.iter().filter(|b| b.color.is_cue()).count(), 0);
        // Every object color appears exactly once.
        for color in BallColor::all_objects() {
            assert_eq!(balls.iter().filter(|b| b.color == color).count(), 1);
        }
    }

    #[test]
    fn rack_sits_in_the_foot_half_of_the_table() {
        let runtime = racked_runtime();
        let table = runtime.context().table.unwrap();
        for ball in &runtime.context().balls {
            assert!(ball.position.x >= table.width / 4.0 - table.ball_radius);
            assert!(ball.position.x <= table.width / 2.0);
            assert!(ball.position.y.abs() <= table.height / 2.0);
        }
    }

    #[test]
    fn triangle_rows_grow_by_one() {
        let points = triangle(0.031);
        assert_eq!(points.len(), 15);
        assert_eq!(points[0], Point::new(0.0, 0.0));
    }
}
