//! Pool table geometry: six cushion rails, six pockets, cue-ball placement.

use crate::context::{Ball, BallColor, BilliardContext, Point, Pocket, Rail, Table};
use crate::events::GameEvent;
use crate::runtime::{Effects, Middleware};

/// Builds the static table layout on `InitTable` and places the cue ball on
/// `InitCueBall`. Dimensions are in meters.
pub struct PoolTable {
    width: f32,
    height: f32,
    ball_radius: f32,
    pocket_radius: f32,
}

impl Default for PoolTable {
    fn default() -> Self {
        Self {
            width: 2.24,
            height: 1.12,
            ball_radius: 0.031,
            pocket_radius: 0.05,
        }
    }
}

impl PoolTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn init_table(&self, ctx: &mut BilliardContext) {
        let table = Table {
            width: self.width,
            height: self.height,
            ball_radius: self.ball_radius,
            pocket_radius: self.pocket_radius,
        };

        let spi4 = std::f32::consts::FRAC_PI_4.sin();
        let pr = self.pocket_radius;
        let w = self.width;
        let h = self.height;
        let rw = 1.5 * pr;

        // One horizontal and one vertical cushion profile; the rest are
        // mirror images.
        let hrail = [
            Point::new(pr, h * 0.5),
            Point::new(pr, h * 0.5 + rw),
            Point::new(w * 0.5 - pr / spi4 + rw, h * 0.5 + rw),
            Point::new(w * 0.5 - pr / spi4, h * 0.5),
        ];
        let vrail = [
            Point::new(w * 0.5, -(h * 0.5 - pr / spi4)),
            Point::new(w * 0.5 + rw, -(h * 0.5 - pr / spi4 + rw)),
            Point::new(w * 0.5 + rw, h * 0.5 - pr / spi4 + rw),
            Point::new(w * 0.5, h * 0.5 - pr / spi4),
        ];

        let mirror_x = |vs: &[Point]| vs.iter().map(|v| Point::new(-v.x, v.y)).collect();
        let mirror_y = |vs: &[Point]| vs.iter().map(|v| Point::new(v.x, -v.y)).collect();
        let mirror_xy = |vs: &[Point]| vs.iter().map(|v| Point::new(-v.x, -v.y)).collect();

        let rails = vec![
            Rail { vertices: vrail.to_vec() },  // right
            Rail { vertices: mirror_x(&vrail) }, // left
            Rail { vertices: hrail.to_vec() },  // bottom-right
            Rail { vertices: mirror_x(&hrail) }, // bottom-left
            Rail { vertices: mirror_y(&hrail) }, // top-right
            Rail { vertices: mirror_xy(&hrail) }, // top-left
        ];

        let pockets = vec![
            Pocket { radius: pr, position: Point::new(0.0, -h * 0.5 - pr * 1.1) },
            Pocket { radius: pr, position: Point::new(0.0, h * 0.5 + pr * 1.1) },
            Pocket { radius: pr, position: Point::new(w * 0.5 + pr * 0.2, h * 0.5 + pr * 0.2) },
            Pocket { radius: pr, position: Point::new(-w * 0.5 - pr * 0.2, h * 0.5 + pr * 0.2) },
            Pocket { radius: pr, position: Point::new(w * 0.5 + pr * 0.2, -h * 0.5 - pr * 0.2) },
            Pocket { radius: pr, position: Point::new(-w * 0.5 - pr * 0.2, -h * 0.5 - pr * 0.2) },
        ];

        ctx.table = Some(table);
        ctx.rails = rails;
        ctx.pockets = pockets;
    }

    fn init_cue_ball(&self, ctx: &mut BilliardContext) -> bool {
        let Some(table) = ctx.table else {
            return false;
        };
        // At most one live cue ball; a respot while one is on the table is
        // dropped.
        if ctx.cue_ball().is_some() {
            return false;
        }
        let id = ctx.new_ball_id();
        ctx.balls.push(Ball {
            id,
            color: BallColor::White,
            position: Point::new(-table.width / 4.0, 0.0),
            radius: table.ball_radius,
        });
        true
    }
}

impl Middleware<BilliardContext, GameEvent> for PoolTable {
    fn on_event(
        &mut self,
        ctx: &mut BilliardContext,
        event: &GameEvent,
        fx: &mut Effects<GameEvent>,
    ) {
        match event {
            GameEvent::InitTable => {
                self.init_table(ctx);
                fx.emit(GameEvent::Update);
            }
            GameEvent::InitCueBall => {
                if self.init_cue_ball(ctx) {
                    fx.emit(GameEvent::Update);
                }
            }
            _ => {}
        }
    }
}
