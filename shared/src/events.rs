//! The event vocabulary shared by every unit of a game session.

use crate::context::{Ball, BallId, PlayerId, Point};

/// One event kind per channel message of the session. Dispatch is keyed on
/// the variant; payloads are carried by value.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Periodic tick from the host loop; `dt_ms` is wall time since the
    /// previous tick.
    FrameLoop { dt_ms: f32 },

    /// Pointer gestures from the presentation layer.
    AimStart { point: Point },
    AimMove { point: Point },
    AimEnd { point: Point },

    /// A shot request: apply `impulse` to `ball`.
    CueShot { ball: BallId, impulse: Point },
    /// The physics engine accepted a shot.
    ShotStart { ball: BallId },
    /// The world settled; carries every ball pocketed during the shot.
    ShotEnd { pocketed: Vec<Ball> },

    /// Requests served by the table geometry unit.
    InitTable,
    RackBalls,
    InitCueBall,

    GameStart,
    PassTurn,
    GameOver,

    /// Structural state changed; the sync layer rebroadcasts on this.
    Update,

    /// Roster changes observed by the room.
    UserEnter { player: PlayerId },
    UserExit { player: PlayerId },

    /// The session lease expired or the room was closed.
    TerminateRoom,
}
