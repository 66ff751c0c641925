//! Wire protocol between client and server.
//!
//! Messages are JSON with a `type` tag. `RoomUpdate` is a partial context:
//! the server broadcasts a fixed tier (structural state) on changes and a
//! moving tier (per-tick motion state) while a shot is in flight. The client
//! shallow-merges whatever fields are present; the last message applied wins.

use serde::{Deserialize, Serialize};

use crate::context::{Ball, BallId, BilliardContext, Player, PlayerId, Pocket, Point, Rail, Table, Turn};

/// Increment on breaking protocol changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "cue-shot")]
    CueShot { ball: BallId, impulse: Point },
    #[serde(rename = "exit-room")]
    ExitRoom,
    /// Lobby-level: ask for a fresh room.
    #[serde(rename = "create-room")]
    CreateRoom,
}

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "room-update")]
    RoomUpdate(RoomUpdate),
    /// Lobby-level: a room was created for this client.
    #[serde(rename = "room-ready")]
    RoomReady { id: String },
}

/// Credentials presented when joining a room. The id is public (shared with
/// the other player); the secret binds the id for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinAuth {
    pub id: String,
    pub secret: String,
}

/// Partial snapshot of a room's context. Absent fields are untouched on
/// merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdate {
    // Fixed tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<Player>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rails: Option<Vec<Rail>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pockets: Option<Vec<Pocket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,

    // Moving tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balls: Option<Vec<Ball>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_started: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shot_in_progress: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_over: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<PlayerId>,
}

impl RoomUpdate {
    /// Structural snapshot: table, rails, pockets, roster.
    pub fn fixed(ctx: &BilliardContext) -> Self {
        Self {
            players: Some(ctx.players.clone()),
            rails: Some(ctx.rails.clone()),
            pockets: Some(ctx.pockets.clone()),
            table: ctx.table,
            ..Self::default()
        }
    }

    /// Motion snapshot: balls, turn and session flags.
    pub fn moving(ctx: &BilliardContext) -> Self {
        Self {
            balls: Some(ctx.balls.clone()),
            game_started: Some(ctx.game_started),
            shot_in_progress: Some(ctx.shot_in_progress),
            game_over: Some(ctx.game_over),
            turn: Some(ctx.turn.clone()),
            winner: ctx.winner.clone(),
            ..Self::default()
        }
    }

    /// Shallow-merge present fields into `ctx`. No sequencing: the last
    /// message applied wins, even if it was sent earlier.
    pub fn apply(&self, ctx: &mut BilliardContext) {
        if let Some(players) = &self.players {
            ctx.players = players.clone();
        }
        if let Some(rails) = &self.rails {
            ctx.rails = rails.clone();
        }
        if let Some(pockets) = &self.pockets {
            ctx.pockets = pockets.clone();
        }
        if let Some(table) = self.table {
            ctx.table = Some(table);
        }
        if let Some(balls) = &self.balls {
            ctx.balls = balls.clone();
        }
        if let Some(game_started) = self.game_started {
            ctx.game_started = game_started;
        }
        if let Some(shot_in_progress) = self.shot_in_progress {
            ctx.shot_in_progress = shot_in_progress;
        }
        if let Some(game_over) = self.game_over {
            ctx.game_over = game_over;
        }
        if let Some(turn) = &self.turn {
            ctx.turn = turn.clone();
        }
        if let Some(winner) = &self.winner {
            ctx.winner = Some(winner.clone());
        }
    }
}
