//! Shared game state: entities, players, turn state, and session flags.
//!
//! One `BilliardContext` exists per active session and is shared by every
//! unit of that session's runtime. The server's copy is authoritative; the
//! client's copy is overwritten by snapshots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 2D point in table units (meters).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Context-allocated ball identity, stable across snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BallId(pub u32);

/// The two exclusive object-ball groups of versus play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Solid,
    Stripe,
}

/// The seven object-ball hues; each exists once per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hue {
    Yellow,
    Red,
    Burgundy,
    Orange,
    Green,
    Purple,
    Blue,
}

impl Hue {
    pub const ALL: [Hue; 7] = [
        Hue::Yellow,
        Hue::Red,
        Hue::Burgundy,
        Hue::Orange,
        Hue::Green,
        Hue::Purple,
        Hue::Blue,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Hue::Yellow => "yellow",
            Hue::Red => "red",
            Hue::Burgundy => "burgundy",
            Hue::Orange => "orange",
            Hue::Green => "green",
            Hue::Purple => "purple",
            Hue::Blue => "blue",
        }
    }
}

/// Ball color: the white cue ball, the black eight ball, or one of the
/// fourteen object colors. Encoded on the wire as a kebab string such as
/// `"burgundy-stripe"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallColor {
    White,
    Black,
    Object { hue: Hue, group: Group },
}

impl BallColor {
    /// All fourteen object colors, solids before stripes within each hue.
    pub fn all_objects() -> Vec<BallColor> {
        let mut colors = Vec::with_capacity(14);
        for hue in Hue::ALL {
            colors.push(BallColor::Object { hue, group: Group::Solid });
            colors.push(BallColor::Object { hue, group: Group::Stripe });
        }
        colors
    }

    pub fn is_cue(self) -> bool {
        self == BallColor::White
    }

    pub fn is_eight(self) -> bool {
        self == BallColor::Black
    }

    /// The group this ball belongs to, if it is an object ball.
    pub fn group(self) -> Option<Group> {
        match self {
            BallColor::Object { group, .. } => Some(group),
            _ => None,
        }
    }

    pub fn in_group(self, group: Group) -> bool {
        self.group() == Some(group)
    }
}

impl fmt::Display for BallColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BallColor::White => f.write_str("white"),
            BallColor::Black => f.write_str("black"),
            BallColor::Object { hue, group } => {
                let group = match group {
                    Group::Solid => "solid",
                    Group::Stripe => "stripe",
                };
                write!(f, "{}-{}", hue.as_str(), group)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown ball color: {0}")]
pub struct ParseColorError(String);

impl FromStr for BallColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" => return Ok(BallColor::White),
            "black" => return Ok(BallColor::Black),
            _ => {}
        }
        let (hue, group) = s
            .rsplit_once('-')
            .ok_or_else(|| ParseColorError(s.to_string()))?;
        let group = match group {
            "solid" => Group::Solid,
            "stripe" => Group::Stripe,
            _ => return Err(ParseColorError(s.to_string())),
        };
        let hue = Hue::ALL
            .into_iter()
            .find(|h| h.as_str() == hue)
            .ok_or_else(|| ParseColorError(s.to_string()))?;
        Ok(BallColor::Object { hue, group })
    }
}

impl Serialize for BallColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BallColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub id: BallId,
    pub color: BallColor,
    pub position: Point,
    pub radius: f32,
}

/// Immutable table dimensions, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub width: f32,
    pub height: f32,
    pub ball_radius: f32,
    pub pocket_radius: f32,
}

/// Closed convex polygon forming one cushion segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rail {
    pub vertices: Vec<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pocket {
    pub position: Point,
    pub radius: f32,
}

/// Transient aiming entity; exists only between aim-start and aim-release.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CueStick {
    pub ball: BallId,
    pub start: Point,
    pub end: Point,
}

/// Player identity as presented by the client on join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

/// Opaque turn-slot identity; distinct from player identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnToken(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Group assigned at game start in versus play; never changes afterwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<TurnToken>,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            name: None,
            group: None,
            turn: None,
        }
    }
}

/// Ordered turn slots plus the one currently holding the table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Turn {
    pub turns: Vec<TurnToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<TurnToken>,
}

/// The shared mutable state of one game session.
#[derive(Debug, Default)]
pub struct BilliardContext {
    pub cue: Option<CueStick>,
    pub balls: Vec<Ball>,
    pub rails: Vec<Rail>,
    pub pockets: Vec<Pocket>,
    pub table: Option<Table>,

    pub game_started: bool,
    pub shot_in_progress: bool,
    pub game_over: bool,

    pub players: Vec<Player>,
    pub turn: Turn,
    pub winner: Option<PlayerId>,

    /// Which roster entry is "me"; resolved on the client, `None` on the
    /// server.
    pub local_player: Option<PlayerId>,

    next_ball_id: u32,
}

impl BilliardContext {
    pub fn new_ball_id(&mut self) -> BallId {
        self.next_ball_id += 1;
        BallId(self.next_ball_id)
    }

    pub fn cue_ball(&self) -> Option<&Ball> {
        self.balls.iter().find(|ball| ball.color.is_cue())
    }

    pub fn ball(&self, id: BallId) -> Option<&Ball> {
        self.balls.iter().find(|ball| ball.id == id)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| &player.id == id)
    }

    /// The player holding the current turn token.
    pub fn current_player(&self) -> Option<&Player> {
        let current = self.turn.current.as_ref()?;
        self.players
            .iter()
            .find(|player| player.turn.as_ref() == Some(current))
    }

    /// Whether `player` may shoot right now: game running, no shot already in
    /// flight, and the turn token is theirs.
    pub fn is_turn_of(&self, player: &PlayerId) -> bool {
        if !self.game_started || self.shot_in_progress || self.game_over {
            return false;
        }
        match (self.player(player), self.turn.current.as_ref()) {
            (Some(p), Some(current)) => p.turn.as_ref() == Some(current),
            _ => false,
        }
    }

    /// Client-side convenience: is it the locally resolved player's turn.
    pub fn is_my_turn(&self) -> bool {
        self.local_player
            .as_ref()
            .map(|id| self.is_turn_of(id))
            .unwrap_or(false)
    }
}
