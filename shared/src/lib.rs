//! Billiards game engine shared by client and server.
//!
//! The engine is a tree of event-driven units over one shared context per
//! session: physics, table geometry, rack, cue aiming, turn scheduling and
//! the rule variants, plus the wire protocol that keeps two copies of this
//! state in sync.

pub mod context;
pub mod cue;
pub mod events;
pub mod physics;
pub mod protocol;
pub mod rack;
pub mod room_id;
pub mod rules;
pub mod runtime;
pub mod table;
pub mod turn;
