//! Headless billiards client: joins a room (or plays offline) and lets a
//! simple autopilot take the shots.

pub mod auth;
pub mod bot;
pub mod connection;
pub mod offline;
