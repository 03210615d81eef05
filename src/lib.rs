//! Dialogue Engine — timed, branching and voiced dialogue for games.
//!
//! Sequences pre-authored lines, reveals them character by character on a
//! host-driven tick, advances on a delay or on player input, and lets thin
//! controllers branch to alternate content or play a clip per line.

pub mod core;
pub mod schema;
