//! Engine control core.
//!
//! This module provides a unified core for both the UCI and `XBoard`
//! protocols: game state and mode handling, the search worker thread,
//! pondering hand-off, and time control.

mod controller;
mod hooks;
mod protocol;
pub mod time;

pub use controller::{Engine, EngineError, GameMode, GoParams};
pub use hooks::EngineHooks;
pub use protocol::ProtocolType;
pub use time::{TimeControl, DEFAULT_BASE_MS, RESERVE_MOVES};
