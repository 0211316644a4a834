//! Control core for a chess engine.
//!
//! Coordinates a protocol thread with a persistent search worker:
//! game-mode state machine (play, force, analysis), tournament time
//! budgeting, termination detection, and pondering hand-off. The search
//! itself and the board representation are external collaborators,
//! consumed through the [`SearchFacade`] and [`Position`] traits; the
//! [`uci`] and [`xboard`] modules adapt the two wire protocols onto the
//! core's operation set.
//!
//! # Example
//! ```no_run
//! use chess_control::{Engine, SearchFacade};
//!
//! fn serve<S: SearchFacade>(search: S) {
//!     let engine = Engine::new(search);
//!     let mut uci = chess_control::uci::UciAdapter::new(engine, std::io::stdout());
//!     uci.run(std::io::stdin().lock());
//! }
//! ```

pub mod engine;
pub mod position;
pub mod result;
pub mod search;
pub mod uci;
pub mod xboard;

pub use engine::{
    Engine, EngineError, EngineHooks, GameMode, GoParams, ProtocolType, TimeControl,
};
pub use position::{Color, Position};
pub use result::{GameResult, ResultCode};
pub use search::{SearchFacade, SearchLimits, SearchOutcome, SearchProgress, SearchStats};
