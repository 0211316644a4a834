//! `XBoard` protocol output formatting.
//!
//! Thinking output format:
//! `<ply> <score> <time> <nodes> <pv>`
//!
//! Where:
//! - ply: search depth
//! - score: score in centipawns (positive = good for engine)
//! - time: time in centiseconds
//! - nodes: nodes searched
//! - pv: principal variation

use std::fmt;

use crate::position::Position;
use crate::search::SearchProgress;

/// Format a thinking line for `post` mode.
#[must_use]
pub fn format_post<P: Position>(update: &SearchProgress<'_, P>) -> String {
    format!(
        "{} {} {} {} {}",
        update.depth,
        update.score_cp,
        update.elapsed_ms / 10,
        update.stats.nodes,
        update.stats.pv
    )
}

/// Format a move announcement.
#[must_use]
pub fn format_move<M: fmt::Display>(mv: &M) -> String {
    format!("move {mv}")
}

/// Format the feature announcement after protover. Moves travel in
/// coordinate notation, so SAN is declined.
#[must_use]
pub fn format_features() -> String {
    let features = [
        "feature myname=\"chess_control 0.1\"",
        "feature setboard=1",
        "feature ping=1",
        "feature san=0",
        "feature usermove=1",
        "feature time=1",
        "feature playother=1",
        "feature analyze=1",
        "feature sigint=0",
        "feature sigterm=0",
        "feature reuse=1",
        "feature colors=0",
        "feature name=1",
        "feature done=1",
    ];
    features.join("\n")
}

/// Format an error message.
#[must_use]
pub fn format_error(command: &str, message: &str) -> String {
    format!("Error ({message}): {command}")
}

/// Format an illegal move rejection.
#[must_use]
pub fn format_illegal_move(mv: &str) -> String {
    format!("Illegal move: {mv}")
}

/// Format a pong response.
#[must_use]
pub fn format_pong(n: u32) -> String {
    format!("pong {n}")
}

/// Format a hint response.
#[must_use]
pub fn format_hint<M: fmt::Display>(mv: &M) -> String {
    format!("Hint: {mv}")
}
