//! Per-move time budgeting.
//!
//! This module provides a protocol-agnostic time control abstraction
//! that both the UCI and `XBoard` adapters feed; the engine core asks it
//! for a budget whenever it starts a clock-bounded search. Allocation is
//! pure and non-blocking.

/// Fallback pool when neither the clock nor the control supplies one
/// (five minutes).
pub const DEFAULT_BASE_MS: u64 = 300_000;

/// Conservative reserve divisor for sudden-death budgeting: assume this
/// many moves still have to be played from the remaining time.
pub const RESERVE_MOVES: u64 = 30;

/// Time control settings for a game.
///
/// This enum unifies the time control modes of the UCI and `XBoard`
/// protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeControl {
    /// No time control configured.
    #[default]
    None,
    /// Classical tournament control: a session of `moves_per_session`
    /// moves must be played within `base_ms`, then the clock resets.
    Classical {
        moves_per_session: u32,
        base_ms: u64,
        increment_ms: u64,
    },
    /// Whole-game clock with a per-move increment (sudden death when
    /// the increment is zero).
    Incremental { base_ms: u64, increment_ms: u64 },
    /// Fixed maximum time per move, ignoring clock state.
    FixedMax { move_time_ms: u64 },
}

impl TimeControl {
    /// Create a control from the `XBoard` "level" command fields. A
    /// session length of zero means the whole game is played on one
    /// clock, which is the incremental control.
    #[must_use]
    pub fn from_level(moves_per_session: u32, base_ms: u64, increment_ms: u64) -> TimeControl {
        if moves_per_session == 0 {
            TimeControl::Incremental {
                base_ms,
                increment_ms,
            }
        } else {
            TimeControl::Classical {
                moves_per_session,
                base_ms,
                increment_ms,
            }
        }
    }

    /// Create a fixed per-move control (`XBoard` "st", UCI "movetime").
    #[must_use]
    pub fn fixed(move_time_ms: u64) -> TimeControl {
        TimeControl::FixedMax { move_time_ms }
    }

    /// Compute the budget in milliseconds for the next move.
    ///
    /// `remaining_ms` is the engine's clock when known, `moves_to_go` an
    /// explicit protocol-supplied session rest, and `history_len` the
    /// current position-history length (used to locate the move inside
    /// a classical session). The result is always at least 1 ms.
    #[must_use]
    pub fn allocate(
        &self,
        remaining_ms: Option<u64>,
        moves_to_go: Option<u32>,
        history_len: usize,
    ) -> u64 {
        let budget = match *self {
            TimeControl::FixedMax { move_time_ms } => move_time_ms,
            TimeControl::Classical {
                moves_per_session,
                base_ms,
                ..
            } => {
                let mtg = moves_to_go
                    .unwrap_or_else(|| session_moves_to_go(moves_per_session, history_len));
                pool(remaining_ms, base_ms) / u64::from(mtg.max(1))
            }
            TimeControl::Incremental { base_ms, .. } => pool(remaining_ms, base_ms) / RESERVE_MOVES,
            TimeControl::None => {
                let pool = remaining_ms.unwrap_or(DEFAULT_BASE_MS);
                match moves_to_go {
                    Some(mtg) => pool / u64::from(mtg.max(1)),
                    None => pool / RESERVE_MOVES,
                }
            }
        };
        budget.max(1)
    }
}

/// Remaining clock if known, else the configured base, else the default.
fn pool(remaining_ms: Option<u64>, base_ms: u64) -> u64 {
    remaining_ms.unwrap_or(if base_ms > 0 { base_ms } else { DEFAULT_BASE_MS })
}

/// Effective moves-to-go inside the running classical session:
/// `(history_len - 1) mod moves_per_session`, substituting the full
/// session length when the remainder is zero (the position just reached
/// closed a session, so a whole one lies ahead).
fn session_moves_to_go(moves_per_session: u32, history_len: usize) -> u32 {
    if moves_per_session == 0 {
        return 1;
    }
    let rest = (history_len.saturating_sub(1)) as u32 % moves_per_session;
    if rest == 0 {
        moves_per_session
    } else {
        rest
    }
}
