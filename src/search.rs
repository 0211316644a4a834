//! Search facade.
//!
//! The search algorithm (iterative deepening, transposition tables, move
//! ordering) lives outside this crate. The worker thread drives it
//! through [`SearchFacade`], the only long-blocking call in the system.
//!
//! Cooperative cancellation is a liveness contract on the facade: once
//! `stop_thinking`/`stop_pondering` is signaled, `think`/`ponder` must
//! return promptly. The engine core cannot force a non-cooperating
//! search to stop.

use crate::position::Position;
use std::fmt;

/// Bounds for a single search, snapshotted when the search command is
/// posted and immutable for the search's duration. `None` means
/// unbounded in that dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchLimits<M> {
    /// Maximum depth in plies.
    pub depth: Option<u32>,
    /// Time budget in milliseconds.
    pub budget_ms: Option<u64>,
    /// Maximum nodes to visit.
    pub nodes: Option<u64>,
    /// Stop as soon as a mate in this many moves is proven.
    pub mate_in: Option<u32>,
    /// Restrict the root to these moves only.
    pub searchmoves: Option<Vec<M>>,
}

impl<M> Default for SearchLimits<M> {
    fn default() -> Self {
        SearchLimits {
            depth: None,
            budget_ms: None,
            nodes: None,
            mate_in: None,
            searchmoves: None,
        }
    }
}

impl<M> SearchLimits<M> {
    /// Limits with every dimension unbounded (analysis, pondering).
    #[must_use]
    pub fn unbounded() -> Self {
        SearchLimits::default()
    }

    /// Limits bounded only by a time budget.
    #[must_use]
    pub fn timed(budget_ms: u64) -> Self {
        SearchLimits {
            budget_ms: Some(budget_ms),
            ..SearchLimits::default()
        }
    }

    /// True when no dimension is bounded.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.depth.is_none()
            && self.budget_ms.is_none()
            && self.nodes.is_none()
            && self.mate_in.is_none()
            && self.searchmoves.is_none()
    }
}

/// What a finished search hands back: the move to play and the expected
/// opponent reply, either of which may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome<M> {
    /// The best move found.
    pub best_move: Option<M>,
    /// The expected opponent reply (for pondering).
    pub ponder_move: Option<M>,
}

impl<M> Default for SearchOutcome<M> {
    fn default() -> Self {
        SearchOutcome {
            best_move: None,
            ponder_move: None,
        }
    }
}

impl<M> SearchOutcome<M> {
    /// An outcome with no move, e.g. a search stopped before depth 1.
    #[must_use]
    pub fn none() -> Self {
        SearchOutcome::default()
    }
}

/// Counters a search reports alongside each progress update.
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    pub nodes: u64,
    pub seldepth: u32,
    pub nps: u64,
    pub hashfull: u32,
    pub pv: String,
}

/// A single progress update from a running search.
pub struct SearchProgress<'a, P: Position> {
    /// Completed iteration depth.
    pub depth: u32,
    /// Score in centipawns from the searching side's view.
    pub score_cp: i32,
    /// Milliseconds since the search started.
    pub elapsed_ms: u64,
    pub stats: &'a SearchStats,
    /// The position being pondered on, when this update comes from a
    /// speculative search.
    pub ponder_position: Option<&'a P>,
    /// The predicted move the speculative search assumed.
    pub ponder_move: Option<&'a <P as Position>::Move>,
}

// `derive(Debug)` cannot be used here: it would require `P: Debug` but not
// `<P as Position>::Move: Debug`, so it fails to type-check on the
// `ponder_move` field. This manual impl is what a correct derive would
// produce, adding the associated-type bound the derive omits.
impl<'a, P: Position> fmt::Debug for SearchProgress<'a, P>
where
    P: fmt::Debug,
    <P as Position>::Move: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchProgress")
            .field("depth", &self.depth)
            .field("score_cp", &self.score_cp)
            .field("elapsed_ms", &self.elapsed_ms)
            .field("stats", &self.stats)
            .field("ponder_position", &self.ponder_position)
            .field("ponder_move", &self.ponder_move)
            .finish()
    }
}

/// Blocking interface to the external search.
///
/// Exactly one thread (the engine worker) calls `think`/`ponder`; the
/// stop and flag methods may be called from any thread at any time and
/// are idempotent even when nothing is running.
pub trait SearchFacade: Send + Sync + 'static {
    type Pos: Position;

    /// Search the last position of `history` within `limits`. Returns
    /// when a limit is hit or `stop_thinking` is signaled.
    fn think(
        &self,
        history: &[Self::Pos],
        limits: &SearchLimits<<Self::Pos as Position>::Move>,
        progress: &mut dyn FnMut(SearchProgress<'_, Self::Pos>),
    ) -> SearchOutcome<<Self::Pos as Position>::Move>;

    /// Speculative search during the opponent's time, optionally on the
    /// position after `predicted`. Unbounded; returns only once
    /// `stop_pondering` is signaled.
    fn ponder(
        &self,
        history: &[Self::Pos],
        predicted: Option<&<Self::Pos as Position>::Move>,
        progress: &mut dyn FnMut(SearchProgress<'_, Self::Pos>),
    ) -> SearchOutcome<<Self::Pos as Position>::Move>;

    /// Reset both stop flags before a new search starts.
    fn clear_stop_flags(&self);

    /// Ask a running `think` to return promptly.
    fn stop_thinking(&self);

    /// Ask a running `ponder` to return promptly.
    fn stop_pondering(&self);
}
