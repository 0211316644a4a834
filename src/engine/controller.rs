//! Engine controller implementation.
//!
//! Two actors share an [`Engine`]: the protocol thread, which may call
//! any public operation at any time, and one persistent worker thread,
//! the sole caller into the search facade. They meet at a single-slot
//! command cell: posting a command overwrites an unconsumed older one
//! (last write wins, deliberately not a queue), and a condvar wakes the
//! worker.
//!
//! State is split across five independently locked domains so that
//! configuration changes never block on an in-progress search:
//! primary (history, mode, result, pending command), hint move, limits,
//! flags, and a cached copy of the current position for low-contention
//! reads. No operation holds two domain locks at once except to copy a
//! value from one into another, which rules out deadlock by
//! construction. The only long-blocking call in the system is the
//! worker's synchronous call into the search facade; operations that
//! must preempt it signal the facade's stop flags and never touch the
//! worker thread itself.

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, trace, warn};
use parking_lot::{Condvar, Mutex};

use crate::engine::hooks::EngineHooks;
use crate::engine::time::TimeControl;
use crate::position::{Color, Position};
use crate::result::{self, GameResult, ResultCode};
use crate::search::{SearchFacade, SearchLimits, SearchOutcome, SearchProgress};

type MoveOf<S> = <<S as SearchFacade>::Pos as Position>::Move;

/// Error type for engine operations. Failed operations leave the engine
/// unchanged, except for the documented optimistic hint discard and the
/// partial replay of `set_board_and_make_moves`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The selector declined or the proposed move is not legal.
    IllegalMove,
    /// A mutating operation was attempted after a terminal result.
    AlreadyConcluded,
    /// Undo/remove past the start of the recorded history.
    InsufficientHistory,
    /// An externally supplied position was malformed.
    InvalidPosition,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::IllegalMove => write!(f, "move is not legal in the current position"),
            EngineError::AlreadyConcluded => write!(f, "the game has already concluded"),
            EngineError::InsufficientHistory => write!(f, "not enough moves to take back"),
            EngineError::InvalidPosition => write!(f, "invalid position"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Game-mode state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// Normal play: an accepted move triggers a reply search.
    Game,
    /// Moves are recorded without ever triggering a search.
    Force,
    /// Continuous non-playing search on the current position.
    Analysis,
}

/// Explicit limits for a protocol-specified search (the UCI "go"
/// arguments). Absent fields fall back to the configured time control
/// and stored limits.
#[derive(Debug, Clone, Default)]
pub struct GoParams {
    /// Restrict the root to these moves (wire notation).
    pub searchmoves: Option<Vec<String>>,
    /// Start a speculative search instead of a normal one.
    pub ponder: bool,
    pub wtime_ms: Option<u64>,
    pub btime_ms: Option<u64>,
    pub winc_ms: Option<u64>,
    pub binc_ms: Option<u64>,
    pub movestogo: Option<u32>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub mate_in: Option<u32>,
    pub movetime_ms: Option<u64>,
    pub infinite: bool,
}

/// The single-slot command cell. Not a queue: a newer value replaces an
/// older, unconsumed one. `Think` carries the limits snapshot so the
/// snapshot is replaced atomically with the command itself.
enum Pending<M> {
    None,
    Think(SearchLimits<M>),
    Ponder,
    Quit,
}

/// Domain 1: history, mode, result and the command cell.
struct PrimaryState<P: Position> {
    history: Vec<P>,
    mode: GameMode,
    previous_mode: GameMode,
    result: GameResult,
    pending: Pending<P::Move>,
    /// Bumped on every history mutation; lets the worker detect that a
    /// finished search no longer matches the game it was started for.
    generation: u64,
}

impl<P: Position> PrimaryState<P> {
    fn current(&self) -> &P {
        self.history.last().expect("history is never empty")
    }
}

/// Domain 3: time control and stored clock state.
#[derive(Debug, Clone, Copy, Default)]
struct LimitsState {
    time_control: TimeControl,
    engine_remaining_ms: Option<u64>,
    opponent_remaining_ms: Option<u64>,
    moves_to_go: Option<u32>,
    depth_limit: Option<u32>,
}

/// Domain 4: behavior toggles.
#[derive(Debug, Clone, Copy)]
struct FlagState {
    auto_ponder: bool,
    auto_play: bool,
    show_thinking: bool,
}

impl Default for FlagState {
    fn default() -> Self {
        FlagState {
            auto_ponder: false,
            auto_play: true,
            show_thinking: false,
        }
    }
}

struct Shared<S: SearchFacade> {
    search: S,
    primary: Mutex<PrimaryState<S::Pos>>,
    wake: Condvar,
    /// Domain 2: the predicted opponent reply, if any.
    hint: Mutex<Option<MoveOf<S>>>,
    limits: Mutex<LimitsState>,
    flags: Mutex<FlagState>,
    /// Domain 5: duplicate of the current position for reporting code.
    cached: Mutex<S::Pos>,
    hooks: EngineHooks<S::Pos>,
}

/// The engine control core.
///
/// Owns the game history, the mode state machine and the worker thread;
/// every public method may be called from the protocol thread while a
/// search is running.
pub struct Engine<S: SearchFacade> {
    shared: Arc<Shared<S>>,
    worker: Option<JoinHandle<()>>,
}

impl<S: SearchFacade> Engine<S> {
    /// Create an engine around a search facade and start its worker
    /// thread. The worker lives until [`Engine::shutdown`] (or drop).
    #[must_use]
    pub fn new(search: S) -> Self {
        let start = S::Pos::startpos();
        let shared = Arc::new(Shared {
            search,
            primary: Mutex::new(PrimaryState {
                history: vec![start.clone()],
                mode: GameMode::Game,
                previous_mode: GameMode::Game,
                result: GameResult::none(),
                pending: Pending::None,
                generation: 0,
            }),
            wake: Condvar::new(),
            hint: Mutex::new(None),
            limits: Mutex::new(LimitsState::default()),
            flags: Mutex::new(FlagState::default()),
            cached: Mutex::new(start),
            hooks: EngineHooks::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("engine-worker".to_string())
            .spawn(move || worker_loop(&worker_shared))
            .expect("failed to spawn engine worker thread");
        Engine {
            shared,
            worker: Some(worker),
        }
    }

    // ========================================================================
    // Game mutation
    // ========================================================================

    /// Start a new game: stop any search, reset the history to the
    /// initial position, clear the result and fire board-changed.
    pub fn new_game(&self) {
        self.cancel_searches();
        *self.shared.hint.lock() = None;
        let position = {
            let mut primary = self.shared.primary.lock();
            primary.history.clear();
            primary.history.push(S::Pos::startpos());
            primary.result = GameResult::none();
            primary.generation += 1;
            primary.current().clone()
        };
        self.refresh_cached(&position);
        self.shared.hooks.fire_board_changed(&position);
    }

    /// Commit the move proposed by `selector` for the current position.
    ///
    /// On success the move is appended to the history, board-changed
    /// fires and the result is recomputed. If the game goes on and the
    /// mode is not `Force`, a reply search starts: a clock-budgeted one
    /// in `Game` mode (discarding a stale hint unless it matches the
    /// move just played), a fresh unbounded one in `Analysis` mode. If
    /// the game concluded, the result callback fires instead.
    pub fn make_move<F>(&self, selector: F) -> Result<(), EngineError>
    where
        F: FnOnce(&S::Pos) -> Option<MoveOf<S>>,
    {
        let (position, mv, result, mode) = {
            let mut primary = self.shared.primary.lock();
            if primary.result.is_concluded() {
                return Err(EngineError::AlreadyConcluded);
            }
            let (mv, next) = {
                let current = primary.current();
                let mv = selector(current).ok_or(EngineError::IllegalMove)?;
                let next = current.make_move(&mv).ok_or(EngineError::IllegalMove)?;
                (mv, next)
            };
            primary.history.push(next.clone());
            primary.generation += 1;
            primary.result = result::evaluate(&primary.history);
            (next, mv, primary.result.clone(), primary.mode)
        };
        self.refresh_cached(&position);
        self.shared.hooks.fire_board_changed(&position);

        if result.is_concluded() {
            self.shared.hooks.fire_result(&result);
            return Ok(());
        }
        match mode {
            GameMode::Force => {}
            GameMode::Analysis => self.start_think(SearchLimits::unbounded()),
            GameMode::Game => {
                {
                    let mut hint = self.shared.hint.lock();
                    if hint.as_ref().is_some_and(|h| *h != mv) {
                        *hint = None;
                    }
                }
                let limits = self.full_budget_limits();
                self.start_think(limits);
            }
        }
        Ok(())
    }

    /// Take back one ply. Discards any pending hint first.
    pub fn undo(&self) -> Result<(), EngineError> {
        *self.shared.hint.lock() = None;
        let (position, mode) = {
            let mut primary = self.shared.primary.lock();
            if primary.result.is_concluded() {
                return Err(EngineError::AlreadyConcluded);
            }
            if primary.history.len() < 2 {
                return Err(EngineError::InsufficientHistory);
            }
            primary.history.pop();
            primary.generation += 1;
            primary.result = result::evaluate(&primary.history);
            (primary.current().clone(), primary.mode)
        };
        self.refresh_cached(&position);
        self.shared.hooks.fire_board_changed(&position);
        if mode == GameMode::Analysis {
            self.start_think(SearchLimits::unbounded());
        }
        Ok(())
    }

    /// Take back a full round (two plies), for retracting a move when
    /// playing against the engine.
    pub fn remove(&self) -> Result<(), EngineError> {
        *self.shared.hint.lock() = None;
        let (position, mode) = {
            let mut primary = self.shared.primary.lock();
            if primary.result.is_concluded() {
                return Err(EngineError::AlreadyConcluded);
            }
            if primary.history.len() < 3 {
                return Err(EngineError::InsufficientHistory);
            }
            primary.history.pop();
            primary.history.pop();
            primary.generation += 1;
            primary.result = result::evaluate(&primary.history);
            (primary.current().clone(), primary.mode)
        };
        self.refresh_cached(&position);
        self.shared.hooks.fire_board_changed(&position);
        if mode == GameMode::Analysis {
            self.start_think(SearchLimits::unbounded());
        }
        Ok(())
    }

    /// Replace the whole history with a selector-supplied position.
    pub fn set_board<F>(&self, selector: F) -> Result<(), EngineError>
    where
        F: FnOnce() -> Option<S::Pos>,
    {
        self.set_board_and_make_moves(selector, &[] as &[&str])
    }

    /// Replace the whole history with a selector-supplied position,
    /// then replay `moves` ply by ply.
    ///
    /// The first unparsable or illegal move aborts the operation with
    /// `IllegalMove`, leaving the history at the position reached so
    /// far; the result is recomputed after every applied ply and a
    /// terminal result halts the replay. Board-changed fires once at
    /// the end. A selector failure yields `InvalidPosition` without
    /// touching the history (the hint discard is optimistic and is not
    /// rolled back).
    pub fn set_board_and_make_moves<F, T>(&self, selector: F, moves: &[T]) -> Result<(), EngineError>
    where
        F: FnOnce() -> Option<S::Pos>,
        T: AsRef<str>,
    {
        self.cancel_searches();
        *self.shared.hint.lock() = None;
        let Some(start) = selector() else {
            return Err(EngineError::InvalidPosition);
        };
        let mut replay = Ok(());
        let (position, result, mode) = {
            let mut primary = self.shared.primary.lock();
            primary.history.clear();
            primary.history.push(start);
            primary.generation += 1;
            primary.result = result::evaluate(&primary.history);
            for text in moves {
                if primary.result.is_concluded() {
                    break;
                }
                let next = {
                    let current = primary.current();
                    current
                        .parse_move(text.as_ref())
                        .and_then(|mv| current.make_move(&mv))
                };
                let Some(next) = next else {
                    replay = Err(EngineError::IllegalMove);
                    break;
                };
                primary.history.push(next);
                primary.generation += 1;
                primary.result = result::evaluate(&primary.history);
            }
            (primary.current().clone(), primary.result.clone(), primary.mode)
        };
        self.refresh_cached(&position);
        self.shared.hooks.fire_board_changed(&position);
        if result.is_concluded() {
            self.shared.hooks.fire_result(&result);
        } else if mode == GameMode::Analysis {
            self.start_think(SearchLimits::unbounded());
        }
        replay
    }

    /// Record a game outcome reported from outside (the legacy `result`
    /// command). Stops any search and makes the result terminal.
    pub fn set_result(&self, code: ResultCode, comment: &str) {
        self.cancel_searches();
        self.shared.primary.lock().result = GameResult::new(code, comment);
    }

    // ========================================================================
    // Mode control
    // ========================================================================

    /// Enter force mode: moves are recorded but never answered.
    pub fn set_force_mode(&self) {
        self.cancel_searches();
        self.shared.primary.lock().mode = GameMode::Force;
    }

    /// Enter analysis mode and start an unbounded non-playing search,
    /// unless the result is already terminal. Re-entering analysis is a
    /// no-op so the remembered previous mode survives.
    pub fn analyze(&self) {
        let start = {
            let mut primary = self.shared.primary.lock();
            if primary.mode == GameMode::Analysis {
                return;
            }
            primary.previous_mode = primary.mode;
            primary.mode = GameMode::Analysis;
            !primary.result.is_concluded()
        };
        if start {
            self.start_think(SearchLimits::unbounded());
        }
    }

    /// Leave analysis mode: stop the search and restore the mode that
    /// was active before [`Engine::analyze`].
    pub fn quit_from_analysis(&self) {
        self.cancel_searches();
        let mut primary = self.shared.primary.lock();
        if primary.mode == GameMode::Analysis {
            primary.mode = primary.previous_mode;
        }
    }

    /// Switch to game mode without making a move; the opponent is about
    /// to move. Starts a speculative search when auto-pondering is on.
    pub fn play_other(&self) {
        let concluded = {
            let mut primary = self.shared.primary.lock();
            if primary.result.is_concluded() {
                true
            } else {
                primary.mode = GameMode::Game;
                false
            }
        };
        if concluded {
            return;
        }
        if self.shared.flags.lock().auto_ponder {
            self.start_ponder();
        }
    }

    // ========================================================================
    // Search control
    // ========================================================================

    /// Switch to game mode, discard stale hints and start a
    /// clock-budgeted search. No-op when the result is terminal: the
    /// command cell is left unchanged and no search starts.
    pub fn go(&self) {
        {
            let mut primary = self.shared.primary.lock();
            if primary.result.is_concluded() {
                return;
            }
            primary.mode = GameMode::Game;
        }
        *self.shared.hint.lock() = None;
        let limits = self.clock_limits();
        self.start_think(limits);
    }

    /// Start a search with protocol-specified explicit limits, which
    /// override the time-control-derived budget. No-op when the result
    /// is terminal.
    pub fn go_explicit(&self, params: GoParams) {
        let side = {
            let primary = self.shared.primary.lock();
            if primary.result.is_concluded() {
                return;
            }
            primary.current().side_to_move()
        };
        let (engine_clock, opponent_clock) = match side {
            Color::White => (params.wtime_ms, params.btime_ms),
            Color::Black => (params.btime_ms, params.wtime_ms),
        };
        let (control, remaining, stored_depth) = {
            let mut limits = self.shared.limits.lock();
            if let Some(ms) = engine_clock {
                limits.engine_remaining_ms = Some(ms);
            }
            if let Some(ms) = opponent_clock {
                limits.opponent_remaining_ms = Some(ms);
            }
            limits.moves_to_go = params.movestogo;
            (limits.time_control, limits.engine_remaining_ms, limits.depth_limit)
        };
        let history_len = self.shared.primary.lock().history.len();
        let searchmoves = params
            .searchmoves
            .as_ref()
            .map(|texts| {
                let position = self.current_position();
                texts
                    .iter()
                    .filter_map(|text| position.parse_move(text))
                    .collect::<Vec<_>>()
            })
            .filter(|set| !set.is_empty());
        let budget_ms = if params.infinite {
            None
        } else if let Some(ms) = params.movetime_ms {
            Some(ms.max(1))
        } else if remaining.is_some() {
            Some(control.allocate(remaining, params.movestogo, history_len))
        } else if params.depth.is_some() || params.nodes.is_some() || params.mate_in.is_some() {
            None
        } else {
            Some(control.allocate(None, params.movestogo, history_len))
        };
        let limits = SearchLimits {
            depth: params.depth.or(stored_depth),
            budget_ms,
            nodes: params.nodes,
            mate_in: params.mate_in,
            searchmoves,
        };
        self.shared.primary.lock().mode = GameMode::Game;
        if params.ponder {
            self.start_ponder();
        } else {
            *self.shared.hint.lock() = None;
            self.start_think(limits);
        }
    }

    /// The predicted opponent move actually occurred: promote the
    /// running ponder into a normal search with the current limits.
    /// With no ponder active this simply posts a think command.
    pub fn pondering_hit(&self) {
        let limits = self.clock_limits();
        self.shared.search.stop_pondering();
        self.post_command(Pending::Think(limits));
    }

    /// Forward a cooperative stop to the search facade. Idempotent.
    pub fn stop_thinking(&self) {
        self.shared.search.stop_thinking();
    }

    /// Forward a cooperative stop to the ponder search. Idempotent.
    pub fn stop_pondering(&self) {
        self.shared.search.stop_pondering();
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Configure a session time control (`level`). A session length of
    /// zero selects the incremental control.
    pub fn set_level(&self, moves_per_session: u32, base_ms: u64, increment_ms: u64) {
        self.shared.limits.lock().time_control =
            TimeControl::from_level(moves_per_session, base_ms, increment_ms);
    }

    /// Configure a fixed maximum time per move (`st`).
    pub fn set_move_time(&self, move_time_ms: u64) {
        self.shared.limits.lock().time_control = TimeControl::fixed(move_time_ms);
    }

    /// Bound the depth of explicitly started searches (`sd`).
    pub fn set_depth(&self, depth: u32) {
        self.shared.limits.lock().depth_limit = Some(depth);
    }

    /// Update the engine's remaining clock (`time`).
    pub fn set_remaining_engine_time(&self, ms: u64) {
        self.shared.limits.lock().engine_remaining_ms = Some(ms);
    }

    /// Update the opponent's remaining clock (`otim`).
    pub fn set_remaining_opponent_time(&self, ms: u64) {
        self.shared.limits.lock().opponent_remaining_ms = Some(ms);
    }

    /// Enable speculative search on the opponent's time (`hard`/`easy`).
    pub fn set_auto_ponder(&self, on: bool) {
        self.shared.flags.lock().auto_ponder = on;
    }

    /// Whether the engine applies its own found move to the history.
    /// The legacy protocol plays its move; under UCI the GUI does.
    pub fn set_auto_play(&self, on: bool) {
        self.shared.flags.lock().auto_play = on;
    }

    /// Whether search progress is forwarded to the progress hook
    /// (`post`/`nopost`).
    pub fn set_show_thinking(&self, on: bool) {
        self.shared.flags.lock().show_thinking = on;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The current ponder suggestion, if one is pending.
    #[must_use]
    pub fn get_hint_move(&self) -> Option<MoveOf<S>> {
        self.shared.hint.lock().clone()
    }

    /// A copy of the current position, read from the low-contention
    /// cache domain.
    #[must_use]
    pub fn current_position(&self) -> S::Pos {
        self.shared.cached.lock().clone()
    }

    /// Number of positions in the history (starting position included).
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.shared.primary.lock().history.len()
    }

    #[must_use]
    pub fn mode(&self) -> GameMode {
        self.shared.primary.lock().mode
    }

    #[must_use]
    pub fn result(&self) -> GameResult {
        self.shared.primary.lock().result.clone()
    }

    /// Remaining clocks as last reported: (engine, opponent).
    #[must_use]
    pub fn remaining_times(&self) -> (Option<u64>, Option<u64>) {
        let limits = self.shared.limits.lock();
        (limits.engine_remaining_ms, limits.opponent_remaining_ms)
    }

    /// The replaceable output hooks.
    #[must_use]
    pub fn hooks(&self) -> &EngineHooks<S::Pos> {
        &self.shared.hooks
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Post a quit command, stop any running search and join the worker
    /// thread. Idempotent; also run on drop.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.shared.primary.lock().pending = Pending::Quit;
        self.shared.wake.notify_one();
        self.shared.search.stop_thinking();
        self.shared.search.stop_pondering();
        let _ = worker.join();
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn refresh_cached(&self, position: &S::Pos) {
        *self.shared.cached.lock() = position.clone();
    }

    /// Overwrite the command cell and wake the worker. Callers that
    /// preempt a running search signal the facade's stop flags before
    /// calling this, never after: a stop issued after the write could
    /// land on the search this very command starts.
    fn post_command(&self, command: Pending<MoveOf<S>>) {
        {
            let mut primary = self.shared.primary.lock();
            if matches!(primary.pending, Pending::Quit) {
                return;
            }
            primary.pending = command;
        }
        self.shared.wake.notify_one();
    }

    fn start_think(&self, limits: SearchLimits<MoveOf<S>>) {
        self.shared.search.stop_thinking();
        self.shared.search.stop_pondering();
        self.post_command(Pending::Think(limits));
    }

    fn start_ponder(&self) {
        self.shared.search.stop_thinking();
        self.shared.search.stop_pondering();
        self.post_command(Pending::Ponder);
    }

    /// Stop whatever runs and clear any queued search command.
    fn cancel_searches(&self) {
        self.shared.search.stop_thinking();
        self.shared.search.stop_pondering();
        let mut primary = self.shared.primary.lock();
        if matches!(primary.pending, Pending::Think(_) | Pending::Ponder) {
            primary.pending = Pending::None;
        }
    }

    /// Limits for a reply search triggered by an accepted move: time
    /// from the allocator, everything else unbounded.
    fn full_budget_limits(&self) -> SearchLimits<MoveOf<S>> {
        let (control, remaining) = {
            let limits = self.shared.limits.lock();
            (limits.time_control, limits.engine_remaining_ms)
        };
        let history_len = self.shared.primary.lock().history.len();
        SearchLimits::timed(control.allocate(remaining, None, history_len))
    }

    /// Limits for an explicitly started clock search: allocator budget
    /// plus the stored depth bound and moves-to-go.
    fn clock_limits(&self) -> SearchLimits<MoveOf<S>> {
        let (control, remaining, moves_to_go, depth) = {
            let limits = self.shared.limits.lock();
            (
                limits.time_control,
                limits.engine_remaining_ms,
                limits.moves_to_go,
                limits.depth_limit,
            )
        };
        let history_len = self.shared.primary.lock().history.len();
        SearchLimits {
            depth,
            budget_ms: Some(control.allocate(remaining, moves_to_go, history_len)),
            ..SearchLimits::default()
        }
    }
}

impl<S: SearchFacade> Drop for Engine<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Worker thread
// ============================================================================

fn worker_loop<S: SearchFacade>(shared: &Shared<S>) {
    loop {
        let command = {
            let mut primary = shared.primary.lock();
            while matches!(primary.pending, Pending::None) {
                shared.wake.wait(&mut primary);
            }
            mem::replace(&mut primary.pending, Pending::None)
        };
        match command {
            Pending::None => {}
            Pending::Quit => {
                debug!("worker: quit");
                break;
            }
            Pending::Think(limits) => run_think(shared, &limits),
            Pending::Ponder => run_ponder(shared),
        }
    }
}

/// True when a command was posted after this search was taken out of
/// the cell; the superseded search must not start.
fn superseded<S: SearchFacade>(shared: &Shared<S>) -> bool {
    !matches!(shared.primary.lock().pending, Pending::None)
}

fn run_think<S: SearchFacade>(shared: &Shared<S>, limits: &SearchLimits<MoveOf<S>>) {
    shared.search.clear_stop_flags();
    let (history, generation) = {
        let primary = shared.primary.lock();
        (primary.history.clone(), primary.generation)
    };
    if superseded(shared) {
        trace!("worker: think superseded before it started");
        return;
    }
    let mut progress = |update: SearchProgress<'_, S::Pos>| {
        let show = shared.flags.lock().show_thinking;
        if show {
            shared.hooks.fire_progress(update);
        }
    };
    let outcome = shared.search.think(&history, limits, &mut progress);
    finish_think(shared, generation, outcome);
}

fn run_ponder<S: SearchFacade>(shared: &Shared<S>) {
    shared.search.clear_stop_flags();
    let history = shared.primary.lock().history.clone();
    let predicted = shared.hint.lock().clone();
    if superseded(shared) {
        trace!("worker: ponder superseded before it started");
        return;
    }
    let mut progress = |update: SearchProgress<'_, S::Pos>| {
        let show = shared.flags.lock().show_thinking;
        if show {
            shared.hooks.fire_progress(update);
        }
    };
    let _ = shared.search.ponder(&history, predicted.as_ref(), &mut progress);
    trace!("worker: ponder finished");
}

fn finish_think<S: SearchFacade>(
    shared: &Shared<S>,
    generation: u64,
    outcome: SearchOutcome<MoveOf<S>>,
) {
    let (mode, stale, before) = {
        let primary = shared.primary.lock();
        (
            primary.mode,
            primary.generation != generation,
            primary.current().clone(),
        )
    };
    if stale {
        debug!("worker: discarding outcome of a stale search");
        return;
    }
    let Some(best) = outcome.best_move else {
        trace!("worker: search finished without a move");
        return;
    };
    *shared.hint.lock() = outcome.ponder_move.clone();
    if mode == GameMode::Analysis {
        return;
    }
    shared.hooks.fire_move_made(&before, &best, outcome.ponder_move.as_ref());

    let flags = *shared.flags.lock();
    if !flags.auto_play {
        return;
    }
    // Apply the found move the way make_move would; the generation
    // re-check under the lock closes the race with a concurrent
    // history mutation.
    let committed = {
        let mut primary = shared.primary.lock();
        if primary.generation != generation || primary.result.is_concluded() {
            None
        } else {
            match primary.current().make_move(&best) {
                Some(next) => {
                    primary.history.push(next.clone());
                    primary.generation += 1;
                    primary.result = result::evaluate(&primary.history);
                    Some((next, primary.result.clone()))
                }
                None => {
                    warn!("worker: search produced a move the position rejects");
                    None
                }
            }
        }
    };
    let Some((position, result)) = committed else {
        return;
    };
    *shared.cached.lock() = position.clone();
    shared.hooks.fire_board_changed(&position);
    if result.is_concluded() {
        shared.hooks.fire_result(&result);
    } else if flags.auto_ponder {
        let mut primary = shared.primary.lock();
        if matches!(primary.pending, Pending::None) {
            primary.pending = Pending::Ponder;
        }
    }
}
