//! Scripted doubles and in-memory IO shared by the integration tests.
#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use chess_control::{
    Color, Position, SearchFacade, SearchLimits, SearchOutcome, SearchProgress, SearchStats,
};

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Upper bound for every blocking wait in the doubles, so a regression
/// hangs a test for seconds instead of forever.
const FAILSAFE: Duration = Duration::from_secs(5);

// ============================================================================
// Position double
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubMove(pub String);

impl StubMove {
    pub fn new(text: &str) -> StubMove {
        StubMove(text.to_string())
    }
}

impl fmt::Display for StubMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A position that accepts any move text except a few scripted ones:
/// moves that stay on their origin square are illegal, and the move
/// "mate" checkmates the side that receives it.
#[derive(Debug, Clone)]
pub struct StubPosition {
    pub fen: String,
    pub moves: Vec<String>,
    pub side: Color,
    pub checkmate: bool,
    pub halfmove: u32,
}

impl Position for StubPosition {
    type Move = StubMove;

    fn startpos() -> Self {
        StubPosition {
            fen: STARTPOS_FEN.to_string(),
            moves: Vec::new(),
            side: Color::White,
            checkmate: false,
            halfmove: 0,
        }
    }

    fn from_fen(fen: &str) -> Option<Self> {
        if fen == "invalid" || fen.split_whitespace().count() < 2 {
            return None;
        }
        let side = if fen.split_whitespace().nth(1) == Some("b") {
            Color::Black
        } else {
            Color::White
        };
        Some(StubPosition {
            fen: fen.to_string(),
            moves: Vec::new(),
            side,
            checkmate: false,
            halfmove: 0,
        })
    }

    fn to_fen(&self) -> String {
        self.fen.clone()
    }

    fn parse_move(&self, text: &str) -> Option<StubMove> {
        if text.is_empty() || text == "null" {
            None
        } else {
            Some(StubMove::new(text))
        }
    }

    fn make_move(&self, mv: &StubMove) -> Option<Self> {
        let bytes = mv.0.as_bytes();
        let null_motion = bytes.len() >= 4 && bytes[..2] == bytes[2..4];
        if mv.0 == "illegal" || null_motion {
            return None;
        }
        let mut next = self.clone();
        next.moves.push(mv.0.clone());
        next.side = self.side.opponent();
        next.halfmove = self.halfmove + 1;
        next.checkmate = mv.0 == "mate";
        Some(next)
    }

    fn in_checkmate(&self) -> bool {
        self.checkmate
    }

    fn in_stalemate(&self) -> bool {
        false
    }

    fn halfmove_clock(&self) -> u32 {
        self.halfmove
    }

    fn side_to_move(&self) -> Color {
        self.side
    }

    fn repetition_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.fen.hash(&mut hasher);
        self.moves.hash(&mut hasher);
        hasher.finish()
    }
}

// ============================================================================
// Search double
// ============================================================================

pub fn outcome(best: &str, ponder: Option<&str>) -> SearchOutcome<StubMove> {
    SearchOutcome {
        best_move: Some(StubMove::new(best)),
        ponder_move: ponder.map(StubMove::new),
    }
}

#[derive(Default)]
struct SearchLog {
    thinks: Vec<SearchLimits<StubMove>>,
    ponders: Vec<Option<StubMove>>,
}

#[derive(Default, Clone, Copy)]
struct StopFlags {
    think: bool,
    ponder: bool,
}

struct StubSearchInner {
    log: Mutex<SearchLog>,
    log_cv: Condvar,
    outcomes: Mutex<VecDeque<SearchOutcome<StubMove>>>,
    stops: Mutex<StopFlags>,
    stop_cv: Condvar,
    /// When set, `think` blocks until `stop_thinking`.
    blocking: AtomicBool,
}

/// A recording search facade. `think` returns the next scripted outcome
/// (or none), optionally blocking until stopped; `ponder` always blocks
/// until stopped, per the facade contract.
#[derive(Clone)]
pub struct StubSearch {
    inner: Arc<StubSearchInner>,
}

impl StubSearch {
    pub fn new() -> StubSearch {
        StubSearch {
            inner: Arc::new(StubSearchInner {
                log: Mutex::new(SearchLog::default()),
                log_cv: Condvar::new(),
                outcomes: Mutex::new(VecDeque::new()),
                stops: Mutex::new(StopFlags::default()),
                stop_cv: Condvar::new(),
                blocking: AtomicBool::new(false),
            }),
        }
    }

    /// Queue the outcome of the next `think` call.
    pub fn script(&self, outcome: SearchOutcome<StubMove>) {
        self.inner.outcomes.lock().push_back(outcome);
    }

    /// Make `think` block until a stop is signaled.
    pub fn set_blocking(&self, on: bool) {
        self.inner.blocking.store(on, Ordering::SeqCst);
    }

    pub fn think_count(&self) -> usize {
        self.inner.log.lock().thinks.len()
    }

    pub fn think_limits(&self, index: usize) -> SearchLimits<StubMove> {
        self.inner.log.lock().thinks[index].clone()
    }

    pub fn ponder_count(&self) -> usize {
        self.inner.log.lock().ponders.len()
    }

    pub fn ponder_predicted(&self, index: usize) -> Option<StubMove> {
        self.inner.log.lock().ponders[index].clone()
    }

    pub fn wait_for_thinks(&self, count: usize, timeout: Duration) -> bool {
        self.wait_on_log(timeout, |log| log.thinks.len() >= count)
    }

    pub fn wait_for_ponders(&self, count: usize, timeout: Duration) -> bool {
        self.wait_on_log(timeout, |log| log.ponders.len() >= count)
    }

    fn wait_on_log(&self, timeout: Duration, done: impl Fn(&SearchLog) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut log = self.inner.log.lock();
        while !done(&log) {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let _ = self.inner.log_cv.wait_for(&mut log, deadline - now);
        }
        true
    }

    fn emit_progress(&self, progress: &mut dyn FnMut(SearchProgress<'_, StubPosition>)) {
        let pv = self
            .inner
            .outcomes
            .lock()
            .front()
            .and_then(|o| o.best_move.clone())
            .map(|m| m.0)
            .unwrap_or_default();
        let stats = SearchStats {
            nodes: 100,
            seldepth: 1,
            nps: 1000,
            hashfull: 0,
            pv,
        };
        progress(SearchProgress {
            depth: 1,
            score_cp: 13,
            elapsed_ms: 30,
            stats: &stats,
            ponder_position: None,
            ponder_move: None,
        });
    }
}

impl SearchFacade for StubSearch {
    type Pos = StubPosition;

    fn think(
        &self,
        _history: &[StubPosition],
        limits: &SearchLimits<StubMove>,
        progress: &mut dyn FnMut(SearchProgress<'_, StubPosition>),
    ) -> SearchOutcome<StubMove> {
        {
            self.inner.log.lock().thinks.push(limits.clone());
        }
        self.inner.log_cv.notify_all();
        self.emit_progress(progress);
        if self.inner.blocking.load(Ordering::SeqCst) {
            let deadline = Instant::now() + FAILSAFE;
            let mut stops = self.inner.stops.lock();
            while !stops.think {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let _ = self.inner.stop_cv.wait_for(&mut stops, deadline - now);
            }
        }
        self.inner.outcomes.lock().pop_front().unwrap_or_default()
    }

    fn ponder(
        &self,
        _history: &[StubPosition],
        predicted: Option<&StubMove>,
        _progress: &mut dyn FnMut(SearchProgress<'_, StubPosition>),
    ) -> SearchOutcome<StubMove> {
        {
            self.inner.log.lock().ponders.push(predicted.cloned());
        }
        self.inner.log_cv.notify_all();
        let deadline = Instant::now() + FAILSAFE;
        let mut stops = self.inner.stops.lock();
        while !stops.ponder {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let _ = self.inner.stop_cv.wait_for(&mut stops, deadline - now);
        }
        SearchOutcome::none()
    }

    fn clear_stop_flags(&self) {
        *self.inner.stops.lock() = StopFlags::default();
    }

    fn stop_thinking(&self) {
        self.inner.stops.lock().think = true;
        self.inner.stop_cv.notify_all();
    }

    fn stop_pondering(&self) {
        self.inner.stops.lock().ponder = true;
        self.inner.stop_cv.notify_all();
    }
}

/// Poll a condition until it holds or the timeout passes.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// ============================================================================
// In-memory IO
// ============================================================================

/// A clonable output sink the adapters can write to while the test
/// inspects it.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn new() -> SharedBuf {
        SharedBuf::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn wait_for(&self, needle: &str, timeout: Duration) -> bool {
        let needle = needle.to_string();
        let buf = self.clone();
        wait_until(timeout, move || buf.contents().contains(&needle))
    }
}

impl Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct PipeState {
    buf: VecDeque<u8>,
    closed: bool,
}

struct PipeInner {
    state: Mutex<PipeState>,
    ready: Condvar,
}

/// Write half of an in-memory pipe; dropping it signals end of input.
pub struct PipeWriter {
    inner: Arc<PipeInner>,
}

/// Blocking read half of an in-memory pipe.
pub struct PipeReader {
    inner: Arc<PipeInner>,
}

/// A blocking in-memory byte pipe, standing in for the stdin pipe a GUI
/// would hold open.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let inner = Arc::new(PipeInner {
        state: Mutex::new(PipeState {
            buf: VecDeque::new(),
            closed: false,
        }),
        ready: Condvar::new(),
    });
    (
        PipeWriter {
            inner: Arc::clone(&inner),
        },
        PipeReader { inner },
    )
}

impl PipeWriter {
    /// Send one command line.
    pub fn send_line(&mut self, line: &str) {
        let _ = writeln!(self, "{line}");
    }
}

impl Write for PipeWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.inner.state.lock();
        state.buf.extend(data);
        self.inner.ready.notify_all();
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        self.inner.state.lock().closed = true;
        self.inner.ready.notify_all();
    }
}

impl Read for PipeReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let mut state = self.inner.state.lock();
        loop {
            if !state.buf.is_empty() {
                let mut copied = 0;
                while copied < out.len() {
                    let Some(byte) = state.buf.pop_front() else {
                        break;
                    };
                    out[copied] = byte;
                    copied += 1;
                }
                return Ok(copied);
            }
            if state.closed {
                return Ok(0);
            }
            let timed_out = self
                .inner
                .ready
                .wait_for(&mut state, FAILSAFE)
                .timed_out();
            if timed_out {
                return Ok(0);
            }
        }
    }
}
