//! Replaceable output callbacks.
//!
//! The engine core reports through four independently replaceable
//! hooks: search progress, a move decided by the engine, a recorded
//! game result, and a changed board. Hooks may be invoked from either
//! the protocol thread or the worker thread; they must serialize their
//! own output, should not block, and must not call back into the engine
//! synchronously.
//!
//! The set is guarded by its own leaf lock. Firing clones the hook out
//! of the set first, so no lock is held while a callback runs and
//! replacing a hook never races a call in progress.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::position::Position;
use crate::result::GameResult;
use crate::search::SearchProgress;

pub type ProgressFn<P> = dyn for<'a> Fn(SearchProgress<'a, P>) + Send + Sync;
pub type MoveMadeFn<P> =
    dyn Fn(&P, &<P as Position>::Move, Option<&<P as Position>::Move>) + Send + Sync;
pub type ResultFn = dyn Fn(&GameResult) + Send + Sync;
pub type BoardChangedFn<P> = dyn Fn(&P) + Send + Sync;

struct HookSet<P: Position> {
    progress: Option<Arc<ProgressFn<P>>>,
    move_made: Option<Arc<MoveMadeFn<P>>>,
    result: Option<Arc<ResultFn>>,
    board_changed: Option<Arc<BoardChangedFn<P>>>,
}

/// The four output hooks of an engine.
pub struct EngineHooks<P: Position> {
    inner: Mutex<HookSet<P>>,
}

impl<P: Position> EngineHooks<P> {
    #[must_use]
    pub fn new() -> Self {
        EngineHooks {
            inner: Mutex::new(HookSet {
                progress: None,
                move_made: None,
                result: None,
                board_changed: None,
            }),
        }
    }

    /// Replace the progress hook.
    pub fn set_progress<F>(&self, hook: F)
    where
        F: for<'a> Fn(SearchProgress<'a, P>) + Send + Sync + 'static,
    {
        self.inner.lock().progress = Some(Arc::new(hook));
    }

    /// Replace the move-made hook.
    pub fn set_move_made<F>(&self, hook: F)
    where
        F: Fn(&P, &P::Move, Option<&P::Move>) + Send + Sync + 'static,
    {
        self.inner.lock().move_made = Some(Arc::new(hook));
    }

    /// Replace the result hook.
    pub fn set_result<F>(&self, hook: F)
    where
        F: Fn(&GameResult) + Send + Sync + 'static,
    {
        self.inner.lock().result = Some(Arc::new(hook));
    }

    /// Replace the board-changed hook.
    pub fn set_board_changed<F>(&self, hook: F)
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.inner.lock().board_changed = Some(Arc::new(hook));
    }

    pub(crate) fn fire_progress(&self, update: SearchProgress<'_, P>) {
        let hook = self.inner.lock().progress.clone();
        if let Some(hook) = hook {
            hook(update);
        }
    }

    pub(crate) fn fire_move_made(&self, position: &P, mv: &P::Move, ponder: Option<&P::Move>) {
        let hook = self.inner.lock().move_made.clone();
        if let Some(hook) = hook {
            hook(position, mv, ponder);
        }
    }

    pub(crate) fn fire_result(&self, result: &GameResult) {
        let hook = self.inner.lock().result.clone();
        if let Some(hook) = hook {
            hook(result);
        }
    }

    pub(crate) fn fire_board_changed(&self, position: &P) {
        let hook = self.inner.lock().board_changed.clone();
        if let Some(hook) = hook {
            hook(position);
        }
    }
}

impl<P: Position> Default for EngineHooks<P> {
    fn default() -> Self {
        Self::new()
    }
}
