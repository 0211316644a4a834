//! XBoard/WinBoard protocol adapter.
//!
//! Handles communication with chess GUIs using the `XBoard` protocol,
//! the line-based alternative to UCI used by older interfaces.
//!
//! # Protocol Overview
//!
//! - Moves travel in coordinate notation ("e2e4", "e7e8q"); SAN is
//!   declined in the feature negotiation.
//! - Clocks are reported in centiseconds, thinking output as
//!   `<ply> <score> <time> <nodes> <pv>`.
//! - The engine answers accepted moves by itself, so auto-play stays
//!   enabled and the move-made callback becomes the "move" line.
//! - `edit` and `analyze` open sub-loops; the adapter tracks them with
//!   mode flags and routes the restricted command sets accordingly.

pub mod command;
mod edit;
pub mod output;

use std::io::{BufRead, Write};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::engine::{Engine, EngineError};
use crate::position::Position;
use crate::result::ResultCode;
use crate::search::SearchFacade;

use command::{parse_xboard_command, XBoardCommand};
use edit::EditSession;

/// `XBoard` protocol handler around an engine and an output stream.
pub struct XBoardAdapter<S: SearchFacade, W: Write + Send + 'static> {
    engine: Engine<S>,
    out: Arc<Mutex<W>>,
    /// Active edit sub-loop, if any.
    edit: Option<EditSession>,
    /// Whether the analyze sub-loop is active.
    analyze_mode: bool,
}

impl<S, W> XBoardAdapter<S, W>
where
    S: SearchFacade,
    W: Write + Send + 'static,
{
    /// Wire an engine to an output stream and install the callbacks the
    /// protocol needs.
    pub fn new(engine: Engine<S>, writer: W) -> Self {
        engine.set_auto_play(true);
        let out = Arc::new(Mutex::new(writer));

        let move_out = Arc::clone(&out);
        engine.hooks().set_move_made(move |_, mv, _| {
            let mut out = move_out.lock();
            let _ = writeln!(out, "{}", output::format_move(mv));
            let _ = out.flush();
        });

        let result_out = Arc::clone(&out);
        engine.hooks().set_result(move |result| {
            let mut out = result_out.lock();
            let _ = writeln!(out, "{result}");
            let _ = out.flush();
        });

        let post_out = Arc::clone(&out);
        engine
            .hooks()
            .set_progress(move |update: crate::search::SearchProgress<'_, S::Pos>| {
                let mut out = post_out.lock();
                let _ = writeln!(out, "{}", output::format_post(&update));
                let _ = out.flush();
            });

        XBoardAdapter {
            engine,
            out,
            edit: None,
            analyze_mode: false,
        }
    }

    /// Run the protocol main loop until "quit" or end of input.
    pub fn run<R: BufRead>(&mut self, input: R) {
        for line in input.lines() {
            let Ok(line) = line else { break };
            let Some(cmd) = parse_xboard_command(&line) else {
                continue;
            };
            if !self.handle_command(&cmd) {
                break;
            }
        }
        self.engine.shutdown();
    }

    /// Handle a single command; returns false when the loop should end.
    pub fn handle_command(&mut self, cmd: &XBoardCommand) -> bool {
        match cmd {
            XBoardCommand::Quit => return false,
            XBoardCommand::XBoard => {}
            XBoardCommand::Protover(version) => {
                if *version >= 2 {
                    self.send(&output::format_features());
                }
            }
            XBoardCommand::Ping(n) => self.send(&output::format_pong(*n)),
            _ => self.handle_state_command(cmd),
        }
        true
    }

    fn handle_state_command(&mut self, cmd: &XBoardCommand) {
        if self.edit.is_some() {
            self.handle_edit_command(cmd);
            return;
        }
        match cmd {
            XBoardCommand::New => {
                self.engine.new_game();
                if self.analyze_mode {
                    // Re-enter analysis on the fresh game.
                    self.engine.quit_from_analysis();
                    self.engine.analyze();
                } else {
                    self.engine.play_other();
                }
            }
            XBoardCommand::Force => self.engine.set_force_mode(),
            XBoardCommand::Go => self.engine.go(),
            XBoardCommand::PlayOther => self.engine.play_other(),
            // "white"/"black" hand the engine the side that is not on
            // move, so either way it waits for the opponent.
            XBoardCommand::White | XBoardCommand::Black => self.engine.play_other(),
            XBoardCommand::Level {
                moves_per_session,
                base_ms,
                increment_ms,
            } => self.engine.set_level(*moves_per_session, *base_ms, *increment_ms),
            XBoardCommand::St(secs) => self.engine.set_move_time(u64::from(*secs) * 1000),
            XBoardCommand::Sd(depth) => self.engine.set_depth(*depth),
            XBoardCommand::Time(cs) => self.engine.set_remaining_engine_time(cs * 10),
            XBoardCommand::OTime(cs) => self.engine.set_remaining_opponent_time(cs * 10),
            XBoardCommand::Result { code, comment } => {
                self.engine.set_result(ResultCode::from_token(code), comment);
            }
            XBoardCommand::SetBoard(fen) => {
                let fen = fen.clone();
                if let Err(err) = self.engine.set_board(|| S::Pos::from_fen(&fen)) {
                    self.send(&output::format_error(&fen, &err.to_string()));
                }
            }
            XBoardCommand::Edit => {
                let fen = self.engine.current_position().to_fen();
                match EditSession::from_fen(&fen) {
                    Some(session) => self.edit = Some(session),
                    None => self.send(&output::format_error("edit", "position unavailable")),
                }
            }
            XBoardCommand::EditDone => {
                // Outside edit mode "." is the analyze status poll; we
                // have nothing new to report.
            }
            XBoardCommand::ClearBoard | XBoardCommand::ToggleColor | XBoardCommand::Place(_) => {
                self.send(&output::format_error("edit", "not in edit mode"));
            }
            XBoardCommand::Hint => {
                if let Some(mv) = self.engine.get_hint_move() {
                    self.send(&output::format_hint(&mv));
                }
            }
            XBoardCommand::Bk => {
                self.send(" no book moves");
                self.send("");
            }
            XBoardCommand::Undo => {
                if let Err(err) = self.engine.undo() {
                    self.send(&output::format_error("undo", &err.to_string()));
                }
            }
            XBoardCommand::Remove => {
                if let Err(err) = self.engine.remove() {
                    self.send(&output::format_error("remove", &err.to_string()));
                }
            }
            XBoardCommand::Hard => self.engine.set_auto_ponder(true),
            XBoardCommand::Easy => self.engine.set_auto_ponder(false),
            XBoardCommand::Post => self.engine.set_show_thinking(true),
            XBoardCommand::NoPost => self.engine.set_show_thinking(false),
            XBoardCommand::Analyze => {
                self.analyze_mode = true;
                self.engine.analyze();
            }
            XBoardCommand::ExitAnalyze => {
                if self.analyze_mode {
                    self.analyze_mode = false;
                    self.engine.quit_from_analysis();
                }
            }
            XBoardCommand::Name(name) => debug!("opponent name: {name}"),
            XBoardCommand::Computer => debug!("opponent is a computer"),
            XBoardCommand::Display => {
                let fen = self.engine.current_position().to_fen();
                self.send(&fen);
            }
            XBoardCommand::UserMove(text) => self.handle_user_move(text),
            XBoardCommand::Unknown(text) => {
                self.send(&output::format_error(text, "unknown command"));
            }
            XBoardCommand::XBoard
            | XBoardCommand::Protover(_)
            | XBoardCommand::Ping(_)
            | XBoardCommand::Quit => {}
        }
    }

    /// Commands inside the edit sub-loop, which ends on ".".
    fn handle_edit_command(&mut self, cmd: &XBoardCommand) {
        let Some(session) = self.edit.as_mut() else {
            return;
        };
        match cmd {
            XBoardCommand::ClearBoard => session.clear(),
            XBoardCommand::ToggleColor => session.toggle_color(),
            XBoardCommand::Place(token) => session.apply(token),
            XBoardCommand::EditDone => {
                let fen = session.to_fen();
                self.edit = None;
                if let Err(err) = self.engine.set_board(|| S::Pos::from_fen(&fen)) {
                    self.send(&output::format_error(&fen, &err.to_string()));
                }
            }
            other => {
                debug!("ignoring command during edit: {other:?}");
            }
        }
    }

    fn handle_user_move(&mut self, text: &str) {
        match self.engine.make_move(|position| position.parse_move(text)) {
            Ok(()) => {}
            Err(EngineError::IllegalMove) => self.send(&output::format_illegal_move(text)),
            Err(err) => self.send(&output::format_error(text, &err.to_string())),
        }
    }

    fn send(&self, text: &str) {
        let mut out = self.out.lock();
        for line in text.lines() {
            let _ = writeln!(out, "{line}");
        }
        if text.is_empty() {
            let _ = writeln!(out);
        }
        let _ = out.flush();
    }
}
