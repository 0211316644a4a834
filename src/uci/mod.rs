//! Universal Chess Interface (UCI) protocol adapter.
//!
//! Translates the UCI command grammar into engine operations and turns
//! the engine's output callbacks into UCI responses. Under UCI the GUI
//! applies the engine's move itself, so auto-play is disabled and the
//! move-made callback becomes the "bestmove" line; search progress is
//! always streamed as "info" lines.
//!
//! Domain errors are reported as "info string" lines; only "quit" or a
//! closed input stream ends the loop.

pub mod command;
pub mod print;

use std::io::{BufRead, Write};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::engine::Engine;
use crate::position::Position;
use crate::search::SearchFacade;

use command::{parse_go, parse_setoption, parse_uci_command, UciCommand};

pub const ENGINE_NAME: &str = "chess_control 0.1";
pub const ENGINE_AUTHOR: &str = "the chess_control developers";

/// UCI protocol handler around an engine and an output stream.
pub struct UciAdapter<S: SearchFacade, W: Write + Send + 'static> {
    engine: Engine<S>,
    out: Arc<Mutex<W>>,
}

impl<S, W> UciAdapter<S, W>
where
    S: SearchFacade,
    W: Write + Send + 'static,
{
    /// Wire an engine to an output stream and install the callbacks the
    /// protocol needs.
    pub fn new(engine: Engine<S>, writer: W) -> Self {
        engine.set_auto_play(false);
        engine.set_show_thinking(true);
        let out = Arc::new(Mutex::new(writer));

        let bestmove_out = Arc::clone(&out);
        engine.hooks().set_move_made(move |_, mv, ponder| {
            let mut out = bestmove_out.lock();
            let _ = writeln!(out, "{}", print::format_bestmove(mv, ponder));
            let _ = out.flush();
        });

        let info_out = Arc::clone(&out);
        engine
            .hooks()
            .set_progress(move |update: crate::search::SearchProgress<'_, S::Pos>| {
                let mut out = info_out.lock();
                let _ = writeln!(out, "{}", print::format_info(&update));
                let _ = out.flush();
            });

        UciAdapter { engine, out }
    }

    /// Run the protocol main loop until "quit" or end of input.
    pub fn run<R: BufRead>(&mut self, input: R) {
        for line in input.lines() {
            let Ok(line) = line else { break };
            let Some(cmd) = parse_uci_command(&line) else {
                continue;
            };
            if !self.handle_command(&cmd) {
                break;
            }
        }
        self.engine.shutdown();
    }

    /// Handle a single command; returns false when the loop should end.
    pub fn handle_command(&mut self, cmd: &UciCommand) -> bool {
        match cmd {
            UciCommand::Uci => {
                self.send(&format!("id name {ENGINE_NAME}"));
                self.send(&format!("id author {ENGINE_AUTHOR}"));
                self.send("option name Ponder type check default false");
                self.send("uciok");
            }
            UciCommand::Debug(value) => {
                debug!("debug mode: {value:?}");
            }
            UciCommand::IsReady => self.send("readyok"),
            UciCommand::SetOption(parts) => self.handle_setoption(parts),
            UciCommand::UciNewGame => self.engine.new_game(),
            UciCommand::Position(parts) => self.handle_position(parts),
            UciCommand::Go(parts) => self.engine.go_explicit(parse_go(parts)),
            UciCommand::Stop => {
                self.engine.stop_thinking();
                self.engine.stop_pondering();
            }
            UciCommand::PonderHit => self.engine.pondering_hit(),
            UciCommand::Quit => return false,
            UciCommand::Unknown(text) => {
                self.send(&format!("info string unknown command: {text}"));
            }
        }
        true
    }

    fn handle_setoption(&self, parts: &[String]) {
        let Some((name, value)) = parse_setoption(parts) else {
            self.send("info string error: setoption needs a name");
            return;
        };
        match name.to_ascii_lowercase().as_str() {
            "ponder" => {
                let on = matches!(
                    value.as_deref().map(str::trim),
                    Some("true") | Some("1")
                );
                self.engine.set_auto_ponder(on);
            }
            _ => debug!("ignoring unknown option: {name}"),
        }
    }

    /// Handle "position {startpos | fen <6 fields>} [moves ...]".
    fn handle_position(&self, parts: &[String]) {
        let mut i = 1;
        let fen = if parts.get(i).map(String::as_str) == Some("startpos") {
            i += 1;
            None
        } else if parts.get(i).map(String::as_str) == Some("fen") {
            if i + 6 >= parts.len() {
                self.send("info string error: fen needs 6 fields");
                return;
            }
            let fen = parts[i + 1..i + 7].join(" ");
            i += 7;
            Some(fen)
        } else {
            self.send("info string error: position needs startpos or fen");
            return;
        };

        let moves: &[String] = if parts.get(i).map(String::as_str) == Some("moves") {
            &parts[i + 1..]
        } else {
            &[]
        };

        let outcome = match fen {
            None => self
                .engine
                .set_board_and_make_moves(|| Some(S::Pos::startpos()), moves),
            Some(fen) => self
                .engine
                .set_board_and_make_moves(|| S::Pos::from_fen(&fen), moves),
        };
        if let Err(err) = outcome {
            self.send(&format!("info string error: {err}"));
        }
    }

    fn send(&self, line: &str) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}
