//! UCI output formatting.

use std::fmt;

use crate::position::Position;
use crate::search::SearchProgress;

/// Format a search progress update as a UCI "info" line.
#[must_use]
pub fn format_info<P: Position>(update: &SearchProgress<'_, P>) -> String {
    format!(
        "info depth {} seldepth {} score cp {} nodes {} nps {} hashfull {} time {} pv {}",
        update.depth,
        update.stats.seldepth,
        update.score_cp,
        update.stats.nodes,
        update.stats.nps,
        update.stats.hashfull,
        update.elapsed_ms,
        update.stats.pv
    )
}

/// Format the final move announcement.
#[must_use]
pub fn format_bestmove<M: fmt::Display>(best: &M, ponder: Option<&M>) -> String {
    match ponder {
        Some(ponder) => format!("bestmove {best} ponder {ponder}"),
        None => format!("bestmove {best}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Color;
    use crate::search::SearchStats;

    #[derive(Clone, Debug)]
    struct NullPos;

    impl Position for NullPos {
        type Move = String;

        fn startpos() -> Self {
            NullPos
        }

        fn from_fen(_fen: &str) -> Option<Self> {
            Some(NullPos)
        }

        fn to_fen(&self) -> String {
            String::new()
        }

        fn parse_move(&self, _text: &str) -> Option<String> {
            None
        }

        fn make_move(&self, _mv: &String) -> Option<Self> {
            None
        }

        fn in_checkmate(&self) -> bool {
            false
        }

        fn in_stalemate(&self) -> bool {
            false
        }

        fn halfmove_clock(&self) -> u32 {
            0
        }

        fn side_to_move(&self) -> Color {
            Color::White
        }

        fn repetition_key(&self) -> u64 {
            0
        }
    }

    #[test]
    fn test_format_bestmove() {
        assert_eq!(format_bestmove(&"e2e4", None), "bestmove e2e4");
        assert_eq!(
            format_bestmove(&"e2e4", Some(&"e7e5")),
            "bestmove e2e4 ponder e7e5"
        );
    }

    #[test]
    fn test_format_info() {
        let stats = SearchStats {
            nodes: 12345,
            seldepth: 9,
            nps: 100_000,
            hashfull: 42,
            pv: "e2e4 e7e5".to_string(),
        };
        let update = SearchProgress::<NullPos> {
            depth: 7,
            score_cp: 31,
            elapsed_ms: 250,
            stats: &stats,
            ponder_position: None,
            ponder_move: None,
        };
        assert_eq!(
            format_info(&update),
            "info depth 7 seldepth 9 score cp 31 nodes 12345 nps 100000 hashfull 42 time 250 pv e2e4 e7e5"
        );
    }
}
