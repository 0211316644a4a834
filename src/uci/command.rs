//! UCI command parsing.

use crate::engine::GoParams;

/// Recognized UCI commands.
#[derive(Debug, Clone)]
pub enum UciCommand {
    Uci,
    Debug(Option<String>),
    IsReady,
    SetOption(Vec<String>),
    UciNewGame,
    Position(Vec<String>),
    Go(Vec<String>),
    Stop,
    PonderHit,
    Quit,
    Unknown(String),
}

/// Parse a UCI command from a line of input.
#[must_use]
pub fn parse_uci_command(line: &str) -> Option<UciCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parts: Vec<&str> = trimmed.split_whitespace().collect();

    let owned_parts = || parts.iter().map(|p| (*p).to_string()).collect::<Vec<String>>();

    let cmd = match parts[0] {
        "uci" => UciCommand::Uci,
        "debug" => UciCommand::Debug(parts.get(1).map(|v| (*v).to_string())),
        "isready" => UciCommand::IsReady,
        "setoption" => UciCommand::SetOption(owned_parts()),
        "ucinewgame" => UciCommand::UciNewGame,
        "position" => UciCommand::Position(owned_parts()),
        "go" => UciCommand::Go(owned_parts()),
        "stop" => UciCommand::Stop,
        "ponderhit" => UciCommand::PonderHit,
        "quit" => UciCommand::Quit,
        _ => UciCommand::Unknown(trimmed.to_string()),
    };

    Some(cmd)
}

const GO_KEYWORDS: &[&str] = &[
    "searchmoves",
    "ponder",
    "wtime",
    "btime",
    "winc",
    "binc",
    "movestogo",
    "depth",
    "nodes",
    "mate",
    "movetime",
    "infinite",
];

fn is_go_keyword(token: &str) -> bool {
    GO_KEYWORDS.contains(&token)
}

fn value_after<T: std::str::FromStr>(parts: &[String], i: usize) -> Option<T> {
    parts.get(i + 1).and_then(|v| v.parse().ok())
}

/// Parse the arguments of a "go" command into explicit search limits.
/// Unknown tokens are skipped, matching how GUIs expect engines to cope
/// with grammar extensions.
#[must_use]
pub fn parse_go(parts: &[String]) -> GoParams {
    let mut params = GoParams::default();
    let mut i = 1;
    while i < parts.len() {
        match parts[i].as_str() {
            "searchmoves" => {
                let mut moves = Vec::new();
                i += 1;
                while i < parts.len() && !is_go_keyword(&parts[i]) {
                    moves.push(parts[i].clone());
                    i += 1;
                }
                if !moves.is_empty() {
                    params.searchmoves = Some(moves);
                }
                continue;
            }
            "ponder" => params.ponder = true,
            "infinite" => params.infinite = true,
            "wtime" => {
                params.wtime_ms = value_after(parts, i);
                i += 1;
            }
            "btime" => {
                params.btime_ms = value_after(parts, i);
                i += 1;
            }
            "winc" => {
                params.winc_ms = value_after(parts, i);
                i += 1;
            }
            "binc" => {
                params.binc_ms = value_after(parts, i);
                i += 1;
            }
            "movestogo" => {
                params.movestogo = value_after(parts, i);
                i += 1;
            }
            "depth" => {
                params.depth = value_after(parts, i);
                i += 1;
            }
            "nodes" => {
                params.nodes = value_after(parts, i);
                i += 1;
            }
            "mate" => {
                params.mate_in = value_after(parts, i);
                i += 1;
            }
            "movetime" => {
                params.movetime_ms = value_after(parts, i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    params
}

/// Split a "setoption" command into its name and optional value.
#[must_use]
pub fn parse_setoption(parts: &[String]) -> Option<(String, Option<String>)> {
    if parts.first().map(String::as_str) != Some("setoption") {
        return None;
    }

    let mut name_parts: Vec<&str> = Vec::new();
    let mut value_parts: Vec<&str> = Vec::new();
    let mut mode = "";

    for part in parts.iter().skip(1) {
        match part.as_str() {
            "name" => mode = "name",
            "value" => mode = "value",
            other => match mode {
                "name" => name_parts.push(other),
                "value" => value_parts.push(other),
                _ => {}
            },
        }
    }

    if name_parts.is_empty() {
        return None;
    }

    let name = name_parts.join(" ");
    let value = if value_parts.is_empty() {
        None
    } else {
        Some(value_parts.join(" "))
    };

    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_basic_commands() {
        assert!(matches!(parse_uci_command("uci"), Some(UciCommand::Uci)));
        assert!(matches!(parse_uci_command("isready"), Some(UciCommand::IsReady)));
        assert!(matches!(parse_uci_command("ucinewgame"), Some(UciCommand::UciNewGame)));
        assert!(matches!(parse_uci_command("stop"), Some(UciCommand::Stop)));
        assert!(matches!(parse_uci_command("ponderhit"), Some(UciCommand::PonderHit)));
        assert!(matches!(parse_uci_command("quit"), Some(UciCommand::Quit)));
        assert!(parse_uci_command("   ").is_none());
    }

    #[test]
    fn test_unknown_command() {
        match parse_uci_command("frobnicate now") {
            Some(UciCommand::Unknown(s)) => assert_eq!(s, "frobnicate now"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_go_clock_fields() {
        let params = parse_go(&owned("go wtime 300000 btime 290000 winc 2000 binc 2000 movestogo 40"));
        assert_eq!(params.wtime_ms, Some(300_000));
        assert_eq!(params.btime_ms, Some(290_000));
        assert_eq!(params.winc_ms, Some(2000));
        assert_eq!(params.binc_ms, Some(2000));
        assert_eq!(params.movestogo, Some(40));
        assert!(!params.infinite);
    }

    #[test]
    fn test_go_bounds() {
        let params = parse_go(&owned("go depth 12 nodes 500000 mate 3 movetime 5000"));
        assert_eq!(params.depth, Some(12));
        assert_eq!(params.nodes, Some(500_000));
        assert_eq!(params.mate_in, Some(3));
        assert_eq!(params.movetime_ms, Some(5000));
    }

    #[test]
    fn test_go_infinite_and_ponder() {
        let params = parse_go(&owned("go ponder infinite"));
        assert!(params.ponder);
        assert!(params.infinite);
    }

    #[test]
    fn test_go_searchmoves_stops_at_next_keyword() {
        let params = parse_go(&owned("go searchmoves e2e4 d2d4 movetime 100"));
        assert_eq!(
            params.searchmoves,
            Some(vec!["e2e4".to_string(), "d2d4".to_string()])
        );
        assert_eq!(params.movetime_ms, Some(100));
    }

    #[test]
    fn test_setoption_name_and_value() {
        let parsed = parse_setoption(&owned("setoption name Ponder value true"));
        assert_eq!(parsed, Some(("Ponder".to_string(), Some("true".to_string()))));
    }

    #[test]
    fn test_setoption_multiword_name() {
        let parsed = parse_setoption(&owned("setoption name Clear Hash"));
        assert_eq!(parsed, Some(("Clear Hash".to_string(), None)));
    }

    #[test]
    fn test_setoption_without_name_is_rejected() {
        assert_eq!(parse_setoption(&owned("setoption value 3")), None);
    }
}
