//! XBoard/WinBoard protocol command parsing.

/// `XBoard` protocol commands.
#[derive(Debug, Clone, PartialEq)]
pub enum XBoardCommand {
    /// Enter `XBoard` mode
    XBoard,
    /// Protocol version negotiation
    Protover(u32),
    /// Start new game
    New,
    /// Quit the program
    Quit,
    /// Enter force mode (record moves without answering)
    Force,
    /// Play the side to move
    Go,
    /// Play the side not to move
    PlayOther,
    /// The engine takes Black (White is on move)
    White,
    /// The engine takes White (Black is on move)
    Black,
    /// Session time control: level <mps> <base[:sec]> <inc>
    Level {
        moves_per_session: u32,
        base_ms: u64,
        increment_ms: u64,
    },
    /// Exact seconds per move
    St(u32),
    /// Maximum search depth
    Sd(u32),
    /// Engine clock in centiseconds
    Time(u64),
    /// Opponent clock in centiseconds
    OTime(u64),
    /// Keepalive
    Ping(u32),
    /// Game result reported by the GUI
    Result { code: String, comment: String },
    /// Set position from FEN
    SetBoard(String),
    /// Enter edit mode
    Edit,
    /// Terminate edit mode (".")
    EditDone,
    /// Clear the board in edit mode ("#")
    ClearBoard,
    /// Toggle the placement color in edit mode ("c")
    ToggleColor,
    /// Place ("Pa2") or remove ("xa2") a piece in edit mode
    Place(String),
    /// Ask for the current ponder suggestion
    Hint,
    /// Ask for book moves
    Bk,
    /// Take back one ply
    Undo,
    /// Take back a full round
    Remove,
    /// Enable pondering
    Hard,
    /// Disable pondering
    Easy,
    /// Post thinking output
    Post,
    /// Stop posting thinking output
    NoPost,
    /// Enter analyze mode
    Analyze,
    /// Leave analyze mode ("exit")
    ExitAnalyze,
    /// Opponent's name
    Name(String),
    /// The opponent is another engine
    Computer,
    /// Show the current position
    Display,
    /// A move, bare or behind "usermove"
    UserMove(String),
    /// Anything else
    Unknown(String),
}

/// Parse an `XBoard` command from a line of input.
#[must_use]
pub fn parse_xboard_command(line: &str) -> Option<XBoardCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parts: Vec<&str> = trimmed.split_whitespace().collect();

    let cmd = match parts[0] {
        "xboard" => XBoardCommand::XBoard,
        "protover" => {
            let version = parts.get(1).and_then(|v| v.parse().ok()).unwrap_or(1);
            XBoardCommand::Protover(version)
        }
        "new" => XBoardCommand::New,
        "quit" => XBoardCommand::Quit,
        "force" => XBoardCommand::Force,
        "go" => XBoardCommand::Go,
        "playother" => XBoardCommand::PlayOther,
        "white" => XBoardCommand::White,
        "black" => XBoardCommand::Black,
        "level" => {
            let mps = parts.get(1).and_then(|v| v.parse().ok()).unwrap_or(0);
            let base_ms = parts.get(2).map_or(0, |v| parse_base_ms(v));
            let inc: u64 = parts.get(3).and_then(|v| v.parse().ok()).unwrap_or(0);
            XBoardCommand::Level {
                moves_per_session: mps,
                base_ms,
                increment_ms: inc * 1000,
            }
        }
        "st" => {
            let secs = parts.get(1).and_then(|v| v.parse().ok()).unwrap_or(0);
            XBoardCommand::St(secs)
        }
        "sd" => {
            let depth = parts.get(1).and_then(|v| v.parse().ok()).unwrap_or(1);
            XBoardCommand::Sd(depth)
        }
        "time" => {
            let cs = parts.get(1).and_then(|v| v.parse().ok()).unwrap_or(0);
            XBoardCommand::Time(cs)
        }
        "otim" => {
            let cs = parts.get(1).and_then(|v| v.parse().ok()).unwrap_or(0);
            XBoardCommand::OTime(cs)
        }
        "ping" => {
            let n = parts.get(1).and_then(|v| v.parse().ok()).unwrap_or(0);
            XBoardCommand::Ping(n)
        }
        "result" => {
            let code = parts.get(1).map_or(String::new(), |s| (*s).to_string());
            let comment = strip_braces(&parts[2..].join(" "));
            XBoardCommand::Result { code, comment }
        }
        "setboard" => XBoardCommand::SetBoard(parts[1..].join(" ")),
        "edit" => XBoardCommand::Edit,
        "." => XBoardCommand::EditDone,
        "#" => XBoardCommand::ClearBoard,
        "c" => XBoardCommand::ToggleColor,
        "hint" => XBoardCommand::Hint,
        "bk" => XBoardCommand::Bk,
        "undo" => XBoardCommand::Undo,
        "remove" => XBoardCommand::Remove,
        "hard" => XBoardCommand::Hard,
        "easy" => XBoardCommand::Easy,
        "post" => XBoardCommand::Post,
        "nopost" => XBoardCommand::NoPost,
        "analyze" => XBoardCommand::Analyze,
        "exit" => XBoardCommand::ExitAnalyze,
        "name" => XBoardCommand::Name(parts[1..].join(" ")),
        "computer" => XBoardCommand::Computer,
        "display" => XBoardCommand::Display,
        "usermove" => {
            let mv = parts.get(1).map_or(String::new(), |s| (*s).to_string());
            XBoardCommand::UserMove(mv)
        }
        token => {
            if is_placement(token) {
                XBoardCommand::Place(token.to_string())
            } else if is_likely_move(token) {
                XBoardCommand::UserMove(token.to_string())
            } else {
                XBoardCommand::Unknown(trimmed.to_string())
            }
        }
    };

    Some(cmd)
}

/// An edit-mode placement token: "Pa2" to place, "xa2" to remove.
fn is_placement(token: &str) -> bool {
    let mut chars = token.chars();
    let (Some(first), Some(file), Some(rank)) = (chars.next(), chars.next(), chars.next()) else {
        return false;
    };
    if chars.next().is_some() {
        return false;
    }
    (first == 'x' || "PNBRQK".contains(first)) && ('a'..='h').contains(&file) && ('1'..='8').contains(&rank)
}

/// Whether a bare token looks like a move in coordinate notation.
fn is_likely_move(token: &str) -> bool {
    let bytes = token.as_bytes();
    if bytes.len() < 4 || bytes.len() > 5 {
        return false;
    }
    let square = |file: u8, rank: u8| (b'a'..=b'h').contains(&file) && (b'1'..=b'8').contains(&rank);
    if !square(bytes[0], bytes[1]) || !square(bytes[2], bytes[3]) {
        return false;
    }
    bytes.len() == 4 || b"nbrq".contains(&bytes[4])
}

/// Parse a level base time: "5" is minutes, "0:30" minutes and seconds.
fn parse_base_ms(text: &str) -> u64 {
    match text.split_once(':') {
        Some((mins, secs)) => {
            let mins: u64 = mins.parse().unwrap_or(0);
            let secs: u64 = secs.parse().unwrap_or(0);
            mins * 60_000 + secs * 1000
        }
        None => text.parse::<u64>().unwrap_or(0) * 60_000,
    }
}

/// Strip one pair of surrounding braces from a result comment.
fn strip_braces(text: &str) -> String {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .unwrap_or(trimmed)
        .to_string()
}
