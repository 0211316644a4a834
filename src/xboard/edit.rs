//! Edit-mode position construction.
//!
//! The legacy `edit` sub-loop changes piece placement square by square
//! instead of sending a whole position. The session starts from the
//! current position's FEN board field, applies clear/place/remove
//! tokens, and renders a fresh FEN that is committed through the
//! engine's board-reset operation when the sub-loop terminates on ".".
//!
//! Castling rights cannot be stated in edit mode; following protocol
//! convention they are granted whenever king and rook stand on their
//! home squares.

/// An in-progress edit of the board.
#[derive(Debug, Clone)]
pub struct EditSession {
    /// Piece letters in FEN case, '.' for empty; index = rank * 8 + file
    /// with a1 at index 0.
    squares: [char; 64],
    /// Color the next placement applies to; toggled by "c".
    place_white: bool,
    /// Side to move, carried over from the edited position.
    white_to_move: bool,
}

impl EditSession {
    /// Start a session from a FEN string. `None` if the board field is
    /// malformed.
    #[must_use]
    pub fn from_fen(fen: &str) -> Option<EditSession> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next()?;
        let white_to_move = fields.next() != Some("b");

        let mut squares = ['.'; 64];
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return None;
        }
        for (i, rank_text) in ranks.iter().enumerate() {
            let rank = 7 - i;
            let mut file = 0usize;
            for c in rank_text.chars() {
                if let Some(run) = c.to_digit(10) {
                    file += run as usize;
                } else if c.is_ascii_alphabetic() && file < 8 {
                    squares[rank * 8 + file] = c;
                    file += 1;
                } else {
                    return None;
                }
            }
            if file != 8 {
                return None;
            }
        }

        Some(EditSession {
            squares,
            place_white: true,
            white_to_move,
        })
    }

    /// Empty the board ("#").
    pub fn clear(&mut self) {
        self.squares = ['.'; 64];
    }

    /// Switch the placement color ("c").
    pub fn toggle_color(&mut self) {
        self.place_white = !self.place_white;
    }

    /// Apply a placement token: "Pa2" places, "xa2" removes.
    pub fn apply(&mut self, token: &str) {
        let chars: Vec<char> = token.chars().collect();
        let [piece, file, rank] = chars[..] else {
            return;
        };
        let Some(index) = square_index(file, rank) else {
            return;
        };
        if piece == 'x' {
            self.squares[index] = '.';
        } else if "PNBRQK".contains(piece) {
            self.squares[index] = if self.place_white {
                piece
            } else {
                piece.to_ascii_lowercase()
            };
        }
    }

    /// Render the edited position as a FEN string.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut placement = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                let c = self.squares[rank * 8 + file];
                if c == '.' {
                    empty += 1;
                } else {
                    if empty > 0 {
                        placement.push_str(&empty.to_string());
                        empty = 0;
                    }
                    placement.push(c);
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if rank > 0 {
                placement.push('/');
            }
        }

        let side = if self.white_to_move { 'w' } else { 'b' };
        let castling = self.castling_rights();
        format!("{placement} {side} {castling} - 0 1")
    }

    /// Castling availability from home squares.
    fn castling_rights(&self) -> String {
        let at = |file: usize, rank: usize| self.squares[rank * 8 + file];
        let mut rights = String::new();
        if at(4, 0) == 'K' {
            if at(7, 0) == 'R' {
                rights.push('K');
            }
            if at(0, 0) == 'R' {
                rights.push('Q');
            }
        }
        if at(4, 7) == 'k' {
            if at(7, 7) == 'r' {
                rights.push('k');
            }
            if at(0, 7) == 'r' {
                rights.push('q');
            }
        }
        if rights.is_empty() {
            rights.push('-');
        }
        rights
    }
}

fn square_index(file: char, rank: char) -> Option<usize> {
    let file = ('a'..='h').contains(&file).then(|| file as usize - 'a' as usize)?;
    let rank = ('1'..='8').contains(&rank).then(|| rank as usize - '1' as usize)?;
    Some(rank * 8 + file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_startpos_round_trips() {
        let session = EditSession::from_fen(STARTPOS).unwrap();
        assert_eq!(session.to_fen(), STARTPOS);
    }

    #[test]
    fn test_side_to_move_is_preserved() {
        let session =
            EditSession::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 3 9")
                .unwrap();
        assert!(session.to_fen().contains(" b "));
    }

    #[test]
    fn test_clear_and_place() {
        let mut session = EditSession::from_fen(STARTPOS).unwrap();
        session.clear();
        session.apply("Pa2");
        session.toggle_color();
        session.apply("Pe7");
        assert_eq!(session.to_fen(), "8/4p3/8/8/8/8/P7/8 w - - 0 1");
    }

    #[test]
    fn test_remove_token() {
        let mut session = EditSession::from_fen(STARTPOS).unwrap();
        session.apply("xe2");
        assert_eq!(
            session.to_fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPP1PPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn test_castling_requires_home_squares() {
        let mut session = EditSession::from_fen(STARTPOS).unwrap();
        session.apply("xh1");
        assert!(session.to_fen().contains(" Qkq "));
        session.apply("xe8");
        assert!(session.to_fen().contains(" Q "));
    }

    #[test]
    fn test_malformed_fen_is_rejected() {
        assert!(EditSession::from_fen("not a fen").is_none());
        assert!(EditSession::from_fen("8/8/8 w - - 0 1").is_none());
    }

    #[test]
    fn test_bad_tokens_are_ignored(){
        let mut session = EditSession::from_fen(STARTPOS).unwrap();
        session.apply("Zz9");
        session.apply("P");
        assert_eq!(session.to_fen(), STARTPOS);
    }
}
