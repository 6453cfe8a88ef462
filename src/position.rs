//! Position capability used by the search
//!
//! The engine never touches board state directly; everything goes through
//! [`Position`]. [`ChessPosition`] implements it on top of `chess::Board`
//! and adds what a bare board lacks: the move clocks and the hash history
//! needed for repetition and fifty-move draws.

use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece};

use crate::error::SearchError;
use crate::types::{insufficient_material, is_capture, parse_uci_move};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Rules collaborator required by the engine.
pub trait Position {
    fn side_to_move(&self) -> Color;
    fn hash_key(&self) -> u64;
    fn legal_moves(&self) -> Vec<ChessMove>;
    /// Must be paired with `unmake_move` of the same move.
    fn make_move(&mut self, mv: ChessMove);
    fn unmake_move(&mut self, mv: ChessMove);
    fn is_in_check(&self) -> bool;
    /// Repetition, move-count and dead-material draws.
    fn is_draw(&self) -> bool;
    /// Snapshot handed to the evaluator.
    fn board(&self) -> &Board;
    fn to_fen(&self) -> String;

    fn is_checkmate(&self) -> bool {
        self.is_in_check() && self.legal_moves().is_empty()
    }

    fn is_stalemate(&self) -> bool {
        !self.is_in_check() && self.legal_moves().is_empty()
    }

    fn is_legal(&self, mv: ChessMove) -> bool {
        self.legal_moves().contains(&mv)
    }
}

/// Makes a move on construction and takes it back when dropped, so every
/// exit path out of a search node (cutoff, abort, early return) restores the
/// parent position.
pub struct MoveGuard<'a, P: Position + ?Sized> {
    pos: &'a mut P,
    mv: ChessMove,
}

impl<'a, P: Position + ?Sized> MoveGuard<'a, P> {
    pub fn new(pos: &'a mut P, mv: ChessMove) -> Self {
        pos.make_move(mv);
        Self { pos, mv }
    }
}

impl<P: Position + ?Sized> Deref for MoveGuard<'_, P> {
    type Target = P;
    fn deref(&self) -> &P {
        self.pos
    }
}

impl<P: Position + ?Sized> DerefMut for MoveGuard<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.pos
    }
}

impl<P: Position + ?Sized> Drop for MoveGuard<'_, P> {
    fn drop(&mut self) {
        self.pos.unmake_move(self.mv);
    }
}

#[derive(Clone, Copy, Debug)]
struct Undo {
    board: Board,
    mv: ChessMove,
    halfmove_clock: u32,
    fullmove_number: u32,
}

/// `chess::Board` plus game history.
#[derive(Clone, Debug)]
pub struct ChessPosition {
    board: Board,
    halfmove_clock: u32,
    fullmove_number: u32,
    undo: Vec<Undo>,
    /// Hash of every position in the game so far, current one last.
    keys: Vec<u64>,
}

impl Default for ChessPosition {
    fn default() -> Self {
        Self::from_board(Board::default())
    }
}

impl ChessPosition {
    pub fn startpos() -> Self {
        Self::default()
    }

    pub fn from_board(board: Board) -> Self {
        Self {
            board,
            halfmove_clock: 0,
            fullmove_number: 1,
            undo: Vec::new(),
            keys: vec![board.get_hash()],
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, SearchError> {
        let fen = fen.trim();
        let board = Board::from_str(fen).map_err(|e| SearchError::InvalidPosition {
            fen: fen.to_string(),
            reason: e.to_string(),
        })?;
        let fields: Vec<&str> = fen.split_whitespace().collect();
        let clock = |idx: usize, default: u32| -> Result<u32, SearchError> {
            match fields.get(idx) {
                None => Ok(default),
                Some(s) => s.parse::<u32>().map_err(|_| SearchError::InvalidPosition {
                    fen: fen.to_string(),
                    reason: format!("bad move counter `{s}`"),
                }),
            }
        };
        let mut pos = Self::from_board(board);
        pos.halfmove_clock = clock(4, 0)?;
        pos.fullmove_number = clock(5, 1)?.max(1);
        Ok(pos)
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Number of moves made since construction.
    pub fn game_ply(&self) -> usize {
        self.undo.len()
    }

    /// Plays a move given in coordinate notation (`e2e4`, `e7e8q`).
    pub fn apply_uci(&mut self, s: &str) -> Result<ChessMove, SearchError> {
        let mv = parse_uci_move(s)
            .filter(|&mv| self.board.legal(mv))
            .ok_or_else(|| SearchError::InvalidMove {
                mv: s.to_string(),
                fen: self.to_fen(),
            })?;
        self.make_move(mv);
        Ok(mv)
    }

    /// Same position with colours swapped and the board flipped vertically.
    pub fn color_mirrored(&self) -> Result<Self, SearchError> {
        Self::from_fen(&mirror_fen(&self.to_fen()))
    }

    fn repetitions(&self) -> usize {
        let current = self.board.get_hash();
        // Only positions since the last irreversible move can repeat.
        let window = (self.halfmove_clock as usize + 1).min(self.keys.len());
        self.keys[self.keys.len() - window..]
            .iter()
            .filter(|&&k| k == current)
            .count()
    }
}

impl Position for ChessPosition {
    fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    fn hash_key(&self) -> u64 {
        self.board.get_hash()
    }

    fn legal_moves(&self) -> Vec<ChessMove> {
        MoveGen::new_legal(&self.board).collect()
    }

    fn make_move(&mut self, mv: ChessMove) {
        let irreversible =
            self.board.piece_on(mv.get_source()) == Some(Piece::Pawn) || is_capture(&self.board, mv);
        self.undo.push(Undo {
            board: self.board,
            mv,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        });
        if self.board.side_to_move() == Color::Black {
            self.fullmove_number += 1;
        }
        self.halfmove_clock = if irreversible { 0 } else { self.halfmove_clock + 1 };
        self.board = self.board.make_move_new(mv);
        self.keys.push(self.board.get_hash());
    }

    fn unmake_move(&mut self, mv: ChessMove) {
        let Some(undo) = self.undo.pop() else {
            debug_assert!(false, "unmake_move({mv}) without a matching make_move");
            return;
        };
        debug_assert_eq!(undo.mv, mv, "unmake_move out of order");
        self.board = undo.board;
        self.halfmove_clock = undo.halfmove_clock;
        self.fullmove_number = undo.fullmove_number;
        self.keys.pop();
    }

    fn is_in_check(&self) -> bool {
        self.board.checkers().popcnt() > 0
    }

    fn is_draw(&self) -> bool {
        self.halfmove_clock >= 100 || insufficient_material(&self.board) || self.repetitions() >= 3
    }

    fn board(&self) -> &Board {
        &self.board
    }

    fn to_fen(&self) -> String {
        let fen = self.board.to_string();
        let head: Vec<&str> = fen.split_whitespace().take(4).collect();
        format!("{} {} {}", head.join(" "), self.halfmove_clock, self.fullmove_number)
    }

    fn is_checkmate(&self) -> bool {
        self.board.status() == BoardStatus::Checkmate
    }

    fn is_stalemate(&self) -> bool {
        self.board.status() == BoardStatus::Stalemate
    }

    fn is_legal(&self, mv: ChessMove) -> bool {
        self.board.legal(mv)
    }
}

/// Flips a FEN vertically and swaps the colours of every piece, the side to
/// move, the castling rights and the en-passant square.
pub fn mirror_fen(fen: &str) -> String {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    let swap_case = |c: char| {
        if c.is_ascii_uppercase() {
            c.to_ascii_lowercase()
        } else {
            c.to_ascii_uppercase()
        }
    };

    let placement = fields
        .first()
        .map(|p| {
            p.split('/')
                .rev()
                .map(|rank| rank.chars().map(swap_case).collect::<String>())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default();

    let side = match fields.get(1) {
        Some(&"b") => "w",
        _ => "b",
    };

    let castling = match fields.get(2) {
        Some(&"-") | None => "-".to_string(),
        Some(rights) => {
            let swapped: Vec<char> = rights.chars().map(swap_case).collect();
            "KQkq".chars().filter(|c| swapped.contains(c)).collect()
        }
    };

    let en_passant = match fields.get(3) {
        Some(ep) if ep.len() == 2 => {
            let mut chars = ep.chars();
            let file = chars.next().unwrap_or('a');
            let rank = match chars.next() {
                Some(r @ '1'..='8') => (b'1' + b'8' - r as u8) as char,
                _ => '-',
            };
            if rank == '-' { "-".to_string() } else { format!("{file}{rank}") }
        }
        _ => "-".to_string(),
    };

    let halfmove = fields.get(4).copied().unwrap_or("0");
    let fullmove = fields.get(5).copied().unwrap_or("1");
    format!("{placement} {side} {castling} {en_passant} {halfmove} {fullmove}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Square;

    #[test]
    fn startpos_has_twenty_moves() {
        let pos = ChessPosition::startpos();
        assert_eq!(pos.legal_moves().len(), 20);
        assert_eq!(pos.side_to_move(), Color::White);
        assert!(!pos.is_in_check());
        assert!(!pos.is_draw());
    }

    #[test]
    fn invalid_fen_is_reported() {
        let err = ChessPosition::from_fen("not a fen").unwrap_err();
        assert!(matches!(err, SearchError::InvalidPosition { .. }));
    }

    #[test]
    fn make_unmake_restores_everything() {
        let mut pos = ChessPosition::startpos();
        let key = pos.hash_key();
        let fen = pos.to_fen();
        let mv = ChessMove::new(Square::G1, Square::F3, None);
        pos.make_move(mv);
        assert_ne!(pos.hash_key(), key);
        assert_eq!(pos.halfmove_clock(), 1);
        pos.unmake_move(mv);
        assert_eq!(pos.hash_key(), key);
        assert_eq!(pos.to_fen(), fen);
    }

    #[test]
    fn guard_unmakes_on_drop() {
        let mut pos = ChessPosition::startpos();
        let key = pos.hash_key();
        {
            let guard = MoveGuard::new(&mut pos, ChessMove::new(Square::E2, Square::E4, None));
            assert_eq!(guard.side_to_move(), Color::Black);
        }
        assert_eq!(pos.hash_key(), key);
        assert_eq!(pos.game_ply(), 0);
    }

    #[test]
    fn threefold_repetition_is_a_draw() {
        let mut pos = ChessPosition::startpos();
        for _ in 0..2 {
            for m in ["g1f3", "g8f6", "f3g1", "f6g8"] {
                pos.apply_uci(m).unwrap();
            }
        }
        assert!(pos.is_draw());
    }

    #[test]
    fn fifty_move_rule_from_fen_clock() {
        let pos = ChessPosition::from_fen("4k3/8/8/8/8/8/4P3/4K2R w - - 100 80").unwrap();
        assert!(pos.is_draw());
        let pos = ChessPosition::from_fen("4k3/8/8/8/8/8/4P3/4K2R w - - 99 80").unwrap();
        assert!(!pos.is_draw());
    }

    #[test]
    fn apply_uci_rejects_illegal_move() {
        let mut pos = ChessPosition::startpos();
        let err = pos.apply_uci("e2e5").unwrap_err();
        assert!(matches!(err, SearchError::InvalidMove { .. }));
        assert_eq!(pos.game_ply(), 0);
    }

    #[test]
    fn checkmate_and_stalemate_queries() {
        let mate = ChessPosition::from_fen("R5k1/5ppp/8/8/8/8/8/6K1 b - - 1 1").unwrap();
        assert!(mate.is_checkmate());
        assert!(!mate.is_stalemate());
        let stale = ChessPosition::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(stale.is_stalemate());
    }

    #[test]
    fn mirror_fen_swaps_colours() {
        assert_eq!(
            mirror_fen("4k3/8/8/3Pp3/8/8/8/4K2R w K e6 0 2"),
            "4k2r/8/8/8/3pP3/8/8/4K3 b k e3 0 2"
        );
        assert_eq!(mirror_fen(START_FEN), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1");
    }
}
