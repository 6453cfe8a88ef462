use std::cmp::Reverse;

use chess::{Board, ChessMove, Piece};

use crate::types::*;

/// Two quiet cutoff moves per ply, newest first.
#[derive(Debug, Clone)]
pub struct KillerTable {
    slots: Vec<[Option<ChessMove>; 2]>,
}

impl KillerTable {
    pub fn new(plies: usize) -> Self {
        Self { slots: vec![[None; 2]; plies] }
    }

    pub fn plies(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = [None; 2]);
    }

    pub fn resize(&mut self, plies: usize) {
        self.slots = vec![[None; 2]; plies];
    }

    /// Callers only pass quiet moves that caused a beta cutoff. The older of
    /// the two killers is evicted.
    pub fn record(&mut self, ply: usize, mv: ChessMove) {
        let Some(slot) = self.slots.get_mut(ply) else { return };
        if slot[0] == Some(mv) {
            return;
        }
        slot[1] = slot[0];
        slot[0] = Some(mv);
    }

    pub fn query(&self, ply: usize) -> [Option<ChessMove>; 2] {
        self.slots.get(ply).copied().unwrap_or([None; 2])
    }
}

// Ordering classes, highest first.
const HASH_MOVE: i32 = 4;
const CAPTURE: i32 = 3;
const KILLER: i32 = 2;
const QUIET: i32 = 1;

pub struct MoveOrderer<'a> {
    pub killers: &'a KillerTable,
}

impl<'a> MoveOrderer<'a> {
    /// MVV-LVA: victim value minus attacker value. The king has no material
    /// value, so king captures rank as "least valuable attacker".
    #[inline]
    pub fn mvv_lva(b: &Board, mv: ChessMove) -> i32 {
        let Some(victim) = captured_piece(b, mv) else { return 0 };
        let attacker = b.piece_on(mv.get_source()).unwrap_or(Piece::Pawn);
        piece_val(victim) - piece_val(attacker)
    }

    fn key(&self, b: &Board, mv: ChessMove, ply: usize, tt_move: Option<ChessMove>) -> (i32, i32) {
        if tt_move == Some(mv) {
            return (HASH_MOVE, 0);
        }
        if is_capture(b, mv) {
            return (CAPTURE, Self::mvv_lva(b, mv));
        }
        match self.killers.query(ply) {
            [Some(k), _] if k == mv => (KILLER, 1),
            [_, Some(k)] if k == mv => (KILLER, 0),
            _ => (QUIET, 0),
        }
    }

    /// Reorders `moves` in place: hash move, captures by MVV-LVA, this ply's
    /// killers, then the quiet moves in their original order. A hint that is
    /// not among `moves` matches nothing and is ignored.
    pub fn order(&self, b: &Board, moves: &mut [ChessMove], ply: usize, tt_move: Option<ChessMove>) {
        moves.sort_by_key(|&m| Reverse(self.key(b, m, ply, tt_move)));
    }

    /// Captures and promotions for quiescence, best MVV-LVA first.
    pub fn noisy(b: &Board, moves: &mut Vec<ChessMove>, with_checks: bool) {
        moves.retain(|&m| {
            is_capture(b, m) || m.get_promotion() == Some(Piece::Queen) || (with_checks && gives_check(b, m))
        });
        moves.sort_by_key(|&m| {
            let promo = m.get_promotion().map(piece_val).unwrap_or(0);
            Reverse(Self::mvv_lva(b, m) + promo)
        });
    }
}
