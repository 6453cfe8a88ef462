use chess::ChessMove;

use crate::types::{pack_move, unpack_move, MATE_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Score fell strictly inside the search window.
    Exact,
    /// Beta cutoff: true value >= score.
    Lower,
    /// Nothing raised alpha: true value <= score.
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTEntry {
    pub key: u64,
    pub depth: i16,
    pub score: i32,
    pub bound: Bound,
    pub best: u16,
}

impl TTEntry {
    #[inline]
    pub fn best_move(&self) -> Option<ChessMove> {
        unpack_move(self.best)
    }

    /// Whether this entry alone settles a node searched to `depth` with
    /// window `(alpha, beta)`. `score` must already be ply-adjusted.
    #[inline]
    pub fn cuts(&self, depth: i32, score: i32, alpha: i32, beta: i32) -> bool {
        if (self.depth as i32) < depth {
            return false;
        }
        match self.bound {
            Bound::Exact => true,
            Bound::Lower => score >= beta,
            Bound::Upper => score <= alpha,
        }
    }
}

/// Direct-mapped transposition table, slot = `key % capacity`.
pub struct TT {
    slots: Vec<Option<TTEntry>>,
    used: usize,
}

impl TT {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            used: 0,
        }
    }

    /// Slot count that fits in `tt_mb` megabytes.
    pub fn entries_for_mb(tt_mb: usize) -> usize {
        let entry_sz = std::mem::size_of::<Option<TTEntry>>().max(1);
        (tt_mb.saturating_mul(1024 * 1024) / entry_sz).max(1)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn idx(&self, key: u64) -> usize {
        (key % self.slots.len() as u64) as usize
    }

    /// Returns the slot's entry only if its full key matches.
    pub fn probe(&self, key: u64) -> Option<TTEntry> {
        self.slots[self.idx(key)].filter(|e| e.key == key)
    }

    /// Another key in the slot is always replaced; the same key is replaced
    /// only by an equal or deeper search.
    pub fn store(&mut self, key: u64, depth: i32, score: i32, bound: Bound, best: Option<ChessMove>) {
        let i = self.idx(key);
        let slot = &mut self.slots[i];
        match slot {
            Some(e) if e.key == key && (depth as i16) < e.depth => return,
            Some(_) => {}
            None => self.used += 1,
        }
        *slot = Some(TTEntry {
            key,
            depth: depth as i16,
            score,
            bound,
            best: best.map(pack_move).unwrap_or(0),
        });
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.used = 0;
    }

    /// Occupied slots in permille.
    pub fn hashfull(&self) -> usize {
        self.used * 1000 / self.slots.len()
    }

    /// Resizes, dropping every entry, when the requested capacity differs.
    pub fn resize(&mut self, capacity: usize) {
        if capacity.max(1) != self.slots.len() {
            *self = Self::new(capacity);
        }
    }
}

// Mate scores are stored relative to the node, read back relative to the root.
#[inline]
pub fn to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}
#[inline]
pub fn from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}
