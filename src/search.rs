use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chess::ChessMove;

use crate::config::SearchConfig;
use crate::eval::Evaluator;
use crate::ordering::{KillerTable, MoveOrderer};
use crate::position::{MoveGuard, Position};
use crate::tt::{from_tt, to_tt, Bound, TT};
use crate::types::*;

/// Deadline polling interval, in nodes.
const TIME_CHECK_MASK: u64 = 1023;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Every node visited, quiescence included.
    pub nodes: u64,
    pub qnodes: u64,
    pub tt_hits: u64,
    pub cutoffs: u64,
    pub seldepth: usize,
}

/// Alpha-beta searcher. Owns the transposition and killer tables for the
/// duration of a call; the iterative-deepening loop lives in `engine`.
pub struct Search {
    pub tt: TT,
    pub killers: KillerTable,
    pub stats: SearchStats,
    eval: Evaluator,
    stop: Arc<AtomicBool>,
    deadline: Option<Instant>,
    node_limit: Option<u64>,
    q_cap: u32,
    q_checks: bool,
    aborted: bool,
    pv: Vec<Vec<ChessMove>>,
}

impl Search {
    pub fn new(config: &SearchConfig, stop: Arc<AtomicBool>) -> Self {
        Self {
            tt: TT::new(config.tt_capacity),
            killers: KillerTable::new(config.killer_plies),
            stats: SearchStats::default(),
            eval: Evaluator::new(config.eval),
            stop,
            deadline: None,
            node_limit: config.node_limit,
            q_cap: config.quiescence_depth_cap,
            q_checks: config.quiescence_checks,
            aborted: false,
            pv: vec![Vec::new(); MAX_PLY + 1],
        }
    }

    /// Resets per-call state. The transposition table survives unless the
    /// requested capacity changed.
    pub fn prepare(&mut self, config: &SearchConfig, deadline: Option<Instant>) {
        self.tt.resize(config.tt_capacity);
        if self.killers.plies() == config.killer_plies {
            self.killers.clear();
        } else {
            self.killers.resize(config.killer_plies);
        }
        self.stats = SearchStats::default();
        self.eval = Evaluator::new(config.eval);
        self.deadline = deadline;
        self.node_limit = config.node_limit;
        self.q_cap = config.quiescence_depth_cap;
        self.q_checks = config.quiescence_checks;
        self.aborted = false;
        self.pv.iter_mut().for_each(Vec::clear);
    }

    #[inline]
    pub fn evaluator(&self) -> &Evaluator {
        &self.eval
    }

    #[inline]
    pub fn aborted(&self) -> bool {
        self.aborted
    }

    #[inline]
    fn should_stop(&mut self) -> bool {
        if self.aborted {
            return true;
        }
        if self.stop.load(Ordering::Relaxed) {
            self.aborted = true;
        } else if matches!(self.node_limit, Some(limit) if self.stats.nodes >= limit) {
            self.aborted = true;
        } else if let Some(deadline) = self.deadline {
            if self.stats.nodes & TIME_CHECK_MASK == 0 && Instant::now() >= deadline {
                self.aborted = true;
            }
        }
        self.aborted
    }

    #[inline]
    fn enter(&mut self, ply: usize) {
        self.stats.nodes += 1;
        self.stats.seldepth = self.stats.seldepth.max(ply);
        self.pv[ply].clear();
    }

    fn update_pv(&mut self, ply: usize, mv: ChessMove) {
        let (head, tail) = self.pv.split_at_mut(ply + 1);
        let line = &mut head[ply];
        line.clear();
        line.push(mv);
        line.extend_from_slice(&tail[0]);
    }

    /// Searches the root to `depth`. The score is meaningless if
    /// `aborted()` is set afterwards.
    pub fn root<P: Position + ?Sized>(&mut self, pos: &mut P, depth: u32, alpha: i32, beta: i32) -> i32 {
        self.negamax(pos, depth as i32, alpha, beta, 0)
    }

    pub fn negamax<P: Position + ?Sized>(
        &mut self,
        pos: &mut P,
        depth: i32,
        mut alpha: i32,
        beta: i32,
        ply: usize,
    ) -> i32 {
        if depth <= 0 {
            return self.qsearch(pos, alpha, beta, ply, 0);
        }
        if self.should_stop() {
            return 0;
        }
        self.enter(ply);

        if ply > 0 && pos.is_draw() {
            return DRAW;
        }
        if ply >= MAX_PLY - 1 {
            return self.eval.evaluate_relative(pos.board());
        }

        // TT lookup
        let key = pos.hash_key();
        let mut tt_move = None;
        if let Some(tte) = self.tt.probe(key) {
            tt_move = tte.best_move();
            let tt_score = from_tt(tte.score, ply as i32);
            if ply > 0 && tte.cuts(depth, tt_score, alpha, beta) {
                self.stats.tt_hits += 1;
                return tt_score;
            }
        }

        let mut moves = pos.legal_moves();
        if moves.is_empty() {
            return if pos.is_in_check() { -(MATE - ply as i32) } else { DRAW };
        }
        MoveOrderer { killers: &self.killers }.order(pos.board(), &mut moves, ply, tt_move);

        let orig_alpha = alpha;
        let mut best_score = -INF;
        let mut best_move: Option<ChessMove> = None;

        for m in moves {
            let quiet = !is_capture(pos.board(), m);
            let score = {
                let mut child = MoveGuard::new(&mut *pos, m);
                -self.negamax(&mut *child, depth - 1, -beta, -alpha, ply + 1)
            };
            if self.aborted {
                return 0;
            }

            if score > best_score {
                best_score = score;
                best_move = Some(m);
            }
            if score > alpha {
                alpha = score;
                self.update_pv(ply, m);
                if alpha >= beta {
                    self.stats.cutoffs += 1;
                    if quiet {
                        self.killers.record(ply, m);
                    }
                    break;
                }
            }
        }

        let bound = if best_score <= orig_alpha {
            Bound::Upper
        } else if best_score >= beta {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.tt.store(key, depth, to_tt(best_score, ply as i32), bound, best_move);
        best_score
    }

    /// Captures and queen promotions below the horizon, plus checking moves
    /// when `quiescence_checks` is set. Standing pat bounds the score from
    /// below unless the side to move is in check, in which case every evasion
    /// is tried.
    pub fn qsearch<P: Position + ?Sized>(
        &mut self,
        pos: &mut P,
        mut alpha: i32,
        beta: i32,
        ply: usize,
        qdepth: u32,
    ) -> i32 {
        if self.should_stop() {
            return 0;
        }
        self.enter(ply);
        self.stats.qnodes += 1;

        if ply > 0 && pos.is_draw() {
            return DRAW;
        }

        let mut moves = pos.legal_moves();
        let in_check = pos.is_in_check();
        if moves.is_empty() {
            return if in_check { -(MATE - ply as i32) } else { DRAW };
        }

        let stand = self.eval.evaluate_relative(pos.board());
        if qdepth >= self.q_cap || ply >= MAX_PLY - 1 {
            return stand;
        }

        if in_check {
            MoveOrderer { killers: &self.killers }.order(pos.board(), &mut moves, ply, None);
        } else {
            if stand >= beta {
                return beta;
            }
            if stand > alpha {
                alpha = stand;
            }
            MoveOrderer::noisy(pos.board(), &mut moves, self.q_checks);
        }

        for m in moves {
            let score = {
                let mut child = MoveGuard::new(&mut *pos, m);
                -self.qsearch(&mut *child, -beta, -alpha, ply + 1, qdepth + 1)
            };
            if self.aborted {
                return 0;
            }
            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }
        alpha
    }

    /// Root line from the last completed search, extended through the
    /// transposition table when a cutoff truncated it. Every move is checked
    /// for legality before it is appended.
    pub fn principal_variation<P: Position + ?Sized>(&self, pos: &mut P, max_len: usize) -> Vec<ChessMove> {
        let mut line: Vec<ChessMove> = Vec::with_capacity(max_len);
        for &m in &self.pv[0] {
            if line.len() >= max_len || !pos.is_legal(m) {
                break;
            }
            pos.make_move(m);
            line.push(m);
        }
        while line.len() < max_len && !pos.is_draw() {
            let Some(m) = self.tt.probe(pos.hash_key()).and_then(|e| e.best_move()) else {
                break;
            };
            if !pos.is_legal(m) {
                break;
            }
            pos.make_move(m);
            line.push(m);
        }
        for &m in line.iter().rev() {
            pos.unmake_move(m);
        }
        line
    }
}
