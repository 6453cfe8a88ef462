//! Iterative deepening driver
//!
//! Runs the searcher at depths `1..=target_depth`, keeps the last fully
//! searched depth, and turns an interrupted call into the best answer found
//! so far.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chess::ChessMove;
use log::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::ordering::MoveOrderer;
use crate::position::Position;
use crate::search::Search;
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub best_move: ChessMove,
    /// Centipawns from the side to move's point of view.
    pub score: i32,
    /// Deepest fully completed iteration, 0 for the fallback move.
    pub depth_reached: u32,
    pub nodes: u64,
    pub principal_variation: Vec<ChessMove>,
    /// False when the call was cut short before reaching the target depth.
    pub complete: bool,
    pub seldepth: usize,
    pub elapsed: Duration,
}

impl SearchResult {
    pub fn is_mate(&self) -> bool {
        self.score.abs() >= MATE_THRESHOLD
    }

    /// Moves until mate, positive when the side to move delivers it.
    pub fn mate_in(&self) -> Option<i32> {
        if !self.is_mate() {
            return None;
        }
        let plies = MATE - self.score.abs();
        let moves = (plies + 1) / 2;
        Some(if self.score > 0 { moves } else { -moves })
    }

    pub fn pv_string(&self) -> String {
        self.principal_variation
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Reusable search front end. The transposition table survives between
/// calls until [`Engine::new_game`].
pub struct Engine {
    config: SearchConfig,
    search: Search,
    stop: Arc<AtomicBool>,
}

impl Engine {
    /// Validates `config` before the transposition table is allocated.
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let stop = Arc::new(AtomicBool::new(false));
        let search = Search::new(&config, Arc::clone(&stop));
        Ok(Self { config, search, stop })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Takes effect from the next call.
    pub fn set_target_depth(&mut self, depth: u32) {
        self.config.target_depth = depth;
    }

    /// Setting the flag makes a running call return its last completed depth.
    /// A call started while the flag is set returns the fallback move at once.
    /// Every call clears the flag when it returns.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn new_game(&mut self) {
        self.search.tt.clear();
        self.search.killers.clear();
    }

    /// Transposition table occupancy in permille.
    pub fn hashfull(&self) -> usize {
        self.search.tt.hashfull()
    }

    pub fn choose_move<P: Position + ?Sized>(&mut self, pos: &mut P) -> Result<SearchResult, SearchError> {
        let result = self.run(pos);
        self.stop.store(false, Ordering::Relaxed);
        result
    }

    fn run<P: Position + ?Sized>(&mut self, pos: &mut P) -> Result<SearchResult, SearchError> {
        let config = self.config.clone();
        config.validate()?;

        let start = Instant::now();
        let deadline = config.time_budget.map(|budget| start + budget);

        let root_moves = pos.legal_moves();
        if root_moves.is_empty() {
            return Err(SearchError::NoLegalMoves { fen: pos.to_fen() });
        }

        self.search.prepare(&config, deadline);

        let mut best: Option<SearchResult> = None;
        let mut interrupted = false;
        let mut prev_score: Option<i32> = None;

        for depth in 1..=config.target_depth {
            if depth > 1 && deadline.is_some_and(|d| Instant::now() >= d) {
                debug!("time budget spent before depth {depth}");
                interrupted = true;
                break;
            }

            let Some(score) = self.iterate(pos, depth, prev_score, config.aspiration_window) else {
                debug!("depth {depth} aborted after {} nodes", self.search.stats.nodes);
                interrupted = true;
                break;
            };

            let pv = self.search.principal_variation(pos, depth as usize);
            let best_move = match pv.first() {
                Some(&m) => m,
                None => self.fallback_move(&*pos, &root_moves),
            };
            let stats = self.search.stats;
            info!(
                "depth {} seldepth {} score {} nodes {} qnodes {} tthits {} time {}ms pv {}",
                depth,
                stats.seldepth,
                score,
                stats.nodes,
                stats.qnodes,
                stats.tt_hits,
                start.elapsed().as_millis(),
                pv.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(" ")
            );

            best = Some(SearchResult {
                best_move,
                score,
                depth_reached: depth,
                nodes: stats.nodes,
                principal_variation: pv,
                complete: true,
                seldepth: stats.seldepth,
                elapsed: start.elapsed(),
            });
            prev_score = Some(score);

            if score.abs() >= MATE_THRESHOLD {
                debug!("mate found at depth {depth}, not deepening further");
                break;
            }
        }

        let result = match best {
            Some(mut r) => {
                r.complete = !interrupted;
                r.elapsed = start.elapsed();
                r
            }
            None => {
                let best_move = self.fallback_move(&*pos, &root_moves);
                warn!("no depth completed, falling back to {best_move}");
                SearchResult {
                    best_move,
                    score: self.search.evaluator().evaluate_relative(pos.board()),
                    depth_reached: 0,
                    nodes: self.search.stats.nodes,
                    principal_variation: vec![best_move],
                    complete: false,
                    seldepth: self.search.stats.seldepth,
                    elapsed: start.elapsed(),
                }
            }
        };
        Ok(result)
    }

    /// One depth, with aspiration re-searches. `None` if the search was
    /// aborted.
    fn iterate<P: Position + ?Sized>(
        &mut self,
        pos: &mut P,
        depth: u32,
        prev_score: Option<i32>,
        aspiration: Option<i32>,
    ) -> Option<i32> {
        let (mut alpha, mut beta, mut window) = match (prev_score, aspiration) {
            (Some(s), Some(w)) if s.abs() < MATE_THRESHOLD => (s - w, s + w, w),
            _ => (-INF, INF, ASP_MAX_WIDEN),
        };

        loop {
            let score = self.search.root(pos, depth, alpha, beta);
            if self.search.aborted() {
                return None;
            }
            let failed = (score <= alpha && alpha > -INF) || (score >= beta && beta < INF);
            if !failed {
                return Some(score);
            }

            window = window.saturating_mul(2);
            if window >= ASP_MAX_WIDEN || score.abs() >= MATE_THRESHOLD {
                alpha = -INF;
                beta = INF;
            } else {
                alpha = (score - window).max(-INF);
                beta = (score + window).min(INF);
            }
            debug!("aspiration miss at depth {depth} (score {score}), re-search [{alpha}, {beta}]");
        }
    }

    /// First root move in search order, using the table's move as a hint.
    fn fallback_move<P: Position + ?Sized>(&self, pos: &P, root_moves: &[ChessMove]) -> ChessMove {
        let tt_move = self.search.tt.probe(pos.hash_key()).and_then(|e| e.best_move());
        let mut moves = root_moves.to_vec();
        MoveOrderer { killers: &self.search.killers }.order(pos.board(), &mut moves, 0, tt_move);
        moves[0]
    }
}

/// One-shot search with a fresh engine.
pub fn choose_move<P: Position + ?Sized>(pos: &mut P, config: &SearchConfig) -> Result<SearchResult, SearchError> {
    Engine::new(config.clone())?.choose_move(pos)
}
