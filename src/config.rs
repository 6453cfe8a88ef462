use std::time::Duration;

use crate::error::SearchError;
use crate::types::*;

/// Evaluation weights in centipawns. Piece values and piece-square tables are
/// fixed in `types`; everything here can be tuned or switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalWeights {
    pub piece_square: bool,
    pub passed_pawn_scale: i32,
    pub doubled_pawn: i32,
    pub isolated_pawn: i32,
    pub shield_missing_pawn: i32,
    pub king_open_file: i32,
    pub mobility: i32,
    pub center_attack: i32,
    pub center_occupation: i32,
    pub tempo: i32,
    /// Per own piece attacking a friendly non-king piece.
    pub coordination: i32,
    /// Extra per defender when the defended piece stands on c3-f6.
    pub coordination_center: i32,
    /// Per unit of closeness (8 - distance) of a minor or major piece hitting
    /// the enemy king. Ignored in endgames.
    pub king_tropism: i32,
    /// Percent of its value lost by a piece attacking two squares or fewer.
    pub trapped_piece: i32,
    /// Flat penalty for a bishop attacking three squares or fewer.
    pub trapped_bishop: i32,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            piece_square: true,
            passed_pawn_scale: 1,
            doubled_pawn: 15,
            isolated_pawn: 10,
            shield_missing_pawn: 10,
            king_open_file: 15,
            mobility: 2,
            center_attack: 4,
            center_occupation: 8,
            tempo: 10,
            coordination: 3,
            coordination_center: 2,
            king_tropism: 2,
            trapped_piece: 10,
            trapped_bishop: 20,
        }
    }
}

impl EvalWeights {
    /// Material only: every positional term is zero.
    pub fn material_only() -> Self {
        Self {
            piece_square: false,
            passed_pawn_scale: 0,
            doubled_pawn: 0,
            isolated_pawn: 0,
            shield_missing_pawn: 0,
            king_open_file: 0,
            mobility: 0,
            center_attack: 0,
            center_occupation: 0,
            tempo: 0,
            coordination: 0,
            coordination_center: 0,
            king_tropism: 0,
            trapped_piece: 0,
            trapped_bishop: 0,
        }
    }
}

/// Per-call search configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub target_depth: u32,
    pub time_budget: Option<Duration>,
    /// Transposition table size in entries.
    pub tt_capacity: usize,
    /// Number of plies the killer table tracks.
    pub killer_plies: usize,
    pub quiescence_depth_cap: u32,
    pub quiescence_checks: bool,
    pub node_limit: Option<u64>,
    pub aspiration_window: Option<i32>,
    pub eval: EvalWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            target_depth: DEFAULT_DEPTH,
            time_budget: None,
            tt_capacity: DEFAULT_TT_CAPACITY,
            killer_plies: MAX_PLY,
            quiescence_depth_cap: DEFAULT_QUIESCENCE_CAP,
            quiescence_checks: false,
            node_limit: None,
            aspiration_window: Some(ASP_WINDOW),
            eval: EvalWeights::default(),
        }
    }
}

impl SearchConfig {
    pub fn with_depth(depth: u32) -> Self {
        Self { target_depth: depth, ..Self::default() }
    }

    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn tt_capacity(mut self, entries: usize) -> Self {
        self.tt_capacity = entries;
        self
    }

    pub fn node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    pub fn quiescence_depth_cap(mut self, cap: u32) -> Self {
        self.quiescence_depth_cap = cap;
        self
    }

    pub fn quiescence_checks(mut self, enabled: bool) -> Self {
        self.quiescence_checks = enabled;
        self
    }

    pub fn aspiration_window(mut self, window: Option<i32>) -> Self {
        self.aspiration_window = window;
        self
    }

    pub fn eval_weights(mut self, eval: EvalWeights) -> Self {
        self.eval = eval;
        self
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.target_depth == 0 {
            return Err(SearchError::InvalidConfig("target depth must be positive".into()));
        }
        if self.target_depth as usize >= MAX_PLY {
            return Err(SearchError::InvalidConfig(format!(
                "target depth {} exceeds the maximum of {}",
                self.target_depth,
                MAX_PLY - 1
            )));
        }
        if self.tt_capacity == 0 {
            return Err(SearchError::InvalidConfig("transposition table capacity must be positive".into()));
        }
        if self.tt_capacity > MAX_TT_CAPACITY {
            return Err(SearchError::InvalidConfig(format!(
                "transposition table capacity {} exceeds the maximum of {} entries",
                self.tt_capacity, MAX_TT_CAPACITY
            )));
        }
        if self.killer_plies == 0 {
            return Err(SearchError::InvalidConfig("killer table needs at least one ply".into()));
        }
        if matches!(self.aspiration_window, Some(w) if w <= 0) {
            return Err(SearchError::InvalidConfig("aspiration window must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_depth_is_rejected() {
        let err = SearchConfig::with_depth(0).validate().unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfig(_)));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(SearchConfig::with_depth(3).tt_capacity(0).validate().is_err());
        assert!(SearchConfig::with_depth(3)
            .aspiration_window(Some(0))
            .validate()
            .is_err());
    }

    #[test]
    fn oversized_table_is_rejected() {
        let err = SearchConfig::with_depth(3).tt_capacity(usize::MAX).validate().unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfig(_)));
        assert!(SearchConfig::with_depth(3).tt_capacity(MAX_TT_CAPACITY).validate().is_ok());
    }

    #[test]
    fn quiescence_checks_builder() {
        assert!(!SearchConfig::default().quiescence_checks);
        assert!(SearchConfig::with_depth(2).quiescence_checks(true).quiescence_checks);
    }
}
