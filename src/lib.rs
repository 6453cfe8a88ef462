// chess-search/src/lib.rs

pub mod types;
pub mod error;
pub mod config;
pub mod position;
pub mod eval;
pub mod ordering;
pub mod tt;
pub mod search;
pub mod engine;

pub use config::{EvalWeights, SearchConfig};
pub use engine::{choose_move, Engine, SearchResult};
pub use error::SearchError;
pub use eval::{EvalBreakdown, Evaluator};
pub use ordering::{KillerTable, MoveOrderer};
pub use position::{mirror_fen, ChessPosition, MoveGuard, Position, START_FEN};
pub use search::{Search, SearchStats};
pub use tt::{Bound, TTEntry, TT};
pub use types::{DRAW, INF, MATE, MATE_THRESHOLD, MAX_PLY};
