use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use chess::{ChessMove, Square};
use engine::{
    choose_move, ChessPosition, Engine, EvalWeights, Position, SearchConfig, SearchError, MATE, MATE_THRESHOLD,
};

fn pos(fen: &str) -> ChessPosition {
    ChessPosition::from_fen(fen).unwrap()
}

#[test]
fn startpos_depth_four_is_balanced() {
    let mut p = ChessPosition::startpos();
    let r = choose_move(&mut p, &SearchConfig::with_depth(4)).unwrap();
    assert!(p.is_legal(r.best_move));
    assert!(r.score.abs() <= 50, "score {}", r.score);
    assert_eq!(r.depth_reached, 4);
    assert!(r.complete);
    assert!(!r.principal_variation.is_empty());
    assert_eq!(r.principal_variation[0], r.best_move);
    // Caller's position is untouched.
    assert_eq!(p.to_fen(), ChessPosition::startpos().to_fen());
}

#[test]
fn finds_back_rank_mate_in_one() {
    let mut p = pos("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
    let r = choose_move(&mut p, &SearchConfig::with_depth(3)).unwrap();
    assert_eq!(r.best_move, ChessMove::new(Square::A1, Square::A8, None));
    assert!(r.score >= MATE_THRESHOLD);
    assert_eq!(r.score, MATE - 1);
    assert_eq!(r.principal_variation.len(), 1);
}

#[test]
fn rook_and_king_mate_on_the_edge() {
    let mut p = pos("1R6/8/8/8/8/8/k1K5/8 w - - 42 22");
    let r = choose_move(&mut p, &SearchConfig::with_depth(6)).unwrap();
    assert_eq!(r.best_move, ChessMove::new(Square::B8, Square::A8, None));
    assert_eq!(r.mate_in(), Some(1));
    assert_eq!(r.depth_reached, 1);
}

#[test]
fn finds_rook_ladder_mate_in_two() {
    let mut p = pos("7k/8/8/8/8/8/1R6/R5K1 w - - 0 1");
    let r = choose_move(&mut p, &SearchConfig::with_depth(5)).unwrap();
    assert_eq!(r.score, MATE - 3);
    assert_eq!(r.mate_in(), Some(2));
    assert_eq!(r.principal_variation.len(), 3);

    for &m in &r.principal_variation {
        assert!(p.is_legal(m), "{m} illegal in {}", p.to_fen());
        p.make_move(m);
    }
    assert!(p.is_checkmate());
}

#[test]
fn defends_against_mate_when_possible() {
    // Black to move must give the king air or cover the back rank.
    let mut p = pos("6k1/5ppp/8/8/8/8/5PPP/R5K1 b - - 0 1");
    let r = choose_move(&mut p, &SearchConfig::with_depth(3)).unwrap();
    assert!(r.score > -MATE_THRESHOLD);
}

#[test]
fn mated_side_reports_negative_mate() {
    // Only move Kg8 and then Ra8 mates.
    let mut p = pos("7k/1R6/8/8/8/8/8/R5K1 b - - 0 1");
    let r = choose_move(&mut p, &SearchConfig::with_depth(4)).unwrap();
    assert_eq!(r.score, -(MATE - 2));
    assert_eq!(r.mate_in(), Some(-1));
}

#[test]
fn search_is_deterministic() {
    let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
    let config = SearchConfig::with_depth(4);
    let a = choose_move(&mut pos(fen), &config).unwrap();
    let b = choose_move(&mut pos(fen), &config).unwrap();
    assert_eq!(a.best_move, b.best_move);
    assert_eq!(a.score, b.score);
    assert_eq!(a.nodes, b.nodes);
    assert_eq!(a.principal_variation, b.principal_variation);
}

#[test]
fn interrupted_search_returns_last_completed_depth() {
    let fen = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
    let five = choose_move(&mut pos(fen), &SearchConfig::with_depth(5)).unwrap();
    assert!(five.complete);

    // Enough nodes to finish depth 5 but not depth 6.
    let config = SearchConfig::with_depth(6).node_limit(five.nodes + 10);
    let r = choose_move(&mut pos(fen), &config).unwrap();
    assert!(!r.complete);
    assert_eq!(r.depth_reached, 5);
    assert_eq!(r.best_move, five.best_move);
    assert_eq!(r.score, five.score);
}

#[test]
fn time_budget_cuts_search_short() {
    let mut p = ChessPosition::startpos();
    let config = SearchConfig::with_depth(40).time_budget(Duration::from_millis(1));
    let r = choose_move(&mut p, &config).unwrap();
    assert!(!r.complete);
    assert!(r.depth_reached < 40);
    assert!(p.is_legal(r.best_move));
}

#[test]
fn stop_flag_from_another_thread() {
    let mut engine = Engine::new(SearchConfig::with_depth(60)).unwrap();
    let stop = engine.stop_handle();
    let mut p = ChessPosition::startpos();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        stop.store(true, Ordering::Relaxed);
    });
    let r = engine.choose_move(&mut p).unwrap();
    stopper.join().unwrap();

    assert!(!r.complete);
    assert!(p.is_legal(r.best_move));
    assert_eq!(p.game_ply(), 0);
}

#[test]
fn no_legal_moves_is_an_error() {
    let mut stalemate = pos("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
    let err = choose_move(&mut stalemate, &SearchConfig::with_depth(2)).unwrap_err();
    assert!(matches!(err, SearchError::NoLegalMoves { .. }));
}

#[test]
fn zero_depth_is_invalid() {
    let err = choose_move(&mut ChessPosition::startpos(), &SearchConfig::with_depth(0)).unwrap_err();
    assert!(matches!(err, SearchError::InvalidConfig(_)));
}

#[test]
fn wins_hanging_queen() {
    let mut p = pos("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1");
    let config = SearchConfig::with_depth(2).eval_weights(EvalWeights::material_only());
    let r = choose_move(&mut p, &config).unwrap();
    assert_eq!(r.best_move, ChessMove::new(Square::D1, Square::D5, None));
    assert_eq!(r.score, 500);
}

#[test]
fn reused_engine_keeps_answering_legally() {
    let mut engine = Engine::new(SearchConfig::with_depth(3)).unwrap();
    let mut p = ChessPosition::startpos();
    for _ in 0..6 {
        let r = engine.choose_move(&mut p).unwrap();
        assert!(p.is_legal(r.best_move));
        p.make_move(r.best_move);
    }
    assert_eq!(p.game_ply(), 6);
}

#[test]
fn color_mirror_gives_mirrored_result() {
    let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
    let config = SearchConfig::with_depth(3);
    let mut p = pos(fen);
    let mut m = p.color_mirrored().unwrap();
    let a = choose_move(&mut p, &config).unwrap();
    let b = choose_move(&mut m, &config).unwrap();
    assert_eq!(a.score, b.score);
}
