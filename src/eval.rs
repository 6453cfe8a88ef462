use chess::{
    get_bishop_moves, get_file, get_king_moves, get_knight_moves, get_pawn_attacks, get_rank,
    get_rook_moves, BitBoard, Board, Color, File, MoveGen, Piece, Rank, Square, EMPTY,
};

use crate::config::EvalWeights;
use crate::types::*;

const CENTER: [Square; 4] = [Square::D4, Square::E4, Square::D5, Square::E5];
const PIECES: [Piece; 6] = [
    Piece::Pawn,
    Piece::Knight,
    Piece::Bishop,
    Piece::Rook,
    Piece::Queen,
    Piece::King,
];

/// Evaluation split into its terms, each from White's perspective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalBreakdown {
    pub material: i32,
    pub piece_square: i32,
    pub pawn_structure: i32,
    pub king_safety: i32,
    pub mobility: i32,
    pub center: i32,
    pub tempo: i32,
    pub coordination: i32,
    pub king_tropism: i32,
    pub trapped: i32,
}

impl EvalBreakdown {
    pub fn total(&self) -> i32 {
        self.material
            + self.piece_square
            + self.pawn_structure
            + self.king_safety
            + self.mobility
            + self.center
            + self.tempo
            + self.coordination
            + self.king_tropism
            + self.trapped
    }
}

/// Static evaluator. Scores are centipawns, positive favours White.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    pub weights: EvalWeights,
}

impl Evaluator {
    pub fn new(weights: EvalWeights) -> Self {
        Self { weights }
    }

    #[inline]
    pub fn evaluate(&self, b: &Board) -> i32 {
        clamp_score(self.breakdown(b).total())
    }

    /// Score from the point of view of the side to move.
    #[inline]
    pub fn evaluate_relative(&self, b: &Board) -> i32 {
        sign(b.side_to_move()) * self.evaluate(b)
    }

    pub fn breakdown(&self, b: &Board) -> EvalBreakdown {
        let w = &self.weights;
        let endgame = is_endgame_like(b);
        let mut e = EvalBreakdown::default();

        for color in [Color::White, Color::Black] {
            let sgn = sign(color);
            e.material += sgn * (P * count_pieces(b, Piece::Pawn, color) + non_pawn_material(b, color));
            if w.piece_square {
                e.piece_square += sgn * piece_square(b, color, endgame);
            }
            e.pawn_structure += sgn * self.pawn_structure(b, color);
            e.king_safety -= sgn * self.king_danger(b, color);
            e.center += sgn * self.center_control(b, color);
            e.coordination += sgn * self.coordination(b, color);
            e.king_tropism += sgn * self.king_tropism(b, color, endgame);
            e.trapped -= sgn * self.trapped(b, color);
        }

        e.mobility = self.mobility(b);
        e.tempo = sign(b.side_to_move()) * w.tempo;
        e
    }

    fn pawn_structure(&self, b: &Board, color: Color) -> i32 {
        let w = &self.weights;
        let ours = *b.color_combined(color) & *b.pieces(Piece::Pawn);
        let theirs = *b.color_combined(!color) & *b.pieces(Piece::Pawn);

        let mut files = [0i32; 8];
        for sq in ours {
            files[file_idx(sq) as usize] += 1;
        }

        let mut score = 0;
        for (f, &n) in files.iter().enumerate() {
            if n > 1 {
                score -= w.doubled_pawn * (n - 1);
            }
            let left = f > 0 && files[f - 1] > 0;
            let right = f < 7 && files[f + 1] > 0;
            if n > 0 && !left && !right {
                score -= w.isolated_pawn * n;
            }
        }

        if w.passed_pawn_scale != 0 {
            for sq in ours {
                if is_passed_pawn(sq, color, theirs) {
                    score += w.passed_pawn_scale * PASSED_PAWN_BONUS_BY_RANK[relative_rank(color, sq)];
                }
            }
        }
        score
    }

    /// Shield holes and open files around `color`'s king, scaled by how much
    /// attacking material the opponent still has.
    fn king_danger(&self, b: &Board, color: Color) -> i32 {
        let w = &self.weights;
        if w.shield_missing_pawn == 0 && w.king_open_file == 0 {
            return 0;
        }
        let ksq = b.king_square(color);
        let kf = file_idx(ksq);
        let kr = relative_rank(color, ksq);
        let ours = *b.color_combined(color) & *b.pieces(Piece::Pawn);

        // The two ranks in front of the king.
        let shield = [kr + 1, kr + 2]
            .into_iter()
            .filter(|&r| r < 8)
            .map(|r| if color == Color::White { r } else { 7 - r })
            .fold(EMPTY, |acc, r| acc | get_rank(Rank::from_index(r)));

        let mut missing = 0;
        let mut open = 0;
        for f in (kf - 1).max(0)..=(kf + 1).min(7) {
            let on_file = ours & get_file(File::from_index(f as usize));
            if on_file == EMPTY {
                open += 1;
            }
            if on_file & shield == EMPTY {
                missing += 1;
            }
        }

        let raw = missing * w.shield_missing_pawn + open * w.king_open_file;
        let attackers = non_pawn_material(b, !color).min(FULL_NON_PAWN_MATERIAL);
        raw * attackers / FULL_NON_PAWN_MATERIAL
    }

    /// Legal move count difference. The side not to move is counted through
    /// a null move, which is unavailable when the side to move is in check;
    /// the term is dropped for both sides then.
    fn mobility(&self, b: &Board) -> i32 {
        if self.weights.mobility == 0 || b.checkers().popcnt() > 0 {
            return 0;
        }
        let Some(flipped) = b.null_move() else {
            return 0;
        };
        let to_move = MoveGen::new_legal(b).len() as i32;
        let waiting = MoveGen::new_legal(&flipped).len() as i32;
        sign(b.side_to_move()) * (to_move - waiting) * self.weights.mobility
    }

    fn center_control(&self, b: &Board, color: Color) -> i32 {
        let w = &self.weights;
        if w.center_attack == 0 && w.center_occupation == 0 {
            return 0;
        }
        CENTER
            .iter()
            .map(|&sq| {
                let attacks = attackers(b, sq, color).popcnt() as i32 * w.center_attack;
                let occupied = if b.color_on(sq) == Some(color) { w.center_occupation } else { 0 };
                attacks + occupied
            })
            .sum()
    }

    /// Friendly pieces defending each other, more so in the centre.
    fn coordination(&self, b: &Board, color: Color) -> i32 {
        let w = &self.weights;
        if w.coordination == 0 && w.coordination_center == 0 {
            return 0;
        }
        let defended = *b.color_combined(color) & !*b.pieces(Piece::King);
        defended
            .map(|sq| {
                let defenders = attackers(b, sq, color).popcnt() as i32;
                let central = (2..=5).contains(&sq.get_rank().to_index())
                    && (2..=5).contains(&sq.get_file().to_index());
                let per = w.coordination + if central { w.coordination_center } else { 0 };
                defenders * per
            })
            .sum()
    }

    /// Minor and major pieces of `color` bearing on the enemy king, closer
    /// ones counting more.
    fn king_tropism(&self, b: &Board, color: Color, endgame: bool) -> i32 {
        let w = self.weights.king_tropism;
        if w == 0 || endgame {
            return 0;
        }
        let ksq = b.king_square(!color);
        let pieces = *b.pieces(Piece::Knight)
            | *b.pieces(Piece::Bishop)
            | *b.pieces(Piece::Rook)
            | *b.pieces(Piece::Queen);
        (attackers(b, ksq, color) & pieces)
            .map(|sq| (8 - distance(sq, ksq)) * w)
            .sum()
    }

    /// Penalty owed by `color` for pieces with almost no squares to go to.
    fn trapped(&self, b: &Board, color: Color) -> i32 {
        let w = &self.weights;
        if w.trapped_piece == 0 && w.trapped_bishop == 0 {
            return 0;
        }
        let occ = *b.combined();
        let mut penalty = 0;
        for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
            for sq in *b.pieces(piece) & *b.color_combined(color) {
                let reach = piece_attacks(piece, sq, occ).popcnt();
                if reach <= 2 {
                    penalty += piece_val(piece) * w.trapped_piece / 100;
                }
                if piece == Piece::Bishop && reach <= 3 {
                    penalty += w.trapped_bishop;
                }
            }
        }
        penalty
    }
}

fn piece_square(b: &Board, color: Color, endgame: bool) -> i32 {
    let mut score = 0;
    for piece in PIECES {
        for sq in *b.pieces(piece) & *b.color_combined(color) {
            score += pst_for(piece, pst_index_for(color, sq), endgame);
        }
    }
    score
}

/// No enemy pawn ahead on the same or an adjacent file.
fn is_passed_pawn(sq: Square, us: Color, their_pawns: BitBoard) -> bool {
    let f = file_idx(sq);
    let rr = relative_rank(us, sq);
    !their_pawns.into_iter().any(|ep| (file_idx(ep) - f).abs() <= 1 && relative_rank(us, ep) > rr)
}

/// Squares attacked by a non-pawn, non-king piece standing on `sq`.
fn piece_attacks(piece: Piece, sq: Square, occ: BitBoard) -> BitBoard {
    match piece {
        Piece::Knight => get_knight_moves(sq),
        Piece::Bishop => get_bishop_moves(sq, occ),
        Piece::Rook => get_rook_moves(sq, occ),
        Piece::Queen => get_bishop_moves(sq, occ) | get_rook_moves(sq, occ),
        Piece::Pawn | Piece::King => EMPTY,
    }
}

/// King-move distance between two squares.
fn distance(a: Square, b: Square) -> i32 {
    let dr = (a.get_rank().to_index() as i32 - b.get_rank().to_index() as i32).abs();
    let df = (file_idx(a) - file_idx(b)).abs();
    dr.max(df)
}

/// Pieces of `color` attacking `sq`.
pub fn attackers(b: &Board, sq: Square, color: Color) -> BitBoard {
    let occ = *b.combined();
    let ours = *b.color_combined(color);
    let diag = *b.pieces(Piece::Bishop) | *b.pieces(Piece::Queen);
    let ortho = *b.pieces(Piece::Rook) | *b.pieces(Piece::Queen);
    let pawns = get_pawn_attacks(sq, !color, ours & *b.pieces(Piece::Pawn));
    let knights = get_knight_moves(sq) & *b.pieces(Piece::Knight);
    let sliders = (get_bishop_moves(sq, occ) & diag) | (get_rook_moves(sq, occ) & ortho);
    let king = get_king_moves(sq) & *b.pieces(Piece::King);
    pawns | ((knights | sliders | king) & ours)
}

#[inline]
fn clamp_score(v: i32) -> i32 {
    v.clamp(-MATE_THRESHOLD + 1, MATE_THRESHOLD - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::mirror_fen;
    use std::str::FromStr;

    fn board(fen: &str) -> Board {
        Board::from_str(fen).unwrap()
    }

    const SAMPLES: &[&str] = &[
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        "4k3/8/8/3Pp3/8/8/8/4K3 w - e6 0 2",
        "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1",
        "4k3/4r3/8/8/8/8/8/4K3 w - - 0 1",
        "4k3/8/8/8/3N4/2P5/8/4K3 w - - 0 1",
        "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
        "4k3/8/8/8/8/8/1P6/B3K3 w - - 0 1",
    ];

    #[test]
    fn mirrored_position_negates_score() {
        let ev = Evaluator::default();
        for fen in SAMPLES {
            let b = board(fen);
            let m = board(&mirror_fen(fen));
            assert_eq!(ev.evaluate(&m), -ev.evaluate(&b), "asymmetric eval for {fen}");
            assert_eq!(ev.breakdown(&m).king_safety, -ev.breakdown(&b).king_safety);
            assert_eq!(ev.breakdown(&m).king_tropism, -ev.breakdown(&b).king_tropism);
            assert_eq!(ev.breakdown(&m).trapped, -ev.breakdown(&b).trapped);
        }
    }

    #[test]
    fn startpos_is_balanced_apart_from_tempo() {
        let ev = Evaluator::default();
        let b = Board::default();
        let e = ev.breakdown(&b);
        assert_eq!(e.material, 0);
        assert_eq!(e.piece_square, 0);
        assert_eq!(e.pawn_structure, 0);
        assert_eq!(e.king_safety, 0);
        assert_eq!(e.mobility, 0);
        assert_eq!(e.center, 0);
        assert_eq!(e.coordination, 0);
        assert_eq!(e.king_tropism, 0);
        assert_eq!(e.trapped, 0);
        assert_eq!(ev.evaluate(&b), ev.weights.tempo);
    }

    #[test]
    fn material_only_counts_missing_knight() {
        let ev = Evaluator::new(EvalWeights::material_only());
        let b = board("rnbqkb1r/pppp1ppp/8/4p3/4P3/8/PPPPQPPP/RNB1KBNR b KQkq - 1 2");
        assert_eq!(ev.evaluate(&b), 320);
        assert_eq!(ev.evaluate_relative(&b), -320);
    }

    #[test]
    fn passed_pawn_beats_blocked_pawn() {
        let ev = Evaluator::default();
        let passed = board("4k3/8/8/3P4/8/8/8/4K3 w - - 0 1");
        let blocked = board("4k3/4p3/8/3P4/8/8/8/4K3 w - - 0 1");
        let p = ev.breakdown(&passed).pawn_structure;
        let q = ev.breakdown(&blocked).pawn_structure;
        assert!(p > 0);
        assert!(q < p);
    }

    #[test]
    fn doubled_and_isolated_pawns_are_penalised() {
        let ev = Evaluator::new(EvalWeights { passed_pawn_scale: 0, ..EvalWeights::default() });
        // Two white pawns on the a-file, nothing on b: doubled and both isolated.
        let b = board("4k3/8/8/8/P7/P7/8/4K3 w - - 0 1");
        let w = ev.weights;
        assert_eq!(
            ev.breakdown(&b).pawn_structure,
            -(w.doubled_pawn + 2 * w.isolated_pawn)
        );
    }

    #[test]
    fn exposed_king_costs_more_against_a_queen() {
        let ev = Evaluator::default();
        // Same bare white king; Black has a queen in one, only a knight in the other.
        let vs_queen = board("3qk3/8/8/8/8/8/8/4K3 w - - 0 1");
        let vs_knight = board("3nk3/8/8/8/8/8/8/4K3 w - - 0 1");
        let danger_q = ev.king_danger(&vs_queen, Color::White);
        let danger_n = ev.king_danger(&vs_knight, Color::White);
        assert!(danger_q > danger_n);
        assert!(danger_n > 0);
    }

    #[test]
    fn shield_counts_only_the_two_ranks_ahead() {
        let ev = Evaluator::default();
        let w = ev.weights;
        let sheltered = board("3q2k1/5ppp/8/8/8/8/5PPP/3Q2K1 w - - 0 1");
        assert_eq!(ev.king_danger(&sheltered, Color::White), 0);
        assert_eq!(ev.king_danger(&sheltered, Color::Black), 0);

        // Pawns pushed past the shield still close the files.
        let pushed = board("3q2k1/8/8/5ppp/5PPP/8/8/3Q2K1 w - - 0 1");
        let expected = 3 * w.shield_missing_pawn * 900 / FULL_NON_PAWN_MATERIAL;
        assert!(expected > 0);
        assert_eq!(ev.king_danger(&pushed, Color::White), expected);
        assert_eq!(ev.king_danger(&pushed, Color::Black), expected);
    }

    #[test]
    fn pawn_defended_central_knight_earns_coordination() {
        let ev = Evaluator::default();
        let w = ev.weights;
        // c3 guards the d4 knight; nothing guards the pawn.
        let b = board("4k3/8/8/8/3N4/2P5/8/4K3 w - - 0 1");
        assert_eq!(ev.breakdown(&b).coordination, w.coordination + w.coordination_center);
        // Off-centre the same pair only earns the base bonus.
        let edge = board("4k3/8/8/8/7N/6P1/8/4K3 w - - 0 1");
        assert_eq!(ev.breakdown(&edge).coordination, w.coordination);
    }

    #[test]
    fn queen_eyeing_the_king_counts_in_the_middlegame_only() {
        let ev = Evaluator::default();
        let w = ev.weights;
        // Qh4 is three squares from e1.
        let middlegame = board("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
        assert_eq!(ev.breakdown(&middlegame).king_tropism, -5 * w.king_tropism);
        let endgame = board("4k3/8/8/8/7q/8/8/4K3 w - - 0 1");
        assert_eq!(ev.breakdown(&endgame).king_tropism, 0);
    }

    #[test]
    fn boxed_in_bishop_is_penalised() {
        let ev = Evaluator::default();
        let w = ev.weights;
        let trapped = board("4k3/8/8/8/8/8/1P6/B3K3 w - - 0 1");
        assert_eq!(
            ev.breakdown(&trapped).trapped,
            -(piece_val(Piece::Bishop) * w.trapped_piece / 100 + w.trapped_bishop)
        );
        let free = board("4k3/8/8/8/8/8/8/B3K3 w - - 0 1");
        assert_eq!(ev.breakdown(&free).trapped, 0);
    }

    #[test]
    fn material_only_ignores_positional_terms() {
        let ev = Evaluator::new(EvalWeights::material_only());
        let e = ev.breakdown(&board("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3"));
        assert_eq!((e.coordination, e.king_tropism, e.trapped), (0, 0, 0));
    }

        #[test]
    fn attackers_include_pawns_and_sliders() {
        let b = Board::default();
        // d3 is covered by the c2 and e2 pawns only.
        assert_eq!(attackers(&b, Square::D3, Color::White).popcnt(), 2);
        // f3: e2, g2 pawns and the g1 knight.
        assert_eq!(attackers(&b, Square::F3, Color::White).popcnt(), 3);
        assert_eq!(attackers(&b, Square::F3, Color::Black).popcnt(), 0);
    }
}
