use chess::{Board, ChessMove, Color, File, Piece, Rank, Square, ALL_SQUARES};

// ---------------------------
// Search limits / scores
// ---------------------------
pub const DEFAULT_DEPTH: u32 = 6;
pub const MAX_PLY: usize = 128;
pub const INF: i32 = 60_000;
pub const MATE: i32 = 30_000;
/// Scores at or beyond this magnitude encode a forced mate.
pub const MATE_THRESHOLD: i32 = MATE - MAX_PLY as i32;
pub const DRAW: i32 = 0;

// Quiescence
pub const DEFAULT_QUIESCENCE_CAP: u32 = 8;

// Aspiration windows
pub const ASP_WINDOW: i32 = 50;
pub const ASP_MAX_WIDEN: i32 = 1_600;

// Table sizes
pub const DEFAULT_TT_CAPACITY: usize = 1 << 20;
pub const MAX_TT_CAPACITY: usize = 1 << 26;

// Piece values
pub const P: i32 = 100;
pub const N: i32 = 320;
pub const B: i32 = 330;
pub const R_: i32 = 500;
pub const Q_: i32 = 900;

/// Non-king material (both sides) at or below which the king uses its endgame table.
pub const ENDGAME_MATERIAL: i32 = 1_500;
/// Non-pawn material of one side at full strength: 2N + 2B + 2R + Q.
pub const FULL_NON_PAWN_MATERIAL: i32 = 2 * N + 2 * B + 2 * R_ + Q_;

// ---------------------------
// Piece-square tables, a1 = index 0, from White's side.
// Black reads them through `pst_index_for` (vertical mirror).
// ---------------------------
#[rustfmt::skip]
pub const PST_PAWN: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5, 10, 10,-20,-20, 10, 10,  5,
     5, -5,-10,  0,  0,-10, -5,  5,
     0,  0,  0, 20, 20,  0,  0,  0,
     5,  5, 10, 25, 25, 10,  5,  5,
    10, 10, 20, 30, 30, 20, 10, 10,
    50, 50, 50, 50, 50, 50, 50, 50,
     0,  0,  0,  0,  0,  0,  0,  0,
];
#[rustfmt::skip]
pub const PST_KNIGHT: [i32; 64] = [
   -50,-40,-30,-30,-30,-30,-40,-50,
   -40,-20,  0,  5,  5,  0,-20,-40,
   -30,  5, 10, 15, 15, 10,  5,-30,
   -30,  0, 15, 20, 20, 15,  0,-30,
   -30,  5, 15, 20, 20, 15,  5,-30,
   -30,  0, 10, 15, 15, 10,  0,-30,
   -40,-20,  0,  0,  0,  0,-20,-40,
   -50,-40,-30,-30,-30,-30,-40,-50,
];
#[rustfmt::skip]
pub const PST_BISHOP: [i32; 64] = [
   -20,-10,-10,-10,-10,-10,-10,-20,
   -10,  5,  0,  0,  0,  0,  5,-10,
   -10, 10, 10, 10, 10, 10, 10,-10,
   -10,  0, 10, 10, 10, 10,  0,-10,
   -10,  5,  5, 10, 10,  5,  5,-10,
   -10,  0,  5, 10, 10,  5,  0,-10,
   -10,  0,  0,  0,  0,  0,  0,-10,
   -20,-10,-10,-10,-10,-10,-10,-20,
];
#[rustfmt::skip]
pub const PST_ROOK: [i32; 64] = [
     0,  0,  0,  5,  5,  0,  0,  0,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
     5, 10, 10, 10, 10, 10, 10,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
];
#[rustfmt::skip]
pub const PST_QUEEN: [i32; 64] = [
   -20,-10,-10, -5, -5,-10,-10,-20,
   -10,  0,  5,  0,  0,  0,  0,-10,
   -10,  5,  5,  5,  5,  5,  0,-10,
     0,  0,  5,  5,  5,  5,  0, -5,
    -5,  0,  5,  5,  5,  5,  0, -5,
   -10,  0,  5,  5,  5,  5,  0,-10,
   -10,  0,  0,  0,  0,  0,  0,-10,
   -20,-10,-10, -5, -5,-10,-10,-20,
];
#[rustfmt::skip]
pub const PST_KING_MG: [i32; 64] = [
    20, 30, 10,  0,  0, 10, 30, 20,
    20, 20,  0,  0,  0,  0, 20, 20,
   -10,-20,-20,-20,-20,-20,-20,-10,
   -20,-30,-30,-40,-40,-30,-30,-20,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
];

// --- Endgame king PSQT ---
#[rustfmt::skip]
pub const PST_KING_EG: [i32; 64] = [
   -50,-40,-30,-30,-30,-30,-40,-50,
   -40,-20,  0,  0,  0,  0,-20,-40,
   -30,  0, 10, 15, 15, 10,  0,-30,
   -30,  0, 15, 20, 20, 15,  0,-30,
   -30,  0, 15, 20, 20, 15,  0,-30,
   -30,  0, 10, 15, 15, 10,  0,-30,
   -40,-20,  0,  0,  0,  0,-20,-40,
   -50,-40,-30,-30,-30,-30,-40,-50,
];

// --- Passed-pawn rank bonuses (relative ranks 0..7; 0 and 7 unused) ---
pub const PASSED_PAWN_BONUS_BY_RANK: [i32; 8] = [0, 5, 10, 20, 35, 60, 100, 0];

// ---------------------------
// PST helpers
// ---------------------------
#[inline]
pub fn pst_for(piece: Piece, idx: usize, endgame: bool) -> i32 {
    match piece {
        Piece::Pawn => PST_PAWN[idx],
        Piece::Knight => PST_KNIGHT[idx],
        Piece::Bishop => PST_BISHOP[idx],
        Piece::Rook => PST_ROOK[idx],
        Piece::Queen => PST_QUEEN[idx],
        Piece::King if endgame => PST_KING_EG[idx],
        Piece::King => PST_KING_MG[idx],
    }
}
#[inline]
pub fn pst_index_for(color: Color, sq: Square) -> usize {
    let i = sq.to_index();
    if color == Color::White { i } else { i ^ 56 }
}

// ---------------------------
// Small helpers
// ---------------------------
#[inline]
pub fn piece_val(pc: Piece) -> i32 {
    match pc {
        Piece::Pawn => P,
        Piece::Knight => N,
        Piece::Bishop => B,
        Piece::Rook => R_,
        Piece::Queen => Q_,
        Piece::King => 0,
    }
}

#[inline]
pub fn sign(color: Color) -> i32 {
    if color == Color::White { 1 } else { -1 }
}

pub fn count_pieces(b: &Board, piece: Piece, color: Color) -> i32 {
    (b.pieces(piece) & b.color_combined(color)).popcnt() as i32
}

/// Knights, bishops, rooks and queens of one side, in centipawns.
pub fn non_pawn_material(b: &Board, color: Color) -> i32 {
    N * count_pieces(b, Piece::Knight, color)
        + B * count_pieces(b, Piece::Bishop, color)
        + R_ * count_pieces(b, Piece::Rook, color)
        + Q_ * count_pieces(b, Piece::Queen, color)
}

#[inline]
pub fn total_material_excl_kings(b: &Board) -> i32 {
    [Color::White, Color::Black]
        .iter()
        .map(|&c| P * count_pieces(b, Piece::Pawn, c) + non_pawn_material(b, c))
        .sum()
}

#[inline]
pub fn is_endgame_like(b: &Board) -> bool {
    total_material_excl_kings(b) <= ENDGAME_MATERIAL
}

pub fn insufficient_material(b: &Board) -> bool {
    let no_pawns = b.pieces(Piece::Pawn).popcnt() == 0;
    let no_rooks = b.pieces(Piece::Rook).popcnt() == 0;
    let no_queens = b.pieces(Piece::Queen).popcnt() == 0;
    if no_pawns && no_rooks && no_queens {
        let minors = |c: Color| count_pieces(b, Piece::Knight, c) + count_pieces(b, Piece::Bishop, c);
        return minors(Color::White) <= 1 && minors(Color::Black) <= 1;
    }
    false
}

#[inline]
pub fn relative_rank(color: Color, sq: Square) -> usize {
    let r = sq.get_rank().to_index();
    if color == Color::White { r } else { 7 - r }
}
#[inline]
pub fn file_idx(sq: Square) -> i32 {
    sq.get_file().to_index() as i32
}
#[inline]
pub fn square_at(rank: usize, file: usize) -> Square {
    Square::make_square(Rank::from_index(rank), File::from_index(file))
}

// ---------------------------
// Move tags, derived from the position the move is played in
// ---------------------------
#[inline]
pub fn is_en_passant(b: &Board, mv: ChessMove) -> bool {
    b.piece_on(mv.get_source()) == Some(Piece::Pawn)
        && mv.get_source().get_file() != mv.get_dest().get_file()
        && b.piece_on(mv.get_dest()).is_none()
}

#[inline]
pub fn is_capture(b: &Board, mv: ChessMove) -> bool {
    b.color_on(mv.get_dest()) == Some(!b.side_to_move()) || is_en_passant(b, mv)
}

#[inline]
pub fn is_castle(b: &Board, mv: ChessMove) -> bool {
    b.piece_on(mv.get_source()) == Some(Piece::King)
        && (file_idx(mv.get_source()) - file_idx(mv.get_dest())).abs() == 2
}

/// Piece removed from the board by `mv`, if any.
#[inline]
pub fn captured_piece(b: &Board, mv: ChessMove) -> Option<Piece> {
    if is_en_passant(b, mv) {
        Some(Piece::Pawn)
    } else if b.color_on(mv.get_dest()) == Some(!b.side_to_move()) {
        b.piece_on(mv.get_dest())
    } else {
        None
    }
}

#[inline]
pub fn gives_check(b: &Board, mv: ChessMove) -> bool {
    b.make_move_new(mv).checkers().popcnt() > 0
}

// ---------------------------
// Move pack/unpack for TT
// ---------------------------
pub fn pack_move(m: ChessMove) -> u16 {
    let from = m.get_source().to_index() as u16;
    let to = m.get_dest().to_index() as u16;
    let promo = match m.get_promotion() {
        Some(Piece::Knight) => 1,
        Some(Piece::Bishop) => 2,
        Some(Piece::Rook) => 3,
        Some(Piece::Queen) => 4,
        _ => 0,
    } as u16;
    (from & 63) | ((to & 63) << 6) | ((promo & 7) << 12)
}
pub fn unpack_move(code: u16) -> Option<ChessMove> {
    if code == 0 {
        return None;
    }
    let from = ALL_SQUARES[(code & 63) as usize];
    let to = ALL_SQUARES[((code >> 6) & 63) as usize];
    let promo = match (code >> 12) & 7 {
        1 => Some(Piece::Knight),
        2 => Some(Piece::Bishop),
        3 => Some(Piece::Rook),
        4 => Some(Piece::Queen),
        _ => None,
    };
    Some(ChessMove::new(from, to, promo))
}

/// Parses coordinate notation such as `e2e4` or `e7e8q`.
pub fn parse_uci_move(s: &str) -> Option<ChessMove> {
    if s.len() < 4 || s.len() > 5 || !s.is_ascii() {
        return None;
    }
    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;
    let promo = if s.len() == 5 {
        match &s[4..5] {
            "q" => Some(Piece::Queen),
            "r" => Some(Piece::Rook),
            "b" => Some(Piece::Bishop),
            "n" => Some(Piece::Knight),
            _ => return None,
        }
    } else {
        None
    };
    Some(ChessMove::new(from, to, promo))
}

fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = chars.next()?;
    let rank = chars.next()?;
    if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
        return None;
    }
    Some(square_at(rank as usize - '1' as usize, file as usize - 'a' as usize))
}
