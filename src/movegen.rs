use lazy_static::lazy_static;

use crate::board::{Move, Position, Side, SQUARES};
use crate::game::Game;

const DIAGONALS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

lazy_static! {
    // per square: in-bounds diagonal targets, steps first and then jumps
    static ref DIAGONAL_TARGETS: Vec<Vec<Position>> = (0..SQUARES)
        .map(|idx| {
            let from = Position::from_index(idx);
            [1, 2].iter()
                .flat_map(|distance| {
                    DIAGONALS.iter().map(move |(d_row, d_col)| from.offset(d_row * distance, d_col * distance))
                })
                .filter(Position::in_bounds)
                .collect()
        })
        .collect();
}

pub fn diagonal_targets(from: Position) -> &'static [Position] {
    match from.index() {
        Some(idx) => &DIAGONAL_TARGETS[idx],
        None => &[],
    }
}

/// Every move `side` may make right now. During a jump chain only the
/// selected piece can move, and only by jumping.
pub fn enumerate_moves(game: &Game, side: Side) -> Vec<Move> {
    let origins: Vec<Position> = match game.selected() {
        Some(selected) if game.jumping() => vec![selected],
        _ => game.board().pieces(side).collect(),
    };
    origins.into_iter()
        .flat_map(|from| {
            diagonal_targets(from).iter()
                .filter_map(move |to| game.validate_move(side, from, to.row, to.col))
        })
        .collect()
}

/// Whether the piece at `from` could capture again.
pub fn can_jump_from(game: &Game, side: Side, from: Position) -> bool {
    diagonal_targets(from).iter()
        .filter(|to| (to.row - from.row).abs() == 2)
        .any(|to| game.validate_move(side, from, to.row, to.col).is_some())
}
