use serde::Serialize;

use crate::board::{Board, Move, Outcome, Position, Side, SIZE};
use crate::engine::COMPUTER;
use crate::game::{Game, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Highlight {
    /// Belongs to the side to move.
    Turn,
    Selected,
    #[serde(rename = "none")]
    Plain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieceView {
    pub at: Position,
    pub glyph: char,
    pub highlight: Highlight,
}

/// Snapshot of everything the front-end draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub board: Board,
    pub turn: Side,
    pub selected: Option<Position>,
    pub jumping: bool,
    pub status: &'static str,
    pub caption: String,
    pub pieces: Vec<PieceView>,
    pub computer_to_move: bool,
    pub computer_moves: Vec<Move>,
}

impl Frame {
    pub fn capture(game: &Game, computer_moves: &[Move]) -> Self {
        let board = *game.board();
        let mut pieces = Vec::new();
        for row in 0..SIZE as i32 {
            for col in 0..SIZE as i32 {
                let at = Position::new(row, col);
                if let Some(piece) = board.get(at) {
                    let highlight = if game.selected() == Some(at) {
                        Highlight::Selected
                    } else if piece.side == game.turn() {
                        Highlight::Turn
                    } else {
                        Highlight::Plain
                    };
                    pieces.push(PieceView { at, glyph: piece.glyph(), highlight });
                }
            }
        }

        Self {
            board,
            turn: game.turn(),
            selected: game.selected(),
            jumping: game.jumping(),
            status: status_name(game.status()),
            caption: game.caption(),
            pieces,
            computer_to_move: !game.is_over() && game.turn() == COMPUTER,
            computer_moves: computer_moves.to_vec(),
        }
    }
}

fn status_name(status: Status) -> &'static str {
    match status {
        Status::InProgress => "in_progress",
        Status::Finished(Outcome::Winner(Side::X)) => "x_wins",
        Status::Finished(Outcome::Winner(Side::O)) => "o_wins",
        Status::Finished(Outcome::Draw) => "draw",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_frame() {
        let frame = Frame::capture(&Game::new(), &[]);
        assert_eq!(frame.pieces.len(), 24);
        assert_eq!(frame.status, "in_progress");
        assert_eq!(frame.caption, "x's turn");
        assert!(!frame.computer_to_move);
        assert!(frame.pieces.iter()
            .all(|p| (p.glyph == 'x') == (p.highlight == Highlight::Turn)));
    }

    #[test]
    fn selected_piece_is_highlighted_apart() {
        let mut game = Game::new();
        game.click(Position::new(2, 3));
        let frame = Frame::capture(&game, &[]);
        let selected: Vec<&PieceView> = frame.pieces.iter()
            .filter(|p| p.highlight == Highlight::Selected)
            .collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].at, Position::new(2, 3));
        assert_eq!(frame.pieces.iter().filter(|p| p.highlight == Highlight::Turn).count(), 11);
    }

    #[test]
    fn frame_json_shape() {
        let mut game = Game::new();
        game.click(Position::new(2, 1));
        game.click(Position::new(3, 0));
        let value = serde_json::to_value(Frame::capture(&game, &[])).unwrap();
        assert_eq!(value["board"][3], "x-------");
        assert_eq!(value["turn"], "o");
        assert_eq!(value["selected"], serde_json::Value::Null);
        assert_eq!(value["computer_to_move"], true);
        assert_eq!(value["pieces"][0], serde_json::json!({ "at": [0, 0], "glyph": "x", "highlight": "none" }));
        assert_eq!(value["caption"], "o's turn");
    }
}
