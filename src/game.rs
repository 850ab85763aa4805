use log::{info, warn};

use crate::board::{Board, Move, Outcome, Piece, Position, Rank, Side};
use crate::movegen::{can_jump_from, enumerate_moves};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    InProgress,
    Finished(Outcome),
}

/// What a click did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Click {
    Selected(Position),
    Deselected,
    Moved(Move),
    Invalid,
    Ignored,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placed {
    mv: Move,
    piece: Piece,
    captured: Option<Piece>,
}

/// Everything `Game::play` or `Game::end_chain` touched, enough to put it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Undo {
    placed: Option<Placed>,
    turn: Side,
    selected: Option<Position>,
    jumping: bool,
    status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    board: Board,
    turn: Side,
    selected: Option<Position>,
    jumping: bool,
    status: Status,
}

impl Game {
    pub fn new() -> Self {
        Self::from_board(Board::new(), Side::X)
    }

    /// Starts from an arbitrary position. Status is not checked until the
    /// next move is applied.
    pub fn from_board(board: Board, turn: Side) -> Self {
        Self {
            board,
            turn,
            selected: None,
            jumping: false,
            status: Status::InProgress,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Side {
        self.turn
    }

    pub fn selected(&self) -> Option<Position> {
        self.selected
    }

    pub fn jumping(&self) -> bool {
        self.jumping
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_over(&self) -> bool {
        self.status != Status::InProgress
    }

    /// Checks a move of the `side` piece on `from` to `(to_row, to_col)`.
    /// Returns the move, with the captured square for a jump, if it is legal.
    pub fn validate_move(&self, side: Side, from: Position, to_row: i32, to_col: i32) -> Option<Move> {
        let to = Position::new(to_row, to_col);
        let piece = self.board.get(from).filter(|p| p.side == side)?;
        if !self.board.is_empty(to) {
            return None;
        }

        let (d_row, d_col) = (to.row - from.row, to.col - from.col);
        let reaches = |distance: i32| {
            d_col.abs() == distance && match piece.rank {
                Rank::King => d_row.abs() == distance,
                Rank::Man => d_row == distance * side.forward(),
            }
        };

        if reaches(1) && !self.jumping {
            return Some(Move::step(from, to));
        }
        if reaches(2) {
            let over = Position::new(from.row + d_row / 2, from.col + d_col / 2);
            if self.board.get(over).map_or(false, |p| p.side != side) {
                return Some(Move::jump(from, to, over));
            }
        }
        None
    }

    /// Commits a move. Returns false if `from` holds no piece of `side`.
    pub fn apply_move(
        &mut self,
        side: Side,
        from: Position,
        to_row: i32,
        to_col: i32,
        captured: Option<Position>,
    ) -> bool {
        let mv = Move { from, to: Position::new(to_row, to_col), captured };
        match self.play(side, mv) {
            Some(_) => {
                info!("{} {} {}", side, if mv.is_jump() { "captures" } else { "moves" }, mv);
                if let Status::Finished(outcome) = self.status {
                    info!("game over: {:?}", outcome);
                }
                true
            }
            None => false,
        }
    }

    /// Applies `mv` for `side` and returns what is needed to take it back.
    pub fn play(&mut self, side: Side, mv: Move) -> Option<Undo> {
        let piece = self.board.get(mv.from).filter(|p| p.side == side)?;
        let captured = mv.captured.and_then(|at| self.board.get(at));
        let undo = self.snapshot(Some(Placed { mv, piece, captured }));

        let rank = if mv.to.row == side.promotion_row() { Rank::King } else { piece.rank };
        self.board.set(mv.from, None);
        self.board.set(mv.to, Some(Piece { side, rank }));

        match mv.captured {
            Some(at) => {
                self.board.set(at, None);
                self.selected = Some(mv.to);
                self.jumping = true;
            }
            None => self.end_turn(side),
        }
        self.update_status();
        Some(undo)
    }

    /// Ends a running jump chain and passes the turn. `None` if no chain
    /// is running.
    pub fn end_chain(&mut self) -> Option<Undo> {
        if !self.jumping {
            return None;
        }
        let undo = self.snapshot(None);
        self.end_turn(self.turn);
        self.update_status();
        Some(undo)
    }

    /// Whether a jump chain is running with no jump left to make.
    pub fn chain_stuck(&self) -> bool {
        self.jumping && self.selected.map_or(true, |at| !can_jump_from(self, self.turn, at))
    }

    fn snapshot(&self, placed: Option<Placed>) -> Undo {
        Undo {
            placed,
            turn: self.turn,
            selected: self.selected,
            jumping: self.jumping,
            status: self.status,
        }
    }

    pub fn undo(&mut self, undo: Undo) {
        let Undo { placed, turn, selected, jumping, status } = undo;
        if let Some(Placed { mv, piece, captured }) = placed {
            self.board.set(mv.to, None);
            self.board.set(mv.from, Some(piece));
            if let (Some(at), Some(piece)) = (mv.captured, captured) {
                self.board.set(at, Some(piece));
            }
        }
        self.turn = turn;
        self.selected = selected;
        self.jumping = jumping;
        self.status = status;
    }

    fn end_turn(&mut self, side: Side) {
        self.selected = None;
        self.jumping = false;
        self.turn = side.opponent();
    }

    fn update_status(&mut self) {
        self.status = match self.board.check_winner() {
            Some(outcome) => Status::Finished(outcome),
            // a stuck chain is not a loss; the chain still has to be ended
            None if !self.jumping && enumerate_moves(self, self.turn).is_empty() => {
                Status::Finished(Outcome::Winner(self.turn.opponent()))
            }
            None => Status::InProgress,
        };
    }

    /// Ends the game in favour of the opponent of `side`.
    pub fn concede(&mut self, side: Side) {
        self.selected = None;
        self.jumping = false;
        self.status = Status::Finished(Outcome::Winner(side.opponent()));
    }

    /// Handles a click on a board cell for the side to move.
    pub fn click(&mut self, at: Position) -> Click {
        if self.is_over() {
            *self = Game::new();
            info!("new game");
            return Click::Reset;
        }

        let Some(selected) = self.selected else {
            return match self.board.get(at) {
                Some(piece) if piece.side == self.turn => {
                    self.selected = Some(at);
                    Click::Selected(at)
                }
                _ => Click::Ignored,
            };
        };

        if let Some(mv) = self.validate_move(self.turn, selected, at.row, at.col) {
            self.apply_move(self.turn, mv.from, mv.to.row, mv.to.col, mv.captured);
            Click::Moved(mv)
        } else if at == selected {
            if self.end_chain().is_none() {
                self.selected = None;
            }
            Click::Deselected
        } else {
            warn!("invalid move: {} from {} to {}", self.turn, selected, at);
            Click::Invalid
        }
    }

    pub fn caption(&self) -> String {
        match self.status {
            Status::InProgress => format!("{}'s turn", self.turn),
            Status::Finished(Outcome::Draw) => "It's a stalemate! Click to start again".to_string(),
            Status::Finished(Outcome::Winner(side)) => format!("{} wins! Click to start again", side),
        }
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
