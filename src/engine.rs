use log::{debug, info};

use crate::board::{Board, Move, Outcome, Side};
use crate::game::{Game, Status};
use crate::movegen::enumerate_moves;

/// Fixed look-ahead of the computer player, in plies.
pub const SEARCH_DEPTH: u32 = 3;
/// Base score of a decided game; material never gets close to it.
pub const WIN_SCORE: i32 = 1_000;
/// The side the engine plays for, and the side scores are relative to.
pub const COMPUTER: Side = Side::O;

pub struct Engine {
    depth: u32,
    nodes: u64,
}

impl Engine {
    pub fn new(depth: u32) -> Self {
        Self { depth, nodes: 0 }
    }

    /// Score of a decided position, or `None` while play goes on.
    /// `depth` is the look-ahead still left, so quicker wins score higher.
    pub fn evaluate(game: &Game, depth: u32) -> Option<i32> {
        match game.status() {
            Status::InProgress => None,
            Status::Finished(Outcome::Draw) => Some(0),
            Status::Finished(Outcome::Winner(side)) => {
                let score = WIN_SCORE + depth as i32;
                Some(if side == COMPUTER { score } else { -score })
            }
        }
    }

    fn material(board: &Board, side: Side) -> i32 {
        (board.count(side) + board.count_kings(side)) as i32
    }

    fn static_eval(game: &Game, depth: u32) -> i32 {
        Self::evaluate(game, depth).unwrap_or_else(|| {
            let board = game.board();
            Self::material(board, COMPUTER) - Self::material(board, COMPUTER.opponent())
        })
    }

    /// Plain minimax. Every trial move is undone before the next one.
    pub fn search(&mut self, game: &mut Game, depth: u32, maximizing: bool) -> i32 {
        self.nodes += 1;
        if depth == 0 || game.is_over() {
            return Self::static_eval(game, depth);
        }
        if game.chain_stuck() {
            if let Some(undo) = game.end_chain() {
                let next_maximizing = game.turn() == COMPUTER;
                let score = self.search(game, depth, next_maximizing);
                game.undo(undo);
                return score;
            }
        }

        let side = if maximizing { COMPUTER } else { COMPUTER.opponent() };
        let mut best: Option<i32> = None;
        for mv in enumerate_moves(game, side) {
            let Some(undo) = game.play(side, mv) else { continue };
            let next_maximizing = game.turn() == COMPUTER;
            let score = self.search(game, depth - 1, next_maximizing);
            game.undo(undo);
            best = Some(match best {
                Some(best) if maximizing => best.max(score),
                Some(best) => best.min(score),
                None => score,
            });
        }
        best.unwrap_or_else(|| Self::static_eval(game, depth))
    }

    /// Picks the move for the side to move, with its score. The first of
    /// equally scored moves wins. `None` if there is nothing to play.
    pub fn best_move(&mut self, game: &mut Game) -> Option<(Move, i32)> {
        if game.is_over() {
            return None;
        }
        self.nodes = 0;
        let side = game.turn();
        let maximizing = side == COMPUTER;
        let mut best: Option<(Move, i32)> = None;

        for mv in enumerate_moves(game, side) {
            let Some(undo) = game.play(side, mv) else { continue };
            let next_maximizing = game.turn() == COMPUTER;
            let score = self.search(game, self.depth.saturating_sub(1), next_maximizing);
            game.undo(undo);
            let improves = match best {
                None => true,
                Some((_, best_score)) if maximizing => score > best_score,
                Some((_, best_score)) => score < best_score,
            };
            if improves {
                best = Some((mv, score));
            }
        }

        debug!("searched {} nodes at depth {}: {:?}", self.nodes, self.depth, best);
        best
    }

    /// Plays the whole turn of the side to move, jump chain included, and
    /// returns the moves made. A chain with no jump left is ended; a side
    /// with no move at all forfeits.
    pub fn play_turn(&mut self, game: &mut Game) -> Vec<Move> {
        let side = game.turn();
        let mut played = Vec::new();
        while !game.is_over() && game.turn() == side {
            let Some((mv, score)) = self.best_move(game) else {
                if game.end_chain().is_some() {
                    debug!("{} has no further jump, chain ended", side);
                    break;
                }
                info!("{} has no legal move and forfeits", side);
                game.concede(side);
                break;
            };
            debug!("{} chose {} (score {})", side, mv, score);
            if !game.apply_move(side, mv.from, mv.to.row, mv.to.col, mv.captured) {
                break;
            }
            played.push(mv);
        }
        played
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(SEARCH_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Piece, Position};

    fn pos(row: i32, col: i32) -> Position {
        Position::new(row, col)
    }

    fn game(rows: [&str; 8], turn: Side) -> Game {
        Game::from_board(Board::from_rows(&rows).unwrap(), turn)
    }

    #[test]
    fn single_legal_move_is_chosen() {
        let mut game = game([
            "-x-x----",
            "--------",
            "--------",
            "--------",
            "--------",
            "--------",
            "--------",
            "o-------",
        ], Side::O);
        let mut engine = Engine::new(3);
        let (mv, score) = engine.best_move(&mut game).unwrap();
        assert_eq!(mv, Move::step(pos(7, 0), pos(6, 1)));
        assert!(score.abs() <= WIN_SCORE + 3);
        assert!(engine.nodes > 1);
    }

    #[test]
    fn search_leaves_the_game_untouched() {
        let mut game = Game::from_board(Board::new(), Side::O);
        let before = game.clone();
        let mut engine = Engine::default();
        assert!(engine.best_move(&mut game).is_some());
        assert_eq!(game, before);

        let mut game = Game::new();
        engine.search(&mut game, 3, false);
        assert_eq!(game, Game::new());
    }

    #[test]
    fn evaluate_scores_only_decided_games() {
        assert_eq!(Engine::evaluate(&Game::new(), 3), None);

        let mut x_wins = game([
            "--------",
            "--------",
            "-x------",
            "--o-----",
            "--------",
            "--------",
            "--------",
            "--------",
        ], Side::X);
        x_wins.apply_move(Side::X, pos(2, 1), 4, 3, Some(pos(3, 2)));
        assert_eq!(Engine::evaluate(&x_wins, 2), Some(-(WIN_SCORE + 2)));

        let mut o_wins = game([
            "--------",
            "--------",
            "-x------",
            "--o-----",
            "--------",
            "--------",
            "--------",
            "--------",
        ], Side::O);
        o_wins.apply_move(Side::O, pos(3, 2), 1, 0, Some(pos(2, 1)));
        assert_eq!(Engine::evaluate(&o_wins, 0), Some(WIN_SCORE));
        assert!(Engine::evaluate(&o_wins, 2) > Engine::evaluate(&o_wins, 1));

        let mut draw = game([
            "--------",
            "--------",
            "-x------",
            "--o-----",
            "--------",
            "--------",
            "--------",
            "-----o--",
        ], Side::X);
        draw.apply_move(Side::X, pos(2, 1), 4, 3, Some(pos(3, 2)));
        assert_eq!(Engine::evaluate(&draw, 1), Some(0));
    }

    #[test]
    fn winning_capture_is_preferred() {
        let mut game = game([
            "--------",
            "--------",
            "-x------",
            "--o-----",
            "--------",
            "--------",
            "--------",
            "------o-",
        ], Side::O);
        let (mv, score) = Engine::default().best_move(&mut game).unwrap();
        assert_eq!(mv, Move::jump(pos(3, 2), pos(1, 0), pos(2, 1)));
        assert_eq!(score, WIN_SCORE + SEARCH_DEPTH as i32 - 1);
    }

    #[test]
    fn human_side_is_minimized() {
        // x can take the last o piece at once
        let mut game = game([
            "--------",
            "--------",
            "-x------",
            "--o-----",
            "--------",
            "--------",
            "--------",
            "-x------",
        ], Side::X);
        let (mv, score) = Engine::default().best_move(&mut game).unwrap();
        assert_eq!(mv, Move::jump(pos(2, 1), pos(4, 3), pos(3, 2)));
        assert!(score < -WIN_SCORE);
    }

    #[test]
    fn ties_keep_the_first_move() {
        let mut game = Game::from_board(Board::new(), Side::O);
        let (mv, _) = Engine::new(1).best_move(&mut game).unwrap();
        assert_eq!(mv, enumerate_moves(&game, Side::O)[0]);
    }

    #[test]
    fn computer_finishes_its_jump_chain() {
        let mut game = game([
            "-x------",
            "--------",
            "-----x--",
            "--------",
            "---x----",
            "--o-----",
            "--------",
            "------o-",
        ], Side::O);
        let played = Engine::default().play_turn(&mut game);
        assert_eq!(played, vec![
            Move::jump(pos(5, 2), pos(3, 4), pos(4, 3)),
            Move::jump(pos(3, 4), pos(1, 6), pos(2, 5)),
        ]);
        assert_eq!(game.turn(), Side::X);
        assert!(!game.jumping());
        assert_eq!(game.selected(), None);
        assert_eq!(game.board().get(pos(1, 6)), Some(Piece::man(Side::O)));
        assert_eq!(game.board().count(Side::X), 1);
        assert_eq!(game.status(), Status::InProgress);
    }

    #[test]
    fn stuck_chain_in_search_passes_the_turn() {
        let mut game = game([
            "-------x",
            "--------",
            "-x------",
            "--o-----",
            "--------",
            "--------",
            "--------",
            "o-------",
        ], Side::X);
        assert!(game.apply_move(Side::X, pos(2, 1), 4, 3, Some(pos(3, 2))));
        assert!(game.chain_stuck());
        let before = game.clone();

        // o gets its reply instead of x being scored as blocked
        let mut engine = Engine::default();
        let score = engine.search(&mut game, 1, false);
        assert_eq!(game, before);
        assert!(score.abs() < WIN_SCORE);

        assert!(engine.play_turn(&mut game).is_empty());
        assert_eq!(game.turn(), Side::O);
        assert!(!game.jumping());
        assert_eq!(game.status(), Status::InProgress);
    }

    #[test]
    fn computer_without_moves_forfeits() {
        let mut game = game([
            "--------",
            "--------",
            "--x-----",
            "-x------",
            "o-------",
            "--------",
            "--------",
            "--------",
        ], Side::O);
        let mut engine = Engine::default();
        assert_eq!(engine.best_move(&mut game), None);
        assert!(engine.play_turn(&mut game).is_empty());
        assert_eq!(game.status(), Status::Finished(Outcome::Winner(Side::X)));
    }

    #[test]
    fn finished_games_have_no_best_move() {
        let mut game = Game::new();
        game.concede(Side::X);
        assert_eq!(Engine::default().best_move(&mut game), None);
        assert!(Engine::default().play_turn(&mut game).is_empty());
    }
}
