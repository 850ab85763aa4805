use std::io::{Error, ErrorKind};

use log::info;
use serde::Deserialize;

use crate::board::{Move, Position, SIZE};
use crate::engine::{Engine, COMPUTER};
use crate::game::Game;
use crate::render::Frame;

/// Pixel size of the board drawn by the front-end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    width: f64,
    height: f64,
}

impl Geometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Maps a pixel to the cell under it. Pixels outside the board map to
    /// off-board positions.
    pub fn cell_at(&self, x: f64, y: f64) -> Position {
        let cell_width = self.width / SIZE as f64;
        let cell_height = self.height / SIZE as f64;
        Position::new((y / cell_height).floor() as i32, (x / cell_width).floor() as i32)
    }
}

/// Input from the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    Click([f64; 2]),
    Quit(bool),
    /// Asks for the current frame only.
    Frame(bool),
}

pub struct Session {
    game: Game,
    engine: Engine,
    geometry: Geometry,
    computer_moves: Vec<Move>,
}

impl Session {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            game: Game::new(),
            engine: Engine::default(),
            geometry,
            computer_moves: Vec::new(),
        }
    }

    /// Applies one event. Returns the frame to draw, or `None` once the
    /// front-end has quit. `quit` and `frame` only take `true`.
    pub fn handle(&mut self, event: Event) -> Result<Option<Frame>, Error> {
        match event {
            Event::Quit(true) => {
                info!("session closed by front-end");
                return Ok(None);
            }
            Event::Click([x, y]) => self.click(x, y),
            Event::Frame(true) => {}
            Event::Quit(false) => return Err(Error::new(ErrorKind::InvalidInput, "Expected \"quit\": true")),
            Event::Frame(false) => return Err(Error::new(ErrorKind::InvalidInput, "Expected \"frame\": true")),
        }
        Ok(Some(self.frame()))
    }

    fn click(&mut self, x: f64, y: f64) {
        self.computer_moves.clear();
        if !self.game.is_over() && self.game.turn() == COMPUTER {
            // any click lets the computer move
            self.computer_moves = self.engine.play_turn(&mut self.game);
        } else {
            let at = self.geometry.cell_at(x, y);
            self.game.click(at);
        }
    }

    pub fn frame(&self) -> Frame {
        Frame::capture(&self.game, &self.computer_moves)
    }
}
