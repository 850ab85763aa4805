use std::fmt;
use std::io::{Error, ErrorKind};

use bitvec::{prelude::*, slice::IterOnes};
use lazy_static::lazy_static;
use serde::de::{Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeSeq, Serializer};

pub const SIZE: usize = 8;
pub const SQUARES: usize = SIZE * SIZE;
pub type BitBoard = BitArr!(for SQUARES, in u64, Lsb0);
// squares are indexed row-major: row * SIZE + col, row 0 at the top

const EMPTY_GLYPH: char = '-';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn in_bounds(&self) -> bool {
        (0..SIZE as i32).contains(&self.row) && (0..SIZE as i32).contains(&self.col)
    }

    pub fn index(&self) -> Option<usize> {
        if self.in_bounds() {
            Some(self.row as usize * SIZE + self.col as usize)
        } else {
            None
        }
    }

    pub fn from_index(idx: usize) -> Self {
        Self::new((idx / SIZE) as i32, (idx % SIZE) as i32)
    }

    pub fn offset(&self, d_row: i32, d_col: i32) -> Self {
        Self::new(self.row + d_row, self.col + d_col)
    }

    pub fn is_dark(&self) -> bool {
        (self.row + self.col) % 2 == 0
    }
}

impl From<[i32; 2]> for Position {
    fn from([row, col]: [i32; 2]) -> Self {
        Self::new(row, col)
    }
}

impl From<Position> for [i32; 2] {
    fn from(pos: Position) -> Self {
        [pos.row, pos.col]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

pub trait BitArr2D {
    fn empty() -> Self;
    fn set_point(&mut self, pos: Position, value: bool);
    fn has_point(&self, pos: Position) -> bool;
    type IterPoints<'a>: Iterator<Item=Position> + 'a where Self: 'a;
    fn iter_set_points(&'_ self) -> Self::IterPoints<'_>;
}

impl BitArr2D for BitBoard {
    fn empty() -> Self {
        bitarr!(u64, Lsb0; 0; SQUARES)
    }

    fn set_point(&mut self, pos: Position, value: bool) {
        if let Some(idx) = pos.index() {
            self.set(idx, value);
        }
    }

    fn has_point(&self, pos: Position) -> bool {
        pos.index().map_or(false, |idx| self[idx])
    }

    type IterPoints<'a> = std::iter::Map<IterOnes<'a, u64, Lsb0>, fn(usize) -> Position>;

    fn iter_set_points(&'_ self) -> Self::IterPoints<'_> {
        self.iter_ones().map(Position::from_index as fn(usize) -> Position)
    }
}

lazy_static! {
    // three rows of men on the dark squares at each end
    static ref STARTING_X: BitBoard = starting_rows(0..3);
    static ref STARTING_O: BitBoard = starting_rows(5..8);
}

fn starting_rows(rows: std::ops::Range<i32>) -> BitBoard {
    let mut squares = BitBoard::empty();
    for row in rows {
        for col in 0..SIZE as i32 {
            let pos = Position::new(row, col);
            if pos.is_dark() {
                squares.set_point(pos, true);
            }
        }
    }
    squares
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    X,
    O,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Side::X => Side::O,
            Side::O => Side::X,
        }
    }

    /// Row direction a man of this side travels in.
    pub fn forward(self) -> i32 {
        match self {
            Side::X => 1,
            Side::O => -1,
        }
    }

    pub fn promotion_row(self) -> i32 {
        match self {
            Side::X => SIZE as i32 - 1,
            Side::O => 0,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Side::X => 'x',
            Side::O => 'o',
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rank {
    Man,
    King,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub side: Side,
    pub rank: Rank,
}

impl Piece {
    pub const fn man(side: Side) -> Self {
        Self { side, rank: Rank::Man }
    }

    pub const fn king(side: Side) -> Self {
        Self { side, rank: Rank::King }
    }

    pub fn is_king(&self) -> bool {
        self.rank == Rank::King
    }

    /// Men are lower case, kings upper case.
    pub fn glyph(&self) -> char {
        match self.rank {
            Rank::Man => self.side.glyph(),
            Rank::King => self.side.glyph().to_ascii_uppercase(),
        }
    }

    fn from_glyph(glyph: char) -> Result<Option<Self>, Error> {
        match glyph {
            EMPTY_GLYPH => Ok(None),
            'x' => Ok(Some(Piece::man(Side::X))),
            'o' => Ok(Some(Piece::man(Side::O))),
            'X' => Ok(Some(Piece::king(Side::X))),
            'O' => Ok(Some(Piece::king(Side::O))),
            other => Err(Error::new(ErrorKind::InvalidInput, format!("Unknown cell glyph {:?}", other))),
        }
    }
}

/// A decided game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(Side),
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Position,
    pub to: Position,
    pub captured: Option<Position>,
}

impl Move {
    pub fn step(from: Position, to: Position) -> Self {
        Self { from, to, captured: None }
    }

    pub fn jump(from: Position, to: Position, captured: Position) -> Self {
        Self { from, to, captured: Some(captured) }
    }

    pub fn is_jump(&self) -> bool {
        self.captured.is_some()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.captured {
            Some(captured) => write!(f, "{} x{} -> {}", self.from, captured, self.to),
            None => write!(f, "{} -> {}", self.from, self.to),
        }
    }
}

impl Serialize for Move {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Move", 3)?;
        s.serialize_field("from", &self.from)?;
        s.serialize_field("to", &self.to)?;
        s.serialize_field("captured", &self.captured)?;
        s.end()
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Board {
    x_squares: BitBoard,
    o_squares: BitBoard,
    kings: BitBoard,
}

impl Board {
    /// The standard opening layout.
    pub fn new() -> Self {
        Self {
            x_squares: *STARTING_X,
            o_squares: *STARTING_O,
            kings: BitBoard::empty(),
        }
    }

    pub fn empty() -> Self {
        Self {
            x_squares: BitBoard::empty(),
            o_squares: BitBoard::empty(),
            kings: BitBoard::empty(),
        }
    }

    /// Builds a board from one string per row, top row first.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, Error> {
        if rows.len() != SIZE {
            return Err(Error::new(ErrorKind::InvalidInput, format!("Expected {} rows, got {}", SIZE, rows.len())));
        }
        let mut board = Board::empty();
        for (row, line) in rows.iter().enumerate() {
            let glyphs: Vec<char> = line.as_ref().chars().collect();
            if glyphs.len() != SIZE {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("Row {} has {} cells, expected {}", row, glyphs.len(), SIZE),
                ));
            }
            for (col, glyph) in glyphs.into_iter().enumerate() {
                board.set(Position::new(row as i32, col as i32), Piece::from_glyph(glyph)?);
            }
        }
        Ok(board)
    }

    pub fn rows(&self) -> Vec<String> {
        (0..SIZE as i32)
            .map(|row| {
                (0..SIZE as i32)
                    .map(|col| self.get(Position::new(row, col)).map_or(EMPTY_GLYPH, |p| p.glyph()))
                    .collect()
            })
            .collect()
    }

    fn side_squares(&self, side: Side) -> &BitBoard {
        match side {
            Side::X => &self.x_squares,
            Side::O => &self.o_squares,
        }
    }

    /// Returns the piece at `pos`, or `None` for empty and off-board cells.
    pub fn get(&self, pos: Position) -> Option<Piece> {
        let rank = if self.kings.has_point(pos) { Rank::King } else { Rank::Man };
        if self.x_squares.has_point(pos) {
            Some(Piece { side: Side::X, rank })
        } else if self.o_squares.has_point(pos) {
            Some(Piece { side: Side::O, rank })
        } else {
            None
        }
    }

    pub fn set(&mut self, pos: Position, cell: Option<Piece>) {
        self.x_squares.set_point(pos, matches!(cell, Some(Piece { side: Side::X, .. })));
        self.o_squares.set_point(pos, matches!(cell, Some(Piece { side: Side::O, .. })));
        self.kings.set_point(pos, cell.map_or(false, |p| p.is_king()));
    }

    pub fn is_empty(&self, pos: Position) -> bool {
        pos.in_bounds() && self.get(pos).is_none()
    }

    /// Men and kings of `side` together.
    pub fn count(&self, side: Side) -> usize {
        self.side_squares(side).count_ones()
    }

    pub fn count_kings(&self, side: Side) -> usize {
        (*self.side_squares(side) & self.kings).count_ones()
    }

    /// Squares holding a piece of `side`, in row-major order.
    pub fn pieces(&self, side: Side) -> <BitBoard as BitArr2D>::IterPoints<'_> {
        self.side_squares(side).iter_set_points()
    }

    /// Terminal detection by piece count alone.
    pub fn check_winner(&self) -> Option<Outcome> {
        let x = self.count(Side::X);
        if x == 0 {
            return Some(Outcome::Winner(Side::O));
        }
        let o = self.count(Side::O);
        if o == 0 {
            return Some(Outcome::Winner(Side::X));
        }
        if x == 1 && o == 1 {
            return Some(Outcome::Draw);
        }
        None
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in self.rows() {
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}

impl Serialize for Board {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        let rows = self.rows();
        let mut s = serializer.serialize_seq(Some(rows.len()))?;
        for row in &rows {
            s.serialize_element(row)?;
        }
        s.end()
    }
}

struct BoardVisitor;
impl<'de> Visitor<'de> for BoardVisitor {
    type Value = Board;
    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON array of 8 row strings")
    }
    fn visit_seq<V>(self, mut seq: V) -> Result<Board, V::Error> where V: SeqAccess<'de> {
        let mut rows = Vec::<String>::with_capacity(SIZE);
        while let Some(row) = seq.next_element::<String>()? {
            rows.push(row);
        }
        Board::from_rows(&rows).map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'de> {
        deserializer.deserialize_seq(BoardVisitor)
    }
}
