//! Piece geometry and kick tables, loaded at runtime from text files.
//!
//! The engine has no built-in rotation system. Whatever the data files
//! describe is what the movement code in [`crate::gameplay`] plays by, so
//! one binary can be pointed at different kick tables without recompiling.

use std::fs;
use std::path::Path;

use log::debug;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::gameplay::{Rotation, Shape, Turn};

type Minoes = SmallVec<[(i8, i8); 4]>;
type Kicks = SmallVec<[(i8, i8); 5]>;

/// Immutable piece geometry, bounding widths, and kick offsets.
///
/// All offsets are `(dy, dx)` relative to a piece's reference center, with
/// `dy` increasing upwards. Rotation 0 comes straight from the pieces
/// file; rotations 1 through 3 are derived by repeatedly applying the 90°
/// clockwise map `(y, x) → (−x, y)`.
///
/// Loaded once, then shared by reference everywhere.
pub struct Physics {
    minoes: [[Minoes; 4]; 7],
    widths: [i8; 7],
    kicks: [[[Kicks; 3]; 4]; 7],
}

impl Physics {
    /// Read a pieces file and a kicks file (formats below).
    pub fn load(pieces_path: impl AsRef<Path>, kicks_path: impl AsRef<Path>) -> Result<Physics> {
        debug!(
            "loading piece data from {:?} and kick data from {:?}",
            pieces_path.as_ref(),
            kicks_path.as_ref()
        );

        let pieces = fs::read_to_string(pieces_path)?;
        let kicks = fs::read_to_string(kicks_path)?;
        Physics::parse(&pieces, &kicks)
    }

    /// Parse piece and kick data from in-memory text.
    ///
    /// The pieces file starts with the seven shape names on one line, then
    /// two 4-character rows per shape (upper row first, `.` for empty).
    /// The kicks file holds seven blocks: a shape name, then for each of
    /// the four rotations and three turns a redundant count line followed
    /// by a `dy, dx; dy, dx; …` offset list.
    pub fn parse(pieces: &str, kicks: &str) -> Result<Physics> {
        let mut physics = Physics {
            minoes: Default::default(),
            widths: [3; 7],
            kicks: Default::default(),
        };
        physics.widths[Shape::O as usize] = 2;
        physics.widths[Shape::I as usize] = 4;

        parse_pieces(pieces, &mut physics)?;
        parse_kicks(kicks, &mut physics)?;

        Ok(physics)
    }

    /// The four cell offsets of a shape in a rotation.
    pub fn minoes(&self, shape: Shape, rotation: Rotation) -> &[(i8, i8)] {
        &self.minoes[shape as usize][rotation as usize]
    }

    /// The bounding width of a shape: 3, except 2 for O and 4 for I.
    ///
    /// This bounds how many lines one lock can clear, which in turn bounds
    /// how many lines the backward enumerator needs to re-insert.
    pub fn width(&self, shape: Shape) -> i8 {
        self.widths[shape as usize]
    }

    /// The ordered kick candidates for rotating a shape out of `rotation`
    /// by `turn`. The first candidate is always `(0, 0)`.
    pub fn kicks(&self, shape: Shape, rotation: Rotation, turn: Turn) -> &[(i8, i8)] {
        &self.kicks[shape as usize][rotation as usize][turn.index()]
    }
}

/// A line iterator that remembers its position for error reporting.
struct LineReader<'a> {
    lines: std::str::Lines<'a>,
    number: usize,
}

impl<'a> LineReader<'a> {
    fn new(text: &'a str) -> LineReader<'a> {
        LineReader {
            lines: text.lines(),
            number: 0,
        }
    }

    fn next(&mut self) -> Result<&'a str> {
        self.number += 1;
        self.lines
            .next()
            .map(str::trim)
            .ok_or_else(|| Error::parse(self.number, "unexpected end of file"))
    }
}

fn parse_pieces(text: &str, physics: &mut Physics) -> Result<()> {
    let mut reader = LineReader::new(text);

    let order = reader.next()?;
    let mut listed = [false; 7];
    let mut shapes = Vec::new();

    for c in order.chars() {
        let shape = Shape::from_char(c)
            .ok_or_else(|| Error::parse(reader.number, format!("unknown shape name {:?}", c)))?;
        if listed[shape as usize] {
            return Err(Error::parse(
                reader.number,
                format!("shape {} listed twice", shape.name()),
            ));
        }
        listed[shape as usize] = true;
        shapes.push(shape);
    }
    if shapes.len() != 7 {
        return Err(Error::parse(
            reader.number,
            "expected all seven shape names",
        ));
    }

    for shape in shapes {
        let upper = reader.next()?;
        let lower = reader.next()?;

        let mut cells: Minoes = SmallVec::new();
        for (row, line) in [(0, lower), (1, upper)] {
            if line.chars().count() != 4 {
                return Err(Error::parse(
                    reader.number,
                    "piece rows must be exactly four characters",
                ));
            }
            for (i, c) in line.chars().enumerate() {
                if c != '.' {
                    cells.push((row, i as i8 - 1));
                }
            }
        }
        if cells.len() != 4 {
            return Err(Error::parse(
                reader.number,
                format!("shape {} must have exactly four cells", shape.name()),
            ));
        }

        for rotation in Rotation::ALL {
            physics.minoes[shape as usize][rotation as usize] = cells.clone();
            cells = cells.iter().map(|&(y, x)| (-x, y)).collect();
        }
    }

    Ok(())
}

fn parse_kicks(text: &str, physics: &mut Physics) -> Result<()> {
    let mut reader = LineReader::new(text);
    let mut seen = [false; 7];

    for _ in 0..7 {
        let name = reader.next()?;
        let shape = match name.chars().collect::<Vec<_>>()[..] {
            [c] => Shape::from_char(c),
            _ => None,
        }
        .ok_or_else(|| Error::parse(reader.number, format!("expected a shape name, got {:?}", name)))?;

        if seen[shape as usize] {
            return Err(Error::parse(
                reader.number,
                format!("duplicate kick block for {}", shape.name()),
            ));
        }
        seen[shape as usize] = true;

        for rotation in Rotation::ALL {
            for turn in Turn::ALL {
                // The count line is redundant with the list that follows.
                reader.next()?;
                let list = reader.next()?;

                let mut kicks: Kicks = SmallVec::new();
                for pair in list.split("; ") {
                    let (dy, dx) = pair.split_once(", ").ok_or_else(|| {
                        Error::parse(reader.number, format!("expected `dy, dx`, got {:?}", pair))
                    })?;
                    let parse = |s: &str| {
                        s.trim().parse::<i8>().map_err(|_| {
                            Error::parse(reader.number, format!("non-integer offset {:?}", s))
                        })
                    };
                    kicks.push((parse(dy)?, parse(dx)?));
                }

                if kicks.first() != Some(&(0, 0)) {
                    return Err(Error::parse(
                        reader.number,
                        "kick list must begin with `0, 0`",
                    ));
                }

                physics.kicks[shape as usize][rotation as usize][turn.index()] = kicks;
            }
        }
    }

    Ok(())
}
