use crate::random::RandomSource;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

pub const MIN_SCRAMBLE_LENGTH: usize = 20;
pub const MAX_SCRAMBLE_LENGTH: usize = 25;

/// One of the six outer faces of the cube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Face {
    U,
    D,
    R,
    L,
    F,
    B,
}

impl Face {
    pub const ALL: [Face; 6] = [Face::U, Face::D, Face::R, Face::L, Face::F, Face::B];

    pub fn opposite(self) -> Face {
        match self {
            Face::U => Face::D,
            Face::D => Face::U,
            Face::R => Face::L,
            Face::L => Face::R,
            Face::F => Face::B,
            Face::B => Face::F,
        }
    }

    fn from_char(c: char) -> Option<Face> {
        match c {
            'U' => Some(Face::U),
            'D' => Some(Face::D),
            'R' => Some(Face::R),
            'L' => Some(Face::L),
            'F' => Some(Face::F),
            'B' => Some(Face::B),
            _ => None,
        }
    }
}

/// Quarter turn clockwise, counter-clockwise, or half turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Modifier {
    #[default]
    None,
    Inverse,
    Double,
}

impl Modifier {
    pub const ALL: [Modifier; 3] = [Modifier::None, Modifier::Inverse, Modifier::Double];

    pub fn suffix(self) -> &'static str {
        match self {
            Modifier::None => "",
            Modifier::Inverse => "'",
            Modifier::Double => "2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub face: Face,
    pub modifier: Modifier,
}

impl Move {
    pub fn new(face: Face, modifier: Modifier) -> Self {
        Self { face, modifier }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.face, self.modifier.suffix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseMoveError {
    #[error("empty move token")]
    Empty,
    #[error("unknown face '{0}'")]
    UnknownFace(char),
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
}

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let mut chars = token.chars();
        let first = chars.next().ok_or(ParseMoveError::Empty)?;
        let face = Face::from_char(first).ok_or(ParseMoveError::UnknownFace(first))?;
        let modifier = match chars.as_str() {
            "" => Modifier::None,
            "'" => Modifier::Inverse,
            "2" => Modifier::Double,
            other => return Err(ParseMoveError::UnknownModifier(other.to_string())),
        };
        Ok(Move::new(face, modifier))
    }
}

/// An ordered move sequence, rendered as space separated tokens
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scramble {
    moves: Vec<Move>,
}

impl Scramble {
    pub fn new(moves: Vec<Move>) -> Self {
        Self { moves }
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn difficulty(&self) -> Difficulty {
        Difficulty::from_move_count(self.len())
    }
}

impl fmt::Display for Scramble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.moves.iter().join(" "))
    }
}

impl FromStr for Scramble {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let moves = s
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<Move>, _>>()?;
        Ok(Scramble::new(moves))
    }
}

impl TryFrom<String> for Scramble {
    type Error = ParseMoveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Scramble> for String {
    fn from(scramble: Scramble) -> Self {
        scramble.to_string()
    }
}

/// Rough difficulty label derived only from the number of moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn from_move_count(count: usize) -> Self {
        match count {
            0..=18 => Difficulty::Easy,
            19..=22 => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }
}

/// Produces scrambles that never turn the same face (or its opposite) twice
/// in a row and never return to the face used two moves earlier.
pub struct ScrambleGenerator<R: RandomSource> {
    rng: R,
}

impl<R: RandomSource> ScrambleGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(&mut self) -> Scramble {
        let span = MAX_SCRAMBLE_LENGTH - MIN_SCRAMBLE_LENGTH + 1;
        let length = MIN_SCRAMBLE_LENGTH + self.rng.uniform(span);

        let mut moves: Vec<Move> = Vec::with_capacity(length);
        for i in 0..length {
            let last = moves.last().map(|m| m.face);
            let before_last = if i > 1 { Some(moves[i - 2].face) } else { None };
            let allowed = |face: Face| {
                Some(face) != last
                    && Some(face) != before_last
                    && last.map_or(true, |l| l.opposite() != face)
            };

            // at most three faces are excluded, so the rejection loop below terminates
            assert!(
                Face::ALL.iter().any(|&f| allowed(f)),
                "no face is allowed after {:?}/{:?}",
                before_last,
                last
            );

            let face = loop {
                let candidate = Face::ALL[self.rng.uniform(Face::ALL.len())];
                if allowed(candidate) {
                    break candidate;
                }
            };
            let modifier = Modifier::ALL[self.rng.uniform(Modifier::ALL.len())];
            moves.push(Move::new(face, modifier));
        }

        Scramble::new(moves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{RngSource, ScriptedSource};

    fn assert_well_formed(scramble: &Scramble) {
        let faces: Vec<Face> = scramble.moves().iter().map(|m| m.face).collect();
        assert!((MIN_SCRAMBLE_LENGTH..=MAX_SCRAMBLE_LENGTH).contains(&faces.len()));
        for i in 1..faces.len() {
            assert_ne!(faces[i], faces[i - 1], "repeated face in {scramble}");
            assert_ne!(faces[i], faces[i - 1].opposite(), "opposite faces in {scramble}");
            if i > 1 {
                assert_ne!(faces[i], faces[i - 2], "face two back in {scramble}");
            }
        }
    }

    #[test]
    fn generated_scrambles_respect_adjacency_rules() {
        let mut generator = ScrambleGenerator::new(RngSource::seeded(1234));
        for _ in 0..500 {
            assert_well_formed(&generator.generate());
        }
    }

    #[test]
    fn every_length_in_range_is_reachable() {
        let mut generator = ScrambleGenerator::new(RngSource::seeded(99));
        let mut seen = [false; MAX_SCRAMBLE_LENGTH + 1];
        for _ in 0..500 {
            seen[generator.generate().len()] = true;
        }
        assert!(seen[MIN_SCRAMBLE_LENGTH..=MAX_SCRAMBLE_LENGTH].iter().all(|s| *s));
    }

    #[test]
    fn rejected_faces_are_redrawn() {
        // length draw 0 -> 20 moves; first move U, then U and D are redrawn until R
        let mut generator = ScrambleGenerator::new(ScriptedSource::new(vec![
            0, 0, 0, // length, U, modifier none
            0, 1, 2, 1, // U rejected, D rejected (opposite), R accepted, modifier '
            3, 4, 5, // every face shows up once per cycle
        ]));
        let scramble = generator.generate();
        assert_eq!(scramble.moves()[0], Move::new(Face::U, Modifier::None));
        assert_eq!(scramble.moves()[1], Move::new(Face::R, Modifier::Inverse));
        assert_well_formed(&scramble);
    }

    #[test]
    fn difficulty_thresholds() {
        assert_eq!(Difficulty::from_move_count(0), Difficulty::Easy);
        assert_eq!(Difficulty::from_move_count(18), Difficulty::Easy);
        assert_eq!(Difficulty::from_move_count(19), Difficulty::Medium);
        assert_eq!(Difficulty::from_move_count(22), Difficulty::Medium);
        assert_eq!(Difficulty::from_move_count(23), Difficulty::Hard);
        assert_eq!(Difficulty::from_move_count(40), Difficulty::Hard);
        assert_eq!(Difficulty::Medium.to_string(), "Medium");
    }

    #[test]
    fn generated_difficulty_is_medium_or_hard() {
        let mut generator = ScrambleGenerator::new(RngSource::seeded(5));
        for _ in 0..50 {
            let difficulty = generator.generate().difficulty();
            assert!(matches!(difficulty, Difficulty::Medium | Difficulty::Hard));
        }
    }

    #[test]
    fn parse_and_render_tokens() {
        let scramble: Scramble = "R U' F2 D".parse().unwrap();
        assert_eq!(scramble.len(), 4);
        assert_eq!(scramble.moves()[1], Move::new(Face::U, Modifier::Inverse));
        assert_eq!(scramble.to_string(), "R U' F2 D");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!("X".parse::<Move>(), Err(ParseMoveError::UnknownFace('X')));
        assert_eq!(
            "R3".parse::<Move>(),
            Err(ParseMoveError::UnknownModifier("3".to_string()))
        );
        assert_eq!("".parse::<Move>(), Err(ParseMoveError::Empty));
        assert!("".parse::<Scramble>().unwrap().is_empty());
    }

    #[test]
    fn serializes_as_plain_string() {
        let scramble: Scramble = "L2 B".parse().unwrap();
        let json = serde_json::to_string(&scramble).unwrap();
        assert_eq!(json, "\"L2 B\"");
        let back: Scramble = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scramble);
    }
}
