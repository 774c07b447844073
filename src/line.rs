use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

use smallvec::SmallVec;

use crate::{Error, Result, Symbol};

/// The orbital space an index line runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Space {
    /// Occupied orbitals, labels `i` through `o`.
    Occupied,
    /// Virtual orbitals, labels `a` through `h`.
    Virtual,
    /// Density-fitting auxiliary functions, labels starting with `Q` or `L`.
    Density,
    /// Sigma (trial vector) index, labels starting with `X`.
    Sigma,
}

impl Space {
    /// Classify a label by its leading character.
    pub fn classify(label: &str) -> Option<Space> {
        match label.chars().next()? {
            'i'..='o' => Some(Space::Occupied),
            'a'..='h' => Some(Space::Virtual),
            'Q' | 'L' => Some(Space::Density),
            'X' => Some(Space::Sigma),
            _ => None,
        }
    }

    fn letter(self) -> char {
        match self {
            Space::Occupied => 'o',
            Space::Virtual => 'v',
            Space::Density => 'L',
            Space::Sigma => 'X',
        }
    }
}

/// An index line of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Line {
    pub label: Symbol,
    pub space: Space,
}

/// Most tensors carry at most four lines.
pub type Lines = SmallVec<[Line; 4]>;

impl Line {
    pub fn new(label: impl Into<Symbol>, space: Space) -> Self {
        Line {
            label: label.into(),
            space,
        }
    }

    /// Make a line, deriving its space from the label.
    pub fn parse(label: &str) -> Result<Self> {
        let space = Space::classify(label).ok_or_else(|| Error::UnknownLine(label.into()))?;
        Ok(Line::new(label, space))
    }

    pub fn is_sigma(&self) -> bool {
        self.space == Space::Sigma
    }
}

impl Display for Line {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.label, f)
    }
}

/// Lines appearing in exactly one of `left` or `right`, left lines first.
///
/// These are the external lines of a contraction; everything else is
/// summed over.
pub(crate) fn external_lines(left: &[Line], right: &[Line]) -> Lines {
    let mut lines = Lines::new();
    for line in left {
        if !right.contains(line) {
            lines.push(*line);
        }
    }
    for line in right {
        if !left.contains(line) {
            lines.push(*line);
        }
    }
    lines
}

/// Every distinct line of `left` and `right`, left lines first.
pub(crate) fn all_lines(left: &[Line], right: &[Line]) -> Lines {
    let mut lines: Lines = left.iter().copied().collect();
    for line in right {
        if !lines.contains(line) {
            lines.push(*line);
        }
    }
    lines
}

/// A computational complexity class: how many lines of each space an
/// operation touches.
///
/// Classes order by total size first (occupied + virtual + auxiliary), then
/// by the number of virtual, auxiliary, occupied and finally sigma lines,
/// so `o2v4` is more expensive than `o3v3`, which beats `o4v2`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape {
    pub occ: u8,
    pub vir: u8,
    pub den: u8,
    pub sig: u8,
}

impl Shape {
    pub fn from_lines(lines: &[Line]) -> Self {
        let mut shape = Shape::default();
        for line in lines {
            match line.space {
                Space::Occupied => shape.occ += 1,
                Space::Virtual => shape.vir += 1,
                Space::Density => shape.den += 1,
                Space::Sigma => shape.sig += 1,
            }
        }
        shape
    }

    /// Number of non-sigma lines.
    pub fn total(&self) -> u32 {
        self.occ as u32 + self.vir as u32 + self.den as u32
    }

    fn key(&self) -> (u32, u8, u8, u8, u8) {
        (self.total(), self.vir, self.den, self.occ, self.sig)
    }
}

impl PartialOrd for Shape {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Shape {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "o{}v{}", self.occ, self.vir)?;
        if self.den > 0 {
            write!(f, "L{}", self.den)?;
        }
        if self.sig > 0 {
            write!(f, "X{}", self.sig)?;
        }
        Ok(())
    }
}

/// Compact space signature such as `vvoo`, used in temporary names.
pub(crate) fn space_signature(lines: &[Line]) -> String {
    lines.iter().map(|line| line.space.letter()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(labels: &[&str]) -> Lines {
        labels.iter().map(|l| Line::parse(l).unwrap()).collect()
    }

    #[test]
    fn classify_labels() {
        assert_eq!(Space::classify("i"), Some(Space::Occupied));
        assert_eq!(Space::classify("m1"), Some(Space::Occupied));
        assert_eq!(Space::classify("e"), Some(Space::Virtual));
        assert_eq!(Space::classify("Q"), Some(Space::Density));
        assert_eq!(Space::classify("X"), Some(Space::Sigma));
        assert_eq!(Space::classify("z"), None);
        assert!(Line::parse("z").is_err());
    }

    #[test]
    fn contraction_lines() {
        let left = lines(&["a", "b", "i", "j"]);
        let right = lines(&["i", "j", "k", "l"]);
        assert_eq!(external_lines(&left, &right), lines(&["a", "b", "k", "l"]));
        assert_eq!(
            all_lines(&left, &right),
            lines(&["a", "b", "i", "j", "k", "l"])
        );
    }

    #[test]
    fn shape_order() {
        let o2v4 = Shape::from_lines(&lines(&["a", "b", "c", "d", "i", "j"]));
        let o3v3 = Shape::from_lines(&lines(&["a", "b", "c", "i", "j", "k"]));
        let o4v2 = Shape::from_lines(&lines(&["a", "b", "i", "j", "k", "l"]));
        let o2v2 = Shape::from_lines(&lines(&["a", "b", "i", "j"]));
        assert!(o2v4 > o3v3);
        assert!(o3v3 > o4v2);
        assert!(o4v2 > o2v2);
        assert_eq!(o2v4.to_string(), "o2v4");
        assert_eq!(space_signature(&lines(&["a", "b", "i", "j"])), "vvoo");
    }
}
