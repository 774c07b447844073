use std::cmp::Ordering;
use std::collections::{btree_map, BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::Shape;

/// Result of comparing two [`ScalingMap`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `self` is cheaper.
    Better,
    /// Every class has the same count.
    Same,
    /// `self` is more expensive.
    Worse,
}

/// A cost profile: how many operations fall into each [`Shape`] class.
///
/// Profiles compare lexicographically from the most expensive class down:
/// a single extra `o2v4` contraction outweighs any number of `o3v3` ones.
/// Zero counts are never stored, so two maps are equal exactly when they
/// compare as [`Comparison::Same`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct ScalingMap {
    counts: BTreeMap<Shape, i64>,
}

impl ScalingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` more occurrences of `shape`.
    pub fn insert(&mut self, shape: Shape, count: i64) {
        if count == 0 {
            return;
        }
        match self.counts.entry(shape) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(count);
            }
            btree_map::Entry::Occupied(mut entry) => {
                *entry.get_mut() += count;
                if *entry.get() == 0 {
                    entry.remove();
                }
            }
        }
    }

    pub fn get(&self, shape: &Shape) -> i64 {
        self.counts.get(shape).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> i64 {
        self.counts.values().sum()
    }

    /// The most expensive class present, if any.
    pub fn worst(&self) -> Option<Shape> {
        self.counts.keys().next_back().copied()
    }

    /// Iterate classes from the cheapest to the most expensive.
    pub fn iter(&self) -> impl Iterator<Item = (&Shape, &i64)> {
        self.counts.iter()
    }

    /// Drop every class with a negative count.
    pub fn clamp_positive(&mut self) {
        self.counts.retain(|_, count| *count > 0);
    }

    /// Three-way comparison, walking classes from most to least expensive.
    pub fn compare(&self, other: &ScalingMap) -> Comparison {
        let shapes: BTreeSet<&Shape> = self.counts.keys().chain(other.counts.keys()).collect();
        for shape in shapes.into_iter().rev() {
            let (mine, theirs) = (self.get(shape), other.get(shape));
            if mine < theirs {
                return Comparison::Better;
            }
            if mine > theirs {
                return Comparison::Worse;
            }
        }
        Comparison::Same
    }
}

impl PartialOrd for ScalingMap {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScalingMap {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.compare(other) {
            Comparison::Better => Ordering::Less,
            Comparison::Same => Ordering::Equal,
            Comparison::Worse => Ordering::Greater,
        }
    }
}

impl AddAssign<&ScalingMap> for ScalingMap {
    fn add_assign(&mut self, other: &ScalingMap) {
        for (shape, count) in &other.counts {
            self.insert(*shape, *count);
        }
    }
}

impl SubAssign<&ScalingMap> for ScalingMap {
    fn sub_assign(&mut self, other: &ScalingMap) {
        for (shape, count) in &other.counts {
            self.insert(*shape, -count);
        }
    }
}

impl Add for &ScalingMap {
    type Output = ScalingMap;
    fn add(self, other: &ScalingMap) -> ScalingMap {
        let mut sum = self.clone();
        sum += other;
        sum
    }
}

impl Sub for &ScalingMap {
    type Output = ScalingMap;
    fn sub(self, other: &ScalingMap) -> ScalingMap {
        let mut diff = self.clone();
        diff -= other;
        diff
    }
}

impl FromIterator<Shape> for ScalingMap {
    fn from_iter<T: IntoIterator<Item = Shape>>(iter: T) -> Self {
        let mut map = ScalingMap::new();
        for shape in iter {
            map.insert(shape, 1);
        }
        map
    }
}

impl Display for ScalingMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.counts.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{")?;
        for (i, (shape, count)) in self.counts.iter().rev().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", shape, count)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(occ: u8, vir: u8) -> Shape {
        Shape {
            occ,
            vir,
            ..Shape::default()
        }
    }

    #[test]
    fn expensive_class_dominates() {
        let a: ScalingMap = vec![shape(2, 4)].into_iter().collect();
        let b: ScalingMap = vec![shape(3, 3); 100].into_iter().collect();
        assert_eq!(a.compare(&b), Comparison::Worse);
        assert_eq!(b.compare(&a), Comparison::Better);
        assert!(b < a);
    }

    #[test]
    fn ties_cascade_to_cheaper_classes() {
        let a: ScalingMap = vec![shape(2, 4), shape(2, 2)].into_iter().collect();
        let b: ScalingMap = vec![shape(2, 4), shape(2, 2), shape(2, 2)]
            .into_iter()
            .collect();
        assert_eq!(a.compare(&b), Comparison::Better);
        assert_eq!(a.compare(&a.clone()), Comparison::Same);
    }

    #[test]
    fn arithmetic_drops_zero_counts() {
        let a: ScalingMap = vec![shape(2, 4), shape(2, 2)].into_iter().collect();
        let b: ScalingMap = vec![shape(2, 4)].into_iter().collect();
        let diff = &a - &b;
        assert_eq!(diff.total(), 1);
        assert_eq!(diff.get(&shape(2, 4)), 0);
        assert_eq!(&diff + &b, a);

        let mut negative = &b - &a;
        assert_eq!(negative.total(), -1);
        negative.clamp_positive();
        assert!(negative.is_empty());
        assert_eq!(negative, ScalingMap::new());
    }

    #[test]
    fn display_lists_worst_first() {
        let a: ScalingMap = vec![shape(2, 2), shape(2, 4), shape(2, 4)]
            .into_iter()
            .collect();
        assert_eq!(a.to_string(), "{o2v4: 2, o2v2: 1}");
        assert_eq!(a.worst(), Some(shape(2, 4)));
    }
}
