use std::fmt::{self, Debug, Formatter};

use crate::{util::IndexSet, Linkage};

/// A set of [`Linkage`]s deduplicated by structure.
///
/// However many separately built copies of an expression are inserted,
/// the set keeps the first one as the canonical representative.
/// Iteration follows insertion order, so a search over the set is
/// reproducible from run to run.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LinkageSet {
    links: IndexSet<Linkage>,
}

impl LinkageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `link`, returning `false` if an equal linkage was present.
    pub fn insert(&mut self, link: Linkage) -> bool {
        self.links.insert(link)
    }

    pub fn contains(&self, link: &Linkage) -> bool {
        self.links.contains(link)
    }

    /// The stored representative of `link`.
    pub fn get(&self, link: &Linkage) -> Option<&Linkage> {
        self.links.get(link)
    }

    pub fn remove(&mut self, link: &Linkage) -> bool {
        self.links.shift_remove(link)
    }

    pub fn get_index(&self, i: usize) -> Option<&Linkage> {
        self.links.get_index(i)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn clear(&mut self) {
        self.links.clear()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Linkage> + '_ {
        self.links.iter()
    }

    pub fn retain(&mut self, keep: impl FnMut(&Linkage) -> bool) {
        self.links.retain(keep)
    }

    /// Add every linkage of `other`.
    pub fn union_with(&mut self, other: &LinkageSet) {
        self.links.extend(other.links.iter().cloned())
    }

    /// The linkages of `self` missing from `other`, in `self`'s order.
    pub fn difference(&self, other: &LinkageSet) -> LinkageSet {
        self.links
            .iter()
            .filter(|link| !other.contains(link))
            .cloned()
            .collect()
    }
}

impl Extend<Linkage> for LinkageSet {
    fn extend<T: IntoIterator<Item = Linkage>>(&mut self, iter: T) {
        self.links.extend(iter)
    }
}

impl FromIterator<Linkage> for LinkageSet {
    fn from_iter<T: IntoIterator<Item = Linkage>>(iter: T) -> Self {
        LinkageSet {
            links: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a LinkageSet {
    type Item = &'a Linkage;
    type IntoIter = indexmap::set::Iter<'a, Linkage>;
    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

impl Debug for LinkageSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.links.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vertex;

    fn l(s: &str) -> Linkage {
        s.parse::<Vertex>().unwrap().as_link().cloned().unwrap()
    }

    #[test]
    fn one_representative_per_structure() {
        let mut set = LinkageSet::new();
        let first = l("(* (X a b) (Y b c))");
        let second = l("(* (X a b) (Y b c))");
        assert!(set.insert(first.clone()));
        assert!(!set.insert(second.clone()));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&second));
        assert_eq!(set.get(&second), Some(&first));
    }

    #[test]
    fn set_algebra_keeps_order() {
        let a = l("(* (X a b) (Y b c))");
        let b = l("(* (Y b c) (Z c d))");
        let c = l("(+ (X a b) (W a b))");

        let all: LinkageSet = vec![a.clone(), b.clone(), c.clone()].into_iter().collect();
        let ignore: LinkageSet = vec![b.clone()].into_iter().collect();
        let test = all.difference(&ignore);
        assert_eq!(test.iter().cloned().collect::<Vec<_>>(), vec![a.clone(), c.clone()]);

        let mut merged = ignore.clone();
        merged.union_with(&test);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get_index(0), Some(&b));

        merged.remove(&b);
        assert_eq!(merged.get_index(0), Some(&a));
        merged.retain(|link| !link.is_addition());
        assert_eq!(merged.len(), 1);
    }
}
