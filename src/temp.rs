use std::fmt::{self, Display, Formatter};
use std::ops::{Index, IndexMut};

/// The category a temporary is declared in.
///
/// Categories are listed in the order their declarations are emitted:
/// scalars first, then reused intermediates, then generic ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum TempKind {
    /// A temporary with no free index lines.
    Scalar,
    /// A temporary independent of any sigma (trial) vector; it can be
    /// computed once and reused across sigma builds.
    Reused,
    /// Everything else.
    Generic,
}

impl TempKind {
    pub const ALL: [TempKind; 3] = [TempKind::Scalar, TempKind::Reused, TempKind::Generic];

    /// Name of the equation holding this category's declarations.
    pub fn equation_name(self) -> &'static str {
        match self {
            TempKind::Scalar => "scalar",
            TempKind::Reused => "reused",
            TempKind::Generic => "generic-temp",
        }
    }

    /// The category whose declarations live in the equation called `name`.
    pub fn from_equation_name(name: &str) -> Option<TempKind> {
        TempKind::ALL
            .into_iter()
            .find(|kind| kind.equation_name() == name)
    }

    pub(crate) fn prefix(self) -> &'static str {
        match self {
            TempKind::Scalar => "scalar",
            TempKind::Reused => "reused",
            TempKind::Generic => "tmps",
        }
    }

    /// Scalar and reused declarations are hoisted out of the iterated
    /// equations, so their cost is paid once.
    pub fn is_hoisted(self) -> bool {
        self != TempKind::Generic
    }
}

impl Display for TempKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.equation_name())
    }
}

/// Identity of a declared temporary: unique within its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TempId {
    pub kind: TempKind,
    pub id: u32,
}

impl TempId {
    pub fn new(kind: TempKind, id: u32) -> Self {
        TempId { kind, id }
    }
}

impl Display for TempId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.id)
    }
}

/// One value per [`TempKind`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PerKind<T> {
    pub scalar: T,
    pub reused: T,
    pub generic: T,
}

impl<T> PerKind<T> {
    pub fn iter(&self) -> impl Iterator<Item = (TempKind, &T)> {
        TempKind::ALL.into_iter().map(move |kind| (kind, &self[kind]))
    }
}

impl<T> Index<TempKind> for PerKind<T> {
    type Output = T;
    fn index(&self, kind: TempKind) -> &T {
        match kind {
            TempKind::Scalar => &self.scalar,
            TempKind::Reused => &self.reused,
            TempKind::Generic => &self.generic,
        }
    }
}

impl<T> IndexMut<TempKind> for PerKind<T> {
    fn index_mut(&mut self, kind: TempKind) -> &mut T {
        match kind {
            TempKind::Scalar => &mut self.scalar,
            TempKind::Reused => &mut self.reused,
            TempKind::Generic => &mut self.generic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equation_names_round_trip() {
        for kind in TempKind::ALL {
            assert_eq!(TempKind::from_equation_name(kind.equation_name()), Some(kind));
        }
        assert_eq!(TempKind::from_equation_name("rt2"), None);
    }

    #[test]
    fn per_kind_indexing() {
        let mut counts = PerKind::<u32>::default();
        counts[TempKind::Reused] += 2;
        counts[TempKind::Generic] += 1;
        let collected: Vec<_> = counts.iter().map(|(k, c)| (k, *c)).collect();
        assert_eq!(
            collected,
            vec![
                (TempKind::Scalar, 0),
                (TempKind::Reused, 2),
                (TempKind::Generic, 1)
            ]
        );
    }
}
