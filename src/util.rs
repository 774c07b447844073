use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use symbolic_expressions::Sexp;

use fmt::{Debug, Display, Formatter};
use once_cell::sync::Lazy;

pub(crate) type BuildHasher = fxhash::FxBuildHasher;

pub(crate) type HashMap<K, V> = hashbrown::HashMap<K, V, BuildHasher>;
pub(crate) type HashSet<K> = hashbrown::HashSet<K, BuildHasher>;

pub(crate) type IndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub(crate) type IndexSet<K> = indexmap::IndexSet<K, BuildHasher>;

pub(crate) type Instant = instant::Instant;
pub(crate) type Duration = instant::Duration;

/// Rearranges `idxs` into the next lexicographic permutation.
///
/// Returns `false` (leaving `idxs` sorted ascending) once the last
/// permutation has been passed.
pub(crate) fn next_permutation(idxs: &mut [usize]) -> bool {
    if idxs.len() < 2 {
        return false;
    }

    let mut i = idxs.len() - 1;
    while i > 0 && idxs[i - 1] >= idxs[i] {
        i -= 1;
    }

    if i == 0 {
        idxs.reverse();
        return false;
    }

    let mut j = idxs.len() - 1;
    while idxs[j] <= idxs[i - 1] {
        j -= 1;
    }
    idxs.swap(i - 1, j);
    idxs[i..].reverse();
    true
}

pub(crate) fn pretty_print(
    buf: &mut String,
    sexp: &Sexp,
    width: usize,
    level: usize,
) -> std::fmt::Result {
    use std::fmt::Write;
    if let Sexp::List(list) = sexp {
        let indent = sexp.to_string().len() > width;
        write!(buf, "(")?;

        for (i, val) in list.iter().enumerate() {
            if indent && i > 0 {
                writeln!(buf)?;
                for _ in 0..level {
                    write!(buf, "  ")?;
                }
            }
            pretty_print(buf, val, width, level + 1)?;
            if !indent && i < list.len() - 1 {
                write!(buf, " ")?;
            }
        }

        write!(buf, ")")?;
        Ok(())
    } else {
        write!(buf, "{}", sexp.to_string().trim_matches('"'))
    }
}

/// Pretty print an s-expression, breaking lines once it exceeds `width`.
pub fn pretty(sexp: &Sexp, width: usize) -> String {
    let mut buf = String::new();
    pretty_print(&mut buf, sexp, width, 1).unwrap();
    buf
}

static STRINGS: Lazy<Mutex<IndexSet<&'static str>>> = Lazy::new(Default::default);

/// An interned string.
///
/// Tensor names and index labels are compared and hashed constantly while
/// the candidate pool is deduplicated, so they are stored as [`Symbol`]s:
/// a `u32` index into a global table. Comparing two symbols never touches
/// the string itself.
///
/// The derived `Ord` follows interning order, not the alphabet; use
/// [`Symbol::as_str`] when a lexicographic order is needed.
///
/// # Example
/// ```rust
/// use tensor_factor::Symbol;
///
/// assert_eq!(Symbol::from("t2"), Symbol::from("t2"));
/// assert_eq!(Symbol::from("t2"), "t2".parse().unwrap());
///
/// assert_ne!(Symbol::from("t2"), Symbol::from("V"));
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    /// Get the string that this symbol represents
    pub fn as_str(self) -> &'static str {
        let i = self.0 as usize;
        let strings = STRINGS
            .lock()
            .unwrap_or_else(|err| panic!("Failed to acquire the global symbol table: {}", err));
        strings.get_index(i).unwrap()
    }
}

fn leak(s: &str) -> &'static str {
    Box::leak(s.to_owned().into_boxed_str())
}

fn intern(s: &str) -> Symbol {
    let mut strings = STRINGS
        .lock()
        .unwrap_or_else(|err| panic!("Failed to acquire the global symbol table: {}", err));
    let i = match strings.get_full(s) {
        Some((i, _)) => i,
        None => strings.insert_full(leak(s)).0,
    };
    Symbol(i as u32)
}

impl<S: AsRef<str>> From<S> for Symbol {
    fn from(s: S) -> Self {
        intern(s.as_ref())
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.into())
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self.as_str(), f)
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self.as_str(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutations_are_lexicographic() {
        let mut idxs = vec![0, 1, 2];
        let mut seen = vec![idxs.clone()];
        while next_permutation(&mut idxs) {
            seen.push(idxs.clone());
        }
        assert_eq!(
            seen,
            vec![
                vec![0, 1, 2],
                vec![0, 2, 1],
                vec![1, 0, 2],
                vec![1, 2, 0],
                vec![2, 0, 1],
                vec![2, 1, 0],
            ]
        );
        // wrapped back around to sorted
        assert_eq!(idxs, vec![0, 1, 2]);
    }

    #[test]
    fn short_slices_have_no_successor() {
        let mut empty: Vec<usize> = vec![];
        assert!(!next_permutation(&mut empty));
        let mut one = vec![0];
        assert!(!next_permutation(&mut one));
    }
}
