use std::fmt::{self, Display, Formatter};

use crate::{
    util::{HashSet, IndexMap},
    Error, Linkage, Result, ScalingMap, TempKind, Term, Vertex,
};

/// Coefficients at or below this magnitude are zero.
pub const ZERO_TOLERANCE: f64 = 1e-12;

/// A named list of terms accumulating into one target.
///
/// The declarations of each temporary category live in an equation of
/// their own (see [`TempKind::equation_name`]); its terms assign different
/// temporaries, are never merged, and never supply candidates.
#[derive(Debug, Clone)]
pub struct Equation {
    name: String,
    assignment: Vertex,
    terms: Vec<Term>,
    temp_kind: Option<TempKind>,
    flop_map: ScalingMap,
    mem_map: ScalingMap,
}

impl Equation {
    /// Build an equation, checking that every term assigns the target of
    /// the first one.
    pub fn new(name: impl Into<String>, terms: Vec<Term>) -> Result<Self> {
        let name = name.into();
        let assignment = match terms.first() {
            Some(term) => term.lhs().clone(),
            None => return Err(Error::EmptyEquation { name }),
        };
        if let Some(term) = terms.iter().find(|t| t.lhs().name() != assignment.name()) {
            return Err(Error::LhsMismatch {
                equation: name,
                expected: assignment.name(),
                found: term.lhs().name(),
            });
        }

        let mut eq = Equation {
            name,
            assignment,
            terms,
            temp_kind: None,
            flop_map: ScalingMap::new(),
            mem_map: ScalingMap::new(),
        };
        eq.collect_scaling(false);
        Ok(eq)
    }

    /// The empty equation holding declarations of category `kind`.
    pub fn declarations(kind: TempKind) -> Self {
        Equation {
            name: kind.equation_name().into(),
            assignment: Vertex::Empty,
            terms: vec![],
            temp_kind: Some(kind),
            flop_map: ScalingMap::new(),
            mem_map: ScalingMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn assignment(&self) -> &Vertex {
        &self.assignment
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The category this equation declares, if it is a declaration
    /// equation.
    pub fn temp_kind(&self) -> Option<TempKind> {
        self.temp_kind
    }

    pub fn is_temp_equation(&self) -> bool {
        self.temp_kind.is_some()
    }

    /// Is this equation evaluated once rather than on every iteration of
    /// the method?
    pub fn is_hoisted(&self) -> bool {
        self.temp_kind.map_or(false, TempKind::is_hoisted)
    }

    /// The category whose declaration order this equation must respect.
    pub(crate) fn dependency_kind(&self) -> TempKind {
        self.temp_kind.unwrap_or(TempKind::Generic)
    }

    pub fn flop_map(&self) -> &ScalingMap {
        &self.flop_map
    }

    pub fn mem_map(&self) -> &ScalingMap {
        &self.mem_map
    }

    pub(crate) fn terms_mut(&mut self) -> &mut Vec<Term> {
        &mut self.terms
    }

    pub(crate) fn push_term(&mut self, term: Term) {
        self.flop_map += term.flop_map();
        self.mem_map += term.mem_map();
        self.terms.push(term);
    }

    /// Put every term in its cheapest operand order.
    pub fn reorder(&mut self) {
        for term in &mut self.terms {
            term.reorder();
        }
        self.collect_scaling(false);
    }

    /// Recompute each term's cost and the equation total.
    pub fn collect_scaling(&mut self, regenerate: bool) {
        self.flop_map = ScalingMap::new();
        self.mem_map = ScalingMap::new();
        for term in &mut self.terms {
            term.collect_scaling(regenerate);
            self.flop_map += term.flop_map();
            self.mem_map += term.mem_map();
        }
    }

    /// Combine terms with the same lhs, expression, permutations and
    /// conditions by adding their coefficients; drop sums that vanish.
    /// Returns how many terms were removed.
    pub fn merge_terms(&mut self) -> usize {
        if self.is_temp_equation() {
            return 0;
        }
        let before = self.terms.len();
        let mut groups: IndexMap<_, Term> = Default::default();
        for term in self.terms.drain(..) {
            match groups.entry(term.merge_key()) {
                indexmap::map::Entry::Occupied(mut entry) => {
                    let merged = entry.get().coefficient() + term.coefficient();
                    let first = entry.get_mut();
                    first.set_coefficient(merged);
                    if term.is_assignment() {
                        first.set_assignment(true);
                    }
                }
                indexmap::map::Entry::Vacant(entry) => {
                    entry.insert(term);
                }
            }
        }
        self.terms = groups
            .into_values()
            .filter(|t| t.coefficient().abs() > ZERO_TOLERANCE)
            .collect();
        self.collect_scaling(false);

        let removed = before - self.terms.len();
        if removed > 0 {
            log::debug!("Merged {} terms in {}", removed, self.name);
        }
        removed
    }

    /// Sort terms by conditions, lhs, size and cost, then by the
    /// declaration order of temporaries of category `kind`.
    pub fn rearrange(&mut self, kind: TempKind) {
        self.terms.sort_by(|a, b| {
            a.conditions()
                .cmp(b.conditions())
                .then_with(|| a.lhs().name().cmp(&b.lhs().name()))
                .then_with(|| a.size().cmp(&b.size()))
                .then_with(|| a.flop_map().cmp(b.flop_map()))
        });
        sort_tmp_type(&mut self.terms, kind);
    }

    /// Cost of this equation if `pattern` were replaced by `temp`, without
    /// changing anything. Returns the number of terms that would change.
    pub fn test_substitute(
        &self,
        pattern: &Linkage,
        temp: &Linkage,
        flop_map: &mut ScalingMap,
        mem_map: &mut ScalingMap,
    ) -> usize {
        let mut substituted = 0;
        for term in &self.terms {
            match term.best_rewrite(pattern, temp) {
                Some(rewrite) if term.accepts(&rewrite, true) => {
                    *flop_map += &rewrite.flop_map;
                    *mem_map += &rewrite.mem_map;
                    substituted += 1;
                }
                _ => {
                    *flop_map += term.flop_map();
                    *mem_map += term.mem_map();
                }
            }
        }
        substituted
    }

    /// Replace `pattern` with `temp` in every term where that does not
    /// raise the cost. Returns the number of terms changed.
    pub fn substitute(&mut self, pattern: &Linkage, temp: &Linkage, allow_equality: bool) -> usize {
        let mut substituted = 0;
        for term in &mut self.terms {
            if term.substitute(pattern, temp, allow_equality) {
                substituted += 1;
            }
        }
        if substituted > 0 {
            self.collect_scaling(false);
        }
        substituted
    }

    /// Temporaries referenced by any term's expression, looking inside
    /// other temporaries.
    pub fn referenced_temps(&self) -> HashSet<Linkage> {
        self.terms
            .iter()
            .flat_map(|t| t.linkage().get_temps(true, true))
            .collect()
    }
}

/// Order terms so that each temporary of category `kind` is declared
/// before it is used.
///
/// Terms without such temporaries come first in their current order.
/// The rest follow by the largest id they declare or reference; for equal
/// ids the declaration precedes its uses. Ids must already follow
/// dependency order. Afterwards the first term for each ordinary lhs
/// becomes the assignment.
pub fn sort_tmp_type(terms: &mut Vec<Term>, kind: TempKind) {
    let mut keyed: Vec<_> = terms
        .drain(..)
        .enumerate()
        .map(|(idx, term)| {
            let key = match term.temp_ids(kind) {
                (_, None) => (0, 0, 0, idx),
                (declared, Some(max)) => (1, max, usize::from(declared != Some(max)), idx),
            };
            (key, term)
        })
        .collect();
    keyed.sort_by_key(|(key, _)| *key);

    let mut assigned = HashSet::default();
    for (_, mut term) in keyed {
        if !term.lhs().is_temp() {
            let first = assigned.insert(term.lhs().name());
            term.set_assignment(first);
        }
        terms.push(term);
    }
}

impl Display for Equation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;
        for term in &self.terms {
            writeln!(f, "  {}", term)?;
        }
        Ok(())
    }
}
