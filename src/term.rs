use std::fmt::{self, Display, Formatter};

use crate::{
    vertex::link, Comparison, Limit, Line, Linkage, LinkageSet, ScalingMap, TempKind, Vertex,
};

/// An antisymmetric permutation operator `P(p,q)` applied to a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permutation(pub Line, pub Line);

impl Display for Permutation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "P({},{})", self.0, self.1)
    }
}

/// One contribution `lhs += coefficient * P * rhs` to an equation.
#[derive(Debug, Clone)]
pub struct Term {
    lhs: Vertex,
    coefficient: f64,
    rhs: Vec<Vertex>,
    linkage: Vertex,
    permutations: Vec<Permutation>,
    conditions: Vec<String>,
    provenance: String,
    is_assignment: bool,
    flop_map: ScalingMap,
    mem_map: ScalingMap,
}

/// A candidate rewrite of a term's expression and its cost.
pub(crate) struct Rewrite {
    pub linkage: Vertex,
    pub flop_map: ScalingMap,
    pub mem_map: ScalingMap,
}

impl Term {
    pub fn new(lhs: Vertex, coefficient: f64, rhs: Vec<Vertex>) -> Self {
        let linkage = link(&rhs);
        let mut term = Term {
            lhs,
            coefficient,
            rhs,
            linkage,
            permutations: vec![],
            conditions: vec![],
            provenance: String::new(),
            is_assignment: false,
            flop_map: ScalingMap::new(),
            mem_map: ScalingMap::new(),
        };
        term.collect_scaling(false);
        term
    }

    /// The term computing temporary `temp` from its structure.
    pub fn declaration(temp: &Linkage) -> Self {
        let structure = Vertex::Link(temp.structure());
        let mut term = Term::new(Vertex::Link(temp.clone()), 1.0, structure.operands());
        term.linkage = structure;
        term.is_assignment = true;
        term.provenance = format!("declaration of {}", temp.name());
        term.collect_scaling(false);
        term
    }

    pub fn with_permutations(mut self, permutations: Vec<Permutation>) -> Self {
        self.permutations = permutations;
        self
    }

    pub fn with_conditions(mut self, conditions: Vec<String>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = provenance.into();
        self
    }

    pub fn with_assignment(mut self, is_assignment: bool) -> Self {
        self.is_assignment = is_assignment;
        self
    }

    pub fn lhs(&self) -> &Vertex {
        &self.lhs
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    pub fn rhs(&self) -> &[Vertex] {
        &self.rhs
    }

    /// The rhs operands linked into a single expression.
    pub fn linkage(&self) -> &Vertex {
        &self.linkage
    }

    pub fn permutations(&self) -> &[Permutation] {
        &self.permutations
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn provenance(&self) -> &str {
        &self.provenance
    }

    /// Does this term overwrite its lhs rather than accumulate into it?
    pub fn is_assignment(&self) -> bool {
        self.is_assignment
    }

    pub fn flop_map(&self) -> &ScalingMap {
        &self.flop_map
    }

    pub fn mem_map(&self) -> &ScalingMap {
        &self.mem_map
    }

    /// Does this term declare a temporary?
    pub fn is_declaration(&self) -> bool {
        self.lhs.is_temp()
    }

    pub(crate) fn set_coefficient(&mut self, coefficient: f64) {
        self.coefficient = coefficient;
    }

    pub(crate) fn set_assignment(&mut self, is_assignment: bool) {
        self.is_assignment = is_assignment;
    }

    pub(crate) fn set_lhs(&mut self, lhs: Vertex) {
        self.lhs = lhs;
    }

    /// Replace the operand list; the linkage is rebuilt from it.
    pub fn set_rhs(&mut self, rhs: Vec<Vertex>) {
        self.linkage = link(&rhs);
        self.rhs = rhs;
        self.collect_scaling(false);
    }

    /// Replace the expression; the operand list is derived from it.
    pub(crate) fn set_linkage(&mut self, linkage: Vertex) {
        self.rhs = linkage.operands();
        self.linkage = linkage;
        self.collect_scaling(false);
    }

    /// Number of tensors and constants the term multiplies.
    pub fn size(&self) -> usize {
        match &self.linkage {
            Vertex::Link(link) if !link.is_temp() => link.vertices(false).len(),
            Vertex::Empty => 0,
            _ => 1,
        }
    }

    /// Recompute the term's cost profiles.
    pub fn collect_scaling(&mut self, regenerate: bool) {
        let (flops, mems) = match &self.linkage {
            Vertex::Link(link) => link.netscales(regenerate),
            _ => Default::default(),
        };
        self.flop_map = flops;
        self.mem_map = mems;
    }

    /// Put the expression into its cheapest operand order.
    pub fn reorder(&mut self) {
        if self.linkage.is_linked() {
            let best = self.linkage.best_permutation();
            self.set_linkage(best);
        }
    }

    /// The cheapest way to write this term with `pattern` replaced by
    /// `temp`, if `pattern` occurs in any ordering of the expression.
    pub(crate) fn best_rewrite(&self, pattern: &Linkage, temp: &Linkage) -> Option<Rewrite> {
        let link = match &self.linkage {
            Vertex::Link(link) if !link.is_temp() => link,
            _ => return None,
        };
        if self.lhs.temp_id() == temp.temp_id() || link.depth() < pattern.depth() {
            return None;
        }

        let replacement = Vertex::Link(temp.clone());
        let mut best: Option<Rewrite> = None;
        for perm in link.permutations(false).iter() {
            let (replaced, found) = perm.replace(pattern, &replacement);
            // a declaration must not become an alias of another temporary
            if !found || (self.is_declaration() && replaced.is_temp()) {
                continue;
            }
            let replaced = replaced.best_permutation();
            let (flop_map, mem_map) = replaced.netscales();
            let better = match &best {
                None => true,
                Some(b) => flop_map
                    .cmp(&b.flop_map)
                    .then_with(|| mem_map.cmp(&b.mem_map))
                    .is_lt(),
            };
            if better {
                best = Some(Rewrite {
                    linkage: replaced,
                    flop_map,
                    mem_map,
                });
            }
        }
        best
    }

    /// Would `rewrite` be accepted in place of the current expression?
    pub(crate) fn accepts(&self, rewrite: &Rewrite, allow_equality: bool) -> bool {
        match rewrite.flop_map.compare(&self.flop_map) {
            Comparison::Better => true,
            Comparison::Same => allow_equality,
            Comparison::Worse => false,
        }
    }

    /// Replace `pattern` with a reference to `temp` if that does not make
    /// the term more expensive. Returns whether the term changed.
    pub fn substitute(&mut self, pattern: &Linkage, temp: &Linkage, allow_equality: bool) -> bool {
        match self.best_rewrite(pattern, temp) {
            Some(rewrite) if self.accepts(&rewrite, allow_equality) => {
                self.set_linkage(rewrite.linkage);
                true
            }
            _ => false,
        }
    }

    /// Every sub-expression up to `max_depth` in any operand ordering.
    pub fn make_all_links(&self, max_depth: Limit) -> LinkageSet {
        let mut set = LinkageSet::new();
        if let Vertex::Link(link) = &self.linkage {
            for perm in link.permutations(false).iter() {
                perm.collect_subgraphs(max_depth, &mut set);
            }
        }
        set
    }

    /// Ids of temporaries of category `kind` the term declares or
    /// references directly: the declared id, and the largest id overall.
    pub(crate) fn temp_ids(&self, kind: TempKind) -> (Option<u32>, Option<u32>) {
        let declared = self
            .lhs
            .temp_id()
            .filter(|id| id.kind == kind)
            .map(|id| id.id);
        let referenced = self
            .linkage
            .get_temps(false, true)
            .into_iter()
            .filter_map(|t| t.temp_id())
            .filter(|id| id.kind == kind)
            .map(|id| id.id)
            .max();
        (declared, declared.max(referenced))
    }

    /// Key identifying terms that can be merged by adding coefficients.
    pub(crate) fn merge_key(&self) -> (Vertex, Vertex, Vec<Permutation>, Vec<String>) {
        (
            self.lhs.clone(),
            self.linkage.clone(),
            self.permutations.clone(),
            self.conditions.clone(),
        )
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let op = if self.is_assignment { "=" } else { "+=" };
        write!(f, "{} {} {}", self.lhs, op, self.coefficient)?;
        for perm in &self.permutations {
            write!(f, " {}", perm)?;
        }
        if !self.linkage.is_empty() {
            write!(f, " {}", self.linkage)?;
        }
        if !self.conditions.is_empty() {
            write!(f, " if {}", self.conditions.join(" && "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Vertex {
        s.parse().unwrap()
    }

    fn l(s: &str) -> Linkage {
        v(s).as_link().cloned().unwrap()
    }

    fn term(lhs: &str, coefficient: f64, rhs: &[&str]) -> Term {
        Term::new(v(lhs), coefficient, rhs.iter().map(|s| v(s)).collect())
    }

    #[test]
    fn declarations_are_not_aliased() {
        let pattern = l("(* (X a b) (Y b c))");
        let mut decl = Term::declaration(&pattern.as_temp(TempKind::Generic, 1));

        // the same product in another order covers the whole declaration
        let swapped = l("(* (Y b c) (X a b))");
        let temp = swapped.as_temp(TempKind::Generic, 2);
        assert!(!decl.substitute(&swapped, &temp, true));

        // a regular term may be replaced entirely
        let mut t = term("(R a c)", 1.0, &["(Y b c)", "(X a b)"]);
        assert!(t.substitute(&swapped, &temp, true));
        assert!(t.linkage().is_temp());
    }

    #[test]
    fn rhs_and_linkage_agree() {
        crate::init_logger();
        let mut t = term("(R a b i j)", 0.5, &["(V a b c d)", "(t2 c d i j)"]);
        assert_eq!(t.linkage(), &v("(* (V a b c d) (t2 c d i j))"));
        assert_eq!(t.flop_map().to_string(), "{o2v4: 1}");
        assert_eq!(t.size(), 2);

        t.set_rhs(vec![v("(t2 a b i j)")]);
        assert!(t.flop_map().is_empty());
        assert_eq!(t.to_string(), "(R a b i j) += 0.5 (t2 a b i j)");
    }

    #[test]
    fn substitute_any_ordering() {
        let mut t = term("(R a d)", 1.0, &["(X a b)", "(Z c d)", "(Y b c)"]);
        let pattern = l("(* (X a b) (Y b c))");
        let temp = pattern.as_temp(TempKind::Generic, 1);

        assert!(t.substitute(&pattern, &temp, true));
        assert!(t.linkage().has_temp(&temp, false, Limit::Unbounded));
        assert_eq!(t.rhs().len(), 2);
        assert!(t.rhs().contains(&v("(Z c d)")));

        // already substituted
        assert!(!t.substitute(&pattern, &temp, true));
    }

    #[test]
    fn declaration_is_never_rewritten_with_itself() {
        let pattern = l("(* (X a b) (Y b c))");
        let temp = pattern.as_temp(TempKind::Generic, 1);
        let mut decl = Term::declaration(&temp);
        assert!(decl.is_declaration());
        assert!(decl.is_assignment());
        assert_eq!(decl.linkage(), &Vertex::Link(pattern.clone()));
        assert!(!decl.substitute(&pattern, &temp, true));
        assert_eq!(decl.to_string(), "(tmps_1_vv a c) = 1 (* (X a b) (Y b c))");
    }

    #[test]
    fn candidates_cover_every_ordering() {
        let t = term("(R a d)", 1.0, &["(X a b)", "(Y b c)", "(Z c d)"]);
        let links = t.make_all_links(Limit::At(1));
        assert!(links.contains(&l("(* (X a b) (Y b c))")));
        assert!(links.contains(&l("(* (Y b c) (Z c d))")));
        assert!(links.contains(&l("(* (Z c d) (Y b c))")));
        assert!(links.iter().all(|link| link.depth() == 1));
    }
}
