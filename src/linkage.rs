use std::collections::BTreeSet;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};

use symbolic_expressions::Sexp;

use crate::{
    line::{all_lines, external_lines, space_signature, Lines},
    util::{next_permutation, pretty, HashMap, HashSet},
    vertex::link,
    Limit, Line, LinkageSet, ScalingMap, Shape, TempId, TempKind, Vertex,
};

static LOW_MEMORY: AtomicBool = AtomicBool::new(false);

/// In low-memory mode the lazily computed data of every [`Linkage`]
/// (flattened operands, permutations, cost profiles) is recomputed on
/// each request instead of being kept on the node.
pub fn set_low_memory(enabled: bool) {
    LOW_MEMORY.store(enabled, AtomicOrdering::Relaxed);
}

pub fn low_memory() -> bool {
    LOW_MEMORY.load(AtomicOrdering::Relaxed)
}

/// A lazily filled slot of derived data.
///
/// Nodes are immutable, so a filled cache never goes stale; an edit builds
/// a new node with empty caches.
pub(crate) struct Cache<T>(Mutex<Option<T>>);

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Cache(Mutex::new(None))
    }
}

impl<T: Clone> Cache<T> {
    fn get_or_compute(&self, regenerate: bool, compute: impl FnOnce() -> T) -> T {
        if !regenerate {
            let slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(value) = slot.as_ref() {
                return value.clone();
            }
        }
        // the lock is not held while computing; children fill their own caches
        let value = compute();
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = if low_memory() {
            None
        } else {
            Some(value.clone())
        };
        value
    }

    fn clear(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// How a [`Linkage`] combines its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkOp {
    Contract,
    Add,
}

impl LinkOp {
    fn symbol(self) -> &'static str {
        match self {
            LinkOp::Contract => "*",
            LinkOp::Add => "+",
        }
    }
}

struct LinkageData {
    left: Vertex,
    right: Vertex,
    op: LinkOp,
    temp: Option<TempId>,

    lines: Lines,
    tree_depth: usize,
    scalar: bool,
    sigma: bool,
    flop_scale: Option<Shape>,
    mem_scale: Option<Shape>,
    hash: u64,

    link_vector: Cache<Arc<[Vertex]>>,
    vertices: Cache<Arc<[Vertex]>>,
    permutations: Cache<Arc<[Linkage]>>,
    netscales: Cache<(ScalingMap, ScalingMap)>,
}

/// A binary expression node: the contraction or the sum of two vertices.
///
/// A linkage may be tagged as a declared temporary. Temporaries are
/// atomic operands to everything that walks a tree: they have depth zero,
/// contribute no cost where they are referenced, and are never permuted
/// or searched into unless a function says otherwise. Two temporaries are
/// equal when they have the same [`TempId`] and lines, whatever their
/// internal structure; all other linkages are compared structurally.
/// The internal structure of a temporary is a snapshot taken when it was
/// declared. Copies nested inside the structure of other temporaries are
/// not updated when its declaration term is rewritten; only the
/// declaration term is authoritative.
///
/// `Linkage` is a cheap handle; clones share the node.
#[derive(Clone)]
pub struct Linkage(Arc<LinkageData>);

impl Linkage {
    pub(crate) fn new(left: Vertex, right: Vertex, op: LinkOp) -> Self {
        Self::build(left, right, op, None)
    }

    fn build(left: Vertex, right: Vertex, op: LinkOp, temp: Option<TempId>) -> Self {
        let lines = match op {
            LinkOp::Contract => external_lines(left.lines(), right.lines()),
            LinkOp::Add => left.lines().iter().copied().collect(),
        };

        let costly = |v: &Vertex| !v.is_empty() && !v.is_constant();
        let (flop_scale, mem_scale) = if costly(&left) && costly(&right) {
            match op {
                LinkOp::Contract => (
                    Some(Shape::from_lines(&all_lines(left.lines(), right.lines()))),
                    Some(Shape::from_lines(&lines)),
                ),
                LinkOp::Add => {
                    let shape = Shape::from_lines(&lines);
                    (Some(shape), Some(shape))
                }
            }
        } else {
            (None, None)
        };

        let tree_depth = 1 + left.depth().max(right.depth());
        let scalar = lines.is_empty();
        let sigma = left.is_sigma() || right.is_sigma();

        let mut hasher = fxhash::FxHasher::default();
        match temp {
            Some(id) => {
                1u8.hash(&mut hasher);
                id.hash(&mut hasher);
                lines.hash(&mut hasher);
            }
            None => {
                0u8.hash(&mut hasher);
                op.hash(&mut hasher);
                left.hash(&mut hasher);
                right.hash(&mut hasher);
            }
        }

        Linkage(Arc::new(LinkageData {
            left,
            right,
            op,
            temp,
            lines,
            tree_depth,
            scalar,
            sigma,
            flop_scale,
            mem_scale,
            hash: hasher.finish(),
            link_vector: Cache::default(),
            vertices: Cache::default(),
            permutations: Cache::default(),
            netscales: Cache::default(),
        }))
    }

    pub fn left(&self) -> &Vertex {
        &self.0.left
    }

    pub fn right(&self) -> &Vertex {
        &self.0.right
    }

    pub fn op(&self) -> LinkOp {
        self.0.op
    }

    pub fn temp_id(&self) -> Option<TempId> {
        self.0.temp
    }

    pub fn is_temp(&self) -> bool {
        self.0.temp.is_some()
    }

    pub fn is_addition(&self) -> bool {
        self.0.op == LinkOp::Add
    }

    /// Free lines of the result.
    pub fn lines(&self) -> &[Line] {
        &self.0.lines
    }

    pub fn is_scalar(&self) -> bool {
        self.0.scalar
    }

    pub fn is_sigma(&self) -> bool {
        self.0.sigma
    }

    /// Temporaries have depth zero; anything else is one deeper than its
    /// deepest operand.
    pub fn depth(&self) -> usize {
        if self.is_temp() {
            0
        } else {
            self.0.tree_depth
        }
    }

    /// Complexity class of evaluating this node alone.
    pub fn flop_scale(&self) -> Option<Shape> {
        self.0.flop_scale
    }

    /// Complexity class of storing this node's result.
    pub fn mem_scale(&self) -> Option<Shape> {
        self.0.mem_scale
    }

    /// Is this a contraction whose operands can be flattened into a chain?
    pub(crate) fn is_expandable(&self) -> bool {
        !self.is_temp() && self.0.op == LinkOp::Contract
    }

    fn children(&self) -> [&Vertex; 2] {
        [&self.0.left, &self.0.right]
    }

    pub fn name(&self) -> String {
        match self.0.temp {
            Some(id) if id.kind == TempKind::Scalar => id.to_string(),
            Some(id) => format!("{}_{}", id, space_signature(self.lines())),
            None => self.to_string(),
        }
    }

    /// This node with any temporary tag removed.
    pub fn structure(&self) -> Linkage {
        if self.is_temp() {
            Self::build(self.0.left.clone(), self.0.right.clone(), self.0.op, None)
        } else {
            self.clone()
        }
    }

    /// Declare this expression as temporary `id` of category `kind`.
    pub fn as_temp(&self, kind: TempKind, id: u32) -> Linkage {
        self.tagged(Some(TempId::new(kind, id)))
    }

    fn tagged(&self, temp: Option<TempId>) -> Linkage {
        Self::build(self.0.left.clone(), self.0.right.clone(), self.0.op, temp)
    }

    fn rebuild(&self, left: Vertex, right: Vertex) -> Vertex {
        match self.0.temp {
            Some(id) => Vertex::Link(Self::build(left, right, self.0.op, Some(id))),
            None => Vertex::combine(self.0.op, left, right),
        }
    }

    /// The operands of this node's contraction chain, in order.
    ///
    /// Nested contractions are flattened; temporaries, additions and
    /// leaves are kept whole. An addition yields its two operands.
    pub fn link_vector(&self, regenerate: bool) -> Arc<[Vertex]> {
        self.0.link_vector.get_or_compute(regenerate, || {
            if self.0.op == LinkOp::Add {
                return vec![self.0.left.clone(), self.0.right.clone()].into();
            }
            let mut operands = vec![];
            for child in self.children() {
                match child {
                    Vertex::Link(link) if link.is_expandable() => {
                        operands.extend(link.link_vector(regenerate).iter().cloned())
                    }
                    _ => operands.push(child.clone()),
                }
            }
            operands.into()
        })
    }

    /// Every leaf of the tree in order, looking through additions.
    /// Nested temporaries count as leaves.
    pub fn vertices(&self, regenerate: bool) -> Arc<[Vertex]> {
        self.0.vertices.get_or_compute(regenerate, || {
            let mut leaves = vec![];
            for child in self.children() {
                match child {
                    Vertex::Link(link) if !link.is_temp() => {
                        leaves.extend(link.vertices(regenerate).iter().cloned())
                    }
                    _ => leaves.push(child.clone()),
                }
            }
            leaves.into()
        })
    }

    /// Alternative orderings of this expression, starting with itself.
    ///
    /// A contraction chain yields every distinct ordering of its operands.
    /// An addition yields at most its two orderings, with each side in its
    /// best order. A temporary only yields itself.
    pub fn permutations(&self, regenerate: bool) -> Arc<[Linkage]> {
        self.0.permutations.get_or_compute(regenerate, || {
            if self.is_temp() {
                return vec![self.clone()].into();
            }

            let mut seen: HashSet<Linkage> = Default::default();
            let mut perms = vec![self.clone()];
            seen.insert(self.clone());
            let mut push = |v: Vertex| {
                if let Vertex::Link(link) = v {
                    if seen.insert(link.clone()) {
                        perms.push(link);
                    }
                }
            };

            match self.0.op {
                LinkOp::Contract => {
                    let operands = self.link_vector(regenerate);
                    let mut idxs: Vec<usize> = (0..operands.len()).collect();
                    while next_permutation(&mut idxs) {
                        let ordered: Vec<Vertex> =
                            idxs.iter().map(|&i| operands[i].clone()).collect();
                        push(link(&ordered));
                    }
                }
                LinkOp::Add => {
                    let left = self.0.left.best_permutation();
                    let right = self.0.right.best_permutation();
                    push(Vertex::sum(left.clone(), right.clone()));
                    push(Vertex::sum(right, left));
                }
            }
            perms.into()
        })
    }

    /// The cheapest ordering of this expression.
    ///
    /// Orderings are ranked by flop profile, then memory profile, then
    /// number of free lines, then printed form, so the choice is
    /// deterministic.
    pub fn best_permutation(&self) -> Linkage {
        let perms = self.permutations(false);
        let mut best = &perms[0];
        for perm in perms.iter().skip(1) {
            if perm.cheaper_than(best) {
                best = perm;
            }
        }
        best.clone()
    }

    fn cheaper_than(&self, other: &Linkage) -> bool {
        let (flop, mem) = self.netscales(false);
        let (other_flop, other_mem) = other.netscales(false);
        flop.cmp(&other_flop)
            .then_with(|| mem.cmp(&other_mem))
            .then_with(|| self.lines().len().cmp(&other.lines().len()))
            .then_with(|| self.to_string().cmp(&other.to_string()))
            .is_lt()
    }

    /// Flop and memory profiles of evaluating this tree.
    ///
    /// Nested temporaries are free where they are referenced, and a
    /// temporary itself costs nothing; use [`Linkage::structure`] for the
    /// cost of declaring it.
    pub fn netscales(&self, regenerate: bool) -> (ScalingMap, ScalingMap) {
        if self.is_temp() {
            return Default::default();
        }
        self.0.netscales.get_or_compute(regenerate, || {
            let mut flops = ScalingMap::new();
            let mut mems = ScalingMap::new();
            if let Some(shape) = self.0.flop_scale {
                flops.insert(shape, 1);
            }
            if let Some(shape) = self.0.mem_scale {
                mems.insert(shape, 1);
            }
            for child in self.children() {
                if let Vertex::Link(link) = child {
                    let (f, m) = link.netscales(regenerate);
                    flops += &f;
                    mems += &m;
                }
            }
            (flops, mems)
        })
    }

    /// Every distinct sub-linkage rooted at this node or below with depth
    /// at most `max_depth`. Temporaries are not searched.
    pub fn subgraphs(&self, max_depth: Limit) -> LinkageSet {
        let mut set = LinkageSet::default();
        self.collect_subgraphs(max_depth, &mut set);
        set
    }

    pub(crate) fn collect_subgraphs(&self, max_depth: Limit, set: &mut LinkageSet) {
        if self.is_temp() {
            return;
        }
        if max_depth.allows(self.depth()) {
            set.insert(self.clone());
        }
        for child in self.children() {
            if let Vertex::Link(link) = child {
                link.collect_subgraphs(max_depth, set);
            }
        }
    }

    /// Replace every occurrence of `target` with `replacement`.
    ///
    /// Returns the rebuilt tree and whether anything was replaced. Untouched
    /// subtrees are shared with `self`; temporaries are not searched.
    pub fn replace(&self, target: &Linkage, replacement: &Vertex) -> (Vertex, bool) {
        if self == target {
            return (replacement.clone(), true);
        }
        if self.is_temp() || self.depth() <= target.depth() {
            return (Vertex::Link(self.clone()), false);
        }
        let (left, found_left) = self.0.left.replace(target, replacement);
        let (right, found_right) = self.0.right.replace(target, replacement);
        if found_left || found_right {
            (self.rebuild(left, right), true)
        } else {
            (Vertex::Link(self.clone()), false)
        }
    }

    /// Give every occurrence of the temporary `target` the id `new_id`,
    /// looking inside other temporaries as well.
    pub fn replace_id(&self, target: &Linkage, new_id: u32) -> (Vertex, bool) {
        if let Some(mine) = self.0.temp {
            if self == target {
                let id = TempId::new(mine.kind, new_id);
                return (Vertex::Link(self.tagged(Some(id))), true);
            }
        }
        let (left, found_left) = self.0.left.replace_id(target, new_id);
        let (right, found_right) = self.0.right.replace_id(target, new_id);
        if found_left || found_right {
            (self.rebuild(left, right), true)
        } else {
            (Vertex::Link(self.clone()), false)
        }
    }

    /// Apply every id change in `ids` at once, looking inside temporaries.
    /// Returns `None` when nothing changed.
    pub fn remap_ids(&self, ids: &HashMap<TempId, u32>) -> Option<Vertex> {
        let left = self.0.left.remap_ids(ids);
        let right = self.0.right.remap_ids(ids);
        let temp = self
            .0
            .temp
            .and_then(|old| ids.get(&old).map(|&id| TempId::new(old.kind, id)))
            .filter(|new| Some(*new) != self.0.temp);

        if left.is_none() && right.is_none() && temp.is_none() {
            return None;
        }
        let left = left.unwrap_or_else(|| self.0.left.clone());
        let right = right.unwrap_or_else(|| self.0.right.clone());
        Some(Vertex::Link(Self::build(
            left,
            right,
            self.0.op,
            temp.or(self.0.temp),
        )))
    }

    pub fn rename_lines(&self, map: &HashMap<Line, Line>) -> Linkage {
        Self::build(
            self.0.left.rename_lines(map),
            self.0.right.rename_lines(map),
            self.0.op,
            self.0.temp,
        )
    }

    /// Does the tree reference `temp`?
    ///
    /// `search_depth` bounds how many levels below this node are searched;
    /// temporaries below the root are only searched with `enter_temps`.
    pub fn has_temp(&self, temp: &Linkage, enter_temps: bool, search_depth: Limit) -> bool {
        if self == temp {
            return true;
        }
        let Some(next) = search_depth.decrement() else {
            return false;
        };
        self.children().into_iter().any(|child| match child {
            Vertex::Link(link) if link == temp => true,
            Vertex::Link(link) if enter_temps || !link.is_temp() => {
                link.has_temp(temp, enter_temps, next)
            }
            _ => false,
        })
    }

    /// Does the tree contain `target` as a subtree? Temporaries are not
    /// searched.
    pub fn has_link(&self, target: &Linkage, search_depth: Limit) -> bool {
        if self == target {
            return true;
        }
        if self.is_temp() || self.depth() <= target.depth() {
            return false;
        }
        let Some(next) = search_depth.decrement() else {
            return false;
        };
        self.children().into_iter().any(|child| match child {
            Vertex::Link(link) => link.has_link(target, next),
            _ => false,
        })
    }

    /// Does any operand below this node refer to a temporary?
    pub fn has_any_temp(&self) -> bool {
        self.children().into_iter().any(|child| match child {
            Vertex::Link(link) => link.is_temp() || link.has_any_temp(),
            _ => false,
        })
    }

    /// Temporaries referenced by this tree (including the root), sorted by
    /// id and without duplicates.
    pub fn get_temps(&self, enter_temps: bool, enter_additions: bool) -> Vec<Linkage> {
        let mut found = vec![];
        self.collect_temps(enter_temps, enter_additions, true, &mut found);
        found.sort_by_key(|t| t.0.temp);
        found.dedup();
        found
    }

    fn collect_temps(
        &self,
        enter_temps: bool,
        enter_additions: bool,
        root: bool,
        found: &mut Vec<Linkage>,
    ) {
        if self.is_temp() {
            found.push(self.clone());
            if !enter_temps {
                return;
            }
        } else if !root && self.is_addition() && !enter_additions {
            return;
        }
        for child in self.children() {
            if let Vertex::Link(link) = child {
                link.collect_temps(enter_temps, enter_additions, false, found);
            }
        }
    }

    /// Ids of every temporary of category `kind` (or of any category)
    /// referenced anywhere in this tree.
    pub fn get_ids(&self, kind: Option<TempKind>) -> BTreeSet<u32> {
        self.get_temps(true, true)
            .iter()
            .filter_map(|t| t.0.temp)
            .filter(|id| kind.map_or(true, |k| id.kind == k))
            .map(|id| id.id)
            .collect()
    }

    /// Drop every cached value in this tree.
    pub fn forget(&self) {
        let data = &self.0;
        data.link_vector.clear();
        data.vertices.clear();
        data.permutations.clear();
        data.netscales.clear();
        for child in self.children() {
            if let Vertex::Link(link) = child {
                link.forget();
            }
        }
    }

    pub fn to_sexp(&self) -> Sexp {
        if self.is_temp() {
            let name = Sexp::String(self.name());
            if self.lines().is_empty() {
                return name;
            }
            let mut items = vec![name];
            items.extend(self.lines().iter().map(|l| Sexp::String(l.to_string())));
            return Sexp::List(items);
        }

        let mut items = vec![Sexp::String(self.0.op.symbol().into())];
        // print left-folded chains flat
        match &self.0.left {
            Vertex::Link(left) if !left.is_temp() && left.0.op == self.0.op => {
                if let Sexp::List(inner) = left.to_sexp() {
                    items.extend(inner.into_iter().skip(1));
                }
            }
            left => items.push(left.to_sexp()),
        }
        items.push(self.0.right.to_sexp());
        Sexp::List(items)
    }
}

impl PartialEq for Linkage {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.0.hash != other.0.hash {
            return false;
        }
        match (self.0.temp, other.0.temp) {
            (Some(a), Some(b)) => a == b && self.0.lines == other.0.lines,
            (None, None) => {
                self.0.op == other.0.op
                    && self.0.left == other.0.left
                    && self.0.right == other.0.right
            }
            _ => false,
        }
    }
}

impl Eq for Linkage {}

impl Hash for Linkage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash)
    }
}

impl Display for Linkage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&pretty(&self.to_sexp(), usize::MAX))
    }
}

impl Debug for Linkage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
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

    #[test]
    fn lines_and_costs() {
        crate::init_logger();
        let ab = l("(* (t2 a b i j) (V i j k l))");
        let names: Vec<String> = ab.lines().iter().map(|l| l.to_string()).collect();
        assert_eq!(names, ["a", "b", "k", "l"]);
        assert_eq!(ab.flop_scale().unwrap().to_string(), "o4v2");
        assert_eq!(ab.mem_scale().unwrap().to_string(), "o2v2");

        let scaled = l("(* 0.5 (t1 a i))");
        assert_eq!(scaled.flop_scale(), None);
        assert!(scaled.netscales(false).0.is_empty());

        let sum = l("(+ (t1 a i) (f a i))");
        assert_eq!(sum.flop_scale().unwrap().to_string(), "o1v1");
    }

    #[test]
    fn chains_flatten() {
        let chain = l("(* (f a c) (t2 c b i j) (V k l i j))");
        assert_eq!(chain.depth(), 2);
        assert_eq!(chain.link_vector(false).len(), 3);
        assert_eq!(chain.vertices(false).len(), 3);
        assert_eq!(chain.to_string(), "(* (f a c) (t2 c b i j) (V k l i j))");

        let nested = l("(* (f a c) (+ (t1 c i) (f c i)))");
        assert_eq!(nested.link_vector(false).len(), 2);
        assert_eq!(nested.vertices(false).len(), 3);
    }

    #[test]
    fn permutations_of_a_chain() {
        let chain = l("(* (A a b) (B b c) (C c d))");
        let perms = chain.permutations(false);
        assert_eq!(perms.len(), 6);
        assert_eq!(perms[0], chain);

        let sum = l("(+ (A a b) (B a b))");
        assert_eq!(sum.permutations(false).len(), 2);

        let temp = chain.as_temp(TempKind::Generic, 1);
        assert_eq!(temp.permutations(false).len(), 1);
    }

    #[test]
    fn best_permutation_avoids_outer_products() {
        // contracting the two small tensors first is cheaper
        let chain = l("(* (V a b c d) (t1 c i) (t1 d j))");
        let best = chain.best_permutation();
        let (flops, _) = best.netscales(false);
        assert!(flops.compare(&chain.netscales(false).0) != crate::Comparison::Worse);
        assert_eq!(best.best_permutation(), best);
    }

    #[test]
    fn subgraphs_by_depth() {
        let chain = l("(* (A a b) (B b c) (C c d))");
        assert_eq!(chain.subgraphs(Limit::At(1)).len(), 1);
        assert_eq!(chain.subgraphs(Limit::Unbounded).len(), 2);
        let temp = chain.as_temp(TempKind::Generic, 1);
        assert!(temp.subgraphs(Limit::Unbounded).is_empty());
    }

    #[test]
    fn replace_rebuilds_ancestors() {
        let chain = l("(* (A a b) (B b c) (C c d))");
        let pattern = l("(* (A a b) (B b c))");
        let temp = pattern.as_temp(TempKind::Generic, 1);

        let (replaced, found) = chain.replace(&pattern, &Vertex::Link(temp.clone()));
        assert!(found);
        assert_eq!(replaced.to_string(), "(* (tmps_1_vv a c) (C c d))");
        assert_eq!(replaced.depth(), 1);
        assert!(replaced.has_temp(&temp, false, Limit::Unbounded));
        assert!(!chain.has_any_temp());
        assert!(replaced.has_any_temp());
        assert!(chain.has_link(&pattern, Limit::Unbounded));
        assert!(!chain.has_link(&pattern, Limit::At(0)));

        let (same, found) = chain.replace(&l("(* (B b c) (C c d))"), &Vertex::Link(temp));
        assert!(!found);
        assert_eq!(same, Vertex::Link(chain));
    }

    #[test]
    fn temporaries_compare_by_id() {
        let pattern = l("(* (A a b) (B b c))");
        let first = pattern.as_temp(TempKind::Generic, 1);
        let relabeled = l("(* (A a b) (D b c))").as_temp(TempKind::Generic, 1);
        assert_eq!(first, relabeled);
        assert_ne!(first, pattern.as_temp(TempKind::Generic, 2));
        assert_ne!(first, pattern.as_temp(TempKind::Reused, 1));
        assert_ne!(first, pattern);
        assert_eq!(first.structure(), pattern);
        assert_eq!(first.depth(), 0);
    }

    #[test]
    fn ids_are_found_and_rewritten() {
        let inner = l("(* (A a b) (B b c))").as_temp(TempKind::Generic, 1);
        let outer = Vertex::Link(inner.clone()) * v("(C c d)");
        let outer = outer.as_link().unwrap().as_temp(TempKind::Generic, 2);
        let term = Vertex::Link(outer.clone()) * v("(D d e)");

        assert_eq!(term.get_ids(None), [1, 2].into_iter().collect());
        assert_eq!(term.get_temps(false, true), vec![outer.clone()]);
        assert_eq!(term.get_temps(true, true).len(), 2);
        assert!(!term.has_temp(&inner, false, Limit::Unbounded));
        assert!(term.has_temp(&inner, true, Limit::Unbounded));

        let (renamed, found) = term.replace_id(&inner, 7);
        assert!(found);
        assert_eq!(renamed.get_ids(None), [2, 7].into_iter().collect());

        let mut ids = HashMap::default();
        ids.insert(TempId::new(TempKind::Generic, 1), 2);
        ids.insert(TempId::new(TempKind::Generic, 2), 1);
        let swapped = term.remap_ids(&ids).unwrap();
        assert_eq!(swapped.get_temps(false, true)[0].temp_id().unwrap().id, 1);
        assert!(term.remap_ids(&HashMap::default()).is_none());
    }

    #[test]
    fn low_memory_recomputes() {
        let chain = l("(* (A a b) (B b c) (C c d))");
        let before = chain.netscales(false);
        chain.forget();
        assert_eq!(chain.netscales(true), before);
        assert_eq!(chain.permutations(false).len(), 6);
    }
}
