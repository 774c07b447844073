use std::collections::BTreeSet;
use std::fmt::{self, Debug, Display, Formatter};
use std::ops::{Add, Mul};
use std::str::FromStr;

use ordered_float::OrderedFloat;
use symbolic_expressions::{parser::parse_str, Sexp};

use crate::{
    line::Lines,
    util::{pretty, HashMap},
    Error, Limit, Line, LinkOp, Linkage, Result, ScalingMap, Symbol, TempId, TempKind,
};

/// Constants within this distance of one are the multiplicative identity.
pub(crate) const UNIT_TOLERANCE: f64 = 1e-8;

/// A named tensor with its index lines, like `t2(a,b,i,j)`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Tensor {
    name: Symbol,
    lines: Lines,
}

impl Tensor {
    pub fn new(name: impl Into<Symbol>, lines: impl IntoIterator<Item = Line>) -> Self {
        Tensor {
            name: name.into(),
            lines: lines.into_iter().collect(),
        }
    }

    /// Build a tensor, classifying each label into its space.
    pub fn parse(name: &str, labels: &[&str]) -> Result<Self> {
        let lines = labels
            .iter()
            .map(|label| Line::parse(label))
            .collect::<Result<Lines>>()?;
        Ok(Tensor::new(name, lines))
    }

    pub fn name(&self) -> Symbol {
        self.name
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    fn to_sexp(&self) -> Sexp {
        if self.lines.is_empty() {
            return Sexp::String(self.name.to_string());
        }
        let mut items = vec![Sexp::String(self.name.to_string())];
        items.extend(self.lines.iter().map(|l| Sexp::String(l.to_string())));
        Sexp::List(items)
    }
}

/// A numeric constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Constant(pub OrderedFloat<f64>);

impl Constant {
    pub fn new(value: f64) -> Self {
        Constant(OrderedFloat(value))
    }

    pub fn value(self) -> f64 {
        self.0.into_inner()
    }
}

/// A node of an expression tree.
///
/// Vertices are values: every edit (renaming lines, assigning a temporary
/// id, substituting a subexpression) builds a new vertex and shares every
/// untouched subtree with the old one. Equality is structural and never
/// looks at object identity.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub enum Vertex {
    /// Nothing; absorbed by [`Vertex::contract`] and [`Vertex::sum`].
    #[default]
    Empty,
    Constant(Constant),
    Tensor(Tensor),
    /// A contraction or addition of two vertices.
    Link(Linkage),
}

impl Vertex {
    pub fn constant(value: f64) -> Self {
        Vertex::Constant(Constant::new(value))
    }

    pub fn tensor(name: &str, labels: &[&str]) -> Result<Self> {
        Tensor::parse(name, labels).map(Vertex::Tensor)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Vertex::Empty)
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Vertex::Constant(_))
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Vertex::Constant(c) => Some(c.value()),
            _ => None,
        }
    }

    /// Is this the multiplicative identity?
    pub fn is_unit(&self) -> bool {
        self.value()
            .map_or(false, |v| (v - 1.0).abs() < UNIT_TOLERANCE)
    }

    pub fn is_linked(&self) -> bool {
        matches!(self, Vertex::Link(_))
    }

    pub fn as_link(&self) -> Option<&Linkage> {
        match self {
            Vertex::Link(link) => Some(link),
            _ => None,
        }
    }

    pub fn is_temp(&self) -> bool {
        self.temp_id().is_some()
    }

    pub fn temp_id(&self) -> Option<TempId> {
        self.as_link().and_then(|link| link.temp_id())
    }

    pub fn is_addition(&self) -> bool {
        self.as_link().map_or(false, |link| link.is_addition())
    }

    /// A vertex without free lines. Constants and empty vertices are not
    /// scalars in this sense.
    pub fn is_scalar(&self) -> bool {
        match self {
            Vertex::Tensor(t) => t.lines.is_empty(),
            Vertex::Link(link) => link.is_scalar(),
            _ => false,
        }
    }

    /// Does any leaf carry a sigma line?
    pub fn is_sigma(&self) -> bool {
        match self {
            Vertex::Tensor(t) => t.lines.iter().any(Line::is_sigma),
            Vertex::Link(link) => link.is_sigma(),
            _ => false,
        }
    }

    pub fn lines(&self) -> &[Line] {
        match self {
            Vertex::Empty | Vertex::Constant(_) => &[],
            Vertex::Tensor(t) => &t.lines,
            Vertex::Link(link) => link.lines(),
        }
    }

    /// Leaves and temporaries have depth zero.
    pub fn depth(&self) -> usize {
        self.as_link().map_or(0, Linkage::depth)
    }

    /// Display name: the tensor name, the temporary name, or the printed
    /// expression for anything else.
    pub fn name(&self) -> String {
        match self {
            Vertex::Empty => String::new(),
            Vertex::Constant(c) => c.value().to_string(),
            Vertex::Tensor(t) => t.name.to_string(),
            Vertex::Link(link) => link.name(),
        }
    }

    /// Product of two vertices; empty operands and unit constants vanish.
    pub fn contract(left: Vertex, right: Vertex) -> Vertex {
        if left.is_empty() || left.is_unit() {
            return right;
        }
        if right.is_empty() || right.is_unit() {
            return left;
        }
        Vertex::Link(Linkage::new(left, right, LinkOp::Contract))
    }

    /// Sum of two vertices; empty operands vanish.
    pub fn sum(left: Vertex, right: Vertex) -> Vertex {
        if left.is_empty() {
            return right;
        }
        if right.is_empty() {
            return left;
        }
        Vertex::Link(Linkage::new(left, right, LinkOp::Add))
    }

    pub(crate) fn combine(op: LinkOp, left: Vertex, right: Vertex) -> Vertex {
        match op {
            LinkOp::Contract => Vertex::contract(left, right),
            LinkOp::Add => Vertex::sum(left, right),
        }
    }

    /// The operand list a term stores for this expression: the flattened
    /// contraction chain, or the vertex itself when it is a leaf, a
    /// temporary or an addition.
    pub fn operands(&self) -> Vec<Vertex> {
        match self {
            Vertex::Empty => vec![],
            Vertex::Link(link) if link.is_expandable() => link.link_vector(false).to_vec(),
            _ => vec![self.clone()],
        }
    }

    pub fn best_permutation(&self) -> Vertex {
        match self {
            Vertex::Link(link) => Vertex::Link(link.best_permutation()),
            _ => self.clone(),
        }
    }

    /// Flop and memory profiles of evaluating this expression.
    pub fn netscales(&self) -> (ScalingMap, ScalingMap) {
        match self {
            Vertex::Link(link) => link.netscales(false),
            _ => Default::default(),
        }
    }

    /// Are both vertices the same declared temporary?
    pub fn same_temp(&self, other: &Vertex) -> bool {
        match (self.temp_id(), other.temp_id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn has_temp(&self, temp: &Linkage, enter_temps: bool, search_depth: Limit) -> bool {
        self.as_link()
            .map_or(false, |link| link.has_temp(temp, enter_temps, search_depth))
    }

    pub fn has_any_temp(&self) -> bool {
        self.as_link().map_or(false, Linkage::has_any_temp)
    }

    pub fn get_temps(&self, enter_temps: bool, enter_additions: bool) -> Vec<Linkage> {
        self.as_link()
            .map(|link| link.get_temps(enter_temps, enter_additions))
            .unwrap_or_default()
    }

    pub fn get_ids(&self, kind: Option<TempKind>) -> BTreeSet<u32> {
        self.as_link()
            .map(|link| link.get_ids(kind))
            .unwrap_or_default()
    }

    pub fn replace(&self, target: &Linkage, replacement: &Vertex) -> (Vertex, bool) {
        match self {
            Vertex::Link(link) => link.replace(target, replacement),
            _ => (self.clone(), false),
        }
    }

    pub fn replace_id(&self, target: &Linkage, new_id: u32) -> (Vertex, bool) {
        match self {
            Vertex::Link(link) => link.replace_id(target, new_id),
            _ => (self.clone(), false),
        }
    }

    /// Rewrite every temporary id found in `ids` at once.
    pub fn remap_ids(&self, ids: &HashMap<TempId, u32>) -> Option<Vertex> {
        self.as_link().and_then(|link| link.remap_ids(ids))
    }

    /// Rename index lines; lines missing from `map` are kept.
    pub fn rename_lines(&self, map: &HashMap<Line, Line>) -> Vertex {
        match self {
            Vertex::Tensor(t) => Vertex::Tensor(Tensor {
                name: t.name,
                lines: t
                    .lines
                    .iter()
                    .map(|line| map.get(line).copied().unwrap_or(*line))
                    .collect(),
            }),
            Vertex::Link(link) => Vertex::Link(link.rename_lines(map)),
            _ => self.clone(),
        }
    }

    pub fn to_sexp(&self) -> Sexp {
        match self {
            Vertex::Empty => Sexp::Empty,
            Vertex::Constant(c) => Sexp::String(c.value().to_string()),
            Vertex::Tensor(t) => t.to_sexp(),
            Vertex::Link(link) => link.to_sexp(),
        }
    }

    /// Pretty print with line breaks once the expression exceeds `width`.
    pub fn pretty(&self, width: usize) -> String {
        pretty(&self.to_sexp(), width)
    }

    fn from_sexp(sexp: &Sexp) -> Result<Vertex> {
        match sexp {
            Sexp::Empty => Ok(Vertex::Empty),
            Sexp::String(s) => match s.parse::<f64>() {
                Ok(value) => Ok(Vertex::constant(value)),
                Err(_) => Ok(Vertex::Tensor(Tensor::new(s.as_str(), []))),
            },
            Sexp::List(list) => {
                let (head, rest) = match list.split_first() {
                    Some((Sexp::String(head), rest)) => (head.as_str(), rest),
                    _ => return Err(Error::Parse(format!("expected an operator in {}", sexp))),
                };
                match head {
                    "*" | "+" => {
                        let op = if head == "*" {
                            LinkOp::Contract
                        } else {
                            LinkOp::Add
                        };
                        let mut acc = Vertex::Empty;
                        for child in rest {
                            acc = Vertex::combine(op, acc, Vertex::from_sexp(child)?);
                        }
                        Ok(acc)
                    }
                    name => {
                        let labels = rest
                            .iter()
                            .map(|s| match s {
                                Sexp::String(label) => Ok(label.as_str()),
                                _ => Err(Error::Parse(format!("bad index line {} in {}", s, sexp))),
                            })
                            .collect::<Result<Vec<&str>>>()?;
                        Vertex::tensor(name, &labels)
                    }
                }
            }
        }
    }
}

/// Left-fold `operands` into a contraction chain.
///
/// Empty vertices and unit constants are skipped. Fewer than two remaining
/// operands yield the lone operand (or [`Vertex::Empty`]) rather than a
/// linkage, so every [`Linkage`] built here has two genuine operands.
pub fn link(operands: &[Vertex]) -> Vertex {
    operands
        .iter()
        .cloned()
        .fold(Vertex::Empty, Vertex::contract)
}

impl From<Tensor> for Vertex {
    fn from(t: Tensor) -> Self {
        Vertex::Tensor(t)
    }
}

impl From<Linkage> for Vertex {
    fn from(link: Linkage) -> Self {
        Vertex::Link(link)
    }
}

impl Mul for Vertex {
    type Output = Vertex;
    fn mul(self, rhs: Vertex) -> Vertex {
        Vertex::contract(self, rhs)
    }
}

impl Add for Vertex {
    type Output = Vertex;
    fn add(self, rhs: Vertex) -> Vertex {
        Vertex::sum(self, rhs)
    }
}

impl FromStr for Vertex {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let sexp = parse_str(s.trim()).map_err(|e| Error::Parse(e.to_string()))?;
        Vertex::from_sexp(&sexp)
    }
}

impl Display for Vertex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty(usize::MAX))
    }
}

impl Debug for Vertex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Debug for Tensor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&pretty(&self.to_sexp(), usize::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Vertex {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_print() {
        crate::init_logger();
        let t2 = v("(t2 a b i j)");
        assert_eq!(t2.lines().len(), 4);
        assert_eq!(t2.to_string(), "(t2 a b i j)");

        let product = v("(* (t2 a b i j) (V i j k l))");
        assert!(product.is_linked());
        assert_eq!(product.to_string(), "(* (t2 a b i j) (V i j k l))");
        let names: Vec<String> = product.lines().iter().map(|l| l.to_string()).collect();
        assert_eq!(names, vec!["a", "b", "k", "l"]);

        assert_eq!(v("0.5").value(), Some(0.5));
        assert!(v("E").is_scalar());
        assert!("(t2 a z)".parse::<Vertex>().is_err());
        assert!("((t2) a)".parse::<Vertex>().is_err());
    }

    #[test]
    fn identity_collapse() {
        let a = v("(f a b)");
        assert_eq!(Vertex::contract(Vertex::Empty, a.clone()), a);
        assert_eq!(Vertex::contract(a.clone(), Vertex::constant(1.0)), a);
        assert_eq!(Vertex::sum(a.clone(), Vertex::Empty), a);
        assert!(Vertex::contract(a.clone(), Vertex::constant(2.0)).is_linked());
    }

    #[test]
    fn link_skips_empty_and_unit() {
        let a = v("(f a b)");
        let b = v("(t1 b i)");
        assert_eq!(link(&[]), Vertex::Empty);
        assert_eq!(link(&[Vertex::constant(1.0), a.clone(), Vertex::Empty]), a);

        let ab = link(&[a.clone(), Vertex::constant(1.0), b.clone()]);
        assert_eq!(ab, a.clone() * b.clone());
        assert_eq!(ab.depth(), 1);
        assert_eq!(ab.operands(), vec![a, b]);
    }

    #[test]
    fn structural_equality_ignores_instances() {
        let first = v("(* (f a b) (t1 b i))");
        let second = v("(f a b)") * v("(t1 b i)");
        assert_eq!(first, second);

        use std::hash::{Hash, Hasher};
        let hash = |x: &Vertex| {
            let mut h = fxhash::FxHasher::default();
            x.hash(&mut h);
            h.finish()
        };
        assert_eq!(hash(&first), hash(&second));
        assert_ne!(first, v("(* (t1 b i) (f a b))"));
    }

    #[test]
    fn rename_lines_builds_new_vertex() {
        let original = v("(* (f a c) (t1 c i))");
        let mut map = HashMap::default();
        map.insert(Line::parse("c").unwrap(), Line::parse("d").unwrap());
        let renamed = original.rename_lines(&map);
        assert_eq!(renamed, v("(* (f a d) (t1 d i))"));
        assert_eq!(original.to_string(), "(* (f a c) (t1 c i))");
    }
}
