use log::*;
use rayon::prelude::*;

use crate::{
    linkage::set_low_memory,
    util::{Instant, IndexMap},
    Comparison, Config, Equation, Error, Limit, Linkage, LinkageSet, PerKind, Result, ScalingMap,
    SubstituteTarget, TempKind, Term,
};

/** Searches a set of equations for intermediates worth declaring.

A [`Factorizer`] owns the equations of a method (residuals, energy
expressions) and repeatedly looks for a sub-expression that, declared
once as a temporary and referenced everywhere it occurs, makes the
combined cost of all equations no worse. Costs are compared as
[`ScalingMap`] profiles, so an extra `o2v4` contraction always outweighs
any number of cheaper ones.

Each pass of the search:

- collects every sub-expression of every term up to the current search
  depth, minus those already declared or rejected;

- evaluates every candidate on a [`rayon`] thread pool by substituting it
  into clones of the equations, adding the cost of its declaration;

- commits the surviving candidates best-first, one per pass unless the
  search is [batched](Config::batched);

- when no candidates remain, merges duplicate terms, inlines
  intermediates with a single consumer, drops unreferenced ones and
  increases the search depth.

The search stops when no candidate is left at the maximum depth, when
the temporary budget is used up, or when only a few additions remain
(see [`StopReason`]). Temporaries are finally renumbered in order of
use.

Progress is logged at the `info` level; each committed substitution is
reported with the cost before and after.

```
use tensor_factor::*;

let v = |s: &str| s.parse::<Vertex>().unwrap();
let term = |lhs: &str, rhs: &[&str]| Term::new(v(lhs), 1.0, rhs.iter().map(|s| v(s)).collect());

let r1 = Equation::new("r1", vec![term("(R1 a d)", &["(X a b)", "(Y b c)", "(Z c d)"])])?;
let r2 = Equation::new("r2", vec![term("(R2 a e)", &["(X a b)", "(Y b c)", "(W c e)"])])?;

let mut factorizer = Factorizer::new(Config::default().with_threads(1))?
    .with_equations(vec![r1, r2])?;
factorizer.substitute();

let temps = factorizer.equation("generic-temp").unwrap();
assert_eq!(temps.len(), 1);
# Ok::<(), tensor_factor::Error>(())
```
*/
pub struct Factorizer {
    equations: IndexMap<String, Equation>,
    /// Data accumulated on each pass of the search.
    pub iterations: Vec<Iteration>,
    /// Why the last search stopped.
    pub stop_reason: Option<StopReason>,
    config: Config,
    pub(crate) state: SearchState,
    flop_map: ScalingMap,
    mem_map: ScalingMap,
    pool: rayon::ThreadPool,
}

/// Why a [`Factorizer`] stopped searching.
///
/// None of these are failures: the equations are valid whatever the
/// reason, just possibly more expensive than the optimum.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize))]
pub enum StopReason {
    /// No candidate is left at the maximum search depth.
    Converged,
    /// Only a few candidates are left and all of them are additions,
    /// which never pay for themselves.
    AdditionsOnly,
    /// Consecutive passes at the maximum depth committed nothing.
    RetryLimit,
    /// The category being searched for, or every category that could be
    /// declared, is at its budget.
    TempLimit,
    /// The time limit was hit. The data is the elapsed time in seconds.
    TimeLimit(f64),
}

/// Data recorded for one pass of the search.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize))]
#[non_exhaustive]
pub struct Iteration {
    /// The search depth of this pass.
    pub depth: usize,
    /// Number of candidates offered for evaluation.
    pub candidates: usize,
    /// Candidates that could be substituted somewhere.
    pub evaluated: usize,
    /// Candidates that did not raise the cost.
    pub kept: usize,
    /// Temporaries declared in this pass.
    pub committed: usize,
    /// The combined flop profile after this pass.
    pub flop_map: ScalingMap,
    /// Seconds spent evaluating candidates.
    pub evaluate_time: f64,
    /// Seconds spent committing substitutions.
    pub commit_time: f64,
    /// Total seconds spent in this pass.
    pub total_time: f64,
    /// If the search stopped after this pass, this is the reason.
    pub stop_reason: Option<StopReason>,
}

/// Bookkeeping of a search that persists between passes.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// Highest id handed out in each category.
    pub temp_counts: PerKind<u32>,
    /// Expressions declared as temporaries, per category.
    pub saved: PerKind<LinkageSet>,
    /// Every candidate at the current depth.
    pub all_links: LinkageSet,
    /// Current search depth.
    pub depth: usize,
    /// Consecutive retries at the maximum depth without a commit.
    pub retries: usize,
    /// Substitutions committed so far.
    pub substitutions: usize,
    /// Candidates that must not be proposed again.
    pub(crate) dead: LinkageSet,
}

/// Outcome of evaluating one candidate.
enum Evaluation {
    /// Not worth looking at in this pass.
    Skip,
    /// Can never be committed.
    Dead(Linkage),
    /// Its category has no budget left.
    Full(Linkage),
    Trial(Trial),
}

struct Trial {
    pattern: Linkage,
    kind: TempKind,
    flop_map: ScalingMap,
    mem_map: ScalingMap,
    substitutions: usize,
}

const ALLOW_EQUALITY: bool = true;
const LARGE_POOL: usize = 100_000;

impl Factorizer {
    /// Create a factorizer with no equations.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        set_low_memory(config.low_memory);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()?;
        Ok(Self {
            equations: Default::default(),
            iterations: vec![],
            stop_reason: None,
            config,
            state: SearchState::default(),
            flop_map: ScalingMap::new(),
            mem_map: ScalingMap::new(),
            pool,
        })
    }

    /// Add an equation. Names must be unique and must not be one of the
    /// temporary category names.
    pub fn add_equation(&mut self, equation: Equation) -> Result<()> {
        let reserved = TempKind::from_equation_name(equation.name()).is_some();
        if (reserved && !equation.is_temp_equation()) || self.equations.contains_key(equation.name())
        {
            return Err(Error::DuplicateEquation(equation.name().into()));
        }
        self.equations.insert(equation.name().into(), equation);
        self.collect_scaling(false);
        Ok(())
    }

    pub fn with_equations(mut self, equations: impl IntoIterator<Item = Equation>) -> Result<Self> {
        for equation in equations {
            self.add_equation(equation)?;
        }
        Ok(self)
    }

    pub fn equation(&self, name: &str) -> Option<&Equation> {
        self.equations.get(name)
    }

    pub fn equations(&self) -> impl Iterator<Item = &Equation> + '_ {
        self.equations.values()
    }

    pub fn into_equations(self) -> Vec<Equation> {
        self.equations.into_values().collect()
    }

    pub(crate) fn equations_mut(&mut self) -> impl Iterator<Item = &mut Equation> + '_ {
        self.equations.values_mut()
    }

    pub(crate) fn equation_mut(&mut self, name: &str) -> Option<&mut Equation> {
        self.equations.get_mut(name)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Combined flop profile of every equation evaluated per iteration
    /// of the method; hoisted declarations are not included.
    pub fn flop_map(&self) -> &ScalingMap {
        &self.flop_map
    }

    pub fn mem_map(&self) -> &ScalingMap {
        &self.mem_map
    }

    /// Recompute the cost of every equation and the combined profile.
    pub fn collect_scaling(&mut self, regenerate: bool) {
        self.flop_map = ScalingMap::new();
        self.mem_map = ScalingMap::new();
        for eq in self.equations.values_mut() {
            eq.collect_scaling(regenerate);
            if !eq.is_hoisted() {
                self.flop_map += eq.flop_map();
                self.mem_map += eq.mem_map();
            }
        }
    }

    fn classify(&self, pattern: &Linkage) -> TempKind {
        if pattern.is_scalar() {
            TempKind::Scalar
        } else if self.config.separate_reused && !pattern.is_sigma() {
            TempKind::Reused
        } else {
            TempKind::Generic
        }
    }

    /// Categories this search may declare.
    fn declarable(&self) -> impl Iterator<Item = TempKind> + '_ {
        TempKind::ALL.into_iter().filter(move |&kind| match kind {
            TempKind::Scalar => {
                self.config.allow_scalars || self.config.target == SubstituteTarget::Scalars
            }
            TempKind::Reused => {
                self.config.separate_reused && self.config.target != SubstituteTarget::Scalars
            }
            TempKind::Generic => self.config.target != SubstituteTarget::Scalars,
        })
    }

    fn budget_full(&self, kind: TempKind) -> bool {
        self.config
            .max_temps
            .reached(self.state.temp_counts[kind] as usize)
    }

    /// The category the search is aiming for.
    fn target_kind(&self) -> TempKind {
        match self.config.target {
            SubstituteTarget::Temps => TempKind::Generic,
            SubstituteTarget::Reused => TempKind::Reused,
            SubstituteTarget::Scalars => TempKind::Scalar,
        }
    }

    fn budget_exhausted(&self) -> bool {
        self.budget_full(self.target_kind()) || self.declarable().all(|kind| self.budget_full(kind))
    }

    /// The deepest expression of any term, bounded by the configured
    /// maximum.
    fn max_search_depth(&self) -> usize {
        let deepest = self
            .equations
            .values()
            .filter(|eq| !eq.is_temp_equation())
            .flat_map(|eq| eq.terms())
            .map(|t| t.linkage().depth())
            .max()
            .unwrap_or(1);
        self.config.max_depth.min(deepest).max(1)
    }

    fn ensure_temp_equations(&mut self) {
        for kind in TempKind::ALL {
            self.equations
                .entry(kind.equation_name().into())
                .or_insert_with(|| Equation::declarations(kind));
        }
    }

    /// Candidates that are never offered again: declared ones and dead ones.
    fn settled(&self) -> LinkageSet {
        let mut settled = self.state.dead.clone();
        for (_, saved) in self.state.saved.iter() {
            settled.union_with(saved);
        }
        settled
    }

    /// Collect every candidate at the current depth.
    pub(crate) fn regenerate_links(&mut self) {
        let depth = Limit::At(self.state.depth);
        let mut all = LinkageSet::new();
        for eq in self.equations.values().filter(|eq| !eq.is_temp_equation()) {
            for term in eq.terms() {
                all.union_with(&term.make_all_links(depth));
            }
        }
        if all.len() > LARGE_POOL {
            warn!(
                "{} candidates at depth {}; consider limiting the search depth",
                all.len(),
                self.state.depth
            );
        }
        info!(
            "Generated {} candidates at depth {}",
            all.len(),
            self.state.depth
        );
        self.state.all_links = all;
    }

    /// Search for temporaries until no candidate improves the equations.
    ///
    /// Returns the reason the search stopped, which is also stored in
    /// [`Factorizer::stop_reason`].
    pub fn substitute(&mut self) -> StopReason {
        if self.budget_exhausted() {
            info!("Temporary budget already reached, nothing to substitute");
            self.stop_reason = Some(StopReason::TempLimit);
            return StopReason::TempLimit;
        }

        let start = Instant::now();
        for eq in self.equations.values_mut() {
            eq.reorder();
        }
        self.ensure_temp_equations();
        self.merge_terms();
        self.collect_scaling(true);

        let max_depth = self.max_search_depth();
        self.state.depth = if self.config.batched { 1 } else { max_depth };
        self.state.retries = 0;
        self.regenerate_links();

        let initial_flops = self.flop_map.clone();
        let initial_substitutions = self.state.substitutions;
        info!("Initial flop scaling: {}", initial_flops);

        let mut ignore = self.settled();
        let mut test = self.state.all_links.difference(&ignore);

        let reason = loop {
            if let Some(limit) = self.config.time_limit {
                let elapsed = start.elapsed();
                if elapsed > limit {
                    break StopReason::TimeLimit(elapsed.as_secs_f64());
                }
            }

            let pass_start = Instant::now();
            let candidates = test.len();
            info!(
                "\nIteration {}: {} candidates at depth {}",
                self.iterations.len(),
                candidates,
                self.state.depth
            );

            let (trials, dead, full) = self.evaluate(&test, &ignore);
            for pattern in dead {
                trace!("Ignoring {} from now on", pattern);
                ignore.insert(pattern.clone());
                self.state.dead.insert(pattern);
            }
            ignore.extend(full);
            let evaluated = trials.len();
            let (ranked, declined) = self.rank(trials);
            let kept = ranked.len();
            let evaluate_time = pass_start.elapsed().as_secs_f64();

            let commit_start = Instant::now();
            let committed = self.commit(ranked, &mut ignore, &mut test);
            if committed > 0 {
                self.state.retries = 0;
                self.regenerate_links();
                ignore = self.settled();
            } else {
                ignore.extend(declined);
            }
            test = self.state.all_links.difference(&ignore);
            let commit_time = commit_start.elapsed().as_secs_f64();

            self.iterations.push(Iteration {
                depth: self.state.depth,
                candidates,
                evaluated,
                kept,
                committed,
                flop_map: self.flop_map.clone(),
                evaluate_time,
                commit_time,
                total_time: pass_start.elapsed().as_secs_f64(),
                stop_reason: None,
            });

            if test.is_empty() {
                let changed = self.consolidate();
                test = self.escalate(max_depth, &ignore);
                if test.is_empty() {
                    if changed == 0 {
                        break StopReason::Converged;
                    }
                    // housekeeping rewrote terms; look again from scratch
                    self.state.retries += 1;
                    if self.state.retries > self.config.retry_limit {
                        break StopReason::RetryLimit;
                    }
                    debug!("Retry {} at depth {}", self.state.retries, max_depth);
                    self.state.depth = max_depth;
                    self.regenerate_links();
                    ignore = self.settled();
                    test = self.state.all_links.difference(&ignore);
                    if test.is_empty() {
                        break StopReason::Converged;
                    }
                }
            }

            if test.len() <= self.config.addition_exit_threshold
                && test.iter().all(Linkage::is_addition)
            {
                break StopReason::AdditionsOnly;
            }

            if self.budget_exhausted() {
                break StopReason::TempLimit;
            }
        };

        if let Some(last) = self.iterations.last_mut() {
            last.stop_reason = Some(reason.clone());
        }
        self.finish(&reason, &initial_flops, initial_substitutions);
        self.stop_reason = Some(reason.clone());
        reason
    }

    /// Raise the search depth until new candidates appear. After two
    /// fruitless steps the depth jumps straight to `max_depth`.
    fn escalate(&mut self, max_depth: usize, ignore: &LinkageSet) -> LinkageSet {
        let mut fruitless = 0;
        while self.state.depth < max_depth {
            self.state.depth += 1;
            self.regenerate_links();
            let test = self.state.all_links.difference(ignore);
            if !test.is_empty() {
                return test;
            }
            fruitless += 1;
            if fruitless >= 2 && self.state.depth < max_depth {
                self.state.depth = max_depth;
                self.regenerate_links();
                return self.state.all_links.difference(ignore);
            }
        }
        LinkageSet::new()
    }

    /// Trial-substitute every candidate in parallel. Returns the trials,
    /// the candidates that can never be committed and the candidates whose
    /// category is full.
    fn evaluate(
        &self,
        test: &LinkageSet,
        ignore: &LinkageSet,
    ) -> (Vec<Trial>, Vec<Linkage>, Vec<Linkage>) {
        let candidates: Vec<&Linkage> = test.iter().collect();
        let results: Vec<Evaluation> = self.pool.install(|| {
            candidates
                .par_iter()
                .map(|pattern| self.evaluate_one(pattern, ignore))
                .collect()
        });

        let mut trials = vec![];
        let mut dead = vec![];
        let mut full = vec![];
        for result in results {
            match result {
                Evaluation::Skip => {}
                Evaluation::Dead(pattern) => dead.push(pattern),
                Evaluation::Full(pattern) => full.push(pattern),
                Evaluation::Trial(trial) => trials.push(trial),
            }
        }
        (trials, dead, full)
    }

    fn evaluate_one(&self, pattern: &Linkage, ignore: &LinkageSet) -> Evaluation {
        if ignore.contains(pattern) {
            return Evaluation::Skip;
        }
        if self.config.target == SubstituteTarget::Reused && pattern.is_sigma() {
            return Evaluation::Dead(pattern.clone());
        }
        let kind = self.classify(pattern);
        if !self.declarable().any(|k| k == kind) {
            return Evaluation::Dead(pattern.clone());
        }
        if self.budget_full(kind) {
            return Evaluation::Full(pattern.clone());
        }

        let temp = pattern.as_temp(kind, self.state.temp_counts[kind] + 1);
        let mut flop_map = ScalingMap::new();
        let mut mem_map = ScalingMap::new();
        let mut substitutions = 0;
        for eq in self.equations.values().filter(|eq| !eq.is_hoisted()) {
            substitutions += eq.test_substitute(pattern, &temp, &mut flop_map, &mut mem_map);
        }
        if substitutions == 0 {
            return Evaluation::Dead(pattern.clone());
        }
        if !kind.is_hoisted() {
            let (flops, mems) = pattern.netscales(false);
            flop_map += &flops;
            mem_map += &mems;
        }

        debug!(
            "{} candidate {} substitutes into {} terms: {}",
            kind, pattern, substitutions, flop_map
        );
        Evaluation::Trial(Trial {
            pattern: pattern.clone(),
            kind,
            flop_map,
            mem_map,
            substitutions,
        })
    }

    /// Keep candidates that do not raise the combined cost, best first.
    /// Returns the survivors and the declined candidates.
    ///
    /// A trial that leaves the cost unchanged is kept only when its category
    /// is hoisted or it replaces more than one term. A generic temporary
    /// used by a single term would be inlined again by
    /// [`Factorizer::merge_intermediates`].
    fn rank(&self, trials: Vec<Trial>) -> (Vec<Trial>, Vec<Linkage>) {
        let mut kept = vec![];
        let mut declined = vec![];
        for trial in trials {
            let keep = match trial.flop_map.compare(&self.flop_map) {
                Comparison::Better => true,
                Comparison::Same => {
                    trial.kind.is_hoisted() || (ALLOW_EQUALITY && trial.substitutions > 1)
                }
                Comparison::Worse => false,
            };
            if keep {
                kept.push(trial);
            } else {
                declined.push(trial.pattern);
            }
        }
        kept.sort_by(|a, b| {
            a.flop_map
                .cmp(&b.flop_map)
                .then_with(|| a.mem_map.cmp(&b.mem_map))
                .then_with(|| b.substitutions.cmp(&a.substitutions))
        });
        (kept, declined)
    }

    /// Declare the ranked candidates in order. Returns how many were
    /// declared.
    fn commit(&mut self, ranked: Vec<Trial>, ignore: &mut LinkageSet, test: &mut LinkageSet) -> usize {
        let mut committed = 0;
        for trial in ranked {
            let kind = trial.kind;
            if self.budget_full(kind) {
                continue;
            }

            let id = self.state.temp_counts[kind] + 1;
            self.state.temp_counts[kind] = id;
            let temp = trial.pattern.as_temp(kind, id);

            let mut substituted = 0;
            for eq in self.equations.values_mut() {
                // a generic temporary must not leak into a hoisted declaration
                if eq.is_hoisted() && !kind.is_hoisted() {
                    continue;
                }
                let n = eq.substitute(&trial.pattern, &temp, ALLOW_EQUALITY);
                if n > 0 {
                    let order = eq.dependency_kind();
                    eq.rearrange(order);
                }
                substituted += n;
            }
            ignore.insert(trial.pattern.clone());
            test.remove(&trial.pattern);

            if substituted == 0 {
                debug!("{} no longer occurs, releasing {}", trial.pattern, temp.name());
                self.state.temp_counts[kind] -= 1;
                continue;
            }

            if let Some(decls) = self.equations.get_mut(kind.equation_name()) {
                decls.push_term(Term::declaration(&temp));
            }
            self.state.saved[kind].insert(trial.pattern.clone());
            self.state.substitutions += 1;

            let before = self.flop_map.clone();
            self.collect_scaling(false);
            info!(
                "Declared {} = {} in {} terms: {} -> {}",
                temp.name(),
                trial.pattern,
                substituted,
                before,
                self.flop_map
            );

            committed += 1;
            if !self.config.batched
                || self.config.batch_size.reached(committed)
                || self.budget_full(kind)
            {
                break;
            }
        }
        committed
    }

    fn finish(&mut self, reason: &StopReason, initial_flops: &ScalingMap, initial_substitutions: usize) {
        self.consolidate();
        for eq in self.equations.values_mut() {
            let order = eq.dependency_kind();
            eq.rearrange(order);
        }
        self.collect_scaling(true);

        if self.budget_exhausted() {
            warn!(
                "Temporary budget of {} per category reached",
                self.config.max_temps
            );
        }
        if self.state.substitutions == initial_substitutions {
            info!("No substitutions found");
        } else {
            self.reindex();
        }
        info!(
            "Stopped ({:?}) after {} substitutions: {} -> {}",
            reason,
            self.state.substitutions - initial_substitutions,
            initial_flops,
            self.flop_map
        );
    }

    pub fn print_report(&self) {
        let evaluate_time: f64 = self.iterations.iter().map(|i| i.evaluate_time).sum();
        let commit_time: f64 = self.iterations.iter().map(|i| i.commit_time).sum();
        let total_time: f64 = self.iterations.iter().map(|i| i.total_time).sum();
        let iters = self.iterations.len();
        let candidates: usize = self.iterations.iter().map(|i| i.candidates).sum();
        let counts = &self.state.temp_counts;

        println!("Factorizer report");
        println!("=================");
        println!("  Stop reason: {:?}", self.stop_reason);
        println!("  Iterations: {}", iters);
        println!(
            "  Candidates: {}, {:.2} per iter",
            candidates,
            (candidates as f64) / (iters.max(1) as f64)
        );
        println!(
            "  Temporaries: {} scalar, {} reused, {} generic",
            counts.scalar, counts.reused, counts.generic
        );
        println!("  Flop scaling: {}", self.flop_map);
        println!("  Memory scaling: {}", self.mem_map);
        println!("  Total time: {}", total_time);
        println!("    Evaluate: ({:.2}) {}", evaluate_time / total_time, evaluate_time);
        println!("    Commit:   ({:.2}) {}", commit_time / total_time, commit_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vertex;

    fn v(s: &str) -> Vertex {
        s.parse().unwrap()
    }

    fn chain() -> Term {
        let rhs = ["(A a b)", "(B b c)", "(C c d)", "(D d e)", "(E e f)", "(F f g)"];
        Term::new(v("(R a g)"), 1.0, rhs.map(v).to_vec())
    }

    fn factorizer(terms: Vec<Term>) -> Factorizer {
        Factorizer::new(Config::default().with_threads(1))
            .unwrap()
            .with_equations(vec![Equation::new("r1", terms).unwrap()])
            .unwrap()
    }

    #[test]
    fn escalation_jumps_after_two_fruitless_steps() {
        crate::init_logger();
        let term = chain();
        let mut f = factorizer(vec![term.clone()]);

        // everything up to depth 3 has been seen already
        let ignore = term.make_all_links(Limit::At(3));
        f.state.depth = 1;
        let test = f.escalate(5, &ignore);

        assert_eq!(f.state.depth, 5);
        assert!(!test.is_empty());
        assert!(test.iter().all(|link| link.depth() >= 4));
    }

    #[test]
    fn escalation_stops_at_new_candidates() {
        crate::init_logger();
        let term = chain();
        let mut f = factorizer(vec![term.clone()]);

        let ignore = term.make_all_links(Limit::At(1));
        f.state.depth = 1;
        let test = f.escalate(5, &ignore);

        assert_eq!(f.state.depth, 2);
        assert!(test.iter().all(|link| link.depth() == 2));
    }

    #[test]
    fn escalation_at_max_depth_finds_nothing() {
        let term = chain();
        let mut f = factorizer(vec![term.clone()]);

        let ignore = term.make_all_links(Limit::Unbounded);
        f.state.depth = 5;
        assert!(f.escalate(5, &ignore).is_empty());
        assert_eq!(f.state.depth, 5);
    }

    #[test]
    fn full_category_is_declined() {
        let term = chain();
        let config = Config::default().with_threads(1).with_max_temps(Limit::At(1));
        let mut f = Factorizer::new(config)
            .unwrap()
            .with_equations(vec![Equation::new("r1", vec![term]).unwrap()])
            .unwrap();
        f.state.temp_counts[TempKind::Generic] = 1;
        assert!(f.budget_exhausted());

        let pattern = v("(* (A a b) (B b c))").as_link().cloned().unwrap();
        assert!(matches!(
            f.evaluate_one(&pattern, &LinkageSet::new()),
            Evaluation::Full(_)
        ));
    }
}
