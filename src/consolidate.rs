use log::*;

use crate::{
    equation::sort_tmp_type,
    util::{HashMap, HashSet, IndexMap},
    Factorizer, Limit, Linkage, LinkageSet, PerKind, TempId, TempKind, Term, Vertex,
};

impl Factorizer {
    /// Merge duplicate terms, inline single-use intermediates and drop
    /// unreferenced declarations. Returns how many changes were made.
    pub(crate) fn consolidate(&mut self) -> usize {
        let merged = self.merge_terms();
        let fused = self.merge_intermediates();
        let pruned = self.prune();
        if merged + fused + pruned > 0 {
            self.collect_scaling(false);
            info!(
                "Consolidated: {} terms merged, {} temporaries fused, {} pruned",
                merged, fused, pruned
            );
        }
        merged + fused + pruned
    }

    /// Merge duplicate terms in every equation. Returns the number of terms
    /// removed.
    pub fn merge_terms(&mut self) -> usize {
        self.equations_mut().map(|eq| eq.merge_terms()).sum()
    }

    /// Terms that reference `temp` directly, as (equation, index) pairs.
    fn consumers(&self, temp: &Linkage) -> Vec<(String, usize)> {
        let mut found = vec![];
        for eq in self.equations() {
            for (idx, term) in eq.terms().iter().enumerate() {
                if term.lhs().same_temp(&Vertex::Link(temp.clone())) {
                    continue;
                }
                if term.linkage().has_temp(temp, false, Limit::Unbounded) {
                    found.push((eq.name().to_string(), idx));
                }
            }
        }
        found
    }

    /// Inline every generic temporary that is declared by a single term and
    /// consumed by a single term. Returns how many were inlined.
    ///
    /// When the consumer is itself a declaration, direct references to the
    /// consuming temporary are rebuilt with its new structure.
    pub fn merge_intermediates(&mut self) -> usize {
        let name = TempKind::Generic.equation_name();
        let mut fused = 0;
        let mut i = 0;
        loop {
            let decl = match self.equation(name).and_then(|eq| eq.terms().get(i)) {
                Some(term) => term.clone(),
                None => break,
            };
            let temp = match decl.lhs().as_link() {
                Some(temp) if temp.is_temp() => temp.clone(),
                _ => {
                    i += 1;
                    continue;
                }
            };
            let declarations = self
                .equation(name)
                .map_or(0, |eq| eq.terms().iter().filter(|t| t.lhs() == decl.lhs()).count());
            let consumers = self.consumers(&temp);
            if declarations != 1 || consumers.len() != 1 {
                i += 1;
                continue;
            }

            let (consumer_eq, idx) = &consumers[0];
            let mut rebuilt = None;
            if let Some(eq) = self.equation_mut(consumer_eq) {
                let term = &mut eq.terms_mut()[*idx];
                let (inlined, _) = term.linkage().replace(&temp, decl.linkage());
                term.set_coefficient(term.coefficient() * decl.coefficient());
                term.set_linkage(inlined);
                term.reorder();
                if let (Some(owner), Some(structure)) = (term.lhs().as_link(), term.linkage().as_link()) {
                    if let Some(id) = owner.temp_id() {
                        rebuilt = Some((owner.clone(), structure.as_temp(id.kind, id.id)));
                    }
                }
            }
            if let Some((old, new)) = rebuilt {
                self.refresh_references(&old, &new);
            }
            if let Some(eq) = self.equation_mut(name) {
                eq.terms_mut().remove(i);
            }
            debug!("Inlined {} into {}", temp.name(), consumer_eq);

            if let Some(pattern) = decl.linkage().as_link() {
                self.state.saved[TempKind::Generic].remove(pattern);
                self.state.dead.insert(pattern.clone());
            }
            self.state.dead.insert(temp.structure());
            fused += 1;
        }
        if fused > 0 {
            for eq in self.equations_mut() {
                eq.collect_scaling(false);
            }
        }
        fused
    }

    /// Swap every direct reference to `old` for `new`, an equal temporary
    /// with a different structure.
    fn refresh_references(&mut self, old: &Linkage, new: &Linkage) {
        let replacement = Vertex::Link(new.clone());
        for eq in self.equations_mut() {
            for term in eq.terms_mut() {
                if term.lhs().same_temp(&replacement) {
                    term.set_lhs(replacement.clone());
                }
                let (linkage, found) = term.linkage().replace(old, &replacement);
                if found {
                    term.set_linkage(linkage);
                }
            }
        }
    }

    /// Remove declarations of temporaries nothing refers to any more,
    /// repeating until none are left. Returns how many were removed.
    pub fn prune(&mut self) -> usize {
        let mut pruned = 0;
        loop {
            let referenced: HashSet<TempId> = self
                .equations()
                .flat_map(|eq| eq.terms())
                .flat_map(|t| t.linkage().get_temps(false, true))
                .filter_map(|t| t.temp_id())
                .collect();

            let mut removed: Vec<(TempKind, Term)> = vec![];
            for eq in self.equations_mut() {
                let Some(kind) = eq.temp_kind() else {
                    continue;
                };
                let terms = eq.terms_mut();
                let mut kept = Vec::with_capacity(terms.len());
                for term in terms.drain(..) {
                    match term.lhs().temp_id() {
                        Some(id) if !referenced.contains(&id) => removed.push((kind, term)),
                        _ => kept.push(term),
                    }
                }
                *terms = kept;
            }

            if removed.is_empty() {
                break;
            }
            for (kind, term) in &removed {
                debug!("Pruned unused {}", term.lhs());
                if let Some(pattern) = term.linkage().as_link() {
                    self.state.saved[*kind].remove(pattern);
                }
            }
            pruned += removed.len();
        }
        if pruned > 0 {
            for eq in self.equations_mut() {
                eq.collect_scaling(false);
            }
        }
        pruned
    }

    /// Renumber temporaries so each category's ids are gap free and follow
    /// the order in which the temporaries are last used.
    pub fn reindex(&mut self) {
        for pass in 0..self.config().reindex_passes {
            let mapping = self.reindex_mapping();
            if mapping.is_empty() {
                debug!("Reindexing settled after {} passes", pass);
                break;
            }
            debug!("Reindex pass {} renumbers {} temporaries", pass, mapping.len());

            for eq in self.equations_mut() {
                for term in eq.terms_mut() {
                    if let Some(lhs) = term.lhs().remap_ids(&mapping) {
                        term.set_lhs(lhs);
                    }
                    if let Some(linkage) = term.linkage().remap_ids(&mapping) {
                        term.set_linkage(linkage);
                    }
                }
                let order = eq.dependency_kind();
                eq.rearrange(order);
            }
            self.resync_saved();
        }
    }

    /// New ids for every temporary whose id changes.
    fn reindex_mapping(&self) -> HashMap<TempId, u32> {
        let mut terms: Vec<Term> = self
            .equations()
            .flat_map(|eq| eq.terms().iter().cloned())
            .collect();
        for kind in TempKind::ALL {
            sort_tmp_type(&mut terms, kind);
        }

        let mut last_use: IndexMap<TempId, usize> = Default::default();
        let mut depends: HashMap<TempId, Vec<TempId>> = Default::default();
        for (pos, term) in terms.iter().enumerate() {
            let used: Vec<TempId> = term
                .linkage()
                .get_temps(false, true)
                .iter()
                .filter_map(Linkage::temp_id)
                .collect();
            if let Some(id) = term.lhs().temp_id() {
                last_use.insert(id, pos);
                depends.entry(id).or_default().extend(used.iter().copied());
            }
            for id in used {
                last_use.insert(id, pos);
            }
        }

        let mut order: Vec<(usize, TempId)> = last_use.into_iter().map(|(id, pos)| (pos, id)).collect();
        order.sort();

        let mut assigned: HashMap<TempId, u32> = Default::default();
        let mut next = PerKind::<u32>::default();
        for (_, id) in order {
            assign_id(id, &depends, &mut assigned, &mut next, &mut HashSet::default());
        }
        assigned.retain(|old, new| old.id != *new);
        assigned
    }

    /// Rebuild the saved sets and id counters from the declarations.
    fn resync_saved(&mut self) {
        let mut saved = PerKind::<LinkageSet>::default();
        let mut counts = PerKind::<u32>::default();
        for kind in TempKind::ALL {
            if let Some(eq) = self.equation(kind.equation_name()) {
                for term in eq.terms() {
                    if let Some(pattern) = term.linkage().as_link() {
                        saved[kind].insert(pattern.clone());
                    }
                    if let Some(id) = term.lhs().temp_id() {
                        counts[kind] = counts[kind].max(id.id);
                    }
                }
            }
        }
        self.state.saved = saved;
        self.state.temp_counts = counts;
    }

    /// Drop the cached data of every expression.
    pub fn forget(&mut self) {
        for eq in self.equations() {
            for term in eq.terms() {
                for vertex in [term.lhs(), term.linkage()] {
                    if let Some(link) = vertex.as_link() {
                        link.forget();
                    }
                }
            }
        }
        self.state.all_links.clear();
    }
}

/// Number `id` after the temporaries of its own category that its
/// declaration uses.
fn assign_id(
    id: TempId,
    depends: &HashMap<TempId, Vec<TempId>>,
    assigned: &mut HashMap<TempId, u32>,
    next: &mut PerKind<u32>,
    visiting: &mut HashSet<TempId>,
) {
    if assigned.contains_key(&id) || !visiting.insert(id) {
        return;
    }
    if let Some(deps) = depends.get(&id) {
        for &dep in deps {
            if dep.kind == id.kind {
                assign_id(dep, depends, assigned, next, visiting);
            }
        }
    }
    next[id.kind] += 1;
    assigned.insert(id, next[id.kind]);
}
