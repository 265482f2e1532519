//! `PathAnalyser`: a branch tree tracking which control-flow-sensitive
//! facts ("incidents") are certainly or only potentially true at the
//! current point in a function body.

use fixedbitset::FixedBitSet;

use crate::variable::VariableId;

/// A control-flow-sensitive fact the analyzer cares about. Variable
/// initialization is parameterized by which variable; the other three are
/// singletons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Incident {
    VariableInitialized(VariableId),
    SuperInitializerCalled,
    SelfUsed,
    Returned,
}

const SCALAR_COUNT: usize = 3;

fn incident_bit(incident: Incident) -> usize {
    match incident {
        Incident::SuperInitializerCalled => 0,
        Incident::SelfUsed => 1,
        Incident::Returned => 2,
        Incident::VariableInitialized(VariableId(id)) => SCALAR_COUNT + id as usize,
    }
}

fn ensure_len(set: &mut FixedBitSet, len: usize) {
    if set.len() < len {
        set.grow(len);
    }
}

#[derive(Clone, Debug)]
struct Branch {
    parent: Option<usize>,
    children: Vec<usize>,
    certain: FixedBitSet,
    potential: FixedBitSet,
}

impl Branch {
    fn new(parent: Option<usize>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            certain: FixedBitSet::with_capacity(0),
            potential: FixedBitSet::with_capacity(0),
        }
    }
}

/// A tree of branches rooted at a "main branch", with a cursor (`current`)
/// tracking where control flow is. Sibling branches (the arms of an `if`,
/// say) record incidents independently; joining them back together
/// combines what they each established, either by intersection (a fact is
/// certain only if every arm made it certain) or, when not every arm runs,
/// by union into the potential set alone.
#[derive(Clone, Debug)]
pub struct PathAnalyser {
    branches: Vec<Branch>,
    current: usize,
}

impl PathAnalyser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            branches: vec![Branch::new(None)],
            current: 0,
        }
    }

    pub fn begin_branch(&mut self) {
        let child_index = self.branches.len();
        self.branches.push(Branch::new(Some(self.current)));
        self.branches[self.current].children.push(child_index);
        self.current = child_index;
    }

    /// # Panics
    /// If the current branch still has open child branches of its own.
    pub fn end_branch(&mut self) {
        assert!(
            self.branches[self.current].children.is_empty(),
            "end_branch called with unjoined child branches"
        );
        self.current = self.branches[self.current]
            .parent
            .expect("end_branch called on the main branch");
    }

    pub fn record_incident(&mut self, incident: Incident) {
        let bit = incident_bit(incident);
        let branch = &mut self.branches[self.current];
        ensure_len(&mut branch.certain, bit + 1);
        ensure_len(&mut branch.potential, bit + 1);
        branch.certain.insert(bit);
        branch.potential.insert(bit);
    }

    /// At a control-flow join where every child branch definitely executes
    /// (e.g. every arm of an exhaustive `if`/`else`): a fact becomes
    /// certain on the joined branch only if all children agreed it was
    /// certain; anything any child touched becomes potential.
    pub fn end_mutual_exclusive_branches(&mut self) {
        let children = std::mem::take(&mut self.branches[self.current].children);
        if children.is_empty() {
            return;
        }
        let mut certain_intersection = self.branches[children[0]].certain.clone();
        for &child in &children[1..] {
            certain_intersection = intersect(&certain_intersection, &self.branches[child].certain);
        }
        self.merge_potential(&children);
        let current = &mut self.branches[self.current];
        ensure_len(&mut current.certain, certain_intersection.len());
        current.certain.union_with(&certain_intersection);
    }

    /// At a join where not every branch necessarily executes (e.g. a
    /// single `if` with no `else`): nothing becomes certain, but anything
    /// any branch touched becomes potential.
    pub fn end_uncertain_branches(&mut self) {
        let children = std::mem::take(&mut self.branches[self.current].children);
        self.merge_potential(&children);
    }

    fn merge_potential(&mut self, children: &[usize]) {
        for &child in children {
            let child_potential = self.branches[child].potential.clone();
            let current = &mut self.branches[self.current];
            ensure_len(&mut current.potential, child_potential.len());
            current.potential.union_with(&child_potential);
        }
    }

    #[must_use]
    pub fn has_certainly(&self, incident: Incident) -> bool {
        self.branches[self.current].certain.contains(incident_bit(incident))
    }

    #[must_use]
    pub fn has_potentially(&self, incident: Incident) -> bool {
        self.branches[self.current].potential.contains(incident_bit(incident))
    }
}

impl Default for PathAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

fn intersect(a: &FixedBitSet, b: &FixedBitSet) -> FixedBitSet {
    let mut result = FixedBitSet::with_capacity(a.len().max(b.len()));
    for bit in a.ones() {
        if b.contains(bit) {
            result.insert(bit);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certain_in_every_branch_becomes_certain_after_join() {
        let mut pa = PathAnalyser::new();
        pa.begin_branch();
        pa.record_incident(Incident::Returned);
        pa.end_branch();
        pa.begin_branch();
        pa.record_incident(Incident::Returned);
        pa.end_branch();
        pa.end_mutual_exclusive_branches();
        assert!(pa.has_certainly(Incident::Returned));
    }

    #[test]
    fn certain_in_only_one_branch_stays_only_potential_after_join() {
        let mut pa = PathAnalyser::new();
        pa.begin_branch();
        pa.record_incident(Incident::Returned);
        pa.end_branch();
        pa.begin_branch();
        pa.end_branch();
        pa.end_mutual_exclusive_branches();
        assert!(!pa.has_certainly(Incident::Returned));
        assert!(pa.has_potentially(Incident::Returned));
    }

    #[test]
    fn uncertain_branches_never_produce_a_certain_fact() {
        let mut pa = PathAnalyser::new();
        pa.begin_branch();
        pa.record_incident(Incident::SelfUsed);
        pa.end_branch();
        pa.end_uncertain_branches();
        assert!(!pa.has_certainly(Incident::SelfUsed));
        assert!(pa.has_potentially(Incident::SelfUsed));
    }

    #[test]
    fn variable_initialized_incident_is_tracked_per_variable() {
        let mut pa = PathAnalyser::new();
        pa.record_incident(Incident::VariableInitialized(VariableId(0)));
        assert!(pa.has_certainly(Incident::VariableInitialized(VariableId(0))));
        assert!(!pa.has_certainly(Incident::VariableInitialized(VariableId(1))));
    }

    #[test]
    #[should_panic(expected = "unjoined child branches")]
    fn end_branch_panics_when_a_child_was_never_joined() {
        let mut pa = PathAnalyser::new();
        pa.begin_branch();
        pa.begin_branch();
        pa.end_branch();
        // The outer branch still has its (ended-but-unmerged) child, so
        // popping it back to main is rejected until a join call clears it.
        pa.end_branch();
    }
}
