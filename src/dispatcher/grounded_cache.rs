/*!
Memoizes, per cid, the grounded-constraint variants tried during
`core_unsat_forall` (spec §4.3): every non-empty subset of a cid's
condition-id set yields one possible grounding of that atom's expression,
since which conditions will eventually be true is exactly what is not yet
known while the atom remains unpropagated.

The enumeration is exponential in the number of conditions, which is fine
at the condition-set sizes a grounded ASP program actually produces for a
single theory atom (a handful of guard literals, not hundreds); this is
recorded as a known scaling limit in DESIGN.md rather than engineered away.
*/

use std::collections::HashMap;

use crate::registry::Atom;
use crate::types::{AffineExpr, Cid, CondId};

pub struct GroundedConstraintCache {
    memo: HashMap<Cid, Vec<(Vec<CondId>, AffineExpr)>>,
}

impl GroundedConstraintCache {
    pub fn new() -> Self {
        GroundedConstraintCache { memo: HashMap::new() }
    }

    /// Returns (memoizing on first call) every `(subset, grounded expr)`
    /// pair for `atom`'s non-empty subsets of condition ids, each combined
    /// with the atom's always-true terms.
    pub fn variants(&mut self, atom: &Atom) -> &[(Vec<CondId>, AffineExpr)] {
        self.memo.entry(atom.cid).or_insert_with(|| enumerate_variants(atom))
    }
}

fn enumerate_variants(atom: &Atom) -> Vec<(Vec<CondId>, AffineExpr)> {
    let conditions = atom.condition_ids();
    let mut variants = Vec::new();
    let always_true = atom.expr_by_condition.get(&CondId::TRUE).cloned().unwrap_or_default();

    if conditions.is_empty() {
        if !always_true.is_empty() {
            variants.push((Vec::new(), always_true));
        }
        return variants;
    }

    let n = conditions.len();
    // Every non-empty subset of `conditions`, as a bitmask over `n` bits.
    for mask in 1..(1u32 << n) {
        let mut subset = Vec::new();
        let mut expr = always_true.clone();
        for (i, cond) in conditions.iter().enumerate() {
            if mask & (1 << i) != 0 {
                subset.push(*cond);
                if let Some(terms) = atom.expr_by_condition.get(cond) {
                    expr.extend(terms.iter().cloned());
                }
            }
        }
        variants.push((subset, expr));
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AtomKind;
    use crate::types::{Pid, Sense, Sid};
    use std::collections::HashMap as Map;

    fn atom_with_conditions(conds: &[i32]) -> Atom {
        let mut expr_by_condition = Map::new();
        expr_by_condition.insert(CondId::TRUE, vec![(1.0, "x".into())]);
        for c in conds {
            expr_by_condition.insert(CondId(*c), vec![(1.0, "y".into())]);
        }
        Atom {
            cid: Cid(1),
            sid: Sid(1),
            pid: Pid::default_pid(),
            kind: AtomKind::Exists,
            expr_by_condition,
            sense: Sense::Ge,
            bound: 0.0,
            strict: false,
            objective_weight: None,
        }
    }

    #[test]
    fn enumerates_all_non_empty_subsets() {
        let atom = atom_with_conditions(&[5, 6]);
        let mut cache = GroundedConstraintCache::new();
        let variants = cache.variants(&atom);
        assert_eq!(variants.len(), 3); // {5}, {6}, {5,6}
    }

    #[test]
    fn no_conditions_yields_single_always_true_variant() {
        let atom = atom_with_conditions(&[]);
        let mut cache = GroundedConstraintCache::new();
        let variants = cache.variants(&atom);
        assert_eq!(variants.len(), 1);
        assert!(variants[0].0.is_empty());
    }
}
