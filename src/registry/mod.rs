/*!
Parses each theory atom once into an immutable [Atom] row and assigns it a
stable constraint id.

An atom is registered exactly once, at init, and never mutated afterwards
(spec §3, "Lifecycle: Atoms: created at init, immutable thereafter"). What
*does* vary over the course of a search is which of an atom's conditions are
currently true — [grounded_expr] concatenates the term lists of an atom's
currently-true conditions into the flat expression that should, right now,
be added to (or checked against) its partition's LP problem.

Building atoms from a raw theory-atom shape (one or two rows per the rules
in spec §4.3) is handled by [builder::Builder], kept separate from
[AtomRegistry] itself so the registry stays a plain lookup table.
*/

pub mod builder;

use std::collections::HashMap;

use crate::types::{err::RegistryError, AffineExpr, Cid, CondId, Pid, Sense, Sid};

/// The three kinds of registered atom (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtomKind {
    /// "There must exist an assignment satisfying …"; added directly to the
    /// partition's LP problem whenever true.
    Exists,
    /// "For all feasible assignments to the existentials, …"; checked by
    /// worst-case optimization.
    Forall,
    /// A term of a (possibly lexicographic) objective.
    Objective,
}

/// One parsed, immutable constraint row.
#[derive(Clone, Debug)]
pub struct Atom {
    pub cid: Cid,
    pub sid: Sid,
    pub pid: Pid,
    pub kind: AtomKind,
    /// Condition id -> the term list contributed when that condition holds.
    /// [CondId::TRUE] is always contributed, regardless of the current
    /// assignment.
    pub expr_by_condition: HashMap<CondId, AffineExpr>,
    pub sense: Sense,
    pub bound: f64,
    /// Set for `Forall` atoms built from a strict `<`/`>` guard; widens the
    /// effective tolerance slightly so a boundary touch still counts as a
    /// violation (see DESIGN.md).
    pub strict: bool,
    /// Set only for `Objective` atoms: lower is optimized first.
    pub objective_weight: Option<i64>,
}

impl Atom {
    /// All condition ids this atom's expression depends on, excluding the
    /// always-true sentinel.
    pub fn condition_ids(&self) -> Vec<CondId> {
        self.expr_by_condition
            .keys()
            .copied()
            .filter(|c| *c != CondId::TRUE)
            .collect()
    }
}

/// Concatenates the term lists of `atom`'s currently-true conditions
/// (spec §4.3, "Grounding of a cid under a set of currently-true condition
/// ids").
pub fn grounded_expr(atom: &Atom, true_conditions: &std::collections::HashSet<CondId>) -> AffineExpr {
    let mut expr = AffineExpr::new();
    for (cond, terms) in &atom.expr_by_condition {
        if *cond == CondId::TRUE || true_conditions.contains(cond) {
            expr.extend(terms.iter().cloned());
        }
    }
    expr
}

/// The immutable table of all registered atoms, keyed by cid.
#[derive(Default)]
pub struct AtomRegistry {
    atoms: HashMap<Cid, Atom>,
}

impl AtomRegistry {
    pub fn new() -> Self {
        AtomRegistry {
            atoms: HashMap::new(),
        }
    }

    pub fn insert(&mut self, atom: Atom) -> Result<(), RegistryError> {
        if self.atoms.contains_key(&atom.cid) {
            return Err(RegistryError::DuplicateCid(atom.cid));
        }
        self.atoms.insert(atom.cid, atom);
        Ok(())
    }

    pub fn get(&self, cid: Cid) -> Option<&Atom> {
        self.atoms.get(&cid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.values()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(cid: i64, conds: &[(i32, &[(f64, &str)])]) -> Atom {
        let mut expr_by_condition = HashMap::new();
        for (cond, terms) in conds {
            expr_by_condition.insert(
                CondId(*cond),
                terms.iter().map(|(c, v)| (*c, (*v).into())).collect(),
            );
        }
        Atom {
            cid: Cid(cid),
            sid: Sid(cid as i32),
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
    fn grounding_concatenates_true_conditions_and_always_includes_true_sentinel() {
        let a = atom(
            1,
            &[
                (0, &[(1.0, "x")]),
                (5, &[(2.0, "y")]),
                (6, &[(3.0, "z")]),
            ],
        );
        let mut true_conditions = std::collections::HashSet::new();
        true_conditions.insert(CondId(5));
        let expr = grounded_expr(&a, &true_conditions);
        assert_eq!(expr.len(), 2);
        assert!(expr.contains(&(1.0, "x".into())));
        assert!(expr.contains(&(2.0, "y".into())));
        assert!(!expr.iter().any(|(_, v)| v.0 == "z"));
    }

    #[test]
    fn duplicate_cid_registration_is_rejected() {
        let mut registry = AtomRegistry::new();
        registry.insert(atom(1, &[])).unwrap();
        let err = registry.insert(atom(1, &[])).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateCid(Cid(1)));
    }
}
