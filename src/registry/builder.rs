/*!
Builds [Atom](super::Atom) rows from a raw theory-atom shape, applying the
one-or-two-row grounding rules of spec §4.3.
*/

use std::collections::HashMap;

use super::{Atom, AtomKind, AtomRegistry};
use crate::types::{err::RegistryError, AffineExpr, Cid, CondId, Pid, Sense, Sid, Var};

/// The guard operator on an `&assert` atom (a strict superset of [Sense]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssertOp {
    Le,
    Ge,
    Eq,
    Lt,
    Gt,
}

/// Accumulates atoms into an [AtomRegistry].
pub struct Builder<'r> {
    registry: &'r mut AtomRegistry,
}

impl<'r> Builder<'r> {
    pub fn new(registry: &'r mut AtomRegistry) -> Self {
        Builder { registry }
    }

    /// `&dom(pid){L..U} = v`. One row if `L == U`, else a paired `(cid, -cid)`
    /// with `cid: v >= L` and `-cid: v <= U`.
    pub fn dom(
        &mut self,
        cid: Cid,
        sid: Sid,
        pid: Pid,
        var: Var,
        lower: f64,
        upper: f64,
    ) -> Result<Vec<Cid>, RegistryError> {
        let expr: AffineExpr = vec![(1.0, var)];
        let mut expr_by_condition = HashMap::new();
        expr_by_condition.insert(CondId::TRUE, expr);

        if (lower - upper).abs() < f64::EPSILON {
            let atom = Atom {
                cid,
                sid,
                pid,
                kind: AtomKind::Exists,
                expr_by_condition,
                sense: Sense::Eq,
                bound: lower,
                strict: false,
                objective_weight: None,
            };
            self.registry.insert(atom)?;
            return Ok(vec![cid]);
        }

        let lower_atom = Atom {
            cid,
            sid,
            pid: pid.clone(),
            kind: AtomKind::Exists,
            expr_by_condition: expr_by_condition.clone(),
            sense: Sense::Ge,
            bound: lower,
            strict: false,
            objective_weight: None,
        };
        let upper_atom = Atom {
            cid: cid.paired(),
            sid,
            pid,
            kind: AtomKind::Exists,
            expr_by_condition,
            sense: Sense::Le,
            bound: upper,
            strict: false,
            objective_weight: None,
        };
        self.registry.insert(lower_atom)?;
        self.registry.insert(upper_atom)?;
        Ok(vec![cid, cid.paired()])
    }

    /// `&sum(pid){…} op b`. One existential row.
    pub fn sum(
        &mut self,
        cid: Cid,
        sid: Sid,
        pid: Pid,
        sense: Sense,
        bound: f64,
        expr_by_condition: HashMap<CondId, AffineExpr>,
    ) -> Result<Vec<Cid>, RegistryError> {
        let atom = Atom {
            cid,
            sid,
            pid,
            kind: AtomKind::Exists,
            expr_by_condition,
            sense,
            bound,
            strict: false,
            objective_weight: None,
        };
        self.registry.insert(atom)?;
        Ok(vec![cid])
    }

    /// `&minimize(pid)…@w` / `&maximize(pid)…@w`. One objective row; the
    /// expression is negated when `maximize` so that the rest of the
    /// implementation only ever has to minimize (spec §4.3).
    pub fn objective(
        &mut self,
        cid: Cid,
        sid: Sid,
        pid: Pid,
        maximize: bool,
        weight: i64,
        mut expr_by_condition: HashMap<CondId, AffineExpr>,
    ) -> Result<Vec<Cid>, RegistryError> {
        if maximize {
            for terms in expr_by_condition.values_mut() {
                for (coeff, _) in terms.iter_mut() {
                    *coeff = -*coeff;
                }
            }
        }
        let atom = Atom {
            cid,
            sid,
            pid,
            kind: AtomKind::Objective,
            expr_by_condition,
            sense: Sense::Eq, // unused for Objective rows
            bound: 0.0,
            strict: false,
            objective_weight: Some(weight),
        };
        self.registry.insert(atom)?;
        Ok(vec![cid])
    }

    /// `&assert(pid){…} op b`. One forall row for `<=, >=, <, >`; `=` expands
    /// into two forall rows (paired `cid`/`-cid`).
    pub fn assert(
        &mut self,
        cid: Cid,
        sid: Sid,
        pid: Pid,
        op: AssertOp,
        bound: f64,
        expr_by_condition: HashMap<CondId, AffineExpr>,
    ) -> Result<Vec<Cid>, RegistryError> {
        let row = |cid: Cid, pid: Pid, sense: Sense, bound: f64, strict: bool, expr: HashMap<CondId, AffineExpr>| Atom {
            cid,
            sid,
            pid,
            kind: AtomKind::Forall,
            expr_by_condition: expr,
            sense,
            bound,
            strict,
            objective_weight: None,
        };

        match op {
            AssertOp::Le => {
                self.registry
                    .insert(row(cid, pid, Sense::Le, bound, false, expr_by_condition))?;
                Ok(vec![cid])
            }
            AssertOp::Ge => {
                self.registry
                    .insert(row(cid, pid, Sense::Ge, bound, false, expr_by_condition))?;
                Ok(vec![cid])
            }
            AssertOp::Lt => {
                self.registry
                    .insert(row(cid, pid, Sense::Le, bound, true, expr_by_condition))?;
                Ok(vec![cid])
            }
            AssertOp::Gt => {
                self.registry
                    .insert(row(cid, pid, Sense::Ge, bound, true, expr_by_condition))?;
                Ok(vec![cid])
            }
            AssertOp::Eq => {
                let ge_atom = row(
                    cid,
                    pid.clone(),
                    Sense::Ge,
                    bound,
                    false,
                    expr_by_condition.clone(),
                );
                let le_atom = row(cid.paired(), pid, Sense::Le, bound, false, expr_by_condition);
                self.registry.insert(ge_atom)?;
                self.registry.insert(le_atom)?;
                Ok(vec![cid, cid.paired()])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_domain_registers_single_row() {
        let mut registry = AtomRegistry::new();
        let mut builder = Builder::new(&mut registry);
        let cids = builder
            .dom(Cid(1), Sid(1), Pid::default_pid(), "x".into(), 3.0, 3.0)
            .unwrap();
        assert_eq!(cids, vec![Cid(1)]);
        assert_eq!(registry.get(Cid(1)).unwrap().sense, Sense::Eq);
    }

    #[test]
    fn ranged_domain_registers_paired_rows() {
        let mut registry = AtomRegistry::new();
        let mut builder = Builder::new(&mut registry);
        let cids = builder
            .dom(Cid(1), Sid(1), Pid::default_pid(), "x".into(), 0.0, 10.0)
            .unwrap();
        assert_eq!(cids, vec![Cid(1), Cid(-1)]);
        assert_eq!(registry.get(Cid(1)).unwrap().sense, Sense::Ge);
        assert_eq!(registry.get(Cid(-1)).unwrap().sense, Sense::Le);
    }

    #[test]
    fn maximize_objective_negates_expression() {
        let mut registry = AtomRegistry::new();
        let mut builder = Builder::new(&mut registry);
        let mut expr = HashMap::new();
        expr.insert(CondId::TRUE, vec![(1.0, "x".into())]);
        builder
            .objective(Cid(1), Sid(1), Pid::default_pid(), true, 0, expr)
            .unwrap();
        let atom = registry.get(Cid(1)).unwrap();
        assert_eq!(atom.expr_by_condition[&CondId::TRUE][0].0, -1.0);
    }

    #[test]
    fn assert_equality_expands_to_two_rows() {
        let mut registry = AtomRegistry::new();
        let mut builder = Builder::new(&mut registry);
        let mut expr = HashMap::new();
        expr.insert(CondId::TRUE, vec![(1.0, "x".into())]);
        let cids = builder
            .assert(Cid(7), Sid(7), Pid::default_pid(), AssertOp::Eq, 4.0, expr)
            .unwrap();
        assert_eq!(cids, vec![Cid(7), Cid(-7)]);
        assert_eq!(registry.get(Cid(7)).unwrap().sense, Sense::Ge);
        assert_eq!(registry.get(Cid(-7)).unwrap().sense, Sense::Le);
    }
}
