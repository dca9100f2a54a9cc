/*!
One incremental LP problem per partition id.

A [PartitionModel] owns a single [LpEngine](crate::lp::LpEngine) instance and
everything registered against it: existential constraints (added directly
whenever their cid is true), universal ("forall") templates (checked by
worst-case minimization, never added as constraints themselves), and
objective terms (summed by weight class and solved lexicographically by
[PartitionModel::optimize]).

Every mutation ([PartitionModel::update]/[PartitionModel::remove]) clears the
`checked_exists`/`checked_forall` flags, so a caller never accidentally reads
a stale feasibility verdict after the LP problem has changed underneath it.
*/

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use crate::cache::{Cache, DescriptionKey};
use crate::lp::{ConstraintHandle, Direction, LpEngine, LpOutcome, VarHandle};
use crate::types::err::PartitionError;
use crate::types::{AffineExpr, Cid, Sense, Var};

/// One row staged for [PartitionModel::update].
#[derive(Clone, Debug)]
pub enum Update {
    /// An existential constraint: added to the LP problem outright.
    Exists { expr: AffineExpr, sense: Sense, bound: f64 },
    /// A universal template: never added as a constraint, only minimized
    /// against during [PartitionModel::check_forall].
    ForallTemplate { expr: AffineExpr, sense: Sense, bound: f64, strict: bool },
    /// One term of a (possibly lexicographic) objective.
    Objective { expr: AffineExpr, weight: i64 },
}

struct ConstraintRow {
    handle: ConstraintHandle,
    key: DescriptionKey,
    expr: Vec<(f64, VarHandle)>,
    sense: Sense,
    bound: f64,
}

struct ForallTemplate {
    /// Always normalized so the check is "minimize `expr`, must be >= bound".
    expr: AffineExpr,
    bound: f64,
    strict: bool,
    description_key: DescriptionKey,
}

struct ObjectiveTerm {
    expr: AffineExpr,
    weight: i64,
}

/// Outcome of [PartitionModel::optimize].
#[derive(Clone, Debug, PartialEq)]
pub enum OptimizeStatus {
    Optimal,
    Infeasible,
    Unbounded,
}

fn description_key(expr: &AffineExpr, sense: Sense, bound: f64) -> DescriptionKey {
    let mut terms: Vec<(u64, String)> = expr
        .iter()
        .map(|(coeff, var)| (coeff.to_bits(), var.0.clone()))
        .collect();
    terms.sort();
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    format!("{sense}").hash(&mut hasher);
    bound.to_bits().hash(&mut hasher);
    terms.hash(&mut hasher);
    hasher.finish()
}

/// Normalizes `<=` to `>=` by negating the expression and bound, so every
/// forall template is stored as "expr >= bound" (spec §4.2).
fn normalize_to_ge(expr: AffineExpr, sense: Sense, bound: f64) -> (AffineExpr, f64) {
    match sense {
        Sense::Ge => (expr, bound),
        Sense::Le => (
            expr.into_iter().map(|(c, v)| (-c, v)).collect(),
            -bound,
        ),
        Sense::Eq => (expr, bound),
    }
}

pub struct PartitionModel {
    engine: Box<dyn LpEngine + Send>,
    cache: std::sync::Arc<std::sync::Mutex<Cache>>,
    epsilon: f64,

    var_handles: HashMap<Var, VarHandle>,

    /// Active existential constraints, keyed by cid.
    constraints: HashMap<Cid, ConstraintRow>,
    forall_templates: HashMap<Cid, ForallTemplate>,
    objectives: HashMap<Cid, ObjectiveTerm>,

    /// Extra description keys introduced transiently during core extraction;
    /// always empty except mid-call (spec §3).
    description_complement: HashSet<DescriptionKey>,

    checked_exists: Option<bool>,
    checked_forall: Option<Vec<Cid>>,

    next_constraint_id: i64,

    solve_count: u64,
    solve_time: std::time::Duration,
}

impl PartitionModel {
    pub fn new(
        engine: Box<dyn LpEngine + Send>,
        cache: std::sync::Arc<std::sync::Mutex<Cache>>,
        epsilon: f64,
    ) -> Self {
        PartitionModel {
            engine,
            cache,
            epsilon,
            var_handles: HashMap::new(),
            constraints: HashMap::new(),
            forall_templates: HashMap::new(),
            objectives: HashMap::new(),
            description_complement: HashSet::new(),
            checked_exists: None,
            checked_forall: None,
            next_constraint_id: 1,
            solve_count: 0,
            solve_time: std::time::Duration::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty() && self.forall_templates.is_empty() && self.objectives.is_empty()
    }

    /// Number of LP engine solves issued by this partition so far (spec §6
    /// statistics surface: "LP solver calls ... per partition").
    pub fn solve_count(&self) -> u64 {
        self.solve_count
    }

    /// Cumulative wall time spent inside the LP engine's `solve` (spec §6).
    pub fn solve_time(&self) -> std::time::Duration {
        self.solve_time
    }

    fn timed_solve(&mut self) -> LpOutcome {
        let start = std::time::Instant::now();
        let outcome = self.engine.solve();
        self.solve_count += 1;
        self.solve_time += start.elapsed();
        outcome
    }

    fn var_handle(&mut self, var: &Var) -> VarHandle {
        if let Some(handle) = self.var_handles.get(var) {
            return *handle;
        }
        let handle = self.engine.new_var();
        self.var_handles.insert(var.clone(), handle);
        handle
    }

    fn lower_expr(&mut self, expr: &AffineExpr) -> Vec<(f64, VarHandle)> {
        expr.iter()
            .map(|(coeff, var)| (*coeff, self.var_handle(var)))
            .collect()
    }

    /// Applies a batch of [Update]s keyed by cid (spec §4.2 "update").
    pub fn update(&mut self, updates: Vec<(Cid, Update)>) {
        for (cid, update) in updates {
            match update {
                Update::Exists { expr, sense, bound } => {
                    let key = description_key(&expr, sense, bound);
                    let handle = self.lower_expr(&expr);
                    let constraint_id = ConstraintHandle(cid.0);
                    self.engine.add_constraint(constraint_id, &handle, sense, bound);
                    self.constraints.insert(
                        cid,
                        ConstraintRow {
                            handle: constraint_id,
                            key,
                            expr: handle,
                            sense,
                            bound,
                        },
                    );
                }
                Update::ForallTemplate { expr, sense, bound, strict } => {
                    let (norm_expr, norm_bound) = normalize_to_ge(expr, sense, bound);
                    let key = description_key(&norm_expr, Sense::Ge, norm_bound);
                    self.forall_templates.insert(
                        cid,
                        ForallTemplate {
                            expr: norm_expr,
                            bound: norm_bound,
                            strict,
                            description_key: key,
                        },
                    );
                }
                Update::Objective { expr, weight } => {
                    self.objectives.insert(cid, ObjectiveTerm { expr, weight });
                }
            }
        }
        self.checked_exists = None;
        self.checked_forall = None;
    }

    /// Retracts cids previously staged via [PartitionModel::update] (spec
    /// §4.2 "remove"). A cid present in none of `{constraints,
    /// forall_templates, objectives}` is a programming error (spec §7:
    /// "all other internal inconsistencies ... are programming errors and
    /// abort") — reported as [PartitionError::UnknownCid] rather than
    /// silently ignored.
    pub fn remove(&mut self, cids: &[Cid]) -> Result<(), PartitionError> {
        for cid in cids {
            let present = self.constraints.contains_key(cid)
                || self.forall_templates.contains_key(cid)
                || self.objectives.contains_key(cid);
            if !present {
                return Err(PartitionError::UnknownCid(*cid));
            }
            if let Some(row) = self.constraints.remove(cid) {
                self.engine.remove_constraint(row.handle);
            }
            self.forall_templates.remove(cid);
            self.objectives.remove(cid);
        }
        self.prune_unused_vars();
        self.checked_exists = None;
        self.checked_forall = None;
        Ok(())
    }

    /// Drops the handle bookkeeping of any [Var] no longer referenced by a
    /// live constraint, forall template, or objective term (spec §9, Open
    /// Question 3: this implementation always prunes).
    fn prune_unused_vars(&mut self) {
        self.var_handles.retain(|var, handle| {
            self.constraints
                .values()
                .any(|row| row.expr.iter().any(|(_, h)| h == handle))
                || self.objectives.values().any(|o| o.expr.iter().any(|(_, v)| v == var))
                || self.forall_templates.values().any(|t| t.expr.iter().any(|(_, v)| v == var))
        });
    }

    fn existential_configuration(&self) -> HashSet<DescriptionKey> {
        self.constraints.values().map(|row| row.key).collect()
    }

    pub fn checked_exists(&self) -> bool {
        self.checked_exists.is_some()
    }

    pub fn checked_forall(&self) -> bool {
        self.checked_forall.is_some()
    }

    /// SAT/UNSAT of the active existential constraints alone (spec §4.2).
    pub fn check_exists(&mut self) -> Result<bool, PartitionError> {
        if let Some(result) = self.checked_exists {
            return Ok(result);
        }
        let configuration = self.existential_configuration();
        {
            let mut cache = self.cache.lock().unwrap();
            match cache.check(&configuration, None) {
                crate::cache::CacheResult::Sat => {
                    self.checked_exists = Some(true);
                    return Ok(true);
                }
                crate::cache::CacheResult::Unsat => {
                    self.checked_exists = Some(false);
                    return Ok(false);
                }
                crate::cache::CacheResult::Unknown => {}
            }
        }
        self.engine.clear_objective();
        let sat = match self.timed_solve() {
            LpOutcome::Optimal(_) | LpOutcome::Unbounded => true,
            LpOutcome::Infeasible => false,
            LpOutcome::Undefined => return Err(PartitionError::LpUndefined),
        };
        self.cache.lock().unwrap().add(configuration, None, sat);
        self.checked_exists = Some(sat);
        Ok(sat)
    }

    /// Cids of universal templates currently violated by the active
    /// existential constraints (spec §4.2). Once any template's own solve
    /// discovers the existentials are infeasible, all remaining templates
    /// are vacuously satisfied and the loop stops early.
    pub fn check_forall(&mut self) -> Result<Vec<Cid>, PartitionError> {
        if let Some(violated) = &self.checked_forall {
            return Ok(violated.clone());
        }
        let mut violated = Vec::new();
        let configuration = self.existential_configuration();
        let mut cids: Vec<Cid> = self.forall_templates.keys().copied().collect();
        cids.sort();

        for cid in cids {
            let template_key = self.forall_templates[&cid].description_key;
            let cached = self.cache.lock().unwrap().check(&configuration, Some(template_key));
            match cached {
                crate::cache::CacheResult::Sat => continue,
                crate::cache::CacheResult::Unsat => {
                    violated.push(cid);
                    continue;
                }
                crate::cache::CacheResult::Unknown => {}
            }

            let (expr, bound, strict) = {
                let t = &self.forall_templates[&cid];
                (t.expr.clone(), t.bound, t.strict)
            };
            let handle = self.lower_expr(&expr);
            self.engine.set_objective(&handle, Direction::Minimize);
            let outcome = self.timed_solve();
            self.engine.clear_objective();

            let eps = if strict { self.epsilon.max(1e-9) } else { self.epsilon };
            match outcome {
                LpOutcome::Infeasible => {
                    // The existentials themselves are infeasible: every
                    // universal in this partition is vacuously satisfied.
                    self.cache.lock().unwrap().add(configuration.clone(), Some(template_key), true);
                    break;
                }
                LpOutcome::Unbounded => {
                    self.cache.lock().unwrap().add(configuration.clone(), Some(template_key), false);
                    violated.push(cid);
                }
                LpOutcome::Optimal(value) => {
                    let ok = value >= bound - eps;
                    self.cache
                        .lock()
                        .unwrap()
                        .add(configuration.clone(), Some(template_key), ok);
                    if !ok {
                        violated.push(cid);
                    }
                }
                LpOutcome::Undefined => return Err(PartitionError::LpUndefined),
            }
        }

        self.checked_forall = Some(violated.clone());
        Ok(violated)
    }

    /// Lexicographic weighted optimization (spec §4.2 "optimize"): solves
    /// each weight class lowest-first, freezing its optimum as an equality
    /// constraint before moving to the next.
    pub fn optimize(&mut self) -> Result<(OptimizeStatus, HashMap<Var, f64>), PartitionError> {
        let mut weights: Vec<i64> = self
            .objectives
            .values()
            .map(|o| o.weight)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        weights.sort();

        let mut frozen: Vec<ConstraintHandle> = Vec::new();
        let mut last_assignment: HashMap<Var, f64> = HashMap::new();
        let mut status = OptimizeStatus::Optimal;

        for weight in weights {
            let mut summed: HashMap<Var, f64> = HashMap::new();
            for o in self.objectives.values().filter(|o| o.weight == weight) {
                for (coeff, var) in &o.expr {
                    *summed.entry(var.clone()).or_insert(0.0) += coeff;
                }
            }
            let expr: AffineExpr = summed.into_iter().map(|(v, c)| (c, v)).collect();
            let handle = self.lower_expr(&expr);
            self.engine.set_objective(&handle, Direction::Minimize);
            let outcome = self.timed_solve();
            self.engine.clear_objective();

            match outcome {
                LpOutcome::Infeasible => {
                    status = OptimizeStatus::Infeasible;
                    break;
                }
                LpOutcome::Unbounded => {
                    status = OptimizeStatus::Unbounded;
                    break;
                }
                LpOutcome::Optimal(value) => {
                    last_assignment = self
                        .var_handles
                        .iter()
                        .filter_map(|(v, h)| self.engine.primal(*h).map(|p| (v.clone(), p)))
                        .collect();
                    let frozen_handle = ConstraintHandle(-(1000 + self.next_constraint_id));
                    self.next_constraint_id += 1;
                    self.engine.add_constraint(frozen_handle, &handle, Sense::Eq, value);
                    frozen.push(frozen_handle);
                }
                LpOutcome::Undefined => {
                    for h in frozen {
                        self.engine.remove_constraint(h);
                    }
                    return Err(PartitionError::LpUndefined);
                }
            }
        }

        for h in frozen {
            self.engine.remove_constraint(h);
        }

        Ok((status, last_assignment))
    }

    /// Minimal unsat core of the active existential constraints via
    /// deletion filter (spec §4.2). With `lazy`, skips the filter and
    /// returns every active existential cid.
    pub fn core_unsat_exists(&mut self, lazy: bool) -> Result<Vec<Cid>, PartitionError> {
        if lazy {
            return Ok(self.constraints.keys().copied().collect());
        }

        let mut cids: Vec<Cid> = self.constraints.keys().copied().collect();
        cids.sort();

        let mut dropped: Vec<Cid> = Vec::new();
        let mut essential: Vec<Cid> = Vec::new();

        for cid in cids {
            let handle = self.constraints[&cid].handle;
            self.engine.remove_constraint(handle);
            self.engine.clear_objective();
            let still_infeasible = matches!(self.timed_solve(), LpOutcome::Infeasible);

            if still_infeasible {
                // Not needed for the conflict; leave it out for now.
                dropped.push(cid);
            } else {
                // Removing it restored feasibility: it's part of the core.
                let row = &self.constraints[&cid];
                self.engine.add_constraint(row.handle, &row.expr, row.sense, row.bound);
                essential.push(cid);
            }
        }

        for cid in dropped {
            let row = &self.constraints[&cid];
            self.engine.add_constraint(row.handle, &row.expr, row.sense, row.bound);
        }

        Ok(essential)
    }

    /// Optimum core for a violated universal `conflict_cid` (spec §4.2 /
    /// §4.3). `candidate_groups` holds, for each not-yet-propagated atom
    /// that might fix the violation, the alternative groundings worth
    /// trying — already expanded by the caller (the grounded-constraint
    /// cache lives with the atom registry/dispatcher, not here). With
    /// `lazy`, skips the trial-and-error search and returns every candidate
    /// cid across every group.
    pub fn core_unsat_forall(
        &mut self,
        conflict_cid: Cid,
        candidate_groups: &[Vec<(Cid, AffineExpr, Sense, f64)>],
        lazy: bool,
    ) -> Result<Vec<Cid>, PartitionError> {
        if lazy {
            return Ok(candidate_groups
                .iter()
                .flatten()
                .map(|(cid, _, _, _)| *cid)
                .collect());
        }

        let (expr, bound) = match self.forall_templates.get(&conflict_cid) {
            Some(t) => (t.expr.clone(), t.bound),
            None => return Ok(Vec::new()),
        };

        let mut essential: Vec<Cid> = Vec::new();
        let mut staged: Vec<ConstraintHandle> = Vec::new();
        let mut next_probe_id: i64 = -2_000_000;

        'groups: for group in candidate_groups {
            for (candidate_cid, candidate_expr, sense, candidate_bound) in group {
                let probe_handle = ConstraintHandle(next_probe_id);
                next_probe_id -= 1;
                let probe_key = description_key(candidate_expr, *sense, *candidate_bound);
                let lowered = self.lower_expr(candidate_expr);
                self.engine.add_constraint(probe_handle, &lowered, *sense, *candidate_bound);

                let objective_handle = self.lower_expr(&expr);
                self.engine.set_objective(&objective_handle, Direction::Minimize);
                let outcome = self.timed_solve();
                self.engine.clear_objective();

                let meaningful = matches!(outcome, LpOutcome::Infeasible)
                    || matches!(outcome, LpOutcome::Optimal(v) if v >= bound - self.epsilon);

                if meaningful {
                    essential.push(*candidate_cid);
                    self.engine.remove_constraint(probe_handle);
                    continue 'groups;
                } else {
                    // Didn't help: left in place until the group pass is
                    // done, per spec, its description key stashed here.
                    self.description_complement.insert(probe_key);
                    staged.push(probe_handle);
                }
            }
        }

        for h in staged {
            self.engine.remove_constraint(h);
        }
        self.description_complement.clear();

        Ok(essential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LpSolverChoice;
    use crate::lp::good_lp_engine::GoodLpEngine;

    fn partition() -> PartitionModel {
        let engine = Box::new(GoodLpEngine::new(LpSolverChoice::Microlp));
        let cache = std::sync::Arc::new(std::sync::Mutex::new(Cache::new(None)));
        PartitionModel::new(engine, cache, crate::types::DEFAULT_EPSILON)
    }

    #[test]
    fn feasible_domain_and_sum_check_sat() {
        let mut p = partition();
        let x = Var::from("x");
        p.update(vec![
            (Cid(1), Update::Exists { expr: vec![(1.0, x.clone())], sense: Sense::Ge, bound: 0.0 }),
            (Cid(-1), Update::Exists { expr: vec![(1.0, x.clone())], sense: Sense::Le, bound: 10.0 }),
            (Cid(2), Update::Exists { expr: vec![(1.0, x)], sense: Sense::Ge, bound: 5.0 }),
        ]);
        assert!(p.check_exists().unwrap());
    }

    #[test]
    fn infeasible_pair_reports_both_cids_as_core() {
        let mut p = partition();
        let x = Var::from("x");
        p.update(vec![
            (Cid(10), Update::Exists { expr: vec![(1.0, x.clone())], sense: Sense::Le, bound: 3.0 }),
            (Cid(20), Update::Exists { expr: vec![(1.0, x)], sense: Sense::Ge, bound: 5.0 }),
        ]);
        assert!(!p.check_exists().unwrap());
        let mut core = p.core_unsat_exists(false).unwrap();
        core.sort();
        assert_eq!(core, vec![Cid(10), Cid(20)]);
    }

    #[test]
    fn forall_violation_detected_against_existentials() {
        let mut p = partition();
        let x = Var::from("x");
        p.update(vec![
            (Cid(1), Update::Exists { expr: vec![(1.0, x.clone())], sense: Sense::Ge, bound: 0.0 }),
            (Cid(-1), Update::Exists { expr: vec![(1.0, x.clone())], sense: Sense::Le, bound: 10.0 }),
            // forall: x >= 20 must hold for every feasible x -- it doesn't.
            (Cid(2), Update::ForallTemplate { expr: vec![(1.0, x)], sense: Sense::Ge, bound: 20.0, strict: false }),
        ]);
        let violated = p.check_forall().unwrap();
        assert_eq!(violated, vec![Cid(2)]);
    }

    #[test]
    fn lazy_core_returns_every_active_cid_without_solving() {
        let mut p = partition();
        let x = Var::from("x");
        p.update(vec![
            (Cid(1), Update::Exists { expr: vec![(1.0, x.clone())], sense: Sense::Le, bound: 3.0 }),
            (Cid(2), Update::Exists { expr: vec![(1.0, x)], sense: Sense::Ge, bound: 5.0 }),
        ]);
        let mut core = p.core_unsat_exists(true).unwrap();
        core.sort();
        assert_eq!(core, vec![Cid(1), Cid(2)]);
    }
}
