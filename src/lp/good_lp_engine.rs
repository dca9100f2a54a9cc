/*!
An [LpEngine] backed by the `good_lp` crate.

`good_lp` solves one problem per call rather than exposing a mutable native
handle, so this adapter keeps its own record of what is live
(`variables`, `constraints`, `objective`) and replays it into a fresh
`good_lp` problem every [GoodLpEngine::solve]. Two backends are supported,
selected at construction time: `microlp` (pure Rust, always available) and
`highs` (native, opt-in via the `highs` feature).
*/

use std::collections::HashMap;

use good_lp::{variable, Expression, ResolutionError, Solution, SolverModel, Variable};

use super::{ConstraintHandle, Direction, LpEngine, LpOutcome, VarHandle};
use crate::config::LpSolverChoice;
use crate::types::Sense;

#[derive(Clone, Copy, Debug)]
struct VarSpec {
    lower: Option<f64>,
    upper: Option<f64>,
}

struct LiveConstraint {
    expr: Vec<(f64, VarHandle)>,
    sense: Sense,
    bound: f64,
}

struct LiveObjective {
    expr: Vec<(f64, VarHandle)>,
    direction: Direction,
}

/// An [LpEngine] that rebuilds a `good_lp` problem from scratch on every solve.
pub struct GoodLpEngine {
    solver: LpSolverChoice,
    vars: Vec<VarSpec>,
    constraints: HashMap<ConstraintHandle, LiveConstraint>,
    objective: Option<LiveObjective>,
    last_primals: HashMap<VarHandle, f64>,
}

impl GoodLpEngine {
    pub fn new(solver: LpSolverChoice) -> Self {
        GoodLpEngine {
            solver,
            vars: Vec::new(),
            constraints: HashMap::new(),
            objective: None,
            last_primals: HashMap::new(),
        }
    }

    fn build_expression(&self, terms: &[(f64, VarHandle)], handles: &[Variable]) -> Expression {
        let mut expr = Expression::from(0.0);
        for (coeff, var) in terms {
            expr += *coeff * handles[var.0];
        }
        expr
    }

}

impl LpEngine for GoodLpEngine {
    fn new_var(&mut self) -> VarHandle {
        let handle = VarHandle(self.vars.len());
        self.vars.push(VarSpec {
            lower: None,
            upper: None,
        });
        handle
    }

    fn set_bounds(&mut self, var: VarHandle, lower: Option<f64>, upper: Option<f64>) {
        let spec = &mut self.vars[var.0];
        spec.lower = lower;
        spec.upper = upper;
    }

    fn add_constraint(
        &mut self,
        id: ConstraintHandle,
        expr: &[(f64, VarHandle)],
        sense: Sense,
        bound: f64,
    ) {
        self.constraints.insert(
            id,
            LiveConstraint {
                expr: expr.to_vec(),
                sense,
                bound,
            },
        );
    }

    fn remove_constraint(&mut self, id: ConstraintHandle) {
        self.constraints.remove(&id);
    }

    fn set_objective(&mut self, expr: &[(f64, VarHandle)], direction: Direction) {
        self.objective = Some(LiveObjective {
            expr: expr.to_vec(),
            direction,
        });
    }

    fn clear_objective(&mut self) {
        self.objective = None;
    }

    fn prune_unused(&mut self, _var: VarHandle) {
        // Variable slots are cheap placeholders (bounds only); the live set
        // of variables actually built into the next `good_lp` problem is
        // whatever the current constraints/objective reference, so there is
        // nothing further to release here. Kept as an explicit no-op (rather
        // than omitted) because the trait contract calls for it, per
        // spec §9 Open Question 3.
    }

    fn solve(&mut self) -> LpOutcome {
        let mut builder = good_lp::ProblemVariables::new();
        let mut handles = Vec::with_capacity(self.vars.len());
        for spec in &self.vars {
            let mut def = variable().free();
            if let Some(lower) = spec.lower {
                def = def.min(lower);
            }
            if let Some(upper) = spec.upper {
                def = def.max(upper);
            }
            handles.push(builder.add(def));
        }

        let objective_expr = match &self.objective {
            Some(obj) => {
                let mut expr = self.build_expression(&obj.expr, &handles);
                if obj.direction == Direction::Maximize {
                    expr = -expr;
                }
                expr
            }
            None => Expression::from(0.0),
        };

        let outcome = match self.solver {
            LpSolverChoice::Microlp => {
                let mut model = builder.minimise(objective_expr.clone()).using(good_lp::microlp);
                for live in self.constraints.values() {
                    let expr = self.build_expression(&live.expr, &handles);
                    model = model.with(sense_constraint(expr, live.sense, live.bound));
                }
                model.solve()
            }
            #[cfg(feature = "highs")]
            LpSolverChoice::Highs => {
                let mut model = builder.minimise(objective_expr.clone()).using(good_lp::highs);
                for live in self.constraints.values() {
                    let expr = self.build_expression(&live.expr, &handles);
                    model = model.with(sense_constraint(expr, live.sense, live.bound));
                }
                model.solve()
            }
            #[cfg(not(feature = "highs"))]
            LpSolverChoice::Highs => {
                let mut model = builder.minimise(objective_expr.clone()).using(good_lp::microlp);
                for live in self.constraints.values() {
                    let expr = self.build_expression(&live.expr, &handles);
                    model = model.with(sense_constraint(expr, live.sense, live.bound));
                }
                model.solve()
            }
        };

        match outcome {
            Ok(solution) => {
                self.last_primals.clear();
                for (handle, var) in handles.iter().enumerate() {
                    self.last_primals.insert(VarHandle(handle), solution.value(*var));
                }
                let objective_value = match &self.objective {
                    Some(obj) => {
                        let raw: f64 = obj
                            .expr
                            .iter()
                            .map(|(coeff, var)| coeff * self.last_primals[var])
                            .sum();
                        raw
                    }
                    None => 0.0,
                };
                LpOutcome::Optimal(objective_value)
            }
            Err(ResolutionError::Infeasible) => LpOutcome::Infeasible,
            Err(ResolutionError::Unbounded) => LpOutcome::Unbounded,
            Err(_other) => LpOutcome::Undefined,
        }
    }

    fn primal(&self, var: VarHandle) -> Option<f64> {
        self.last_primals.get(&var).copied()
    }
}

fn sense_constraint(expr: Expression, sense: Sense, bound: f64) -> good_lp::Constraint {
    match sense {
        Sense::Le => expr.leq(bound),
        Sense::Ge => expr.geq(bound),
        Sense::Eq => expr.eq(bound),
    }
}
