/*!
A narrow interface over an underlying LP engine.

[LpEngine] is deliberately small — new variable, set bounds, add/remove
constraint, set/clear objective, solve, read a primal value — so that
[partition::PartitionModel](crate::partition::PartitionModel) never needs to
know which concrete backend it is driving. Handles ([VarHandle],
[ConstraintHandle]) are opaque tokens; only the engine that issued them may
be asked to resolve them.

The one engine provided here, [good_lp_engine::GoodLpEngine], adapts the
`good_lp` crate. `good_lp` builds and solves one problem at a time rather
than mutating a live model in place, so the adapter keeps its own
authoritative record of live variables/bounds/constraints/objective and
reconstructs a fresh `good_lp` problem on every [LpEngine::solve] call. This
is invisible to callers: from the trait's point of view the engine is just
as "incremental" as one that mutated a native handle, because incremental
bookkeeping of *which* constraints are live is the caller's job, not the
engine's (spec §9: "Keep LP handles opaque").
*/

pub mod good_lp_engine;

use crate::types::Sense;

/// An opaque handle to a variable created by an [LpEngine].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarHandle(pub usize);

/// An opaque handle naming one constraint or objective registered with an
/// [LpEngine]. Chosen and owned by the caller (typically a [Cid](crate::types::Cid)
/// or a small negative sentinel for a frozen-equality constraint introduced
/// during lexicographic optimization).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstraintHandle(pub i64);

/// Optimization direction for an objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

/// The outcome of an [LpEngine::solve] call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LpOutcome {
    /// A feasible optimum was found (or, with no objective set, the problem
    /// is simply feasible and the value is `0.0`).
    Optimal(f64),
    Infeasible,
    Unbounded,
    /// The backend reported a status this adapter does not recognise.
    /// Per spec §7 this is a fatal implementation error, never handled
    /// numerically — callers should abort rather than branch on it.
    Undefined,
}

/// The capability set a [PartitionModel](crate::partition::PartitionModel)
/// needs of an LP backend.
pub trait LpEngine {
    /// Allocates a fresh variable with unbounded domain.
    fn new_var(&mut self) -> VarHandle;

    /// Sets (or clears, with `None`) the lower/upper bound of a variable.
    fn set_bounds(&mut self, var: VarHandle, lower: Option<f64>, upper: Option<f64>);

    /// Adds (or replaces, if `id` is already live) an existential constraint.
    fn add_constraint(
        &mut self,
        id: ConstraintHandle,
        expr: &[(f64, VarHandle)],
        sense: Sense,
        bound: f64,
    );

    /// Removes a previously-added constraint. A no-op if `id` is not live.
    fn remove_constraint(&mut self, id: ConstraintHandle);

    /// Sets the objective to optimize on the next [LpEngine::solve] call.
    fn set_objective(&mut self, expr: &[(f64, VarHandle)], direction: Direction);

    /// Clears any objective (the next solve is a feasibility check only).
    fn clear_objective(&mut self);

    /// Solves the problem as currently built from live variables,
    /// constraints, and objective.
    fn solve(&mut self) -> LpOutcome;

    /// Reads the primal value of a variable from the last successful solve.
    fn primal(&self, var: VarHandle) -> Option<f64>;

    /// Drops a variable with no remaining referencing constraint, bound, or
    /// objective term (spec §9, Open Question 3: this adapter always prunes).
    fn prune_unused(&mut self, var: VarHandle);
}
