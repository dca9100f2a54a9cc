/*!
A theory of linear arithmetic over the reals (LRA), for use alongside a
clause-learning ASP or SAT solver.

A host solver grounds a program and exposes a collection of *theory atoms*:
domains, linear sums, objectives, and universal assertions, each guarded by a
solver literal and built from sub-expressions guarded by further literals.
As the host's search assigns truth values to these literals, this crate turns
the true ones into linear constraints and objectives, partitions them by a
problem identifier, and checks the result for feasibility and (bounded)
optimality using an LP backend. Whenever the partial assignment the host has
committed to is inconsistent with the linear theory, a *nogood* — a set of
solver literals that must not simultaneously hold — is returned so the host
can learn from it and backtrack.

# Orientation

- [registry] parses each theory atom once into a [registry::Atom] and assigns
  it a stable constraint id.
- [partition] holds one incremental LP problem per partition id, and answers
  `check_exists`, `check_forall`, and `optimize` queries against it.
- [cache] memoizes the sat/unsat outcome of a configuration of constraints,
  so repeated partial assignments do not repeatedly hit the LP backend.
- [dispatcher] routes literal changes from the host to the right partition
  and drives the check loop.
- [checker] is the callback layer a host calls into (`init`, `propagate`,
  `check`, `undo`) and is where nogoods are synthesized from conflicts.
- [lp] is the narrow interface over the underlying LP engine.
- [host] is the (minimal) interface this crate expects of its host: solver
  literal allocation and nogood submission. Everything else about the host's
  CDCL engine, grounder, and AST parser is out of scope.

# Example

```rust
use std::collections::HashMap;

use lra_theory::{
    checker::Checker,
    config::Config,
    host::TestHost,
    registry::{builder::Builder, AtomRegistry},
    types::{Cid, CondId, Pid, Sense},
};

let mut registry = AtomRegistry::new();
let mut host = TestHost::new();
let mut builder = Builder::new(&mut registry);

// &dom{0..10}=x
let dom_sid = host.fresh_sid();
builder.dom(Cid(1), dom_sid, Pid::default_pid(), "x".into(), 0.0, 10.0).unwrap();

// &sum{x} >= 5
let sum_sid = host.fresh_sid();
let mut terms = HashMap::new();
terms.insert(CondId::TRUE, vec![(1.0, "x".into())]);
builder.sum(Cid(2), sum_sid, Pid::default_pid(), Sense::Ge, 5.0, terms).unwrap();

let mut checker = Checker::new(registry, Config::default());

host.assign_true(dom_sid);
host.assign_true(sum_sid);
let events = host.drain_events();
assert!(checker.propagate(&events, &mut host).is_ok());
assert!(checker.pending_nogoods().is_empty());
assert!(host.nogoods().is_empty());
```
*/

pub mod types;

pub mod config;

pub mod cache;

pub mod lp;

pub mod registry;

pub mod partition;

pub mod dispatcher;

pub mod checker;

pub mod host;

pub mod stats;
