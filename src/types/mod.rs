/*!
Core identifiers and small value types shared across the crate.

Kept as newtypes over primitives rather than raw `i64`/`i32` so that a
constraint id and a solver literal, say, cannot be passed to the wrong
parameter by accident.
*/

pub mod err;

use std::fmt;

/// A constraint id: identifies one logical constraint row in the atom
/// registry. A single theory atom may expand to a paired `(cid, -cid)`
/// (spec: equality-as-two-inequalities, or a two-sided domain).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cid(pub i64);

impl Cid {
    /// The paired row, if this cid was produced as one half of a two-row atom.
    pub fn paired(self) -> Cid {
        Cid(-self.0)
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A solver literal: the host's identifier for a propositional literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sid(pub i32);

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A condition id: a solver literal guarding a sub-expression of a term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CondId(pub i32);

impl CondId {
    /// The sentinel condition id used for an unconditioned element (i.e. a
    /// term that is part of an expression regardless of any guard literal).
    /// Always treated as true during grounding, independent of the host
    /// assignment.
    pub const TRUE: CondId = CondId(0);
}

impl fmt::Display for CondId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A partition id: all constraints sharing a pid live in the same LP problem.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub String);

impl Pid {
    /// The pid used for atoms whose head term omits the `pid(_)` argument.
    pub fn default_pid() -> Pid {
        Pid("default".to_string())
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Pid {
    fn from(s: &str) -> Self {
        Pid(s.to_string())
    }
}

/// A variable name appearing in a linear expression.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(pub String);

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Var {
    fn from(s: &str) -> Self {
        Var(s.to_string())
    }
}

/// The comparison sense of a constraint or assertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

impl Sense {
    /// Flip the sense (used when normalizing `<=` universals/objectives to `>=`).
    pub fn flip(self) -> Sense {
        match self {
            Sense::Le => Sense::Ge,
            Sense::Ge => Sense::Le,
            Sense::Eq => Sense::Eq,
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sense::Le => "<=",
            Sense::Ge => ">=",
            Sense::Eq => "=",
        };
        write!(f, "{s}")
    }
}

/// A single (coefficient, variable) term of a linear expression.
pub type Term = (f64, Var);

/// A flat linear expression: the sum of its terms.
pub type AffineExpr = Vec<Term>;

/// Tolerance for numeric feasibility/optimality comparisons (spec default 1e-6).
pub const DEFAULT_EPSILON: f64 = 1e-6;
