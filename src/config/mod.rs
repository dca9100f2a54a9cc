/*!
Configuration of a checker.

All configuration lives on one [Config] struct, handed to
[Checker::new](crate::checker::Checker::new). Tunables that
have a meaningful bound are wrapped in [ConfigOption] so a CLI or embedder
can validate a requested value against its range before accepting it.
*/

mod config_option;
pub use config_option::ConfigOption;

/// Which LP backend to route solves through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LpSolverChoice {
    /// Pure-Rust backend, no native toolchain required.
    Microlp,
    /// Native HiGHS backend.
    Highs,
}

impl std::fmt::Display for LpSolverChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LpSolverChoice::Microlp => write!(f, "microlp"),
            LpSolverChoice::Highs => write!(f, "highs"),
        }
    }
}

impl std::str::FromStr for LpSolverChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "microlp" => Ok(LpSolverChoice::Microlp),
            "highs" => Ok(LpSolverChoice::Highs),
            other => Err(format!("unknown LP solver: {other}")),
        }
    }
}

/// The primary configuration structure.
#[derive(Clone)]
pub struct Config {
    /// Tolerance used for all numerical feasibility/optimality comparisons.
    pub epsilon: ConfigOption<f64>,

    /// Which LP backend new partition models are built against.
    pub lp_solver: LpSolverChoice,

    /// When true, the checker relies on the host's `check` callback rather
    /// than watching every literal eagerly, and core/optimum-core extraction
    /// skip their expensive search and return the trivial (non-minimized)
    /// candidate set instead (spec §4.5 "Watches and laziness", §4.2/§4.3
    /// "lazy" core-extraction parameter — both driven by this one flag).
    pub lazy_mode: bool,

    /// When true, existential conflicts are also conditioned on the
    /// partition's universals being active (spec §6 `strict-forall`).
    pub strict_forall: bool,

    /// Emit the per-partition LP solver status and a primal assignment
    /// alongside each model (spec §6 `show-lp-assignment`).
    pub show_lp_assignment: bool,

    /// An optional bound on the size of each cache border (spec §4.1:
    /// "Size is tracked for telemetry; an implementation may bound it").
    pub cache_border_bound: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            epsilon: ConfigOption {
                name: "epsilon",
                min: 0.0,
                max: 1.0,
                value: crate::types::DEFAULT_EPSILON,
            },
            lp_solver: LpSolverChoice::Microlp,
            lazy_mode: false,
            strict_forall: false,
            show_lp_assignment: false,
            cache_border_bound: None,
        }
    }
}
