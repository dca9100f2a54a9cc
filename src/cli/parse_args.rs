/*!
Command-line argument parsing for `lra_cli`, wiring the flags named in
spec §6 onto a [Config].
*/

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, LpSolverChoice};

/// Mirrors [LpSolverChoice] with a `clap::ValueEnum` impl, so the public
/// `Config` type itself stays free of a CLI-framework dependency.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum CliLpSolver {
    Microlp,
    Highs,
}

impl From<CliLpSolver> for LpSolverChoice {
    fn from(choice: CliLpSolver) -> Self {
        match choice {
            CliLpSolver::Microlp => LpSolverChoice::Microlp,
            CliLpSolver::Highs => LpSolverChoice::Highs,
        }
    }
}

/// Checks a `.lra` fixture for feasibility, universal violations, and a
/// lexicographic optimum.
#[derive(Parser, Debug)]
#[command(name = "lra_cli", version, about)]
pub struct Cli {
    /// Which LP backend to route solves through.
    #[arg(long = "lp-solver", value_enum, default_value = "microlp")]
    pub lp_solver: CliLpSolver,

    /// Rely on a full-assignment check rather than watching every literal eagerly.
    #[arg(long = "lazy-mode")]
    pub lazy_mode: bool,

    /// Condition existential conflicts on the partition's active universals too.
    #[arg(long = "strict-forall")]
    pub strict_forall: bool,

    /// Print the per-partition LP solver status and primal assignment alongside each model.
    #[arg(long = "show-lp-assignment")]
    pub show_lp_assignment: bool,

    /// Path to a `.lra` fixture file (see the `cli` module doc comment for the format).
    pub path: PathBuf,
}

impl Cli {
    pub fn to_config(&self) -> Config {
        let mut cfg = Config::default();
        cfg.lp_solver = self.lp_solver.into();
        cfg.lazy_mode = self.lazy_mode;
        cfg.strict_forall = self.strict_forall;
        cfg.show_lp_assignment = self.show_lp_assignment;
        cfg
    }
}
