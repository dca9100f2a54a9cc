/*!
Statistics surface (spec §6): per-partition and aggregate counters, mirroring
`Context`'s [`Counters`](https://docs.rs/otter_sat) in spirit — a plain
`Default`-able struct bumped by the layers that actually do the work, read
out by the CLI at the end of a run.
*/

use std::time::Duration;

/// A snapshot of counters for one run (or one partition, before aggregation).
#[derive(Clone, Copy, Debug, Default)]
pub struct Counters {
    /// Number of calls into the LP backend's `solve`.
    pub lp_solver_calls: u64,
    /// Cumulative wall time spent inside `solve`.
    pub lp_solver_time: Duration,

    /// Cache lookups that hit a SAT or UNSAT border.
    pub cache_hits: u64,
    /// Cache lookups that found neither border applicable.
    pub cache_misses: u64,
    /// Current number of configurations held across all cache borders.
    pub cache_size: usize,
    /// Largest `cache_size` has been during this run.
    pub cache_peak_size: usize,
    /// Cumulative wall time spent inside `Cache::check`.
    pub cache_lookup_time: Duration,

    /// Existential (`check_exists`) conflicts found.
    pub exists_conflicts: u64,
    /// Universal (`check_forall`) conflicts found.
    pub forall_conflicts: u64,

    /// Partition model mutations (`update`/`remove` batches) applied.
    pub partition_updates: u64,
    /// Partitions retired (emptied out) during the run.
    pub partition_backtracks: u64,
    /// Cumulative wall time spent retiring (backtracking) partitions.
    pub partition_backtrack_time: Duration,
}

impl Counters {
    pub fn record_cache_lookup(&mut self, hit: bool) {
        if hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
    }

    pub fn merge_partition(&mut self, solve_count: u64, solve_time: Duration) {
        self.lp_solver_calls += solve_count;
        self.lp_solver_time += solve_time;
    }
}

impl std::fmt::Display for Counters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "lp_solver_calls: {}", self.lp_solver_calls)?;
        writeln!(f, "lp_solver_time: {:?}", self.lp_solver_time)?;
        writeln!(f, "cache_hits: {}", self.cache_hits)?;
        writeln!(f, "cache_misses: {}", self.cache_misses)?;
        writeln!(f, "cache_size: {}", self.cache_size)?;
        writeln!(f, "cache_peak_size: {}", self.cache_peak_size)?;
        writeln!(f, "cache_lookup_time: {:?}", self.cache_lookup_time)?;
        writeln!(f, "exists_conflicts: {}", self.exists_conflicts)?;
        writeln!(f, "forall_conflicts: {}", self.forall_conflicts)?;
        writeln!(f, "partition_updates: {}", self.partition_updates)?;
        writeln!(f, "partition_backtracks: {}", self.partition_backtracks)?;
        write!(f, "partition_backtrack_time: {:?}", self.partition_backtrack_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_lookup_recording() {
        let mut c = Counters::default();
        c.record_cache_lookup(true);
        c.record_cache_lookup(false);
        assert_eq!(c.cache_hits, 1);
        assert_eq!(c.cache_misses, 1);
    }
}
