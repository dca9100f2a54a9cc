/*!
Memoization of sat/unsat outcomes of constraint configurations.

A *configuration* is a finite set of [DescriptionKey]s: stable hashes of the
ground linear constraints currently active in some partition. For each
*objective key* (`None` for feasibility-only queries, `Some(key)` when the
query concerns a particular registered objective or universal template) the
cache keeps two antichains:

- a **SAT border**: maximal configurations known satisfiable. Any subset of
  a SAT-border element is also satisfiable.
- an **UNSAT border**: minimal configurations known unsatisfiable. Any
  superset of an UNSAT-border element is also unsatisfiable.

Insert and lookup are linear in border size; this is deliberately a flat
`Vec` of `Vec<SmallSet>` rather than a trie, matching the small configuration
sizes seen in a single LP partition (spec §4.1: "an implementation may bound
it").
*/

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// A stable hash of a ground linear constraint's `(sense, bound, sorted
/// (coeff, var) pairs)`, used as the cache coordinate for one constraint.
pub type DescriptionKey = u64;

/// A finite set of description keys describing the current LP problem.
pub type Configuration = HashSet<DescriptionKey>;

/// Which registered objective (or universal template) a query concerns.
/// `None` means "feasibility only, no objective".
pub type ObjectiveKey = Option<DescriptionKey>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheResult {
    Sat,
    Unsat,
    Unknown,
}

#[derive(Default)]
struct Border {
    sat: Vec<Configuration>,
    unsat: Vec<Configuration>,
}

/// The process-wide (or per-thread, per [crate::config::Config]) cache.
#[derive(Default)]
pub struct Cache {
    borders: HashMap<ObjectiveKey, Border>,
    bound: Option<usize>,
    peak_len: usize,
    hits: u64,
    misses: u64,
    lookup_time: Duration,
}

impl Cache {
    pub fn new(bound: Option<usize>) -> Self {
        Cache {
            borders: HashMap::new(),
            bound,
            peak_len: 0,
            hits: 0,
            misses: 0,
            lookup_time: Duration::ZERO,
        }
    }

    /// `check(C, O)` — SAT if some SAT-border element is a superset of `C`;
    /// UNSAT if some UNSAT-border element is a subset of `C`; else unknown.
    /// Bumps the hit/miss counters and cumulative lookup time used by the
    /// statistics surface (spec §6).
    pub fn check(&mut self, configuration: &Configuration, objective: ObjectiveKey) -> CacheResult {
        let start = Instant::now();
        let result = self.check_uncounted(configuration, objective);
        self.lookup_time += start.elapsed();
        result
    }

    fn check_uncounted(&mut self, configuration: &Configuration, objective: ObjectiveKey) -> CacheResult {
        let Some(border) = self.borders.get(&objective) else {
            self.misses += 1;
            return CacheResult::Unknown;
        };
        if border
            .sat
            .iter()
            .any(|sat_cfg| configuration.is_subset(sat_cfg))
        {
            self.hits += 1;
            return CacheResult::Sat;
        }
        if border
            .unsat
            .iter()
            .any(|unsat_cfg| unsat_cfg.is_subset(configuration))
        {
            self.hits += 1;
            return CacheResult::Unsat;
        }
        self.misses += 1;
        CacheResult::Unknown
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Cumulative wall time spent inside [Cache::check] (spec §6 statistics
    /// surface: "cumulative time spent in cache lookup").
    pub fn lookup_time(&self) -> Duration {
        self.lookup_time
    }

    /// Inserts an outcome for `configuration`, preserving the antichain
    /// invariant of the relevant border.
    pub fn add(&mut self, configuration: Configuration, objective: ObjectiveKey, sat: bool) {
        let border = self.borders.entry(objective).or_default();
        if sat {
            if border.sat.iter().any(|c| configuration.is_subset(c)) {
                return;
            }
            border.sat.retain(|c| !c.is_subset(&configuration));
            border.sat.push(configuration);
        } else {
            if border.unsat.iter().any(|c| c.is_subset(&configuration)) {
                return;
            }
            border.unsat.retain(|c| !configuration.is_subset(c));
            border.unsat.push(configuration);
        }
        self.enforce_bound(objective);
        self.peak_len = self.peak_len.max(self.len());
    }

    fn enforce_bound(&mut self, objective: ObjectiveKey) {
        let Some(bound) = self.bound else { return };
        if let Some(border) = self.borders.get_mut(&objective) {
            while border.sat.len() > bound {
                border.sat.remove(0);
            }
            while border.unsat.len() > bound {
                border.unsat.remove(0);
            }
        }
    }

    /// Total number of configurations currently stored across all borders.
    pub fn len(&self) -> usize {
        self.borders
            .values()
            .map(|b| b.sat.len() + b.unsat.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The largest `len()` has been since this cache was created.
    pub fn peak_len(&self) -> usize {
        self.peak_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(keys: &[u64]) -> Configuration {
        keys.iter().copied().collect()
    }

    #[test]
    fn sat_superset_is_sat() {
        let mut cache = Cache::default();
        cache.add(cfg(&[1, 2, 3]), None, true);
        assert_eq!(cache.check(&cfg(&[1, 2]), None), CacheResult::Sat);
        assert_eq!(cache.check(&cfg(&[1, 2, 3]), None), CacheResult::Sat);
        assert_eq!(cache.check(&cfg(&[4]), None), CacheResult::Unknown);
    }

    #[test]
    fn unsat_subset_is_unsat() {
        let mut cache = Cache::default();
        cache.add(cfg(&[1, 2]), None, false);
        assert_eq!(cache.check(&cfg(&[1, 2, 3]), None), CacheResult::Unsat);
        assert_eq!(cache.check(&cfg(&[1]), None), CacheResult::Unknown);
    }

    #[test]
    fn sat_border_discards_subsets_and_skips_when_superset_present() {
        let mut cache = Cache::default();
        cache.add(cfg(&[1, 2, 3]), None, true);
        // Adding a subset of an existing SAT configuration should not grow the border.
        cache.add(cfg(&[1, 2]), None, true);
        assert_eq!(cache.len(), 1);

        // Adding a superset should discard the old (now-redundant) entry.
        cache.add(cfg(&[1, 2, 3, 4]), None, true);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.check(&cfg(&[4]), None), CacheResult::Sat);
    }

    #[test]
    fn borders_are_keyed_per_objective() {
        let mut cache = Cache::default();
        cache.add(cfg(&[1]), None, true);
        cache.add(cfg(&[1]), Some(99), false);
        assert_eq!(cache.check(&cfg(&[1]), None), CacheResult::Sat);
        assert_eq!(cache.check(&cfg(&[1]), Some(99)), CacheResult::Unsat);
    }
}
