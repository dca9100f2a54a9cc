/*!
Routes literal changes from the host to the right [PartitionModel] and
drives the check loop.

The dispatcher owns one [PartitionModel] per live [Pid], lazily
instantiated the first time a cid belonging to that pid is propagated true,
and retired once its last constraint/template/objective is removed. It also
tracks, per cid, whether the host has guessed it (`cid_guessed`) and whether
that guess has actually been materialized into an LP problem
(`cid_propagated`) — the two differ for a cid guessed false, which never
touches the LP engine at all (spec §4.4, invariant 2).
*/

mod grounded_cache;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use grounded_cache::GroundedConstraintCache;

use crate::cache::Cache;
use crate::config::Config;
use crate::lp::good_lp_engine::GoodLpEngine;
use crate::partition::{OptimizeStatus, PartitionModel, Update};
use crate::registry::{grounded_expr, AtomKind, AtomRegistry};
use crate::stats::Counters;
use crate::types::err::DispatchError;
use crate::types::{AffineExpr, Cid, CondId, Pid, Sense, Var};

/// One triple the checker hands to [Dispatcher::propagate]: the cid now
/// decided, its truth value, and (if true) the set of condition ids that
/// are currently true in its grounding.
pub type PropagateTriple = (Cid, bool, HashSet<CondId>);

/// An existential conflict: a partition whose active constraints are
/// jointly infeasible.
#[derive(Clone, Debug)]
pub struct ExistsConflict {
    pub pid: Pid,
    pub core: Vec<Cid>,
}

/// A universal conflict: one violated `&assert` in a partition.
#[derive(Clone, Debug)]
pub struct ForallConflict {
    pub pid: Pid,
    pub violating_cid: Cid,
    /// Existential cids currently propagated in this partition (spec §4.6
    /// "propagated cids P").
    pub propagated: Vec<Cid>,
    pub optimum_core: Vec<Cid>,
}

pub struct Dispatcher {
    partitions: HashMap<Pid, PartitionModel>,
    pids_to_cids: HashMap<Pid, HashSet<Cid>>,
    cid_guessed: HashMap<Cid, bool>,
    cid_propagated: HashMap<Cid, bool>,
    grounded_cache: GroundedConstraintCache,
    cache: Arc<Mutex<Cache>>,
    config: Config,
    /// Running aggregate of everything no longer attributable to a live
    /// partition: conflict/update/backtrack counts, plus the solve
    /// count/time a partition contributed before being retired (spec §6:
    /// aggregate statistics must survive a partition's retirement).
    base_counters: Counters,
}

impl Dispatcher {
    pub fn new(config: Config, cache: Arc<Mutex<Cache>>) -> Self {
        Dispatcher {
            partitions: HashMap::new(),
            pids_to_cids: HashMap::new(),
            cid_guessed: HashMap::new(),
            cid_propagated: HashMap::new(),
            grounded_cache: GroundedConstraintCache::new(),
            cache,
            config,
            base_counters: Counters::default(),
        }
    }

    /// Aggregates live and retired per-partition counters with the cache's
    /// own hit/miss/size counters (spec §6 statistics surface).
    pub fn counters(&self) -> Counters {
        let mut counters = self.base_counters;
        for partition in self.partitions.values() {
            counters.merge_partition(partition.solve_count(), partition.solve_time());
        }
        let cache = self.cache.lock().unwrap();
        counters.cache_hits = cache.hits();
        counters.cache_misses = cache.misses();
        counters.cache_size = cache.len();
        counters.cache_peak_size = cache.peak_len();
        counters.cache_lookup_time = cache.lookup_time();
        counters
    }

    /// Registers `pid` as owning `cid` (spec §3 `pids_to_cids`); called once
    /// per atom at init time, before any propagate/undo traffic.
    pub fn register(&mut self, cid: Cid, pid: Pid) {
        self.pids_to_cids.entry(pid).or_default().insert(cid);
    }

    fn new_partition(&self) -> PartitionModel {
        let engine = Box::new(GoodLpEngine::new(self.config.lp_solver));
        PartitionModel::new(engine, self.cache.clone(), self.config.epsilon.value)
    }

    /// Applies a batch of decided literals (spec §4.4 "propagate").
    pub fn propagate(
        &mut self,
        triples: &[PropagateTriple],
        registry: &AtomRegistry,
    ) -> Result<(), DispatchError> {
        let mut staged: Vec<(Cid, AffineExpr)> = Vec::new();

        for (cid, truth, true_conditions) in triples {
            let atom = registry.get(*cid).ok_or(DispatchError::UnknownCid(*cid))?;
            let paired = cid.paired();
            let paired_atom = registry.get(paired);

            self.cid_guessed.insert(*cid, *truth);
            if paired_atom.is_some() {
                self.cid_guessed.insert(paired, *truth);
            }

            log::trace!("propagate {cid}: {truth}");

            if *truth {
                staged.push((*cid, grounded_expr(atom, true_conditions)));
                if let Some(patom) = paired_atom {
                    staged.push((paired, grounded_expr(patom, true_conditions)));
                }
            } else {
                self.cid_propagated.insert(*cid, false);
                if paired_atom.is_some() {
                    self.cid_propagated.insert(paired, false);
                }
            }
        }

        for (cid, expr) in staged {
            let atom = registry.get(cid).ok_or(DispatchError::UnknownCid(cid))?;
            if !self.partitions.contains_key(&atom.pid) {
                let fresh = self.new_partition();
                self.partitions.insert(atom.pid.clone(), fresh);
            }
            let partition = self.partitions.get_mut(&atom.pid).unwrap();

            let update = match atom.kind {
                AtomKind::Exists => Update::Exists { expr, sense: atom.sense, bound: atom.bound },
                AtomKind::Forall => Update::ForallTemplate {
                    expr,
                    sense: atom.sense,
                    bound: atom.bound,
                    strict: atom.strict,
                },
                AtomKind::Objective => Update::Objective {
                    expr,
                    weight: atom.objective_weight.unwrap_or(0),
                },
            };
            partition.update(vec![(cid, update)]);
            self.cid_propagated.insert(cid, true);
            self.base_counters.partition_updates += 1;
        }

        Ok(())
    }

    /// Mirrors `propagate`: retracts `cids` from whichever partition holds
    /// them and clears their guess/propagated bookkeeping (spec §4.5
    /// "undo").
    pub fn undo(
        &mut self,
        cids: &[Cid],
        registry: &AtomRegistry,
    ) -> Result<(), crate::types::err::ErrorKind> {
        log::trace!("undo {} cid(s)", cids.len());
        for &cid in cids {
            if self.cid_propagated.get(&cid) == Some(&true) {
                if let Some(atom) = registry.get(cid) {
                    if let Some(partition) = self.partitions.get_mut(&atom.pid) {
                        partition.remove(&[cid])?;
                    }
                }
            }
            self.cid_guessed.remove(&cid);
            self.cid_propagated.remove(&cid);
        }
        self.retire_empty_partitions();
        Ok(())
    }

    fn retire_empty_partitions(&mut self) {
        let emptied: Vec<Pid> = self
            .partitions
            .iter()
            .filter(|(_, p)| p.is_empty())
            .map(|(pid, _)| pid.clone())
            .collect();
        if emptied.is_empty() {
            return;
        }
        let start = std::time::Instant::now();
        for pid in emptied {
            if let Some(partition) = self.partitions.remove(&pid) {
                self.base_counters.merge_partition(partition.solve_count(), partition.solve_time());
                self.base_counters.partition_backtracks += 1;
            }
        }
        self.base_counters.partition_backtrack_time += start.elapsed();
    }

    fn is_fully_guessed(&self, pid: &Pid) -> bool {
        match self.pids_to_cids.get(pid) {
            None => true,
            Some(cids) => cids.iter().all(|c| self.cid_guessed.contains_key(c)),
        }
    }

    /// Per spec §4.4: checks every fully-guessed partition whose
    /// `checked_exists` flag is stale. When `strict_forall` is configured,
    /// an infeasible partition's core additionally includes every
    /// currently-propagated universal cid in that partition.
    pub fn check_exists(
        &mut self,
        registry: &AtomRegistry,
    ) -> Result<Vec<ExistsConflict>, crate::types::err::ErrorKind> {
        let mut conflicts = Vec::new();
        let pids: Vec<Pid> = self.partitions.keys().cloned().collect();
        for pid in pids {
            if !self.is_fully_guessed(&pid) {
                continue;
            }
            let partition = self.partitions.get_mut(&pid).unwrap();
            if partition.checked_exists() {
                continue;
            }
            if !partition.check_exists()? {
                let mut core = partition.core_unsat_exists(self.config.lazy_mode)?;
                if self.config.strict_forall {
                    core.extend(self.propagated_forall_cids(&pid, registry));
                    core.sort();
                    core.dedup();
                }
                self.base_counters.exists_conflicts += 1;
                log::debug!("existential conflict in partition {pid}: core {core:?}");
                conflicts.push(ExistsConflict { pid, core });
            }
        }
        Ok(conflicts)
    }

    /// Every cid of `kind` belonging to `pid` that is currently propagated.
    fn propagated_cids_of_kind(&self, pid: &Pid, registry: &AtomRegistry, kind: AtomKind) -> Vec<Cid> {
        self.pids_to_cids
            .get(pid)
            .into_iter()
            .flatten()
            .copied()
            .filter(|cid| {
                self.cid_propagated.get(cid) == Some(&true)
                    && registry.get(*cid).map(|a| a.kind == kind).unwrap_or(false)
            })
            .collect()
    }

    /// Every forall cid belonging to `pid` that is currently propagated
    /// (spec §6 `strict-forall`: conditions a conflicting existential core
    /// on the partition's active universals too).
    fn propagated_forall_cids(&self, pid: &Pid, registry: &AtomRegistry) -> Vec<Cid> {
        self.propagated_cids_of_kind(pid, registry, AtomKind::Forall)
    }

    /// Per spec §4.4: checks every fully-guessed partition's universal
    /// templates, synthesizing an optimum core for each violation found.
    pub fn check_forall(
        &mut self,
        registry: &AtomRegistry,
    ) -> Result<Vec<ForallConflict>, crate::types::err::ErrorKind> {
        let mut conflicts = Vec::new();
        let pids: Vec<Pid> = self.partitions.keys().cloned().collect();
        for pid in pids {
            if !self.is_fully_guessed(&pid) {
                continue;
            }
            let violated = {
                let partition = self.partitions.get_mut(&pid).unwrap();
                if partition.checked_forall() {
                    Vec::new()
                } else {
                    partition.check_forall()?
                }
            };
            for violating_cid in violated {
                let groups = self.candidate_groups(&pid, registry);
                let propagated = self.propagated_cids_of_kind(&pid, registry, AtomKind::Exists);
                let partition = self.partitions.get_mut(&pid).unwrap();
                let core = partition.core_unsat_forall(violating_cid, &groups, self.config.lazy_mode)?;
                self.base_counters.forall_conflicts += 1;
                log::debug!("universal conflict in partition {pid}: cid {violating_cid} violated, optimum core {core:?}");
                conflicts.push(ForallConflict {
                    pid: pid.clone(),
                    violating_cid,
                    propagated,
                    optimum_core: core,
                });
            }
        }
        Ok(conflicts)
    }

    /// Builds the candidate groups fed to `core_unsat_forall`: for every cid
    /// belonging to `pid` that is not yet propagated (guessed but not
    /// materialized, or not guessed at all), enumerate its grounded-constraint
    /// variants (spec §4.3 "grounded constraint cache").
    fn candidate_groups(
        &mut self,
        pid: &Pid,
        registry: &AtomRegistry,
    ) -> Vec<Vec<(Cid, AffineExpr, Sense, f64)>> {
        let mut groups = Vec::new();
        let Some(cids) = self.pids_to_cids.get(pid).cloned() else {
            return groups;
        };
        let mut ordered: Vec<Cid> = cids.into_iter().collect();
        ordered.sort();

        for cid in ordered {
            let already_propagated = self.cid_propagated.get(&cid) == Some(&true);
            if already_propagated {
                continue;
            }
            let Some(atom) = registry.get(cid) else { continue };
            if atom.kind != AtomKind::Exists {
                continue;
            }
            let variants = self.grounded_cache.variants(atom);
            let group: Vec<(Cid, AffineExpr, Sense, f64)> = variants
                .iter()
                .map(|(_, expr)| (cid, expr.clone(), atom.sense, atom.bound))
                .collect();
            if !group.is_empty() {
                groups.push(group);
            }
        }
        groups
    }

    /// Runs lexicographic optimization on every partition (spec §4.4
    /// "optimize"), returning the per-pid status and variable assignment.
    pub fn optimize(
        &mut self,
    ) -> Result<HashMap<Pid, (OptimizeStatus, HashMap<Var, f64>)>, crate::types::err::ErrorKind> {
        let mut results = HashMap::new();
        for (pid, partition) in self.partitions.iter_mut() {
            results.insert(pid.clone(), partition.optimize()?);
        }
        Ok(results)
    }

    /// All nogoods this layer would need help synthesizing collapse to
    /// conflicts only; actual nogood construction is the checker's job
    /// (spec §4.6). This convenience is used by tests and the doctest to
    /// confirm "no conflicts pending" without reaching into the checker.
    pub fn has_pending_conflicts(&mut self, registry: &AtomRegistry) -> bool {
        !self.check_exists(registry).unwrap_or_default().is_empty()
            || !self.check_forall(registry).unwrap_or_default().is_empty()
    }

    /// All cids currently decided true and materialized into some partition
    /// (used by the checker's `check()` batch-undo/redo pass, spec §4.5).
    pub fn propagated_cids(&self) -> Vec<Cid> {
        self.cid_propagated
            .iter()
            .filter(|(_, v)| **v)
            .map(|(cid, _)| *cid)
            .collect()
    }
}
