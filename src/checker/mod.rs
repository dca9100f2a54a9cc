/*!
The callback layer a host calls into (`propagate`, `check`, `undo`) and the
home of nogood synthesis (spec §4.5, §4.6).

A [Checker] owns an immutable [AtomRegistry](crate::registry::AtomRegistry)
built ahead of time (by a `Builder`, typically fed by a host-specific
grounder out of this crate's scope) plus a [Dispatcher] and the bookkeeping
needed to turn a stream of raw solver-literal assignments into
[PropagateTriple](crate::dispatcher::PropagateTriple)s: `sid_to_cids` maps a
cid's head literal to the cid(s) it guards, `condid_to_cids` does the same
for condition guards, and `fired` remembers which cids have already been
handed to the dispatcher so a later event touching the same literal does not
re-stage it.
*/

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::cache::Cache;
use crate::config::Config;
use crate::dispatcher::{Dispatcher, ExistsConflict, ForallConflict, PropagateTriple};
use crate::host::{Host, HostEvent, SignedLiteral};
use crate::partition::OptimizeStatus;
use crate::registry::AtomRegistry;
use crate::stats::Counters;
use crate::types::err::ErrorKind;
use crate::types::{Cid, CondId, Pid, Sid, Var};

pub struct Checker {
    registry: AtomRegistry,
    dispatcher: Dispatcher,
    config: Config,

    sid_to_cids: HashMap<Sid, Vec<Cid>>,
    condid_to_cids: HashMap<CondId, Vec<Cid>>,
    cid_conditions: HashMap<Cid, Vec<CondId>>,

    /// Current truth of every solver literal the host has told us about,
    /// keyed by its raw numeric id (shared between [Sid] and [CondId]).
    literal_truth: HashMap<i32, bool>,
    /// Cids already handed to the dispatcher as a propagate triple; cleared
    /// by [Checker::undo] when the literal(s) they depend on are retracted.
    fired: HashSet<Cid>,

    pending_nogoods: Vec<Vec<SignedLiteral>>,
}

impl Checker {
    /// Builds a checker over an already-assembled registry (spec §4.5
    /// "Init"). Registers every atom's pid with the dispatcher and indexes
    /// each atom by its head and condition literals.
    pub fn new(registry: AtomRegistry, config: Config) -> Self {
        let cache = Arc::new(Mutex::new(Cache::new(config.cache_border_bound)));
        let mut dispatcher = Dispatcher::new(config.clone(), cache);

        let mut sid_to_cids: HashMap<Sid, Vec<Cid>> = HashMap::new();
        let mut condid_to_cids: HashMap<CondId, Vec<Cid>> = HashMap::new();
        let mut cid_conditions: HashMap<Cid, Vec<CondId>> = HashMap::new();

        for atom in registry.iter() {
            dispatcher.register(atom.cid, atom.pid.clone());
            sid_to_cids.entry(atom.sid).or_default().push(atom.cid);
            let conds = atom.condition_ids();
            for cond in &conds {
                condid_to_cids.entry(*cond).or_default().push(atom.cid);
            }
            cid_conditions.insert(atom.cid, conds);
        }

        Checker {
            registry,
            dispatcher,
            config,
            sid_to_cids,
            condid_to_cids,
            cid_conditions,
            literal_truth: HashMap::new(),
            fired: HashSet::new(),
            pending_nogoods: Vec::new(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn pending_nogoods(&self) -> &[Vec<SignedLiteral>] {
        &self.pending_nogoods
    }

    pub fn counters(&self) -> Counters {
        self.dispatcher.counters()
    }

    /// Runs lexicographic optimization over every fully-guessed partition
    /// (spec §4.4 "optimize", exposed for `show-lp-assignment`).
    pub fn optimize(&mut self) -> Result<HashMap<Pid, (OptimizeStatus, HashMap<Var, f64>)>, ErrorKind> {
        self.dispatcher.optimize()
    }

    /// Spec §4.5 step 3: turns literal assignments into propagate triples,
    /// one per cid whose head is now known and, if true, whose every
    /// condition is also known.
    fn ready_triples(&mut self, events: &[HostEvent]) -> Vec<PropagateTriple> {
        let mut touched: HashSet<i32> = HashSet::new();
        for event in events {
            match *event {
                HostEvent::AssignTrue(sid) => {
                    self.literal_truth.insert(sid.0, true);
                    touched.insert(sid.0);
                }
                HostEvent::AssignFalse(sid) => {
                    self.literal_truth.insert(sid.0, false);
                    touched.insert(sid.0);
                }
            }
        }

        let mut candidates: HashSet<Cid> = HashSet::new();
        for raw in &touched {
            if let Some(cids) = self.sid_to_cids.get(&Sid(*raw)) {
                candidates.extend(cids);
            }
            if let Some(cids) = self.condid_to_cids.get(&CondId(*raw)) {
                candidates.extend(cids);
            }
        }

        let mut ordered: Vec<Cid> = candidates.into_iter().collect();
        ordered.sort();

        let mut triples = Vec::new();
        for cid in ordered {
            // A negative cid is always the derived paired row of some
            // positive cid (`Cid::paired`); the dispatcher propagates it
            // together with its pair, so only the positive side is staged
            // here (spec §4.4: "if the paired `-cid` exists, mark it
            // guessed too").
            if cid.0 < 0 || self.fired.contains(&cid) {
                continue;
            }
            let Some(atom) = self.registry.get(cid) else { continue };
            let Some(&head_true) = self.literal_truth.get(&atom.sid.0) else { continue };

            if !head_true {
                triples.push((cid, false, HashSet::new()));
                self.fired.insert(cid);
                self.fired.insert(cid.paired());
                continue;
            }

            let conditions = self.cid_conditions.get(&cid).cloned().unwrap_or_default();
            if conditions.iter().all(|c| self.literal_truth.contains_key(&c.0)) {
                let true_conditions: HashSet<CondId> = conditions
                    .iter()
                    .copied()
                    .filter(|c| self.literal_truth.get(&c.0) == Some(&true))
                    .collect();
                triples.push((cid, true, true_conditions));
                self.fired.insert(cid);
                self.fired.insert(cid.paired());
            }
        }
        triples
    }

    /// Drains `pending_nogoods` into the host, in order. Stops and returns
    /// `false` the moment the host rejects one (spec §4.5 step 1, §7): the
    /// rejected nogood is dropped, everything still queued stays queued.
    fn flush_nogoods(&mut self, host: &mut dyn Host) -> bool {
        while !self.pending_nogoods.is_empty() {
            let nogood = self.pending_nogoods.remove(0);
            log::trace!("submitting nogood of size {}", nogood.len());
            if !host.add_nogood(nogood, true) {
                log::debug!("host rejected nogood, stopping flush");
                return false;
            }
        }
        true
    }

    /// Spec §4.5 `propagate`: apply queued nogoods, translate `events` into
    /// dispatcher triples, propagate them, and (in eager mode) run checks
    /// immediately. In lazy mode, checking is deferred to [Checker::check].
    pub fn propagate(&mut self, events: &[HostEvent], host: &mut dyn Host) -> Result<(), ErrorKind> {
        if !self.flush_nogoods(host) {
            return Ok(());
        }

        let triples = self.ready_triples(events);
        if !triples.is_empty() {
            self.dispatcher.propagate(&triples, &self.registry)?;
        }

        if !self.config.lazy_mode {
            self.run_checks()?;
        }

        self.flush_nogoods(host);
        Ok(())
    }

    /// Spec §4.5 `check`: same as `propagate`, but the triples it stages
    /// are synthetic — they're undone again once the checks have run, so a
    /// full-assignment probe never leaves behind state the host hasn't
    /// actually committed to via a real `propagate`/`undo` pair.
    pub fn check(&mut self, events: &[HostEvent], host: &mut dyn Host) -> Result<(), ErrorKind> {
        if !self.flush_nogoods(host) {
            return Ok(());
        }

        let triples = self.ready_triples(events);
        if !triples.is_empty() {
            self.dispatcher.propagate(&triples, &self.registry)?;
        }

        self.run_checks()?;

        let synthetic: Vec<Cid> = triples.iter().map(|(cid, _, _)| *cid).collect();
        if !synthetic.is_empty() {
            self.dispatcher.undo(&synthetic, &self.registry)?;
            for cid in &synthetic {
                self.fired.remove(cid);
            }
        }

        self.flush_nogoods(host);
        Ok(())
    }

    /// Spec §4.5 `undo`: mirrors `propagate` for a batch of retracted
    /// literals, in LIFO order with respect to the matching `propagate`
    /// call (spec §5 ordering guarantee — the caller is responsible for
    /// that discipline).
    pub fn undo(&mut self, sids: &[Sid]) -> Result<(), ErrorKind> {
        let mut cids_to_undo: Vec<Cid> = Vec::new();
        for sid in sids {
            let mut affected: Vec<Cid> = Vec::new();
            if let Some(cids) = self.sid_to_cids.get(sid) {
                affected.extend(cids);
            }
            if let Some(cids) = self.condid_to_cids.get(&CondId(sid.0)) {
                affected.extend(cids);
            }
            for cid in affected {
                if self.fired.remove(&cid) {
                    cids_to_undo.push(cid);
                }
            }
            self.literal_truth.remove(&sid.0);
        }
        cids_to_undo.sort();
        cids_to_undo.dedup();
        if !cids_to_undo.is_empty() {
            self.dispatcher.undo(&cids_to_undo, &self.registry)?;
        }
        Ok(())
    }

    fn run_checks(&mut self) -> Result<(), ErrorKind> {
        for conflict in self.dispatcher.check_exists(&self.registry)? {
            let nogood = self.exists_nogood(&conflict);
            self.queue_nogood(nogood);
        }
        for conflict in self.dispatcher.check_forall(&self.registry)? {
            let nogood = self.forall_nogood(&conflict);
            self.queue_nogood(nogood);
        }
        Ok(())
    }

    fn queue_nogood(&mut self, mut nogood: Vec<SignedLiteral>) {
        nogood.sort();
        nogood.dedup();
        if !nogood.is_empty() {
            self.pending_nogoods.push(nogood);
        }
    }

    /// Spec §4.6 "Existential conflict": `+sid(cid)` for every core cid,
    /// plus each of its conditions' current signed literal — with
    /// tie-breaking so only positively-signed cids contribute conditions;
    /// a negatively-signed cid contributes only its head literal.
    fn exists_nogood(&self, conflict: &ExistsConflict) -> Vec<SignedLiteral> {
        let mut lits = Vec::new();
        for &cid in &conflict.core {
            if let Some(atom) = self.registry.get(cid) {
                lits.push(SignedLiteral::new(atom.sid, true));
                if cid.0 >= 0 {
                    lits.extend(self.condition_literals(atom.condition_ids().iter().copied()));
                }
            }
        }
        lits
    }

    /// Spec §4.6 "Universal conflict": `+sid(q)` and its conditions, the
    /// conditions of every propagated existential `p`, and `-sid(u)` for
    /// every optimum-core `u`.
    fn forall_nogood(&self, conflict: &ForallConflict) -> Vec<SignedLiteral> {
        let mut lits = Vec::new();
        if let Some(q) = self.registry.get(conflict.violating_cid) {
            lits.push(SignedLiteral::new(q.sid, true));
            lits.extend(self.condition_literals(q.condition_ids().iter().copied()));
        }
        for &p in &conflict.propagated {
            if let Some(atom) = self.registry.get(p) {
                lits.extend(self.condition_literals(atom.condition_ids().iter().copied()));
            }
        }
        for &u in &conflict.optimum_core {
            if let Some(atom) = self.registry.get(u) {
                lits.push(SignedLiteral::new(atom.sid, false));
            }
        }
        lits
    }

    fn condition_literals(&self, conditions: impl Iterator<Item = CondId>) -> Vec<SignedLiteral> {
        conditions
            .filter_map(|cond| {
                self.literal_truth
                    .get(&cond.0)
                    .map(|&truth| SignedLiteral::new(Sid(cond.0), truth))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TestHost;
    use crate::registry::builder::Builder;
    use crate::types::Sense;
    use std::collections::HashMap as Map;

    fn single_condition_atom_fixture() -> (AtomRegistry, Sid, Sid) {
        let mut registry = AtomRegistry::new();
        let mut builder = Builder::new(&mut registry);
        let a_sid = Sid(1);
        let b_sid = Sid(2);
        builder
            .sum(Cid(1), a_sid, Pid::default_pid(), Sense::Ge, 3.0, {
                let mut m = Map::new();
                m.insert(CondId::TRUE, vec![(1.0, "x".into())]);
                m
            })
            .unwrap();
        builder
            .sum(Cid(2), b_sid, Pid::default_pid(), Sense::Le, 1.0, {
                let mut m = Map::new();
                m.insert(CondId::TRUE, vec![(1.0, "x".into())]);
                m
            })
            .unwrap();
        (registry, a_sid, b_sid)
    }

    #[test]
    fn infeasible_pair_produces_existential_nogood() {
        let (registry, a_sid, b_sid) = single_condition_atom_fixture();
        let mut checker = Checker::new(registry, Config::default());
        let mut host = TestHost::new();

        let events = vec![HostEvent::AssignTrue(a_sid), HostEvent::AssignTrue(b_sid)];
        checker.propagate(&events, &mut host).unwrap();

        assert_eq!(host.nogoods().len(), 1);
        let nogood = &host.nogoods()[0];
        assert!(nogood.contains(&SignedLiteral::new(a_sid, true)));
        assert!(nogood.contains(&SignedLiteral::new(b_sid, true)));
    }

    #[test]
    fn feasible_assignment_yields_no_nogood() {
        let mut registry = AtomRegistry::new();
        let mut builder = Builder::new(&mut registry);
        let dom_sid = Sid(1);
        builder
            .dom(Cid(1), dom_sid, Pid::default_pid(), "x".into(), 0.0, 10.0)
            .unwrap();
        let sum_sid = Sid(2);
        builder
            .sum(Cid(2), sum_sid, Pid::default_pid(), Sense::Ge, 5.0, {
                let mut m = Map::new();
                m.insert(CondId::TRUE, vec![(1.0, "x".into())]);
                m
            })
            .unwrap();
        let obj_sid = Sid(3);
        builder
            .objective(Cid(3), obj_sid, Pid::default_pid(), false, 0, {
                let mut m = Map::new();
                m.insert(CondId::TRUE, vec![(1.0, "x".into())]);
                m
            })
            .unwrap();

        let mut checker = Checker::new(registry, Config::default());
        let mut host = TestHost::new();
        let events = vec![
            HostEvent::AssignTrue(dom_sid),
            HostEvent::AssignTrue(sum_sid),
            HostEvent::AssignTrue(obj_sid),
        ];
        checker.propagate(&events, &mut host).unwrap();

        assert!(host.nogoods().is_empty());
        let (status, assignment) = checker
            .optimize()
            .unwrap()
            .remove(&Pid::default_pid())
            .unwrap();
        assert_eq!(status, OptimizeStatus::Optimal);
        // Minimizing x subject to x >= 5 within [0, 10] settles at 5.0.
        assert!((assignment[&Var::from("x")] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn undo_reverses_propagate_and_clears_conflict() {
        let (registry, a_sid, b_sid) = single_condition_atom_fixture();
        let mut checker = Checker::new(registry, Config::default());
        let mut host = TestHost::new();

        checker
            .propagate(&[HostEvent::AssignTrue(a_sid), HostEvent::AssignTrue(b_sid)], &mut host)
            .unwrap();
        assert_eq!(host.nogoods().len(), 1);

        checker.undo(&[a_sid, b_sid]).unwrap();
        assert!(checker.dispatcher().counters().partition_backtracks >= 1);
    }
}
