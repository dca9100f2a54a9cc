/*!
The (minimal) interface this crate expects of its host (spec §4.5, §5):
solver literal assignment events flowing in, nogoods flowing out. Condition
ids and solver literal ids share one flat numeric namespace — a condition
guarding a sub-expression is just a solver literal used in a different role,
so a single [HostEvent] stream drives both a cid's own truth and the truth
of its conditions.

Everything else about the host's CDCL engine, grounder, and AST parser is
out of scope; [TestHost] is a bare-bones stand-in used by tests and the
crate-level doctest.
*/

use std::collections::HashSet;

use crate::types::Sid;

/// A signed occurrence of a solver literal in a nogood (spec §4.6): `+l`
/// means "literal `l` true", `-l` means "literal `l` false".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignedLiteral {
    pub sid: Sid,
    pub positive: bool,
}

impl SignedLiteral {
    pub fn new(sid: Sid, positive: bool) -> Self {
        SignedLiteral { sid, positive }
    }
}

impl std::fmt::Display for SignedLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.positive {
            write!(f, "+{}", self.sid)
        } else {
            write!(f, "-{}", self.sid)
        }
    }
}

/// One solver-literal assignment, as seen by the checker (spec §4.5
/// `propagate`/`check` inputs).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    AssignTrue(Sid),
    AssignFalse(Sid),
}

/// What the checker needs from its host: a place to submit nogoods.
///
/// `add_nogood` returns `false` when the host rejects the nogood outright
/// (spec §7: "the fact has already been derived") — the caller must stop
/// processing the rest of the current callback and leave any remaining
/// queued nogoods queued for next time.
pub trait Host {
    fn add_nogood(&mut self, nogood: Vec<SignedLiteral>, lock: bool) -> bool;
}

/// An in-memory fake host, for tests and the crate doctest: hands out
/// fresh solver literal ids, records emitted nogoods, and rejects a nogood
/// it has already accepted once (emulating "already derived").
#[derive(Default)]
pub struct TestHost {
    next_sid: i32,
    pending_events: Vec<HostEvent>,
    nogoods: Vec<Vec<SignedLiteral>>,
    seen: HashSet<Vec<SignedLiteral>>,
}

impl TestHost {
    pub fn new() -> Self {
        TestHost {
            next_sid: 1,
            pending_events: Vec::new(),
            nogoods: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Allocates a fresh solver literal id, usable both as a cid's head
    /// literal and as a condition guard.
    pub fn fresh_sid(&mut self) -> Sid {
        let sid = Sid(self.next_sid);
        self.next_sid += 1;
        sid
    }

    pub fn assign_true(&mut self, sid: Sid) {
        self.pending_events.push(HostEvent::AssignTrue(sid));
    }

    pub fn assign_false(&mut self, sid: Sid) {
        self.pending_events.push(HostEvent::AssignFalse(sid));
    }

    /// Takes every event queued by `assign_true`/`assign_false` since the
    /// last drain.
    pub fn drain_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn nogoods(&self) -> &[Vec<SignedLiteral>] {
        &self.nogoods
    }
}

impl Host for TestHost {
    fn add_nogood(&mut self, nogood: Vec<SignedLiteral>, _lock: bool) -> bool {
        let mut canonical = nogood.clone();
        canonical.sort();
        if !self.seen.insert(canonical) {
            return false;
        }
        self.nogoods.push(nogood);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_a_nogood_already_accepted() {
        let mut host = TestHost::new();
        let sid = Sid(1);
        let nogood = vec![SignedLiteral::new(sid, true)];
        assert!(host.add_nogood(nogood.clone(), true));
        assert!(!host.add_nogood(nogood, true));
        assert_eq!(host.nogoods().len(), 1);
    }

    #[test]
    fn events_drain_once() {
        let mut host = TestHost::new();
        let sid = host.fresh_sid();
        host.assign_true(sid);
        assert_eq!(host.drain_events(), vec![HostEvent::AssignTrue(sid)]);
        assert!(host.drain_events().is_empty());
    }
}
