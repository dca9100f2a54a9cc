//! End-to-end scenarios run through `Checker`/`Builder`/`TestHost`, one per
//! concrete case.

use std::collections::HashMap;

use lra_theory::checker::Checker;
use lra_theory::config::Config;
use lra_theory::host::{SignedLiteral, TestHost};
use lra_theory::registry::builder::{AssertOp, Builder};
use lra_theory::registry::AtomRegistry;
use lra_theory::types::{Cid, CondId, Pid, Sense, Var};

fn terms(expr: &[(f64, &str)]) -> HashMap<CondId, Vec<(f64, Var)>> {
    let mut m = HashMap::new();
    m.insert(CondId::TRUE, expr.iter().map(|(c, v)| (*c, Var::from(*v))).collect());
    m
}

#[test]
fn domain_and_sum_feasible() {
    let mut registry = AtomRegistry::new();
    let mut host = TestHost::new();
    let mut builder = Builder::new(&mut registry);

    let dom_sid = host.fresh_sid();
    builder.dom(Cid(1), dom_sid, Pid::default_pid(), "x".into(), 0.0, 10.0).unwrap();
    let sum_sid = host.fresh_sid();
    builder
        .sum(Cid(2), sum_sid, Pid::default_pid(), Sense::Ge, 5.0, terms(&[(1.0, "x")]))
        .unwrap();
    let obj_sid = host.fresh_sid();
    builder
        .objective(Cid(3), obj_sid, Pid::default_pid(), false, 0, terms(&[(1.0, "x")]))
        .unwrap();

    let mut checker = Checker::new(registry, Config::default());
    host.assign_true(dom_sid);
    host.assign_true(sum_sid);
    host.assign_true(obj_sid);
    let events = host.drain_events();
    checker.propagate(&events, &mut host).unwrap();

    assert!(host.nogoods().is_empty());
    let (status, assignment) = checker.optimize().unwrap().remove(&Pid::default_pid()).unwrap();
    assert_eq!(status, lra_theory::partition::OptimizeStatus::Optimal);
    let x = assignment[&Var::from("x")];
    assert!((5.0..=10.0 + 1e-6).contains(&x), "x = {x} out of range");
}

#[test]
fn infeasible_pair_reports_both_cids() {
    let mut registry = AtomRegistry::new();
    let mut host = TestHost::new();
    let mut builder = Builder::new(&mut registry);

    let a_sid = host.fresh_sid();
    builder
        .sum(Cid(1), a_sid, Pid::default_pid(), Sense::Ge, 3.0, terms(&[(1.0, "x")]))
        .unwrap();
    let b_sid = host.fresh_sid();
    builder
        .sum(Cid(2), b_sid, Pid::default_pid(), Sense::Le, 1.0, terms(&[(1.0, "x")]))
        .unwrap();

    let mut checker = Checker::new(registry, Config::default());
    host.assign_true(a_sid);
    host.assign_true(b_sid);
    let events = host.drain_events();
    checker.propagate(&events, &mut host).unwrap();

    assert_eq!(host.nogoods().len(), 1);
    let nogood = &host.nogoods()[0];
    assert_eq!(nogood.len(), 2);
    assert!(nogood.contains(&SignedLiteral::new(a_sid, true)));
    assert!(nogood.contains(&SignedLiteral::new(b_sid, true)));
}

#[test]
fn universal_violation_blames_the_assert() {
    let mut registry = AtomRegistry::new();
    let mut host = TestHost::new();
    let mut builder = Builder::new(&mut registry);

    let dom_sid = host.fresh_sid();
    builder.dom(Cid(1), dom_sid, Pid::default_pid(), "x".into(), 0.0, 10.0).unwrap();
    let assert_sid = host.fresh_sid();
    builder
        .assert(Cid(2), assert_sid, Pid::default_pid(), AssertOp::Ge, 4.0, terms(&[(1.0, "x")]))
        .unwrap();

    let mut checker = Checker::new(registry, Config::default());
    host.assign_true(dom_sid);
    host.assign_true(assert_sid);
    let events = host.drain_events();
    checker.propagate(&events, &mut host).unwrap();

    assert_eq!(host.nogoods().len(), 1);
    let nogood = &host.nogoods()[0];
    assert!(nogood.contains(&SignedLiteral::new(assert_sid, true)));
}

#[test]
fn universal_violation_fixed_by_adding_a_constraint() {
    let mut registry = AtomRegistry::new();
    let mut host = TestHost::new();
    let mut builder = Builder::new(&mut registry);

    let dom_sid = host.fresh_sid();
    builder.dom(Cid(1), dom_sid, Pid::default_pid(), "x".into(), 0.0, 10.0).unwrap();
    let second_sum_sid = host.fresh_sid();
    builder
        .sum(Cid(2), second_sum_sid, Pid::default_pid(), Sense::Ge, 4.0, terms(&[(1.0, "x")]))
        .unwrap();
    let assert_sid = host.fresh_sid();
    builder
        .assert(Cid(3), assert_sid, Pid::default_pid(), AssertOp::Ge, 4.0, terms(&[(1.0, "x")]))
        .unwrap();

    let mut checker = Checker::new(registry, Config::default());
    host.assign_true(dom_sid);
    host.assign_false(second_sum_sid);
    host.assign_true(assert_sid);
    let events = host.drain_events();
    checker.propagate(&events, &mut host).unwrap();

    assert_eq!(host.nogoods().len(), 1);
    let nogood = &host.nogoods()[0];
    assert!(nogood.contains(&SignedLiteral::new(assert_sid, true)));
    assert!(nogood.contains(&SignedLiteral::new(second_sum_sid, false)));
}

#[test]
fn lexicographic_optimize_minimizes_lower_weight_first() {
    let mut registry = AtomRegistry::new();
    let mut host = TestHost::new();
    let mut builder = Builder::new(&mut registry);

    let dom_x = host.fresh_sid();
    builder.dom(Cid(1), dom_x, Pid::default_pid(), "x".into(), 0.0, 10.0).unwrap();
    let dom_y = host.fresh_sid();
    builder.dom(Cid(2), dom_y, Pid::default_pid(), "y".into(), 0.0, 10.0).unwrap();
    let sum_sid = host.fresh_sid();
    builder
        .sum(Cid(3), sum_sid, Pid::default_pid(), Sense::Ge, 7.0, terms(&[(1.0, "x"), (1.0, "y")]))
        .unwrap();
    let min_x = host.fresh_sid();
    builder
        .objective(Cid(4), min_x, Pid::default_pid(), false, 0, terms(&[(1.0, "x")]))
        .unwrap();
    let min_y = host.fresh_sid();
    builder
        .objective(Cid(5), min_y, Pid::default_pid(), false, 1, terms(&[(1.0, "y")]))
        .unwrap();

    let mut checker = Checker::new(registry, Config::default());
    for sid in [dom_x, dom_y, sum_sid, min_x, min_y] {
        host.assign_true(sid);
    }
    let events = host.drain_events();
    checker.propagate(&events, &mut host).unwrap();
    assert!(host.nogoods().is_empty());

    let (status, assignment) = checker.optimize().unwrap().remove(&Pid::default_pid()).unwrap();
    assert_eq!(status, lra_theory::partition::OptimizeStatus::Optimal);
    assert!((assignment[&Var::from("x")] - 0.0).abs() < 1e-6);
    assert!((assignment[&Var::from("y")] - 7.0).abs() < 1e-6);
}

#[test]
fn equality_domain_is_satisfiable() {
    let mut registry = AtomRegistry::new();
    let mut host = TestHost::new();
    let mut builder = Builder::new(&mut registry);

    let dom_sid = host.fresh_sid();
    builder.dom(Cid(1), dom_sid, Pid::default_pid(), "x".into(), 3.0, 3.0).unwrap();
    let sum_sid = host.fresh_sid();
    builder
        .sum(Cid(2), sum_sid, Pid::default_pid(), Sense::Ge, 3.0, terms(&[(1.0, "x")]))
        .unwrap();
    let obj_sid = host.fresh_sid();
    builder
        .objective(Cid(3), obj_sid, Pid::default_pid(), false, 0, terms(&[(1.0, "x")]))
        .unwrap();

    let mut checker = Checker::new(registry, Config::default());
    host.assign_true(dom_sid);
    host.assign_true(sum_sid);
    host.assign_true(obj_sid);
    let events = host.drain_events();
    checker.propagate(&events, &mut host).unwrap();

    assert!(host.nogoods().is_empty());
    let (status, assignment) = checker.optimize().unwrap().remove(&Pid::default_pid()).unwrap();
    assert_eq!(status, lra_theory::partition::OptimizeStatus::Optimal);
    assert!((assignment[&Var::from("x")] - 3.0).abs() < 1e-6);
}
