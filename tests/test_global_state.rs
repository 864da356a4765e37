mod common;

use common::{deploy, id, node_type, op, webshop};
use mprot_analyzer::domain::global_state::fault::Fault;
use mprot_analyzer::domain::protocol::requirement::Requirement;
use mprot_analyzer::error::ExecutionError;

fn assert_binding_consistency(app: &mprot_analyzer::domain::application::application::Application) {
    let state = app.global_state();
    for instance in state.active_instances() {
        let needed = state.needed_reqs(instance.id()).unwrap();
        let satisfied = state.satisfied_reqs(instance.id()).unwrap();
        assert!(satisfied.is_subset(&needed), "'{}' satisfies more than it needs", instance.id());

        for requirement in &satisfied {
            let binding = state.bindings_of(instance.id()).unwrap().iter().find(|b| &b.requirement == requirement).unwrap();
            let server = state.instance(&binding.server).unwrap();
            let target = state.binding_target(instance, requirement).unwrap();
            assert!(server.offers(&target.capability));
        }
    }
}

#[test]
fn instance_without_requirements_has_no_faults_or_bindings() {
    let mut app = webshop();
    deploy(&mut app, &[("database", "d1")]);

    let state = app.global_state();
    assert!(state.pending_faults(&id("d1")).unwrap().is_empty());
    assert!(state.bindings_of(&id("d1")).unwrap().is_empty());
    assert_eq!(state.binding_count(), 0);
}

#[test]
fn late_server_makes_the_fault_resolvable() {
    let mut app = webshop();
    deploy(&mut app, &[("monitor", "m1")]);

    let fault = Fault::new(id("m1"), Requirement::replica_unaware("db"));
    assert_eq!(app.global_state().pending_faults(&id("m1")).unwrap().len(), 1);
    assert!(!app.global_state().is_resolvable_fault(&fault).unwrap());

    deploy(&mut app, &[("database", "d1")]);
    assert!(app.global_state().is_resolvable_fault(&fault).unwrap());

    assert_eq!(app.autoreconnect(&id("m1"), &fault.requirement).unwrap(), id("d1"));
    let state = app.global_state();
    assert!(state.pending_faults(&id("m1")).unwrap().is_empty());
    assert_eq!(state.satisfied_reqs(&id("m1")).unwrap().len(), 1);
    assert_binding_consistency(&app);
}

#[test]
fn stale_bindings_are_unsatisfied_not_errors() {
    let mut app = webshop();
    deploy(&mut app, &[("database", "d1"), ("monitor", "m1")]);

    assert_eq!(app.global_state().offered_caps(&id("d1")).unwrap().len(), 1);

    app.op_start(&id("d1"), &op("stop")).unwrap();
    let state = app.global_state();
    assert!(state.offered_caps(&id("d1")).unwrap().is_empty());
    assert_eq!(state.binding_count(), 1);
    assert!(state.satisfied_reqs(&id("m1")).unwrap().is_empty());
    assert_eq!(state.pending_faults_all().len(), 1);
}

#[test]
fn queries_are_pure() {
    let mut app = webshop();
    deploy(&mut app, &[("monitor", "m1"), ("analytics", "a1"), ("database", "d1")]);

    let state = app.global_state();
    assert_eq!(state.pending_faults_all(), state.pending_faults_all());
    assert_eq!(state.satisfied_reqs(&id("a1")).unwrap(), state.satisfied_reqs(&id("a1")).unwrap());
    assert_eq!(state.capable_instances(&id("m1"), &Requirement::replica_unaware("db")).unwrap(), vec![id("d1")]);
}

#[test]
fn replica_aware_faults_are_never_resolvable() {
    let mut app = webshop();
    deploy(&mut app, &[("analytics", "a1"), ("database", "d1")]);

    let fault = Fault::new(id("a1"), Requirement::replica_aware("db"));
    assert!(app.global_state().is_pending_fault(&fault).unwrap());
    assert!(!app.global_state().is_resolvable_fault(&fault).unwrap());
}

#[test]
fn destroyed_server_leaves_no_dangling_bindings() {
    let mut app = webshop();
    deploy(&mut app, &[("database", "d1"), ("monitor", "m1"), ("monitor", "m2")]);
    assert_eq!(app.global_state().binding_count(), 2);

    app.scale_in(&id("d1")).unwrap();
    let state = app.global_state();
    assert_eq!(state.binding_count(), 0);
    assert_eq!(state.pending_faults_all().len(), 2);
    assert!(matches!(state.instance(&id("d1")), Err(ExecutionError::UnknownInstance(_))));
}

#[test]
fn cascade_leaves_no_broken_instances() {
    let mut app = webshop();
    deploy(&mut app, &[("vm", "v1"), ("vm", "v2")]);
    app.scale_out_contained(&node_type("docker"), &id("k1"), &id("v1")).unwrap();
    app.scale_out_contained(&node_type("docker"), &id("k2"), &id("v2")).unwrap();
    app.scale_out_contained(&node_type("api"), &id("p1"), &id("k1")).unwrap();
    app.scale_out_contained(&node_type("api"), &id("p2"), &id("k1")).unwrap();

    app.scale_in(&id("v1")).unwrap();

    let state = app.global_state();
    assert!(state.broken_instances().is_empty());
    assert_eq!(state.instance_count(), 2);
    for gone in ["v1", "k1", "p1", "p2"] {
        assert_eq!(state.instance(&id(gone)).unwrap_err(), ExecutionError::UnknownInstance(id(gone)));
    }
    assert!(state.contains(&id("k2")));
    assert_binding_consistency(&app);
}
