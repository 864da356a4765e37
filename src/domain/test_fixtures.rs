//! Small in-code topology shared by the unit tests of the domain modules.

use crate::domain::application::application::Application;
use crate::domain::application::binding_policy::BindingPolicy;
use crate::domain::protocol::management_protocol::{ManagementProtocol, StateRules};
use crate::domain::protocol::node_type::NodeType;
use crate::domain::protocol::requirement::Requirement;
use crate::domain::protocol::static_binding::StaticBindings;
use crate::domain::utils::id::{CapabilityId, InstanceId, OperationId};

pub fn id(name: &str) -> InstanceId {
    InstanceId::new(name)
}

fn node_type(name: &str, protocol: ManagementProtocol, requirements: Vec<Requirement>, capabilities: &[&str], operations: &[&str]) -> NodeType {
    NodeType::new(
        name,
        protocol,
        requirements,
        capabilities.iter().map(|c| CapabilityId::new(*c)),
        operations.iter().map(|o| OperationId::new(*o)),
    )
    .unwrap()
}

pub fn node_types() -> Vec<NodeType> {
    let db_unaware = Requirement::replica_unaware("db");
    let db_aware = Requirement::replica_aware("db");
    let store = Requirement::replica_aware("store");
    let host = Requirement::containment("host");
    let engine = Requirement::containment("engine");

    let database = ManagementProtocol::builder("available")
        .state("available", StateRules::new().offers(["endpoint"]))
        .state("stopped", StateRules::new())
        .transition("available", "stop", "stopped", StateRules::new())
        .transition("stopped", "start", "available", StateRules::new())
        .build()
        .unwrap();

    let monitor = ManagementProtocol::builder("watching")
        .state("watching", StateRules::new().needs([db_unaware.clone()]).fault_targets(["idle"]))
        .state("idle", StateRules::new())
        .transition("idle", "watch", "watching", StateRules::new().needs([db_unaware.clone()]).fault_targets(["idle"]))
        .build()
        .unwrap();

    let frontend = ManagementProtocol::builder("stopped")
        .state("stopped", StateRules::new())
        .state("running", StateRules::new().needs([db_unaware.clone()]).offers(["http"]).fault_targets(["stopped"]))
        .transition("stopped", "start", "running", StateRules::new().needs([db_unaware.clone()]).fault_targets(["stopped"]))
        .transition("running", "stop", "stopped", StateRules::new())
        .build()
        .unwrap();

    let analytics = ManagementProtocol::builder("ready")
        .state("ready", StateRules::new().needs([db_aware.clone()]).fault_targets(["degraded"]))
        .state("degraded", StateRules::new())
        .state("done", StateRules::new())
        .transition("ready", "process", "done", StateRules::new().needs([db_aware.clone()]).fault_targets(["degraded"]))
        .transition("degraded", "recover", "ready", StateRules::new())
        .build()
        .unwrap();

    let legacy = ManagementProtocol::builder("waiting")
        .state("waiting", StateRules::new().needs([db_aware.clone()]).fault_targets(["waiting"]))
        .build()
        .unwrap();

    let cache = ManagementProtocol::builder("serving")
        .state(
            "serving",
            StateRules::new().needs([store.clone(), db_unaware.clone()]).fault_targets(["cold", "offline", "partial"]),
        )
        .state("partial", StateRules::new().needs([db_unaware.clone()]))
        .state("cold", StateRules::new())
        .state("offline", StateRules::new().needs([store.clone()]))
        .build()
        .unwrap();

    let vm = ManagementProtocol::builder("on")
        .state("on", StateRules::new().offers(["host"]))
        .state("off", StateRules::new())
        .transition("on", "halt", "off", StateRules::new())
        .transition("off", "boot", "on", StateRules::new())
        .build()
        .unwrap();

    let docker = ManagementProtocol::builder("running")
        .state("running", StateRules::new().needs([host.clone()]).offers(["engine"]))
        .build()
        .unwrap();

    let app = ManagementProtocol::builder("deployed")
        .state("deployed", StateRules::new().needs([engine.clone()]))
        .build()
        .unwrap();

    vec![
        node_type("database", database, vec![], &["endpoint"], &["start", "stop"]),
        node_type("monitor", monitor, vec![db_unaware.clone()], &[], &["watch"]),
        node_type("frontend", frontend, vec![db_unaware], &["http"], &["start", "stop"]),
        node_type("analytics", analytics, vec![db_aware.clone()], &[], &["process", "recover"]),
        node_type("legacy", legacy, vec![db_aware], &[], &[]),
        node_type("cache", cache, vec![store, Requirement::replica_unaware("db")], &[], &[]),
        node_type("vm", vm, vec![], &["host"], &["halt", "boot"]),
        node_type("docker", docker, vec![host], &["engine"], &[]),
        node_type("app", app, vec![engine], &[], &[]),
    ]
}

pub fn static_bindings() -> StaticBindings {
    let mut bindings = StaticBindings::new();
    for source in ["monitor", "frontend", "analytics", "legacy", "cache"] {
        bindings.add(source, "db", "database", "endpoint").unwrap();
    }
    bindings.add("cache", "store", "database", "endpoint").unwrap();
    bindings.add("docker", "host", "vm", "host").unwrap();
    bindings.add("app", "engine", "docker", "engine").unwrap();
    bindings
}

pub fn application(binding_policy: BindingPolicy) -> Application {
    Application::new("fixture", node_types(), static_bindings(), binding_policy).unwrap()
}
