#![allow(dead_code)]

use std::path::PathBuf;

use mprot_analyzer::api::application_dto::ApplicationDto;
use mprot_analyzer::api::global_state_dto::{BindingDto, GlobalStateDto, InstanceDto};
use mprot_analyzer::domain::application::application::Application;
use mprot_analyzer::domain::application::binding_policy::BindingPolicy;
use mprot_analyzer::domain::plan::plan::Plan;
use mprot_analyzer::domain::utils::id::{InstanceId, NodeTypeId, OperationId};
use mprot_analyzer::loader::parser::parse_json_file;
use mprot_analyzer::{load_application, load_plan};

pub fn data_path(file_name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data").join(file_name)
}

pub fn webshop() -> Application {
    load_application(data_path("webshop.json")).expect("webshop fixture must load")
}

pub fn webshop_with(binding_policy: BindingPolicy) -> Application {
    let mut app = webshop();
    app.set_binding_policy(binding_policy);
    app
}

pub fn plan(file_name: &str) -> Plan {
    load_plan(data_path(file_name)).expect("plan fixture must load")
}

pub fn id(name: &str) -> InstanceId {
    InstanceId::new(name)
}

pub fn node_type(name: &str) -> NodeTypeId {
    NodeTypeId::new(name)
}

pub fn op(name: &str) -> OperationId {
    OperationId::new(name)
}

/// Scales out every `(node type, instance)` pair in order.
pub fn deploy(app: &mut Application, instances: &[(&str, &str)]) {
    for (node_type_name, instance) in instances {
        app.scale_out(&node_type(node_type_name), &id(instance)).expect("scale out must succeed");
    }
}

/// The webshop definition resuming from the given instances and bindings instead of an
/// empty deployment. Instances start in their initial state.
pub fn webshop_from_snapshot(instances: &[(&str, &str)], bindings: &[(&str, &str, &str)]) -> Application {
    let mut dto: ApplicationDto = parse_json_file(data_path("webshop.json")).expect("webshop fixture must parse");
    dto.global_state = Some(GlobalStateDto {
        instances: instances
            .iter()
            .map(|(id, node_type)| InstanceDto { id: id.to_string(), node_type: node_type.to_string(), state: None })
            .collect(),
        bindings: bindings
            .iter()
            .map(|(requester, requirement, server)| BindingDto {
                requester: requester.to_string(),
                requirement: requirement.to_string(),
                server: server.to_string(),
            })
            .collect(),
    });
    Application::try_from(dto).expect("snapshot must load")
}
