use crate::api::application_dto::{ApplicationDto, NodeTypeDto, RequirementSortDto, StateRulesDto};
use crate::api::global_state_dto::GlobalStateDto;
use crate::domain::application::application::Application;
use crate::domain::application::binding_policy::BindingPolicy;
use crate::domain::protocol::management_protocol::{ManagementProtocol, StateRules};
use crate::domain::protocol::node_type::NodeType;
use crate::domain::protocol::requirement::{Requirement, RequirementSort};
use crate::domain::protocol::static_binding::StaticBindings;
use crate::domain::utils::id::{CapabilityId, InstanceId, NodeTypeId, OperationId, RequirementId, StateId};
use crate::error::{ConversionError, Error};

fn map_requirement_sort(dto_sort: RequirementSortDto) -> RequirementSort {
    match dto_sort {
        RequirementSortDto::ReplicaAware => RequirementSort::ReplicaAware,
        RequirementSortDto::ReplicaUnaware => RequirementSort::ReplicaUnaware,
        RequirementSortDto::Containment => RequirementSort::Containment,
    }
}

// Contains only help functions for the impl TryFrom<ApplicationDto> for Application
impl Application {
    fn node_type_from_dto(dto: NodeTypeDto) -> Result<NodeType, ConversionError> {
        let name = dto.name.clone();
        Self::build_node_type(dto).map_err(|source| ConversionError::InvalidNodeType { node_type: name, source: Box::new(source) })
    }

    fn build_node_type(dto: NodeTypeDto) -> Result<NodeType, ConversionError> {
        let requirements: Vec<Requirement> =
            dto.requirements.iter().map(|r| Requirement::new(r.name.clone(), map_requirement_sort(r.sort))).collect();

        // State rules name requirements; the sort comes from the declaration.
        let resolve = |rules: &StateRulesDto| -> Result<StateRules, ConversionError> {
            let needs = rules
                .needs
                .iter()
                .map(|name| {
                    requirements.iter().find(|r| r.name.as_str() == name).cloned().ok_or_else(|| ConversionError::UnknownRequirement(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(StateRules::new().needs(needs).offers(rules.offers.iter().cloned()).fault_targets(rules.fault_targets.iter().cloned()))
        };

        let mut builder = ManagementProtocol::builder(dto.protocol.initial_state.clone());
        for state in &dto.protocol.states {
            builder = builder.state(state.name.clone(), resolve(&state.rules)?);
        }
        for transition in &dto.protocol.transitions {
            builder = builder.transition(transition.start.clone(), transition.operation.clone(), transition.end.clone(), resolve(&transition.rules)?);
        }
        let protocol = builder.build()?;

        NodeType::new(
            dto.name,
            protocol,
            requirements,
            dto.capabilities.into_iter().map(CapabilityId::new),
            dto.operations.into_iter().map(OperationId::new),
        )
    }

    /// Replays a snapshot: instances first, then their bindings.
    fn restore_global_state(&mut self, dto: GlobalStateDto) -> Result<(), ConversionError> {
        for instance in dto.instances {
            let node_type = NodeTypeId::new(instance.node_type);
            let state = match instance.state {
                Some(state) => StateId::new(state),
                None => self.node_type(&node_type)?.protocol.initial_state().clone(),
            };
            self.restore_instance(&InstanceId::new(instance.id), &node_type, &state)?;
        }

        for binding in dto.bindings {
            self.restore_binding(&InstanceId::new(binding.requester), &RequirementId::new(binding.requirement), &InstanceId::new(binding.server))?;
        }
        Ok(())
    }
}

/// Constructs an application, and optionally its starting deployment, from an ApplicationDto.
impl TryFrom<ApplicationDto> for Application {
    type Error = Error;

    fn try_from(dto: ApplicationDto) -> Result<Self, Self::Error> {
        let binding_policy = match &dto.binding_policy {
            Some(policy) => policy.parse::<BindingPolicy>()?,
            None => BindingPolicy::default(),
        };

        let node_types = dto.node_types.into_iter().map(Application::node_type_from_dto).collect::<Result<Vec<_>, _>>()?;

        let mut static_bindings = StaticBindings::new();
        for binding in dto.static_bindings {
            static_bindings.add(binding.node_type, binding.requirement, binding.target_node_type, binding.capability)?;
        }

        let mut application = Application::new(dto.name, node_types, static_bindings, binding_policy)?;
        if let Some(global_state) = dto.global_state {
            application.restore_global_state(global_state)?;
        }

        log::info!(
            "Application '{}' loaded with {} node types and {} active instances.",
            application.name(),
            application.node_types().count(),
            application.global_state().instance_count()
        );
        Ok(application)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parser::parse_json_str;

    const SMALL_APPLICATION: &str = r#"{
        "name": "small",
        "bindingPolicy": "random",
        "nodeTypes": [
            {
                "name": "database",
                "capabilities": ["endpoint"],
                "operations": ["stop"],
                "protocol": {
                    "initialState": "available",
                    "states": [
                        { "name": "available", "offers": ["endpoint"] },
                        { "name": "stopped" }
                    ],
                    "transitions": [ { "start": "available", "operation": "stop", "end": "stopped" } ]
                }
            },
            {
                "name": "monitor",
                "requirements": [ { "name": "db", "sort": "replicaUnaware" } ],
                "protocol": {
                    "initialState": "watching",
                    "states": [
                        { "name": "watching", "needs": ["db"], "faultTargets": ["idle"] },
                        { "name": "idle" }
                    ]
                }
            }
        ],
        "staticBindings": [
            { "nodeType": "monitor", "requirement": "db", "targetNodeType": "database", "capability": "endpoint" }
        ],
        "globalState": {
            "instances": [
                { "id": "d1", "nodeType": "database" },
                { "id": "m1", "nodeType": "monitor", "state": "watching" }
            ],
            "bindings": [ { "requester": "m1", "requirement": "db", "server": "d1" } ]
        }
    }"#;

    fn load(json: &str) -> Result<Application, Error> {
        Application::try_from(parse_json_str::<ApplicationDto>(json)?)
    }

    #[test]
    fn loads_types_bindings_and_snapshot() {
        let app = load(SMALL_APPLICATION).unwrap();

        assert_eq!(app.binding_policy(), BindingPolicy::Random);
        assert_eq!(app.node_types().count(), 2);
        assert_eq!(app.static_bindings().len(), 1);
        assert_eq!(app.global_state().instance_count(), 2);
        assert_eq!(app.global_state().binding_count(), 1);
        assert!(app.global_state().pending_faults_all().is_empty());
    }

    #[test]
    fn undeclared_needs_name_the_node_type() {
        let json = SMALL_APPLICATION.replace(r#""needs": ["db"]"#, r#""needs": ["queue"]"#);

        match load(&json) {
            Err(Error::ModelConstructionError(ConversionError::InvalidNodeType { node_type, source })) => {
                assert_eq!(node_type, "monitor");
                assert!(matches!(*source, ConversionError::UnknownRequirement(ref name) if name == "queue"));
            }
            other => panic!("unexpected result: {:?}", other.map(|app| app.name().clone())),
        }
    }

    #[test]
    fn snapshot_errors_are_conversion_errors() {
        let json = SMALL_APPLICATION.replace(r#""server": "d1""#, r#""server": "d9""#);
        assert!(matches!(load(&json), Err(Error::ModelConstructionError(ConversionError::Snapshot(_)))));

        let json = SMALL_APPLICATION.replace(r#""bindingPolicy": "random""#, r#""bindingPolicy": "fastest""#);
        assert!(matches!(load(&json), Err(Error::ModelConstructionError(ConversionError::UnknownBindingPolicy(_)))));
    }
}
