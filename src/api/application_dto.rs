use serde::{Deserialize, Serialize};

use crate::api::global_state_dto::GlobalStateDto;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDto {
    pub name: String,

    /// `greedy` (default) or `random`.
    pub binding_policy: Option<String>,

    pub node_types: Vec<NodeTypeDto>,

    #[serde(default)]
    pub static_bindings: Vec<StaticBindingDto>,

    /// Deployment to resume from instead of the empty global state.
    pub global_state: Option<GlobalStateDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeDto {
    pub name: String,

    #[serde(default)]
    pub requirements: Vec<RequirementDto>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub operations: Vec<String>,

    pub protocol: ProtocolDto,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RequirementDto {
    pub name: String,
    pub sort: RequirementSortDto,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RequirementSortDto {
    ReplicaAware,
    ReplicaUnaware,
    Containment,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolDto {
    pub initial_state: String,
    pub states: Vec<StateDto>,

    #[serde(default)]
    pub transitions: Vec<TransitionDto>,
}

/// Needs, offers and fault handling states of a stable or transient state.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct StateRulesDto {
    #[serde(default)]
    pub needs: Vec<String>,
    #[serde(default)]
    pub offers: Vec<String>,
    #[serde(default)]
    pub fault_targets: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StateDto {
    pub name: String,

    #[serde(flatten)]
    pub rules: StateRulesDto,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransitionDto {
    pub start: String,
    pub operation: String,
    pub end: String,

    /// Rules of the transient state.
    #[serde(flatten)]
    pub rules: StateRulesDto,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StaticBindingDto {
    pub node_type: String,
    pub requirement: String,
    pub target_node_type: String,
    pub capability: String,
}
