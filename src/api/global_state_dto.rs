use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStateDto {
    pub instances: Vec<InstanceDto>,

    #[serde(default)]
    pub bindings: Vec<BindingDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDto {
    pub id: String,
    pub node_type: String,

    /// Defaults to the initial state of the node type's protocol.
    pub state: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BindingDto {
    pub requester: String,
    pub requirement: String,
    pub server: String,
}
