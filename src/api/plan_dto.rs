use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlanDto {
    pub actions: Vec<ActionDto>,

    #[serde(default)]
    pub constraints: Vec<ConstraintDto>,

    /// Orders the actions as listed, on top of the explicit constraints.
    #[serde(default)]
    pub sequence: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActionDto {
    /// Defaults to the 1-based position in the list.
    pub id: Option<String>,

    #[serde(flatten)]
    pub body: ActionBodyDto,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ActionBodyDto {
    ScaleOut { node_type: String, instance: String },
    ScaleOutContained { node_type: String, instance: String, container: String },
    ScaleIn { instance: String },
    OpStart { instance: String, operation: String },
    OpEnd { instance: String, operation: String },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintDto {
    pub before: String,
    pub after: String,
}
