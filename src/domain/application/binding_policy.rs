use rand::rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use std::str::FromStr;

use crate::domain::utils::id::InstanceId;
use crate::error::ConversionError;

/// The rule (pi) used to pick one server among the capable candidates of a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingPolicy {
    /// Always the first capable candidate in instance id order.
    #[default]
    Greedy,

    /// Uniformly at random among all capable candidates.
    Random,
}

impl BindingPolicy {
    pub fn select(&self, candidates: &[InstanceId]) -> Option<InstanceId> {
        match self {
            BindingPolicy::Greedy => candidates.first().cloned(),
            BindingPolicy::Random => candidates.choose(&mut rng()).cloned(),
        }
    }

    /// A deterministic policy leaves no binding choice open to the analyzer.
    pub fn is_deterministic(&self) -> bool {
        matches!(self, BindingPolicy::Greedy)
    }
}

impl FromStr for BindingPolicy {
    type Err = ConversionError;

    fn from_str(policy: &str) -> Result<Self, Self::Err> {
        match policy {
            "greedy" | "Greedy" => Ok(BindingPolicy::Greedy),
            "random" | "Random" => Ok(BindingPolicy::Random),
            _ => Err(ConversionError::UnknownBindingPolicy(policy.to_string())),
        }
    }
}
