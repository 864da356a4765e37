pub mod application_dto;
pub mod global_state_dto;
pub mod plan_dto;
