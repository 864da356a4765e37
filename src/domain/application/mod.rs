pub mod application;
pub mod binding_policy;
mod from_dto;
