pub mod action;
mod from_dto;
pub mod plan;
