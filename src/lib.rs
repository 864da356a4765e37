use std::path::Path;

use crate::api::application_dto::ApplicationDto;
use crate::api::plan_dto::PlanDto;
use crate::domain::application::application::Application;
use crate::domain::plan::plan::Plan;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Loads an application definition (node types, static bindings, binding policy and an
/// optional starting global state) from a JSON file.
pub fn load_application(file_path: impl AsRef<Path>) -> Result<Application> {
    let file_path = file_path.as_ref();
    log::info!("Loading application from '{}'.", file_path.display());

    let root_dto: ApplicationDto = parse_json_file::<ApplicationDto>(file_path)?;
    log::debug!("JSON file parsed successfully.");

    Application::try_from(root_dto)
}

/// Loads a management plan from a JSON file.
pub fn load_plan(file_path: impl AsRef<Path>) -> Result<Plan> {
    let file_path = file_path.as_ref();
    log::info!("Loading plan from '{}'.", file_path.display());

    let root_dto: PlanDto = parse_json_file::<PlanDto>(file_path)?;
    Plan::try_from(root_dto)
}
