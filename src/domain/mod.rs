pub mod analyzer;
pub mod application;
pub mod global_state;
pub mod plan;
pub mod protocol;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_fixtures;
