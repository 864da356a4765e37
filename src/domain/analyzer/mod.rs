pub mod analyzer;
pub mod budget;
pub mod report;
mod search;
