pub mod binding;
pub mod fault;
pub mod global_state;
pub mod node_instance;
