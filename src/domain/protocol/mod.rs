pub mod management_protocol;
pub mod node_type;
pub mod requirement;
pub mod static_binding;
