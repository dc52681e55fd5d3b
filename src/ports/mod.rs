//! Capability traits separating the core from its collaborators.

pub mod price_source;
pub mod order_executor;
pub mod config_port;
pub mod report_port;
