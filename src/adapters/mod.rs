//! Concrete adapter implementations for the ports.

pub mod csv_price_source;
pub mod csv_report_adapter;
pub mod file_config_adapter;
pub mod sim_executor;
