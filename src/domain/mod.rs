//! Core domain types and logic.

pub mod bar;
pub mod detector;
pub mod signal;
pub mod volatility;
pub mod position;
pub mod controller;
pub mod allocator;
pub mod orchestrator;
pub mod order;
pub mod config;
pub mod metrics;
pub mod error;
