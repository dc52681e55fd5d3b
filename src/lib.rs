//! ninetrader — sequential-reversal ("magic nine") trading strategy engine.
//!
//! Hexagonal architecture: signal and risk logic in [`domain`], capability
//! traits in [`ports`], concrete collaborators in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
