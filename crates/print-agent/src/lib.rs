//! Command-line front end for the printer orchestrator

pub mod bootstrap;
pub mod commands;
