//! CLI subcommand implementations.

pub mod rules;
pub mod scan;
