//! CLI subcommand implementations.

pub mod clear;
pub mod list;
pub mod rate;
pub mod start;
pub mod status;
pub mod stop;
pub mod util;
