//! CLI command implementations

pub mod benchmark;
pub mod cache;
pub mod completions;
pub mod compute;
pub mod init;
pub mod report;
