//! Command implementations for the mwi CLI.
//!
//! Each submodule handles a group of related commands.

pub mod install;
pub mod packages;
pub mod query;
