//! Reading tracker application: personal library and reading progress.

pub mod bootstrap;
pub mod modules;

pub use modules::*;
