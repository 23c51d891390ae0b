//! CLI command implementations.

pub mod devices;
pub mod inspect;
pub mod run;
