//! Command implementations

pub mod build;
pub mod destroy;
pub mod run;
pub mod stop;
