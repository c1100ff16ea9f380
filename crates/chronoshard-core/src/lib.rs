//! Shared foundation for the chronoshard workspace: configuration, the
//! injected clock capability, core enums and scope types, and the base
//! error taxonomy. Everything here is dependency-light so the store crate
//! and downstream services can share it freely.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod telemetry;
pub mod types;
pub mod util;
