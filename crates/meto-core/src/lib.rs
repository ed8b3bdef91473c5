//! Core data types, validation and window selection for the weather service
//!
//! This crate provides the observation model shared by every other crate,
//! the collaborator traits the pipeline is wired through, and the pure
//! window computation used by both export paths.

pub mod pipeline;
pub mod types;
pub mod window;

pub use pipeline::*;
pub use types::*;
pub use window::*;
