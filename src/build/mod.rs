// src/build/mod.rs

//! Executable build structure.
//!
//! - [`stage`] holds [`Stage`], a parallel or sequential group of jobs.
//! - [`system`] holds [`BuildSystem`], the ordered, named stage container
//!   with its open/closed lifecycle and full/partial run modes.

pub mod stage;
pub mod system;

pub use stage::Stage;
pub use system::BuildSystem;
