// src/spec/mod.rs

//! Job specification records.
//!
//! - [`model`] holds the raw, deserializable record and argument types.
//! - [`classify`] turns a raw record into a typed [`JobSpec`] plus its
//!   [`Scheduling`] intent.

pub mod classify;
pub mod model;

pub use classify::{ClassifiedSpec, JobSpec, Scheduling, UNSPECIFIED_STAGE};
pub use model::{JobArgs, RawJobSpec, StringOrList};
