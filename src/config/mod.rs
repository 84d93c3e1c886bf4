// src/config/mod.rs

//! Build file loading.
//!
//! - [`model`] mirrors the on-disk format.
//! - [`loader`] reads TOML / JSON files.
//! - [`validate`] turns a raw file into a checked [`BuildFile`].
//! - [`strings`] implements `{name}` token substitution.

pub mod loader;
pub mod model;
pub mod strings;
pub mod validate;

pub use loader::{default_build_files, load_all, load_and_validate, load_from_path};
pub use model::{BuildFile, ConfigSection, RawBuildFile};
pub use strings::Substituter;
