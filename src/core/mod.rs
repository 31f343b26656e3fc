//! Core domain models for the release pipeline
//!
//! This module holds the pure decision logic: environment classification,
//! release version resolution, tag computation, and the per-run context.

pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod release;
pub mod tags;
pub mod version;

pub use context::*;
pub use environment::*;
pub use error::*;
pub use release::*;
pub use tags::*;
