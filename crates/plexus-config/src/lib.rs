//! Configuration types and loaders for PLEXUS.
//!
//! This crate owns the on-disk configuration schema so the runtime crates can
//! share a single source of truth.

pub mod kernel;

pub use kernel::{KernelConfig, LogConfig, RenderConfig, RunMode};
