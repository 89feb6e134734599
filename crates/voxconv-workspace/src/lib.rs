//! # voxconv-workspace
//!
//! Flat, in-process key → bytes store holding uploaded inputs and
//! converted outputs. Nothing is written to disk; entries live as long as
//! the [`VirtualWorkspace`] handle (or any of its clones).

pub mod error;
pub mod store;

pub use error::WorkspaceError;
pub use store::VirtualWorkspace;
