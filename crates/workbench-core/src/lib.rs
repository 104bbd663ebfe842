//! workbench-core library.
//!
//! Builds a tree of diagram elements from a graph of linked work items, lays
//! it out on a retained-mode canvas, keeps it current under live project
//! changes, and supports dragging whole subtrees.
//!
//! # Conventions
//!
//! - **Errors**: Use [`error::WorkbenchError`] at public entry points and
//!   `anyhow::Result` for file/config plumbing.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod controller;
pub mod drag;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod hierarchy;
pub mod model;
pub mod project;
pub mod scene;
pub mod scheduler;
