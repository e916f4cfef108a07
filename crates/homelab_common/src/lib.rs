//! Shared library for the homelab setup tooling.
//!
//! Everything here is host-inspection plumbing: a single command
//! execution boundary, read-only system probes built on top of it,
//! the persistent setup configuration, completion markers, and the
//! console output primitives used by the CLI.

pub mod command_exec;
pub mod config;
pub mod display;
pub mod elevation;
pub mod markers;
pub mod probes;
pub mod testing;
