//! Homelab setup CLI library.
//!
//! The binary in `main.rs` is a thin clap dispatcher; the pre-flight
//! orchestration lives here so the check logic can be exercised by the
//! integration tests with a scripted command runner.

pub mod preflight;
