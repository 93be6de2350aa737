// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

//! secretsfetcher - fetch secrets from AWS Secrets Manager into local files
//!
//! The binary is a thin wrapper over this library: [`cli`] parses arguments,
//! [`config`] merges flags, environment, config file and manifest, and
//! [`commands`] runs the fetch through the `secretsfetcher-secrets` pipeline.

/// CLI argument parsing, errors and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Configuration file and settings resolution.
pub mod config;
/// Tracing and logging configuration.
pub mod tracing;
