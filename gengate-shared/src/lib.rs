//! # Gengate Shared Library
//!
//! This crate contains the collaborator clients and text utilities used by
//! the gengate API server.
//!
//! ## Module Organization
//!
//! - `auth`: Identity verification against the hosted auth service
//! - `credits`: Credit balance store and deduction logic
//! - `provider`: Generative-text provider client (Gemini)
//! - `codeblocks`: Fenced code-block extraction from generated text
//! - `db`: Database connection pooling

pub mod auth;
pub mod codeblocks;
pub mod credits;
pub mod db;
pub mod provider;

/// Current version of the gengate shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
