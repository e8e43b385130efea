/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `generate`: Credit-gated text generation endpoint
/// - `credits`: Credit balance endpoint

pub mod credits;
pub mod generate;
pub mod health;
