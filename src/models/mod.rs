//! Data models and API request/response types.
//!
//! This module contains the records persisted to disk and the JSON shapes
//! exchanged with clients.

/// Stored credentials and auth request/response bodies
pub mod user;
/// Prediction history records
pub mod history;
/// Typed food metadata and catalog search shapes
pub mod food;
/// Classifier output and prediction responses
pub mod prediction;
