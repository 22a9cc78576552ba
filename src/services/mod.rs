//! Business logic services.
//!
//! Services contain the core logic separated from HTTP handlers: token
//! issuing, admission control, persistence, the food catalog and the
//! classification pipeline.

pub mod classifier;
pub mod credential_store;
pub mod food_catalog;
pub mod history_store;
pub mod imaging;
pub mod json_store;
pub mod prediction_service;
pub mod rate_limiter;
pub mod token_service;
