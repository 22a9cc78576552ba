//! Food recognition API.
//!
//! An HTTP service that classifies uploaded food photos through an external
//! inference endpoint, describes the result from a bundled food catalog and
//! keeps a per-user prediction history.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Storage**: JSON files with atomic temp-file-then-rename writes
//! - **Authentication**: HS256 access/refresh tokens, bcrypt password digests
//! - **Admission control**: in-memory fixed-window rate limits per route

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
