//! # TaskFlow Shared Library
//!
//! Shared types and business primitives used by the TaskFlow API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and SQL operations
//! - `auth`: JWT, password hashing, the authorization policy and the actor
//!   extractor
//! - `db`: Connection pool and migration helpers
//! - `realtime`: Redis-backed notification fan-out

pub mod auth;
pub mod db;
pub mod models;
pub mod realtime;

/// Current version of the TaskFlow shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
