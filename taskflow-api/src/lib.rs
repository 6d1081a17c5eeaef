//! # TaskFlow API Server Library
//!
//! This library provides the core functionality for the TaskFlow API server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `clients`: Outbound HTTP clients (email, object storage)
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers
//! - `services`: Side-effect cascade for task mutations

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
