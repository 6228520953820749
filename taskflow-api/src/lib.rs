//! # TaskFlow API Server Library
//!
//! HTTP surface of TaskFlow: configuration, router, error mapping and the
//! route handlers. Business rules live in `taskflow-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
