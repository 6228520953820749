//! # TaskFlow Shared Library
//!
//! Domain types, persistence and business rules of TaskFlow, independent of
//! the HTTP layer.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Token validation, role resolution and authorization policies
//! - `store`: Transactional persistence port with PostgreSQL and in-memory adapters
//! - `services`: Project, task, comment and label operations
//! - `db`: Connection pool and migrations
//! - `error`: Domain error type

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the TaskFlow shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
