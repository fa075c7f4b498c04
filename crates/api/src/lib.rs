//! Contacts API library.
//!
//! Uniqueness-checked CRUD over a single `contacts` table, served with axum
//! and backed by `PostgreSQL`. The binary in `main.rs` wires configuration,
//! logging, the store, and the optional Auth Gate around [`routes::router`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
