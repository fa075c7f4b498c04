//! Contacts Core - Shared domain types.
//!
//! This crate provides the types shared by every contacts component:
//! - `api` - The REST service (handlers, repository, persistence gateway)
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP. Row mapping lives next to the queries in the `api` crate.
//!
//! # Modules
//!
//! - [`types`] - The `Contact` entity, its creation payload, and the `ContactId` newtype

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
