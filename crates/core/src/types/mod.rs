//! Core types for the contacts domain.

pub mod contact;
pub mod id;

pub use contact::{Contact, ContactError, NewContact};
pub use id::*;
