//! HTTP middleware stack for the contacts API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, outermost)
//! 2. `CorsLayer`
//! 3. `TraceLayer` (request span)
//! 4. Request ID (add unique ID to each request)
//! 5. Auth Gate (`/contacts` routes only, when required)

pub mod auth;
pub mod request_id;

pub use auth::{RequireAuth, require_auth};
pub use request_id::request_id_middleware;
