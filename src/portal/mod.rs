//! Identity provider login and session handling.
//!
//! - `session`: cookie-persisting HTTP session and the `Transport` seam
//! - `auth`: the SSO login handshake
//! - `service`: CAS service access after login
//! - `endpoints`: fixed URLs and page markers

pub mod auth;
pub mod endpoints;
pub mod service;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthGrant, AuthSuccess, LoginForm, authenticate};
pub use service::{ServiceAccess, access_service};
pub use session::{HttpSession, PageResponse, Redirects, Transport};
