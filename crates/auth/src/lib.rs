//! `storefront-auth` — token validation and authorization policy.
//!
//! This crate is intentionally decoupled from HTTP and storage. Tokens are
//! issued elsewhere; this service only validates them and maps roles to
//! permissions.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod roles;

pub use authorize::{AuthzError, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::{Permission, permissions_for_roles};
pub use roles::Role;
