//! `stockroute-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how to
//! parse roles, map them to permissions, mint/validate tokens and hash
//! credentials, but never where users are stored.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{authorize, AuthzError};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtIssuer, JwtValidator, TokenError};
pub use password::{Argon2Hasher, CredentialHasher, PasswordHashError};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::{Role, RoleParseError};
pub use user::{NewUser, User};
