//! `shopledger-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: callers pass
//! an explicit [`Identity`] into every core operation and the gate is a pure
//! function of it.

pub mod authorize;
pub mod identity;
pub mod password;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, is_authorized, require_min_role, require_role};
pub use identity::{Identity, Session};
pub use password::{hash_password, verify_password};
pub use roles::Role;
pub use user::{NewUser, User, UserProfile, UserUpdate, normalize_email};
