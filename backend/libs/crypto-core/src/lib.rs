//! Shared credential primitives for BagichaLink services.
//!
//! - `jwt`: HS256 bearer tokens (issue + validate)
//! - `password`: Argon2id password hashing

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtError};
pub use password::{hash_password, verify_password, PasswordError};
