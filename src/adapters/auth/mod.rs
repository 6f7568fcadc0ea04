//! Authentication adapters implementing the `TokenVerifier` port.

mod jwt;
mod mock;

pub use jwt::JwtTokenVerifier;
pub use mock::MockTokenVerifier;
