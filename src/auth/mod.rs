pub mod password;
pub mod token;

pub use password::{legacy_digest, HashError, PasswordHasher};
pub use token::generate_token;
