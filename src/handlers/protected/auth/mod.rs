// handlers/protected/auth/mod.rs - Account management for logged-in users

pub mod change_password; // POST /api/auth/change-password
pub mod logout;          // POST /api/auth/logout
pub mod me;              // GET/PUT /api/auth/me

pub use change_password::change_password_post;
pub use logout::logout_post;
pub use me::{me_get, me_put};
