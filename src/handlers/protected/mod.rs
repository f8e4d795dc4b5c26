// handlers/protected/mod.rs - Protected handlers (session token required)
//
// Every route here runs behind `session_auth_middleware`, which places the
// caller's `AuthUser` in the request extensions.

pub mod auth;     // Account management for the logged-in user
pub mod wardrobe; // Clothing and outfit catalog
