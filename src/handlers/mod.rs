// handlers/mod.rs - Two-tier handler layout
//
// Public (no session) -> Protected (session token required)

pub mod protected;
pub mod public;
pub mod utils;
