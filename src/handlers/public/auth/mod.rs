// handlers/public/auth/mod.rs - Public authentication handlers
//
// Account creation, token acquisition and password recovery. None of these
// require a session; register, login and reset-password sit behind the
// auth rate limiter.

pub mod check_username; // GET  /api/auth/check-username - availability probe
pub mod login;          // POST /api/auth/login - authenticate and get a token
pub mod register;       // POST /api/auth/register - create account and log in
pub mod reset_password; // POST /api/auth/reset-password - set password by username

pub use check_username::check_username_get;
pub use login::login_post;
pub use register::register_post;
pub use reset_password::reset_password_post;
