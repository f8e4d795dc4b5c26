pub mod session_service;
pub mod sweeper;
pub mod wardrobe_service;

pub use session_service::{AuthError, LoginResult, SessionManager, UserUpdate};
pub use sweeper::SessionSweeper;
pub use wardrobe_service::{WardrobeError, WardrobeService};
