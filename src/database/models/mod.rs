pub mod session;
pub mod user;
pub mod wardrobe;

pub use session::{Session, SessionIdentity};
pub use user::{normalize_username, User, UserSummary};
pub use wardrobe::{ClothingInput, ClothingItem, Outfit, OutfitInput, OutfitItem};
