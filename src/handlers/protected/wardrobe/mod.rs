// handlers/protected/wardrobe/mod.rs - Per-user clothing catalog

pub mod clothes; // /api/clothes[/:id]
pub mod outfits; // /api/outfits[/:id]

pub use clothes::{clothes_delete, clothes_get, clothes_post, clothes_put};
pub use outfits::{outfits_delete, outfits_get, outfits_post, outfits_put};
