// handlers/protected/wardrobe/outfits.rs - /api/outfits[/:id] handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};

use crate::database::models::{Outfit, OutfitInput};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

pub async fn outfits_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<Outfit>> {
    let outfits = state.wardrobe.list_outfits(auth.user_id).await?;
    Ok(ApiResponse::success(outfits))
}

/// POST /api/outfits - Save an outfit
///
/// Expected Input:
/// ```json
/// {
///   "name": "string",
///   "items": [{ "id": 1712345678901, "name": "string", "image": "data:image/..." }],
///   "season": [...], "occasion": [...], "notes": "string"
/// }
/// ```
pub async fn outfits_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    body: Result<Json<OutfitInput>, JsonRejection>,
) -> ApiResult<Outfit> {
    let Json(input) = body?;
    let outfit = state.wardrobe.add_outfit(auth.user_id, input).await?;
    Ok(ApiResponse::created(outfit))
}

pub async fn outfits_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    body: Result<Json<OutfitInput>, JsonRejection>,
) -> ApiResult<Outfit> {
    let Json(patch) = body?;
    let outfit = state.wardrobe.update_outfit(auth.user_id, id, patch).await?;
    Ok(ApiResponse::success(outfit))
}

pub async fn outfits_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    state.wardrobe.delete_outfit(auth.user_id, id).await?;
    Ok(ApiResponse::no_content())
}
