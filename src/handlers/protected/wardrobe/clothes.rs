// handlers/protected/wardrobe/clothes.rs - /api/clothes[/:id] handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};

use crate::database::models::{ClothingInput, ClothingItem};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /api/clothes - The caller's clothing, newest first
pub async fn clothes_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<ClothingItem>> {
    let items = state.wardrobe.list_clothes(auth.user_id).await?;
    Ok(ApiResponse::success(items))
}

/// POST /api/clothes - Add a clothing item
///
/// Expected Input:
/// ```json
/// {
///   "name": "string",               // required, <= 200 chars
///   "image": "data:image/...",      // required, <= 10MB
///   "type": "clothes|accessories",
///   "season": ["spring", "summer", "autumn", "winter", "all"],
///   "occasion": ["casual", "date", "work", "party", "formal", "sport", "all"],
///   "brand": "string", "size": "string", "material": "string", "notes": "string",
///   "originalImage": "data:image/...", "wearingPhoto": "data:image/..."
/// }
/// ```
pub async fn clothes_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    body: Result<Json<ClothingInput>, JsonRejection>,
) -> ApiResult<ClothingItem> {
    let Json(input) = body?;
    let item = state.wardrobe.add_clothes(auth.user_id, input).await?;
    Ok(ApiResponse::created(item))
}

/// PUT /api/clothes/:id - Merge the given fields into an item
pub async fn clothes_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    body: Result<Json<ClothingInput>, JsonRejection>,
) -> ApiResult<ClothingItem> {
    let Json(patch) = body?;
    let item = state.wardrobe.update_clothes(auth.user_id, id, patch).await?;
    Ok(ApiResponse::success(item))
}

/// DELETE /api/clothes/:id
pub async fn clothes_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    state.wardrobe.delete_clothes(auth.user_id, id).await?;
    Ok(ApiResponse::no_content())
}
