//! Per-user clothing and outfit lists kept as JSON files under
//! `<data_dir>/user-data/`.

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::database::models::{ClothingInput, ClothingItem, Outfit, OutfitInput};
use crate::store::file::{read_json, write_json};
use crate::store::StoreError;

const USER_DATA_DIR: &str = "user-data";
const CLOTHES: &str = "wardrobe";
const OUTFITS: &str = "outfits";

#[derive(Debug, Error)]
pub enum WardrobeError {
    #[error("{0}")]
    Validation(String),

    #[error("Not found")]
    NotFound,

    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}

trait Entry: Serialize + DeserializeOwned {
    fn id(&self) -> i64;
}

impl Entry for ClothingItem {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Entry for Outfit {
    fn id(&self) -> i64 {
        self.id
    }
}

pub struct WardrobeService {
    dir: PathBuf,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl WardrobeService {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join(USER_DATA_DIR),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn path(&self, user_id: Uuid, collection: &str) -> PathBuf {
        self.dir.join(format!("user-{user_id}-{collection}.json"))
    }

    /// Serializes read-modify-write cycles on one file.
    async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .await
            .entry(path.to_path_buf())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    async fn list<T: Entry>(&self, path: PathBuf) -> Result<Vec<T>, WardrobeError> {
        let _guard = self.lock(&path).await;
        Ok(read_json(&path).await?)
    }

    /// Apply `change` to the stored list and persist it if the change succeeds.
    async fn modify<T, R, F>(&self, path: PathBuf, change: F) -> Result<R, WardrobeError>
    where
        T: Entry,
        F: FnOnce(&mut Vec<T>) -> Result<R, WardrobeError>,
    {
        let _guard = self.lock(&path).await;
        let mut entries: Vec<T> = read_json(&path).await?;
        let result = change(&mut entries)?;
        write_json(&path, &entries).await?;
        Ok(result)
    }

    pub async fn list_clothes(&self, user_id: Uuid) -> Result<Vec<ClothingItem>, WardrobeError> {
        self.list(self.path(user_id, CLOTHES)).await
    }

    pub async fn add_clothes(&self, user_id: Uuid, input: ClothingInput) -> Result<ClothingItem, WardrobeError> {
        input.validate().map_err(WardrobeError::Validation)?;

        let item = self
            .modify(self.path(user_id, CLOTHES), |items: &mut Vec<ClothingItem>| {
                let id = assign_id(items, input.id);
                let item = input.into_item(id, Utc::now());
                items.insert(0, item.clone());
                Ok(item)
            })
            .await?;

        debug!(user_id = %user_id, item_id = item.id, "Added clothing item");
        Ok(item)
    }

    pub async fn update_clothes(
        &self,
        user_id: Uuid,
        id: i64,
        patch: ClothingInput,
    ) -> Result<ClothingItem, WardrobeError> {
        self.modify(self.path(user_id, CLOTHES), |items: &mut Vec<ClothingItem>| {
            let slot = items
                .iter_mut()
                .find(|item| item.id == id)
                .ok_or(WardrobeError::NotFound)?;

            let merged = patch.merged_over(slot);
            merged.validate().map_err(WardrobeError::Validation)?;
            *slot = merged.into_item(id, Utc::now());
            Ok(slot.clone())
        })
        .await
    }

    pub async fn delete_clothes(&self, user_id: Uuid, id: i64) -> Result<(), WardrobeError> {
        self.modify(self.path(user_id, CLOTHES), |items: &mut Vec<ClothingItem>| remove(items, id))
            .await
    }

    pub async fn list_outfits(&self, user_id: Uuid) -> Result<Vec<Outfit>, WardrobeError> {
        self.list(self.path(user_id, OUTFITS)).await
    }

    pub async fn add_outfit(&self, user_id: Uuid, input: OutfitInput) -> Result<Outfit, WardrobeError> {
        input.validate().map_err(WardrobeError::Validation)?;

        let outfit = self
            .modify(self.path(user_id, OUTFITS), |outfits: &mut Vec<Outfit>| {
                let id = assign_id(outfits, input.id);
                let outfit = input.into_outfit(id, Utc::now());
                outfits.insert(0, outfit.clone());
                Ok(outfit)
            })
            .await?;

        debug!(user_id = %user_id, outfit_id = outfit.id, "Added outfit");
        Ok(outfit)
    }

    pub async fn update_outfit(&self, user_id: Uuid, id: i64, patch: OutfitInput) -> Result<Outfit, WardrobeError> {
        self.modify(self.path(user_id, OUTFITS), |outfits: &mut Vec<Outfit>| {
            let slot = outfits
                .iter_mut()
                .find(|outfit| outfit.id == id)
                .ok_or(WardrobeError::NotFound)?;

            let merged = patch.merged_over(slot);
            merged.validate().map_err(WardrobeError::Validation)?;
            *slot = merged.into_outfit(id, Utc::now());
            Ok(slot.clone())
        })
        .await
    }

    pub async fn delete_outfit(&self, user_id: Uuid, id: i64) -> Result<(), WardrobeError> {
        self.modify(self.path(user_id, OUTFITS), |outfits: &mut Vec<Outfit>| remove(outfits, id))
            .await
    }
}

/// A requested positive id is kept when unused; otherwise the current epoch
/// milliseconds, bumped past any id already in the list.
fn assign_id<T: Entry>(entries: &[T], requested: Option<i64>) -> i64 {
    if let Some(id) = requested.filter(|id| *id > 0) {
        if entries.iter().all(|e| e.id() != id) {
            return id;
        }
    }
    let now = Utc::now().timestamp_millis();
    let max = entries.iter().map(Entry::id).max().unwrap_or(0);
    match max.checked_add(1) {
        Some(next) => now.max(next),
        // i64::MAX is already taken; use the first free id from now on
        None => (now..)
            .find(|id| entries.iter().all(|e| e.id() != *id))
            .unwrap_or(now),
    }
}

fn remove<T: Entry>(entries: &mut Vec<T>, id: i64) -> Result<(), WardrobeError> {
    let before = entries.len();
    entries.retain(|e| e.id() != id);
    if entries.len() == before {
        return Err(WardrobeError::NotFound);
    }
    Ok(())
}
