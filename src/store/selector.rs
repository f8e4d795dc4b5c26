use std::sync::Arc;

use super::Store;

/// Chooses the backend for each call: the primary while it reports itself
/// available, the file store otherwise.
#[derive(Clone)]
pub struct StoreSelector {
    primary: Option<Arc<dyn Store>>,
    fallback: Arc<dyn Store>,
}

impl StoreSelector {
    pub fn new(primary: Option<Arc<dyn Store>>, fallback: Arc<dyn Store>) -> Self {
        Self { primary, fallback }
    }

    /// Selector with no primary backend at all.
    pub fn fallback_only(fallback: Arc<dyn Store>) -> Self {
        Self::new(None, fallback)
    }

    /// The primary backend if it is connected right now.
    pub fn primary(&self) -> Option<&dyn Store> {
        self.primary
            .as_deref()
            .filter(|store| store.is_available())
    }

    pub fn fallback(&self) -> &dyn Store {
        self.fallback.as_ref()
    }

    /// The backend a new call would start on.
    pub fn active(&self) -> &dyn Store {
        self.primary().unwrap_or_else(|| self.fallback())
    }
}
