//! Gallery and detail view state.
//!
//! Views never get pushed updates. They re-query the store whenever they
//! gain focus, so a capture shows up the next time the gallery is looked at.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::db::{DateFilter, FilterError, PhotoRecord, PhotoStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    #[error("invalid date filter: {0}")]
    InvalidFilterInput(#[from] FilterError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Liveness flag shared between a view and whoever may dismiss it.
/// Results that arrive after dismissal are dropped.
#[derive(Debug, Clone)]
pub struct ViewGuard(Arc<AtomicBool>);

impl ViewGuard {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn dismiss(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct GalleryView {
    store: PhotoStore,
    photos: Vec<PhotoRecord>,
    filter: Option<DateFilter>,
    selected: Option<PhotoRecord>,
    guard: ViewGuard,
}

impl GalleryView {
    pub fn new(store: PhotoStore) -> Self {
        Self {
            store,
            photos: Vec::new(),
            filter: None,
            selected: None,
            guard: ViewGuard::new(),
        }
    }

    pub fn guard(&self) -> ViewGuard {
        self.guard.clone()
    }

    pub fn photos(&self) -> &[PhotoRecord] {
        &self.photos
    }

    pub fn filter(&self) -> Option<&DateFilter> {
        self.filter.as_ref()
    }

    /// Photo shown in the detail panel.
    pub fn selected(&self) -> Option<&PhotoRecord> {
        self.selected.as_ref()
    }

    /// Re-query with the current filter. Returns `false` if the view was
    /// dismissed before the result arrived.
    pub async fn on_focus(&mut self) -> Result<bool, GalleryError> {
        let photos = self.query(self.filter.as_ref()).await?;
        Ok(self.apply(photos))
    }

    /// "On this day" search. Input is validated before the store is touched.
    pub async fn search(&mut self, month: &str, day: &str) -> Result<bool, GalleryError> {
        let filter = DateFilter::new(month, day)?;
        let photos = self.query(Some(&filter)).await?;
        if !self.apply(photos) {
            return Ok(false);
        }
        self.filter = Some(filter);
        Ok(true)
    }

    pub async fn clear_filter(&mut self) -> Result<bool, GalleryError> {
        let photos = self.query(None).await?;
        if !self.apply(photos) {
            return Ok(false);
        }
        self.filter = None;
        Ok(true)
    }

    /// Select a visible photo for the detail panel.
    pub fn open(&mut self, id: i64) -> bool {
        self.selected = self.photos.iter().find(|p| p.id == id).cloned();
        self.selected.is_some()
    }

    pub fn close(&mut self) {
        self.selected = None;
    }

    /// Delete the photo in the detail panel, close the panel and refresh.
    /// Returns `false` when nothing was selected or the view was dismissed.
    pub async fn delete_selected(&mut self) -> Result<bool, GalleryError> {
        let Some(id) = self.selected.as_ref().map(|p| p.id) else {
            return Ok(false);
        };

        self.store.delete(id).await?;
        if !self.guard.is_alive() {
            return Ok(false);
        }
        self.close();
        self.on_focus().await
    }

    async fn query(&self, filter: Option<&DateFilter>) -> Result<Vec<PhotoRecord>, StoreError> {
        match filter {
            Some(filter) => self.store.list_by_date(filter).await,
            None => self.store.list_all().await,
        }
    }

    fn apply(&mut self, photos: Vec<PhotoRecord>) -> bool {
        if !self.guard.is_alive() {
            debug!("Discarding {} photo(s) for a dismissed view", photos.len());
            return false;
        }

        if let Some(selected) = &self.selected {
            if !photos.iter().any(|p| p.id == selected.id) {
                self.selected = None;
            }
        }
        self.photos = photos;
        true
    }
}
