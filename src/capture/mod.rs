//! Capture pipeline: image → location → stored record.
//!
//! The camera and the location sensor sit behind the [`CaptureSource`] and
//! [`LocationSource`] traits. The coordinator only writes once both have
//! produced a value, so a failed attempt never leaves a partial row behind.

pub mod sources;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tracing::{info, warn};

use crate::db::{NewPhoto, PhotoRecord, PhotoStore, StoreError};

pub use sources::{FileCapture, FixedClock, FixedLocation, SystemClock};

/// Reference to image bytes produced by the capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub uri: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Produces an image reference, e.g. by taking a picture.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn capture(&self) -> anyhow::Result<CapturedImage>;
}

/// Produces the device's current position.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Ask for (or confirm) permission to read the position.
    async fn ensure_permission(&self) -> anyhow::Result<bool>;

    async fn current_position(&self) -> anyhow::Result<Coordinates>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Runs one capture-to-record sequence per call.
pub struct CaptureCoordinator<C, L> {
    store: PhotoStore,
    camera: C,
    location: L,
    clock: Box<dyn Clock>,
}

impl<C: CaptureSource, L: LocationSource> CaptureCoordinator<C, L> {
    pub fn new(store: PhotoStore, camera: C, location: L) -> Self {
        Self::with_clock(store, camera, location, SystemClock)
    }

    pub fn with_clock(store: PhotoStore, camera: C, location: L, clock: impl Clock + 'static) -> Self {
        Self {
            store,
            camera,
            location,
            clock: Box::new(clock),
        }
    }

    /// Take a picture, locate it, and store it.
    ///
    /// The timestamp is read after both collaborators have answered, right
    /// before the insert. There is no fallback that stores a photo without
    /// coordinates.
    pub async fn capture(&self) -> Result<PhotoRecord, CaptureError> {
        let image = self.camera.capture().await.map_err(|e| {
            warn!("Capture aborted: {:#}", e);
            CaptureError::CaptureFailed(format!("{e:#}"))
        })?;
        if image.uri.trim().is_empty() {
            warn!("Capture aborted: camera returned no image reference");
            return Err(CaptureError::CaptureFailed("no image reference returned".into()));
        }

        let position = self
            .locate()
            .await
            .inspect_err(|e| warn!("Capture of {} aborted: {}", image.uri, e))?;

        let photo = NewPhoto::new(image.uri, self.clock.now(), position.latitude, position.longitude)?;
        let id = self.store.insert(photo.clone()).await?;
        info!("Captured photo {} at ({}, {})", id, photo.latitude, photo.longitude);

        Ok(PhotoRecord {
            id,
            uri: photo.uri,
            timestamp: photo.timestamp,
            latitude: photo.latitude,
            longitude: photo.longitude,
        })
    }

    async fn locate(&self) -> Result<Coordinates, CaptureError> {
        let granted = self
            .location
            .ensure_permission()
            .await
            .map_err(|e| CaptureError::LocationUnavailable(format!("permission request failed: {e:#}")))?;
        if !granted {
            return Err(CaptureError::LocationUnavailable("location permission denied".into()));
        }

        self.location
            .current_position()
            .await
            .map_err(|e| CaptureError::LocationUnavailable(format!("{e:#}")))
    }
}
