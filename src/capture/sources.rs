//! Collaborators used when no device hardware is attached: an image file
//! that was captured elsewhere, and a position taken from the command line or
//! config.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use std::path::PathBuf;

use super::{CaptureSource, CapturedImage, Clock, Coordinates, LocationSource};

/// Uses an existing image file as the captured picture. The uri is the
/// file's absolute path.
#[derive(Debug, Clone)]
pub struct FileCapture {
    path: PathBuf,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CaptureSource for FileCapture {
    async fn capture(&self) -> Result<CapturedImage> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .with_context(|| format!("cannot read image {}", self.path.display()))?;
        if !metadata.is_file() {
            bail!("{} is not a file", self.path.display());
        }

        let absolute = tokio::fs::canonicalize(&self.path)
            .await
            .with_context(|| format!("cannot resolve {}", self.path.display()))?;
        Ok(CapturedImage {
            uri: absolute.to_string_lossy().into_owned(),
        })
    }
}

/// A position that does not move, with an explicit permission state.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    permission_granted: bool,
    position: Option<Coordinates>,
}

impl FixedLocation {
    pub fn new(permission_granted: bool, position: Option<Coordinates>) -> Self {
        Self {
            permission_granted,
            position,
        }
    }
}

#[async_trait]
impl LocationSource for FixedLocation {
    async fn ensure_permission(&self) -> Result<bool> {
        Ok(self.permission_granted)
    }

    async fn current_position(&self) -> Result<Coordinates> {
        match self.position {
            Some(position) => Ok(position),
            None => bail!("no position available (pass --lat/--lon or set [location] in config)"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().fixed_offset()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
