//! Geotagged photo log.
//!
//! A [`db::PhotoStore`] keeps one row per photo (image reference, capture
//! time, coordinates) in a local SQLite file. [`capture::CaptureCoordinator`]
//! produces rows; [`gallery::GalleryView`] reads, filters and deletes them.

pub mod capture;
pub mod cli;
pub mod config;
pub mod db;
pub mod gallery;
pub mod logging;
