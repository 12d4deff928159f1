//! Add Amazon Location Service maps, place searches and routes to a map project
//!
//! The settings (region, API key and resource names) are loaded once through a
//! [`settings::SettingsStore`] and handed to each feature pipeline in [`services`]. Every
//! pipeline builds its request URL, performs one blocking JSON request with a
//! [`services::ApiClient`] and turns the typed response into a [`layer::Layer`] that is
//! published to a [`host::MapHost`].
use std::path::PathBuf;

pub mod cli;
pub mod click;
pub mod config;
mod error;
pub mod gps;
pub mod host;
pub mod layer;
pub mod services;
pub mod settings;

pub use error::Error;

/// Directory name used under the platform config and data directories
pub static APP_DIR_NAME: &str = "location-service";

/// Return the path to the application's data directory
pub fn data_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_default().join(APP_DIR_NAME)
}
