//! Bookshelf Catalog Server
//!
//! A REST JSON API for managing books and their authors on PostgreSQL,
//! with deduplicated author linking, filtered listing and bulk import.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
