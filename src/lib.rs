//! Per-profile catalog cache and sync layer for Xtream-Codes IPTV accounts.

pub mod backends;
pub mod config;
pub mod db;
pub mod events;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use services::CatalogService;
pub use utils::errors::{CatalogError, CatalogResult};
