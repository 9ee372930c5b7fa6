#![allow(dead_code)]

pub mod mocks;

use std::sync::Arc;
use tempfile::TempDir;
use xtview::config::Config;
use xtview::db::{Database, Store};
use xtview::models::{Credentials, Profile};
use xtview::services::{BackendFactory, CatalogService};

pub use mocks::{MockBackend, MockFactory};

pub struct TestContext {
    pub store: Store,
    _temp_dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open(&temp_dir.path().join("test.db"))
            .await
            .expect("Failed to open test database");

        Self {
            store: Store::from_connection(db.connection()),
            _temp_dir: temp_dir,
        }
    }

    pub fn service(&self, factory: impl BackendFactory + 'static) -> CatalogService {
        CatalogService::new(self.store.clone(), &Config::default(), Arc::new(factory))
    }
}

pub fn credentials(url: &str) -> Credentials {
    Credentials::new(url, "user", "secret")
}

/// Saves a profile and makes it current.
pub async fn use_new_profile(service: &CatalogService, name: &str) -> Profile {
    let profile = service
        .add_profile(name, credentials("http://tv.example.com:8080"))
        .await
        .expect("Failed to add profile");
    service
        .switch_profile(&profile.id)
        .await
        .expect("Failed to switch profile")
}
