pub mod catalog;
pub mod content_cache;
pub mod downloads;
pub mod profiles;
pub mod session;
pub mod user_data;

pub use catalog::{BackendFactory, CatalogService, XtreamBackendFactory};
pub use content_cache::ContentCache;
pub use downloads::{DownloadCoordinator, DownloadReport};
pub use profiles::ProfileRegistry;
pub use session::{Session, SessionHandle};
pub use user_data::UserDataService;
