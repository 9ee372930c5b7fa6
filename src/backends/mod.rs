pub mod traits;
pub mod xtream;

pub use traits::CatalogBackend;
pub use xtream::XtreamBackend;
