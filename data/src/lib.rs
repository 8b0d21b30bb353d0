//! Entity catalog and the text matching that resolves OCR output against it.

mod catalog;
mod error;
pub mod matcher;
pub mod normalize;
mod schema;
mod shared;
mod structs;

pub use catalog::{CatalogFile, CatalogIndex};
pub use error::CatalogLoadError;
pub use matcher::{FuzzyMatcher, MatchPolicy};
pub use shared::SharedCatalog;
pub use structs::*;
