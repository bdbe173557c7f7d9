// Core types and functionality for the Wayfarer search result store

pub mod types;
pub mod error;
pub mod ids;
pub mod records;
pub mod payload;
pub mod storage;
pub mod filter;
pub mod catalog;

pub use types::*;
pub use error::{SearchError, SearchResult};
pub use ids::SearchIdBuilder;
pub use records::{NamespacedPayload, SearchMetadata, SearchRecord};
pub use storage::ResultStore;
pub use filter::FilterEngine;
pub use catalog::Catalog;
