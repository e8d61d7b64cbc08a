//! Documentation-site search: offline index builder, query engine, result
//! renderer, and the table-of-contents scroll tracker.

pub mod builder;
pub mod error;
pub mod highlight;
pub mod index;
pub mod loader;
pub mod persist;
pub mod query;
pub mod scroll;
pub mod search;
pub mod template;
pub mod tokenizer;
pub mod widget;

pub use error::{BuildError, LoadError};
pub use index::*;
pub use search::{search, IndexHandle, QueryMatch};
