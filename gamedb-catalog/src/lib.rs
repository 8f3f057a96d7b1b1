//! Game catalog data model types and title normalization.
//!
//! This crate defines the listing and canonical-record model without any
//! database or network dependencies. `gamedb-db` persists these types,
//! `gamedb-resolver` produces [`RecordFragment`]s from provider catalogs.

pub mod title;
pub mod types;

pub use title::{clean_title, prepare_title, similarity, titles_equal};
pub use types::*;
