// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Embedded key-document storage for Kiln.
//!
//! Every persisted piece of state (live tasks, archived tasks, upstream
//! catalogs) is one whole JSON document behind the [`DocumentStore`] seam.
//! Swapping the JSON files for a real embedded database only touches this
//! crate.

pub mod catalog;
pub mod error;
pub mod store;

pub use catalog::{CachedCatalog, CatalogCache, CATALOGS_DOCUMENT};
pub use error::{Result, StoreError};
pub use store::{load_document, save_document, DocumentStore, JsonFileStore, MemoryStore};
