// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Server software distribution sources.
//!
//! Each source (Mojang's manifest, the PaperMC project API, Purpur, Magma,
//! the Spigot download listing, or a configured `{version: url}` map) is a
//! [`SourceKind`] variant. [`SourceResolver`] lists versions newest first
//! and resolves a version to the URL of its server artifact.

pub mod error;
pub mod registry;
pub mod resolver;
pub mod spigot;
pub mod version;

pub use error::{Result, SourceError};
pub use registry::{SoftwareSourceDescriptor, SourceKind, SourceRegistry};
pub use resolver::{SourceEndpoints, SourceResolver};
pub use version::{natural_cmp, sort_newest_first};
