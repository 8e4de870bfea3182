// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Java runtime resolution.
//!
//! Maps a requested runtime version and the host platform onto a
//! downloadable archive, locates executables inside unpacked trees, and
//! decides which runtime a given game version needs.

pub mod descriptor;
pub mod error;
pub mod platform;
pub mod required;
pub mod resolver;

pub use descriptor::RuntimeDescriptor;
pub use error::{Result, RuntimeError};
pub use platform::{is_constrained_host, Platform, ScriptDialect, CONSTRAINED_JAVA_PATH};
pub use required::required_runtime;
pub use resolver::{ConstrainedRuntime, RuntimeResolver, RuntimeTarget, DEFAULT_ADOPTIUM_URL};
