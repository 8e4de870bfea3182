// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Task registry for long-running provisioning work.
//!
//! A [`Task`] is created when a download or unpack step begins, mutated as
//! bytes arrive, and finalized either by moving into the archive (only once
//! its target exists on disk) or by being marked failed.

pub mod download;
pub mod error;
pub mod model;
pub mod registry;
pub mod unpack;

pub use download::Downloader;
pub use error::{Result, TaskError};
pub use model::{NewTask, Task, TaskId, TaskSize, TaskStatus, TaskType, TaskUpdate};
pub use registry::{TaskRegistry, ARCHIVED_TASKS_DOCUMENT, TASKS_DOCUMENT};
pub use unpack::{extract, unpack_with_task, ArchiveFormat, UnpackError};
