// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Supervision of provisioned server instances: start, stop, kill, restart,
//! stdin commands and bounded output capture.

pub mod error;
pub mod instance;
pub mod logs;
mod process;
pub mod supervisor;

pub use error::{Result, SupervisorError};
pub use instance::{InstanceConfig, InstanceInfo, InstanceStatus};
pub use logs::{LogBuffer, LogLine, LogStream};
pub use process::LAUNCH_SCRIPT;
pub use supervisor::Supervisor;
