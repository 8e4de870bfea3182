// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Provisioning orchestrator.
//!
//! Resolves and installs the runtime, downloads the server artifact and
//! writes a runnable instance directory, recording each transfer as a task.

pub mod error;
pub mod materialize;
pub mod provisioner;
pub mod spec;

pub use error::{ProvisioningError, Result};
pub use materialize::{render_launch_script, render_server_properties};
pub use provisioner::{ProvisionHandle, ProvisionedInstance, Provisioner};
pub use spec::{ProvisionSpec, DEFAULT_LAUNCH_FLAGS, DEFAULT_PORT};
