// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

pub mod provision;
pub mod run;
pub mod runtimes;
pub mod sources;
pub mod tasks;

pub use provision::ProvisionArgs;
pub use run::RunArgs;
pub use runtimes::RuntimesCommand;
pub use sources::VersionsArgs;
pub use tasks::TasksArgs;
