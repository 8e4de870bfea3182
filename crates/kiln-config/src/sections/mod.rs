// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

mod catalog;
mod endpoints;
mod external;
mod http;
mod logging;
mod paths;
mod supervisor;

pub use catalog::{CatalogConfig, CatalogConfigLayer};
pub use endpoints::{EndpointsConfig, EndpointsConfigLayer};
pub use external::ExternalSourceConfig;
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use paths::{PathsConfig, PathsConfigLayer};
pub use supervisor::{SupervisorConfig, SupervisorConfigLayer};
