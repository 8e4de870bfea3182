// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Kiln.
//!
//! This crate provides:
//! - A pre-configured HTTP client with a consistent User-Agent header
//! - [`Fetcher`], a small wrapper for pulling JSON and text documents from
//!   upstream release APIs
//! - Retry logic with exponential backoff for transient failures

mod client;
mod error;
mod fetch;
mod retry;

pub use client::{builder, new_client, new_client_with_timeout, user_agent};
pub use error::HttpError;
pub use fetch::Fetcher;
pub use retry::{retry, RetryConfig, RetryableError};
