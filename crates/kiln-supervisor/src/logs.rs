// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::VecDeque;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
	Stdout,
	Stderr,
}

impl LogStream {
	pub fn as_str(&self) -> &'static str {
		match self {
			LogStream::Stdout => "stdout",
			LogStream::Stderr => "stderr",
		}
	}
}

/// One line of instance output, as broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
	pub instance: String,
	pub stream: LogStream,
	pub line: String,
}

/// Bounded ring of the most recent output lines.
#[derive(Debug)]
pub struct LogBuffer {
	capacity: usize,
	lines: VecDeque<String>,
}

impl LogBuffer {
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			capacity,
			lines: VecDeque::with_capacity(capacity.min(4096)),
		}
	}

	pub fn push(&mut self, line: String) {
		if self.lines.len() == self.capacity {
			self.lines.pop_front();
		}
		self.lines.push_back(line);
	}

	/// The last `n` lines, oldest first.
	pub fn tail(&self, n: usize) -> Vec<String> {
		let start = self.lines.len().saturating_sub(n);
		self.lines.iter().skip(start).cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.lines.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}
}
