// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::cmp::Ordering;

/// Compare version strings with digit runs compared numerically, so
/// `1.9` sorts before `1.10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
	let mut a = Runs::new(a);
	let mut b = Runs::new(b);

	loop {
		match (a.next(), b.next()) {
			(None, None) => return Ordering::Equal,
			(None, Some(_)) => return Ordering::Less,
			(Some(_), None) => return Ordering::Greater,
			(Some(x), Some(y)) => {
				let ord = match (x, y) {
					(Run::Digits(x), Run::Digits(y)) => {
						let x = x.trim_start_matches('0');
						let y = y.trim_start_matches('0');
						x.len().cmp(&y.len()).then_with(|| x.cmp(y))
					}
					(Run::Digits(_), Run::Text(_)) => Ordering::Less,
					(Run::Text(_), Run::Digits(_)) => Ordering::Greater,
					(Run::Text(x), Run::Text(y)) => x.cmp(y),
				};
				if ord != Ordering::Equal {
					return ord;
				}
			}
		}
	}
}

/// Sort newest first.
pub fn sort_newest_first(versions: &mut [String]) {
	versions.sort_by(|a, b| natural_cmp(b, a));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run<'a> {
	Digits(&'a str),
	Text(&'a str),
}

struct Runs<'a> {
	rest: &'a str,
}

impl<'a> Runs<'a> {
	fn new(s: &'a str) -> Self {
		Self { rest: s }
	}
}

impl<'a> Iterator for Runs<'a> {
	type Item = Run<'a>;

	fn next(&mut self) -> Option<Self::Item> {
		let first = self.rest.chars().next()?;
		let digits = first.is_ascii_digit();
		let end = self
			.rest
			.char_indices()
			.find(|(_, c)| c.is_ascii_digit() != digits)
			.map(|(i, _)| i)
			.unwrap_or(self.rest.len());

		let (run, rest) = self.rest.split_at(end);
		self.rest = rest;
		Some(if digits { Run::Digits(run) } else { Run::Text(run) })
	}
}
