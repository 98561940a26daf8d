// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Immutable boolean rule trees over leaf tokens.
//!
//! A rule is built once by the parser and then only read. Evaluation takes
//! the caller's possessed set by reference, so a single tree can be shared
//! across concurrent requests behind an `Arc`.

use std::collections::HashSet;

use crate::leaf::{Leaf, LeafRegistry};

/// A boolean expression over leaves of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRule<T: Leaf> {
	/// Never satisfied.
	Deny,
	/// Always satisfied.
	AllowAnyone,
	/// Satisfied iff the token is possessed.
	Leaf(T),
	/// Satisfied iff every child is. The parser never builds an empty one;
	/// a hand-built empty combinator is never satisfied.
	AllOf(Vec<AccessRule<T>>),
	/// Satisfied iff at least one child is.
	AnyOf(Vec<AccessRule<T>>),
}

impl<T: Leaf> AccessRule<T> {
	/// Evaluates the rule against the possessed set.
	pub fn evaluate(&self, possessed: &HashSet<T>) -> bool {
		match self {
			AccessRule::Deny => false,
			AccessRule::AllowAnyone => true,
			AccessRule::Leaf(token) => possessed.contains(token),
			AccessRule::AllOf(children) => {
				!children.is_empty() && children.iter().all(|c| c.evaluate(possessed))
			}
			AccessRule::AnyOf(children) => children.iter().any(|c| c.evaluate(possessed)),
		}
	}

	/// Collects every leaf token referenced by the rule.
	pub fn leaves(&self) -> Vec<T> {
		let mut out = Vec::new();
		self.collect_leaves(&mut out);
		out
	}

	fn collect_leaves(&self, out: &mut Vec<T>) {
		match self {
			AccessRule::Deny | AccessRule::AllowAnyone => {}
			AccessRule::Leaf(token) => out.push(*token),
			AccessRule::AllOf(children) | AccessRule::AnyOf(children) => {
				for child in children {
					child.collect_leaves(out);
				}
			}
		}
	}

	/// Renders the rule with registry names, e.g. `allOf(A, B)`.
	pub fn describe(&self, registry: &LeafRegistry<T>) -> String {
		match self {
			AccessRule::Deny => "deny".to_string(),
			AccessRule::AllowAnyone => "anyone".to_string(),
			AccessRule::Leaf(token) => registry
				.name_of(*token)
				.map(str::to_string)
				.unwrap_or_else(|| format!("{token:?}")),
			AccessRule::AllOf(children) => {
				format!("allOf({})", describe_children(children, registry))
			}
			AccessRule::AnyOf(children) => {
				format!("anyOf({})", describe_children(children, registry))
			}
		}
	}
}

fn describe_children<T: Leaf>(children: &[AccessRule<T>], registry: &LeafRegistry<T>) -> String {
	children
		.iter()
		.map(|c| c.describe(registry))
		.collect::<Vec<_>>()
		.join(", ")
}

/// Free-function form of [`AccessRule::evaluate`].
pub fn evaluate<T: Leaf>(rule: &AccessRule<T>, possessed: &HashSet<T>) -> bool {
	rule.evaluate(possessed)
}
