// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Parser from configuration nodes to [`AccessRule`] trees.
//!
//! The grammar has two shapes:
//!
//! ```text
//! abilities: PROSPECTS_VIEW                          # single leaf
//! abilities: { $allOf: [FORMS_VIEW, FOLDERS_VIEW] }  # conjunction
//! abilities: { $anyOf: [FORMS_VIEW, FOLDERS_VIEW] }  # disjunction
//! ```
//!
//! A single leaf is returned as a one-child `AllOf` so consumers always see
//! a combinator of leaves. What an absent property means depends on the leaf
//! kind and is supplied by the [`LeafResolver`].

use serde_json::{Map, Value};

use crate::error::{ParseError, Result};
use crate::leaf::Leaf;
use crate::rule::AccessRule;

pub const ALL_OF: &str = "$allOf";
pub const ANY_OF: &str = "$anyOf";

pub const ABILITIES_PROPERTY: &str = "abilities";
pub const FEATURE_FLAGS_PROPERTY: &str = "featureFlags";

/// Resolves leaf names for one leaf kind.
pub trait LeafResolver {
	type Token: Leaf;

	/// Rule used when the property is not configured at all.
	fn absent_rule(&self) -> AccessRule<Self::Token>;

	/// Resolves a name, reporting `path` on failure.
	fn resolve(&self, path: &str, name: &str) -> Result<Self::Token>;
}

/// Parses rule properties of configuration nodes against one registry.
pub struct RuleParser<'r, R: LeafResolver> {
	resolver: &'r R,
}

impl<'r, R: LeafResolver> RuleParser<'r, R> {
	pub fn new(resolver: &'r R) -> Self {
		Self { resolver }
	}

	/// Parses `node[property]`.
	///
	/// `node_path` is the dotted path of `node` itself and is only used to
	/// build error messages.
	pub fn parse(
		&self,
		node: &Map<String, Value>,
		node_path: &str,
		property: &str,
	) -> Result<AccessRule<R::Token>> {
		let path = join_path(node_path, property);

		match node.get(property) {
			None => Ok(self.resolver.absent_rule()),
			Some(Value::String(name)) => {
				let token = self.resolver.resolve(&path, name)?;
				Ok(AccessRule::AllOf(vec![AccessRule::Leaf(token)]))
			}
			Some(Value::Object(combinator)) => self.parse_combinator(combinator, &path),
			Some(other) => Err(ParseError::InvalidRuleValue {
				path,
				found: value_kind(other),
			}),
		}
	}

	fn parse_combinator(
		&self,
		combinator: &Map<String, Value>,
		path: &str,
	) -> Result<AccessRule<R::Token>> {
		if combinator.len() != 1 {
			return Err(ParseError::CombinatorKeyCount {
				path: path.to_string(),
				count: combinator.len(),
			});
		}

		let Some((key, value)) = combinator.iter().next() else {
			return Err(ParseError::CombinatorKeyCount {
				path: path.to_string(),
				count: 0,
			});
		};

		if key != ALL_OF && key != ANY_OF {
			return Err(ParseError::UnknownCombinator {
				path: path.to_string(),
				key: key.clone(),
			});
		}

		let Value::Array(entries) = value else {
			return Err(ParseError::CombinatorValueNotList {
				path: path.to_string(),
				key: key.clone(),
			});
		};

		if entries.is_empty() {
			return Err(ParseError::EmptyCombinator {
				path: path.to_string(),
				key: key.clone(),
			});
		}

		let mut children = Vec::with_capacity(entries.len());
		for (index, entry) in entries.iter().enumerate() {
			let Value::String(name) = entry else {
				return Err(ParseError::CombinatorEntryNotString {
					path: path.to_string(),
					key: key.clone(),
					index,
				});
			};
			let entry_path = format!("{path}.{key}[{index}]");
			children.push(AccessRule::Leaf(self.resolver.resolve(&entry_path, name)?));
		}

		Ok(if key == ALL_OF {
			AccessRule::AllOf(children)
		} else {
			AccessRule::AnyOf(children)
		})
	}
}

pub(crate) fn join_path(parent: &str, child: &str) -> String {
	if parent.is_empty() {
		child.to_string()
	} else {
		format!("{parent}.{child}")
	}
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "list",
		Value::Object(_) => "object",
	}
}
