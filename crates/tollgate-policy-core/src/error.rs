// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors raised while turning configuration into rule trees.
///
/// Every variant carries the dotted property path of the offending node so a
/// broken catalog can be fixed without guessing. These are fatal to catalog
/// construction: nothing built from a document that produced one is usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("{path}: combinator object must have exactly one key, found {count}")]
	CombinatorKeyCount { path: String, count: usize },

	#[error("{path}: unknown combinator '{key}', expected '$allOf' or '$anyOf'")]
	UnknownCombinator { path: String, key: String },

	#[error("{path}.{key}: combinator value must be a list of strings")]
	CombinatorValueNotList { path: String, key: String },

	#[error("{path}.{key}[{index}]: combinator entries must be strings")]
	CombinatorEntryNotString {
		path: String,
		key: String,
		index: usize,
	},

	#[error("{path}.{key}: combinator list must not be empty")]
	EmptyCombinator { path: String, key: String },

	#[error("{path}: rule must be a string or a combinator object, found {found}")]
	InvalidRuleValue { path: String, found: &'static str },

	#[error("{path}: unknown ability '{name}'")]
	UnknownAbility { path: String, name: String },

	#[error("{path}: feature flag '{name}' must be prefixed with 'feature.'")]
	MissingFeaturePrefix { path: String, name: String },

	#[error("{path}: unknown feature flag '{name}'")]
	UnknownFeatureFlag { path: String, name: String },

	#[error("{path}: {message}")]
	InvalidDocument { path: String, message: String },

	#[error("failed to parse catalog TOML: {0}")]
	Toml(String),
}

impl ParseError {
	/// The dotted property path this error refers to, if it has one.
	pub fn path(&self) -> Option<&str> {
		match self {
			ParseError::CombinatorKeyCount { path, .. }
			| ParseError::UnknownCombinator { path, .. }
			| ParseError::CombinatorValueNotList { path, .. }
			| ParseError::CombinatorEntryNotString { path, .. }
			| ParseError::EmptyCombinator { path, .. }
			| ParseError::InvalidRuleValue { path, .. }
			| ParseError::UnknownAbility { path, .. }
			| ParseError::MissingFeaturePrefix { path, .. }
			| ParseError::UnknownFeatureFlag { path, .. }
			| ParseError::InvalidDocument { path, .. } => Some(path),
			ParseError::Toml(_) => None,
		}
	}
}
