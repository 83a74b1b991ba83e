// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Field-name transcoding between camelCase host objects and the engine's
//! snake_case protocol.
//!
//! Both directions are shallow: only the keys of the top-level object are
//! renamed. Nested objects are expected to already be in the target casing,
//! which holds for every shape the protocol emits. This is not a general
//! purpose deep transform.

use serde_json::{Map, Value};

/// `flagKey` -> `flag_key`: every uppercase letter becomes `_` + lowercase.
pub fn camel_to_snake(key: &str) -> String {
	let mut out = String::with_capacity(key.len() + 4);
	for c in key.chars() {
		if c.is_ascii_uppercase() {
			out.push('_');
			out.push(c.to_ascii_lowercase());
		} else {
			out.push(c);
		}
	}
	out
}

/// `flag_key` -> `flagKey`: every `_x` or `-x` (lowercase `x`) becomes `X`.
pub fn snake_to_camel(key: &str) -> String {
	let mut out = String::with_capacity(key.len());
	let mut chars = key.chars().peekable();
	while let Some(c) = chars.next() {
		if c == '_' || c == '-' {
			if let Some(&next) = chars.peek() {
				if next.is_ascii_lowercase() {
					out.push(next.to_ascii_uppercase());
					chars.next();
					continue;
				}
			}
		}
		out.push(c);
	}
	out
}

/// Renames the top-level keys of an object from camelCase to snake_case.
///
/// Non-object values are returned unchanged.
pub fn serialize(value: Value) -> Value {
	rename_keys(value, camel_to_snake)
}

/// Renames the top-level keys of an object from snake_case to camelCase.
///
/// Non-object values are returned unchanged.
pub fn deserialize(value: Value) -> Value {
	rename_keys(value, snake_to_camel)
}

fn rename_keys(value: Value, rename: fn(&str) -> String) -> Value {
	match value {
		Value::Object(map) => Value::Object(
			map.into_iter()
				.map(|(key, value)| (rename(&key), value))
				.collect::<Map<String, Value>>(),
		),
		other => other,
	}
}
