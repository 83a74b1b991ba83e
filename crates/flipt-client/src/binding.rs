// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Conversion between engine JSON and host values.
//!
//! Engine results arrive as optional JSON strings wrapped in an
//! [`Envelope`]. [`decode`] turns them into typed values or a
//! [`ClientError`] with a fixed per-operation message. [`to_host_value`] and
//! [`from_host_value`] serve hosts that speak camelCase.

use flipt_client_core::{codec, Envelope, EnvelopeError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Engine export an envelope came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	Variant,
	Boolean,
	Batch,
	ListFlags,
}

impl Operation {
	/// Message reported when the engine returns nothing or an empty success.
	pub fn failure_message(self) -> &'static str {
		match self {
			Self::Variant => "Failed to evaluate variant",
			Self::Boolean => "Failed to evaluate boolean",
			Self::Batch => "Failed to evaluate batch",
			Self::ListFlags => "Failed to list flags",
		}
	}
}

/// Decodes an engine result for `operation`.
///
/// `None` and `success` without a result both fail with the operation's fixed
/// message. A `failure` envelope fails with its `error_message`.
pub fn decode<T: DeserializeOwned>(operation: Operation, raw: Option<String>) -> Result<T> {
	let raw = raw.ok_or_else(|| ClientError::EvaluationFailed(operation.failure_message().to_string()))?;
	let envelope: Envelope<T> = serde_json::from_str(&raw)?;
	envelope.into_result().map_err(|e| match e {
		EnvelopeError::Failure(message) => ClientError::EvaluationFailed(message),
		EnvelopeError::MissingResult => ClientError::EvaluationFailed(operation.failure_message().to_string()),
	})
}

/// Encodes a request for the engine.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
	Ok(serde_json::to_string(value)?)
}

/// Converts a value to a camelCase JSON object.
pub fn to_host_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
	Ok(codec::deserialize(serde_json::to_value(value)?))
}

/// Reads a value from a camelCase JSON object.
pub fn from_host_value<T: DeserializeOwned>(value: Value) -> Result<T> {
	Ok(serde_json::from_value(codec::serialize(value))?)
}


#[cfg(test)]
mod proptests {
	use super::*;
	use flipt_client_core::EvaluationRequest;
	use proptest::prelude::*;
	use std::collections::HashMap;

	proptest! {
		#[test]
		fn host_requests_survive_the_codec(
			flag_key in "[a-z][a-z0-9_-]{0,20}",
			entity_id in "[a-zA-Z0-9-]{1,20}",
			context in prop::collection::hash_map("[a-zA-Z_]{1,10}", "[a-z0-9]{0,10}", 0..4),
		) {
			let request = EvaluationRequest::new(&flag_key, &entity_id, context.into_iter().collect::<HashMap<_, _>>());
			let host = to_host_value(&request).unwrap();
			prop_assert!(host.get("flagKey").is_some());
			let back: EvaluationRequest = from_host_value(host).unwrap();
			prop_assert_eq!(back, request);
		}
	}
}
