// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Evaluation requests and responses as exchanged with the engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Discriminator for a boolean response inside a batch.
pub const BOOLEAN_EVALUATION_RESPONSE_TYPE: &str = "BOOLEAN_EVALUATION_RESPONSE_TYPE";
/// Discriminator for a variant response inside a batch.
pub const VARIANT_EVALUATION_RESPONSE_TYPE: &str = "VARIANT_EVALUATION_RESPONSE_TYPE";
/// Discriminator for an error response inside a batch.
pub const ERROR_EVALUATION_RESPONSE_TYPE: &str = "ERROR_EVALUATION_RESPONSE_TYPE";

/// A request to evaluate one flag for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
	pub flag_key: String,
	pub entity_id: String,
	#[serde(default)]
	pub context: HashMap<String, String>,
}

impl EvaluationRequest {
	pub fn new(
		flag_key: impl Into<String>,
		entity_id: impl Into<String>,
		context: HashMap<String, String>,
	) -> Self {
		Self {
			flag_key: flag_key.into(),
			entity_id: entity_id.into(),
			context,
		}
	}

	/// Adds a single context entry.
	pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.context.insert(key.into(), value.into());
		self
	}
}

/// Result of evaluating a variant flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantEvaluationResponse {
	#[serde(rename = "match")]
	pub is_match: bool,
	#[serde(default)]
	pub segment_keys: Vec<String>,
	pub reason: String,
	pub flag_key: String,
	#[serde(default)]
	pub variant_key: String,
	#[serde(default)]
	pub variant_attachment: Option<String>,
	pub request_duration_millis: f64,
	#[serde(default)]
	pub timestamp: String,
}

/// Result of evaluating a boolean flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanEvaluationResponse {
	pub enabled: bool,
	pub flag_key: String,
	pub reason: String,
	pub request_duration_millis: f64,
	#[serde(default)]
	pub timestamp: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub segment_keys: Vec<String>,
}

/// Per-flag error reported inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvaluationResponse {
	pub flag_key: String,
	pub namespace_key: String,
	pub reason: String,
}

/// One element of a batch evaluation.
///
/// On the wire this is an object with a `type` discriminator and exactly one
/// populated nested payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResponse {
	Boolean(BooleanEvaluationResponse),
	Variant(VariantEvaluationResponse),
	Error(ErrorEvaluationResponse),
}

impl EvaluationResponse {
	/// The wire discriminator for this response.
	pub fn type_name(&self) -> &'static str {
		match self {
			Self::Boolean(_) => BOOLEAN_EVALUATION_RESPONSE_TYPE,
			Self::Variant(_) => VARIANT_EVALUATION_RESPONSE_TYPE,
			Self::Error(_) => ERROR_EVALUATION_RESPONSE_TYPE,
		}
	}

	pub fn flag_key(&self) -> &str {
		match self {
			Self::Boolean(r) => &r.flag_key,
			Self::Variant(r) => &r.flag_key,
			Self::Error(r) => &r.flag_key,
		}
	}

	/// Decodes one wire element.
	///
	/// Returns `None` when the `type` is unknown or the matching payload is
	/// missing or malformed.
	pub fn from_wire(value: &Value) -> Option<Self> {
		let kind = value.get("type")?.as_str()?;
		let decoded = match kind {
			BOOLEAN_EVALUATION_RESPONSE_TYPE => {
				decode_payload(value, "boolean_evaluation_response").map(Self::Boolean)
			}
			VARIANT_EVALUATION_RESPONSE_TYPE => {
				decode_payload(value, "variant_evaluation_response").map(Self::Variant)
			}
			ERROR_EVALUATION_RESPONSE_TYPE => {
				decode_payload(value, "error_evaluation_response").map(Self::Error)
			}
			_ => None,
		};
		if decoded.is_none() {
			warn!(response_type = %kind, "Dropping unrecognized or malformed batch response");
		}
		decoded
	}
}

fn decode_payload<T: serde::de::DeserializeOwned>(value: &Value, field: &str) -> Option<T> {
	let payload = value.get(field)?;
	serde_json::from_value(payload.clone()).ok()
}

#[derive(Serialize)]
struct WireResponse<'a> {
	#[serde(rename = "type")]
	kind: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	boolean_evaluation_response: Option<&'a BooleanEvaluationResponse>,
	#[serde(skip_serializing_if = "Option::is_none")]
	variant_evaluation_response: Option<&'a VariantEvaluationResponse>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error_evaluation_response: Option<&'a ErrorEvaluationResponse>,
}

impl Serialize for EvaluationResponse {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut wire = WireResponse {
			kind: self.type_name(),
			boolean_evaluation_response: None,
			variant_evaluation_response: None,
			error_evaluation_response: None,
		};
		match self {
			Self::Boolean(r) => wire.boolean_evaluation_response = Some(r),
			Self::Variant(r) => wire.variant_evaluation_response = Some(r),
			Self::Error(r) => wire.error_evaluation_response = Some(r),
		}
		wire.serialize(serializer)
	}
}

/// Result of a batch evaluation.
///
/// Responses keep the order the engine produced them in. Elements with an
/// unknown `type` are dropped while decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBatchEvaluationResponse")]
pub struct BatchEvaluationResponse {
	pub responses: Vec<EvaluationResponse>,
	pub request_duration_millis: f64,
}

#[derive(Deserialize)]
struct RawBatchEvaluationResponse {
	#[serde(default)]
	responses: Vec<Value>,
	#[serde(default)]
	request_duration_millis: f64,
}

impl From<RawBatchEvaluationResponse> for BatchEvaluationResponse {
	fn from(raw: RawBatchEvaluationResponse) -> Self {
		Self {
			responses: raw
				.responses
				.iter()
				.filter_map(EvaluationResponse::from_wire)
				.collect(),
			request_duration_millis: raw.request_duration_millis,
		}
	}
}

/// Read-only projection of a flag, as returned by `list_flags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
	pub key: String,
	pub enabled: bool,
	#[serde(rename = "type")]
	pub flag_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
}
