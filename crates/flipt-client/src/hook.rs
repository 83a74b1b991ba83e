// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Evaluation hooks.
//!
//! Implement [`EvaluationHook`] to observe evaluations, for example to record
//! exposures in an analytics pipeline. Hooks run synchronously on the
//! evaluation path: `before` once per requested flag, `after` once per
//! successful boolean or variant result. Keep them fast and queue expensive
//! work elsewhere.
//!
//! # Example
//!
//! ```ignore
//! use flipt_client::{AfterHookData, EvaluationHook, FliptClient};
//!
//! struct ExposureLogger;
//!
//! impl EvaluationHook for ExposureLogger {
//!     fn after(&self, data: &AfterHookData) {
//!         println!("{} = {} ({})", data.flag_key, data.value, data.reason);
//!     }
//! }
//!
//! let client = FliptClient::builder()
//!     .url("http://localhost:8080")
//!     .hook(ExposureLogger)
//!     .build()
//!     .await?;
//! ```

use std::fmt;
use std::sync::Arc;

use flipt_client_core::{BooleanEvaluationResponse, VariantEvaluationResponse};

/// Kind of flag an evaluation result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagType {
	Variant,
	Boolean,
}

impl FlagType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Variant => "variant",
			Self::Boolean => "boolean",
		}
	}
}

impl fmt::Display for FlagType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Data passed to [`EvaluationHook::before`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeforeHookData {
	pub flag_key: String,
}

/// Data passed to [`EvaluationHook::after`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfterHookData {
	pub flag_key: String,
	pub flag_type: FlagType,
	/// The variant key, or `"true"`/`"false"` for boolean flags.
	pub value: String,
	pub reason: String,
	pub segment_keys: Vec<String>,
}

impl From<&BooleanEvaluationResponse> for AfterHookData {
	fn from(response: &BooleanEvaluationResponse) -> Self {
		Self {
			flag_key: response.flag_key.clone(),
			flag_type: FlagType::Boolean,
			value: response.enabled.to_string(),
			reason: response.reason.clone(),
			segment_keys: response.segment_keys.clone(),
		}
	}
}

impl From<&VariantEvaluationResponse> for AfterHookData {
	fn from(response: &VariantEvaluationResponse) -> Self {
		Self {
			flag_key: response.flag_key.clone(),
			flag_type: FlagType::Variant,
			value: response.variant_key.clone(),
			reason: response.reason.clone(),
			segment_keys: response.segment_keys.clone(),
		}
	}
}

/// Observer of flag evaluations.
pub trait EvaluationHook: Send + Sync + 'static {
	/// Called before a flag is evaluated.
	fn before(&self, _data: &BeforeHookData) {}

	/// Called after a flag evaluated successfully.
	fn after(&self, _data: &AfterHookData) {}
}

/// Type alias for a shared evaluation hook.
pub type SharedEvaluationHook = Arc<dyn EvaluationHook>;

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex;

	#[derive(Default)]
	struct RecordingHook {
		before: Mutex<Vec<String>>,
		after: Mutex<Vec<AfterHookData>>,
	}

	impl EvaluationHook for RecordingHook {
		fn before(&self, data: &BeforeHookData) {
			self.before.lock().unwrap().push(data.flag_key.clone());
		}

		fn after(&self, data: &AfterHookData) {
			self.after.lock().unwrap().push(data.clone());
		}
	}

	struct SilentHook;

	impl EvaluationHook for SilentHook {}

	#[test]
	fn boolean_response_to_after_data() {
		let response = BooleanEvaluationResponse {
			enabled: false,
			flag_key: "new-ui".to_string(),
			reason: "DEFAULT_EVALUATION_REASON".to_string(),
			request_duration_millis: 0.0,
			timestamp: String::new(),
			segment_keys: vec![],
		};
		let data = AfterHookData::from(&response);
		assert_eq!(data.flag_type, FlagType::Boolean);
		assert_eq!(data.value, "false");
		assert_eq!(data.reason, "DEFAULT_EVALUATION_REASON");
	}

	#[test]
	fn variant_response_to_after_data() {
		let response = VariantEvaluationResponse {
			is_match: true,
			segment_keys: vec!["beta".to_string()],
			reason: "MATCH_EVALUATION_REASON".to_string(),
			flag_key: "theme".to_string(),
			variant_key: "dark".to_string(),
			variant_attachment: None,
			request_duration_millis: 0.0,
			timestamp: String::new(),
		};
		let data = AfterHookData::from(&response);
		assert_eq!(data.flag_type.to_string(), "variant");
		assert_eq!(data.value, "dark");
		assert_eq!(data.segment_keys, vec!["beta"]);
	}

	#[test]
	fn hooks_are_object_safe() {
		let recording = Arc::new(RecordingHook::default());
		let hooks: Vec<SharedEvaluationHook> = vec![recording.clone(), Arc::new(SilentHook)];
		for hook in &hooks {
			hook.before(&BeforeHookData {
				flag_key: "f".to_string(),
			});
		}
		assert_eq!(*recording.before.lock().unwrap(), vec!["f"]);
		assert!(recording.after.lock().unwrap().is_empty());
	}
}
