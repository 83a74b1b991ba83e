// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The `{status, result, error_message}` wrapper every engine call returns.
//!
//! The wire format does not tie `result` and `error_message` to `status`, so
//! [`Envelope::into_result`] checks the combination instead of trusting it:
//! `success` must carry a result, and `failure` is reported with its message.

use serde::{Deserialize, Serialize};

use crate::error::{EnvelopeError, Result};

/// Message used when a failure envelope carries no `error_message`.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Outcome tag of an engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
	Success,
	Failure,
}

/// Envelope returned by every engine export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
	pub status: Status,
	pub result: Option<T>,
	pub error_message: Option<String>,
}

impl<T> Envelope<T> {
	pub fn success(result: T) -> Self {
		Self {
			status: Status::Success,
			result: Some(result),
			error_message: None,
		}
	}

	pub fn failure(message: impl Into<String>) -> Self {
		Self {
			status: Status::Failure,
			result: None,
			error_message: Some(message.into()),
		}
	}

	pub fn is_success(&self) -> bool {
		self.status == Status::Success
	}

	/// Converts the envelope into a `Result`, enforcing the status invariant.
	pub fn into_result(self) -> Result<T> {
		match self.status {
			Status::Failure => Err(EnvelopeError::Failure(
				self.error_message
					.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
			)),
			Status::Success => self.result.ok_or(EnvelopeError::MissingResult),
		}
	}
}

impl<T> From<std::result::Result<T, String>> for Envelope<T> {
	fn from(value: std::result::Result<T, String>) -> Self {
		match value {
			Ok(result) => Self::success(result),
			Err(message) => Self::failure(message),
		}
	}
}
