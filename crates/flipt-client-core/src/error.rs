// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the wire protocol.

use thiserror::Error;

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;

/// Errors produced when unwrapping an engine envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
	/// The engine reported a failure.
	#[error("{0}")]
	Failure(String),

	/// The engine reported success but did not include a result.
	#[error("engine reported success without a result")]
	MissingResult,
}

/// Errors produced while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
	/// An environment variable held a value that could not be parsed.
	#[error("invalid value for {name}: {message}")]
	InvalidEnv { name: String, message: String },
}
