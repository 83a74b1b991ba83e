// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the Flipt client SDK.

use flipt_client_core::ConfigError;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Broad category of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// The snapshot could not be fetched.
	Transport,
	/// The engine returned nothing, a failure envelope, or rejected a snapshot.
	Protocol,
	/// JSON could not be parsed into the expected shape.
	Decode,
	/// The caller passed an argument that was rejected before any engine call.
	InvalidArgument,
	/// The client or its engine could not be set up or is no longer usable.
	Resource,
}

/// Errors that can occur in the client SDK.
#[derive(Debug, Error)]
pub enum ClientError {
	/// Options could not be turned into a working client.
	#[error("invalid options: {0}")]
	InvalidOptions(String),

	/// An evaluation request was rejected before reaching the engine.
	#[error("{0}")]
	InvalidRequest(String),

	/// No engine was supplied and the native engine is not compiled in.
	#[error("no evaluation engine configured")]
	MissingEngine,

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// The snapshot endpoint answered with a status other than 2xx or 304.
	#[error("Failed to fetch data: {status_text}")]
	FetchFailed {
		/// HTTP status code.
		status: u16,
		/// HTTP reason phrase.
		status_text: String,
	},

	/// A snapshot body or engine result was not valid JSON of the expected shape.
	#[error("parsing error: {0}")]
	ParseFailed(#[from] serde_json::Error),

	/// The engine refused to load a snapshot.
	#[error("snapshot rejected by engine: {0}")]
	SnapshotRejected(String),

	/// An engine call produced no result or a failure envelope.
	#[error("{0}")]
	EvaluationFailed(String),

	/// The client has been closed and its engine released.
	#[error("client has been closed")]
	ClientClosed,

	/// Background polling was requested outside a tokio runtime.
	#[error("polling requires a running tokio runtime")]
	RuntimeUnavailable,

	/// Lock acquisition failed.
	#[error("failed to acquire lock")]
	LockError,

	/// Configuration could not be read from the environment.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

impl ClientError {
	/// Category of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::RequestFailed(_) | Self::FetchFailed { .. } => ErrorKind::Transport,
			Self::SnapshotRejected(_) | Self::EvaluationFailed(_) => ErrorKind::Protocol,
			Self::ParseFailed(_) => ErrorKind::Decode,
			Self::InvalidRequest(_) | Self::Config(_) => ErrorKind::InvalidArgument,
			Self::InvalidOptions(_)
			| Self::MissingEngine
			| Self::ClientClosed
			| Self::RuntimeUnavailable
			| Self::LockError => ErrorKind::Resource,
		}
	}
}
