// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire protocol and data model for the Flipt client-side evaluation SDK.
//!
//! This crate has no I/O. It describes what crosses the boundary between the
//! SDK and the native evaluation engine:
//!
//! - [`ClientOptions`] and its JSON encoding, handed to the engine at startup
//! - [`EvaluationRequest`] and the typed evaluation responses
//! - [`Envelope`], the `{status, result, error_message}` wrapper every engine
//!   call returns
//! - [`codec`], the camelCase/snake_case key transcoding used by host bindings
//!
//! The HTTP fetcher, the engine handle and the client itself live in the
//! `flipt-client` crate.
//!
//! # Example
//!
//! ```
//! use flipt_client_core::{Envelope, EvaluationRequest, BooleanEvaluationResponse};
//!
//! let request = EvaluationRequest::new("new-ui", "user-1", Default::default())
//!     .with_context("plan", "pro");
//! let wire = serde_json::to_string(&request).unwrap();
//! assert!(wire.contains("\"flag_key\":\"new-ui\""));
//!
//! let raw = r#"{"status":"failure","result":null,"error_message":"flag not found"}"#;
//! let envelope: Envelope<BooleanEvaluationResponse> = serde_json::from_str(raw).unwrap();
//! assert_eq!(envelope.into_result().unwrap_err().to_string(), "flag not found");
//! ```

pub mod codec;
pub mod envelope;
pub mod error;
pub mod evaluation;
pub mod options;

pub use envelope::{Envelope, Status, UNKNOWN_ERROR};
pub use error::{ConfigError, EnvelopeError, Result};
pub use evaluation::{
	BatchEvaluationResponse, BooleanEvaluationResponse, ErrorEvaluationResponse, EvaluationRequest,
	EvaluationResponse, Flag, VariantEvaluationResponse, BOOLEAN_EVALUATION_RESPONSE_TYPE,
	ERROR_EVALUATION_RESPONSE_TYPE, VARIANT_EVALUATION_RESPONSE_TYPE,
};
pub use options::{
	Authentication, ClientOptions, ErrorStrategy, FetchMode, ACCEPT_SERVER_VERSION, DEFAULT_NAMESPACE,
	DEFAULT_UPDATE_INTERVAL_SECS, DEFAULT_URL, SNAPSHOT_PATH, TlsConfig, secs_rounded_up,
};
