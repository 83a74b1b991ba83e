// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client-side feature flag evaluation SDK for Flipt.
//!
//! The client downloads a namespace snapshot from a Flipt server, loads it into
//! an evaluation engine and answers flag evaluations locally, without a network
//! round-trip per decision.
//!
//! # Features
//!
//! - **Conditional refresh**: snapshots are re-fetched with `If-None-Match`, a
//!   304 leaves the engine untouched
//! - **Pluggable transport**: supply any [`Fetcher`], or use the built-in
//!   [`HttpFetcher`]
//! - **Pluggable engine**: any [`Engine`]; with the `ffi` feature the native
//!   `libfliptengine` is used by default
//! - **Error strategy**: keep serving the last good snapshot when a refresh
//!   fails ([`ErrorStrategy::Fallback`])
//! - **Background polling**: opt-in via [`FliptClient::start_polling`]
//! - **Evaluation hooks**: observe every evaluation with [`EvaluationHook`]
//!
//! # Example
//!
//! ```ignore
//! use std::collections::HashMap;
//! use flipt_client::{Authentication, EvaluationRequest, FliptClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FliptClient::builder()
//!         .namespace("default")
//!         .url("http://localhost:8080")
//!         .authentication(Authentication::client_token("secret"))
//!         .build()
//!         .await?;
//!
//!     let flag = client.evaluate_boolean("new-ui", "user-1", HashMap::new())?;
//!     println!("new-ui enabled: {}", flag.enabled);
//!
//!     let batch = client.evaluate_batch(&[
//!         EvaluationRequest::new("new-ui", "user-1", HashMap::new()),
//!         EvaluationRequest::new("theme", "user-1", HashMap::new()),
//!     ])?;
//!     println!("{} responses", batch.responses.len());
//!
//!     client.close();
//!     Ok(())
//! }
//! ```

pub mod binding;
mod client;
mod engine;
mod error;
mod fetcher;
#[cfg(feature = "ffi")]
mod ffi;
mod hook;
pub mod http;
mod poller;

pub use client::{FliptClient, FliptClientBuilder};
pub use engine::{Engine, EngineError, EngineHandle};
pub use error::{ClientError, ErrorKind, Result};
pub use fetcher::{snapshot_headers, FetchResponse, Fetcher, HttpFetcher, SharedFetcher};
#[cfg(feature = "ffi")]
pub use ffi::NativeEngine;
pub use hook::{AfterHookData, BeforeHookData, EvaluationHook, FlagType, SharedEvaluationHook};

// Re-export core types for convenience
pub use flipt_client_core::{
	codec, Authentication, BatchEvaluationResponse, BooleanEvaluationResponse, ClientOptions,
	Envelope, ErrorEvaluationResponse, ErrorStrategy, EvaluationRequest, EvaluationResponse, FetchMode,
	Flag, TlsConfig, VariantEvaluationResponse,
};
