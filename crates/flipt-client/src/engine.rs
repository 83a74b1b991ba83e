// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ownership of the evaluation engine.
//!
//! The engine is opaque: it accepts a snapshot and answers JSON requests with
//! JSON envelopes. [`EngineHandle`] owns exactly one engine for one namespace
//! and serializes every call through a mutex, so a snapshot load never runs
//! alongside an evaluation. Closing the handle drops the engine once; every
//! call after that fails with [`ClientError::ClientClosed`].

use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Error reported by an engine when it rejects a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}
}

/// Narrow call surface of a flag evaluation engine.
///
/// Evaluation methods receive snake_case JSON requests and return the JSON
/// envelope produced by the engine, or `None` if the engine produced nothing.
pub trait Engine: Send {
	/// Replaces all namespace state with `data`.
	fn snapshot(&mut self, data: &Value) -> std::result::Result<(), EngineError>;

	fn evaluate_boolean(&self, request: &str) -> Option<String>;

	fn evaluate_variant(&self, request: &str) -> Option<String>;

	/// `requests` is a JSON array of evaluation requests.
	fn evaluate_batch(&self, requests: &str) -> Option<String>;

	fn list_flags(&self) -> Option<String>;
}

/// Exclusive owner of one engine instance scoped to one namespace.
pub struct EngineHandle {
	namespace: String,
	engine: Mutex<Option<Box<dyn Engine>>>,
}

impl EngineHandle {
	pub fn new(namespace: impl Into<String>, engine: Box<dyn Engine>) -> Self {
		Self {
			namespace: namespace.into(),
			engine: Mutex::new(Some(engine)),
		}
	}

	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	/// Loads a snapshot into the engine.
	pub fn snapshot(&self, data: &Value) -> Result<()> {
		let mut guard = self.engine.lock().map_err(|_| ClientError::LockError)?;
		let engine = guard.as_mut().ok_or(ClientError::ClientClosed)?;
		engine
			.snapshot(data)
			.map_err(|e| ClientError::SnapshotRejected(e.to_string()))
	}

	pub fn evaluate_boolean(&self, request: &str) -> Result<Option<String>> {
		self.with_engine(|engine| engine.evaluate_boolean(request))
	}

	pub fn evaluate_variant(&self, request: &str) -> Result<Option<String>> {
		self.with_engine(|engine| engine.evaluate_variant(request))
	}

	pub fn evaluate_batch(&self, requests: &str) -> Result<Option<String>> {
		self.with_engine(|engine| engine.evaluate_batch(requests))
	}

	pub fn list_flags(&self) -> Result<Option<String>> {
		self.with_engine(|engine| engine.list_flags())
	}

	/// Releases the engine. Returns `true` only for the call that released it.
	pub fn close(&self) -> bool {
		let engine = match self.engine.lock() {
			Ok(mut guard) => guard.take(),
			Err(poisoned) => poisoned.into_inner().take(),
		};
		let released = engine.is_some();
		drop(engine);
		if released {
			debug!(namespace = %self.namespace, "Engine released");
		}
		released
	}

	pub fn is_closed(&self) -> bool {
		match self.engine.lock() {
			Ok(guard) => guard.is_none(),
			Err(poisoned) => poisoned.into_inner().is_none(),
		}
	}

	fn with_engine<T>(&self, f: impl FnOnce(&dyn Engine) -> T) -> Result<T> {
		let guard = self.engine.lock().map_err(|_| ClientError::LockError)?;
		let engine = guard.as_deref().ok_or(ClientError::ClientClosed)?;
		Ok(f(engine))
	}
}

impl std::fmt::Debug for EngineHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EngineHandle")
			.field("namespace", &self.namespace)
			.field("closed", &self.is_closed())
			.finish()
	}
}
