// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Native evaluation engine linked through its C ABI (`libfliptengine`).
//!
//! Every string the engine returns is engine-allocated and is released through
//! `destroy_string` by [`NativeString`]'s `Drop`. The engine pointer is
//! released through `destroy_engine` by [`NativeEngine`]'s `Drop`, which runs
//! once because [`crate::EngineHandle`] owns the engine exclusively.
//!
//! Requires an engine build that exports `snapshot(engine, data)` and does not
//! fetch snapshots itself. Engine builds whose `initialize_engine` starts their
//! own HTTP poller and export no `snapshot` fail to link; use a custom
//! [`Engine`] with those.

use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr::NonNull;

use flipt_client_core::{ClientOptions, Envelope, UNKNOWN_ERROR};
use serde_json::Value;
use tracing::{debug, warn};

use crate::engine::{Engine, EngineError};
use crate::error::{ClientError, Result};

#[link(name = "fliptengine")]
extern "C" {
	fn initialize_engine(namespace: *const c_char, opts: *const c_char) -> *mut c_void;
	fn snapshot(engine: *mut c_void, data: *const c_char) -> *mut c_char;
	fn evaluate_variant(engine: *mut c_void, request: *const c_char) -> *mut c_char;
	fn evaluate_boolean(engine: *mut c_void, request: *const c_char) -> *mut c_char;
	fn evaluate_batch(engine: *mut c_void, requests: *const c_char) -> *mut c_char;
	fn list_flags(engine: *mut c_void) -> *mut c_char;
	fn destroy_engine(engine: *mut c_void);
	fn destroy_string(ptr: *mut c_char);
}

/// Engine-allocated C string, freed on drop.
struct NativeString(NonNull<c_char>);

impl NativeString {
	/// Takes ownership of `ptr`. Returns `None` for null.
	///
	/// # Safety
	///
	/// `ptr` must be null or a NUL-terminated string allocated by the engine
	/// and not yet passed to `destroy_string`.
	unsafe fn from_raw(ptr: *mut c_char) -> Option<Self> {
		NonNull::new(ptr).map(Self)
	}

	fn to_string_lossy(&self) -> String {
		// SAFETY: the pointer is non-null, NUL-terminated and owned by self.
		unsafe { CStr::from_ptr(self.0.as_ptr()) }
			.to_string_lossy()
			.into_owned()
	}
}

impl Drop for NativeString {
	fn drop(&mut self) {
		// SAFETY: the string was allocated by the engine and is freed only here.
		unsafe { destroy_string(self.0.as_ptr()) }
	}
}

/// Evaluation engine backed by the native library.
pub struct NativeEngine {
	ptr: NonNull<c_void>,
}

// SAFETY: the engine pointer is only used behind `EngineHandle`'s mutex.
unsafe impl Send for NativeEngine {}

impl NativeEngine {
	/// Creates a native engine for `namespace` configured with `options`.
	pub fn initialize(namespace: &str, options: &ClientOptions) -> Result<Self> {
		let namespace_c = CString::new(namespace)
			.map_err(|_| ClientError::InvalidOptions("namespace contains a NUL byte".to_string()))?;
		let options_json = options
			.to_json()
			.map_err(|e| ClientError::InvalidOptions(e.to_string()))?;
		let options_c = CString::new(options_json)
			.map_err(|_| ClientError::InvalidOptions("options contain a NUL byte".to_string()))?;

		// SAFETY: both arguments are valid NUL-terminated strings for the call.
		let ptr = unsafe { initialize_engine(namespace_c.as_ptr(), options_c.as_ptr()) };
		let ptr = NonNull::new(ptr)
			.ok_or_else(|| ClientError::InvalidOptions("native engine failed to initialize".to_string()))?;

		debug!(namespace = %namespace, "Native engine initialized");
		Ok(Self { ptr })
	}

	fn call_with(&self, input: &str, f: unsafe extern "C" fn(*mut c_void, *const c_char) -> *mut c_char) -> Option<String> {
		let input = match CString::new(input) {
			Ok(input) => input,
			Err(_) => {
				warn!("Engine input contains a NUL byte");
				return None;
			}
		};
		// SAFETY: the engine pointer is live until drop and `input` outlives the call.
		let raw = unsafe { f(self.ptr.as_ptr(), input.as_ptr()) };
		// SAFETY: engine exports return null or an engine-allocated string.
		unsafe { NativeString::from_raw(raw) }.map(|s| s.to_string_lossy())
	}
}

impl Engine for NativeEngine {
	fn snapshot(&mut self, data: &Value) -> std::result::Result<(), EngineError> {
		let raw = self
			.call_with(&data.to_string(), snapshot)
			.ok_or_else(|| EngineError::new(UNKNOWN_ERROR))?;
		let envelope: Envelope<Value> =
			serde_json::from_str(&raw).map_err(|e| EngineError::new(e.to_string()))?;
		if envelope.is_success() {
			Ok(())
		} else {
			Err(EngineError::new(
				envelope.error_message.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
			))
		}
	}

	fn evaluate_boolean(&self, request: &str) -> Option<String> {
		self.call_with(request, evaluate_boolean)
	}

	fn evaluate_variant(&self, request: &str) -> Option<String> {
		self.call_with(request, evaluate_variant)
	}

	fn evaluate_batch(&self, requests: &str) -> Option<String> {
		self.call_with(requests, evaluate_batch)
	}

	fn list_flags(&self) -> Option<String> {
		// SAFETY: the engine pointer is live until drop.
		let raw = unsafe { list_flags(self.ptr.as_ptr()) };
		// SAFETY: engine exports return null or an engine-allocated string.
		unsafe { NativeString::from_raw(raw) }.map(|s| s.to_string_lossy())
	}
}

impl Drop for NativeEngine {
	fn drop(&mut self) {
		// SAFETY: the pointer came from `initialize_engine` and is released only here.
		unsafe { destroy_engine(self.ptr.as_ptr()) }
	}
}
