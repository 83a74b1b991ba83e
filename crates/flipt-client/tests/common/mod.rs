// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Engine and fetcher doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flipt_client::{Engine, EngineError, EvaluationRequest, FetchResponse, Fetcher, Result};
use serde_json::{json, Value};

pub const SNAPSHOT_PATH: &str = "/internal/v1/evaluation/snapshot/namespace/default";

/// Snapshot with one boolean flag `new-ui` (enabled) and one variant flag `theme`.
pub fn snapshot() -> Value {
	json!({
		"namespace": { "key": "default" },
		"flags": [
			{ "key": "new-ui", "name": "New UI", "type": "BOOLEAN_FLAG_TYPE", "enabled": true },
			{ "key": "theme", "name": "Theme", "type": "VARIANT_FLAG_TYPE", "enabled": true, "variant": "dark" }
		]
	})
}

#[derive(Debug, Default)]
struct EngineState {
	flags: Vec<Value>,
	snapshots: usize,
	drops: usize,
}

/// Observes a [`StaticEngine`] after it has been moved into a client.
#[derive(Clone)]
pub struct EngineObserver {
	state: Arc<Mutex<EngineState>>,
}

impl EngineObserver {
	pub fn snapshots(&self) -> usize {
		self.state.lock().unwrap().snapshots
	}

	pub fn drops(&self) -> usize {
		self.state.lock().unwrap().drops
	}

	pub fn flag_keys(&self) -> Vec<String> {
		self.state
			.lock()
			.unwrap()
			.flags
			.iter()
			.filter_map(|f| f["key"].as_str().map(str::to_string))
			.collect()
	}
}

/// Engine that answers from the `flags` list of the loaded snapshot.
///
/// Every enabled flag matches every entity. A snapshot with `"reject": true`
/// is refused.
pub struct StaticEngine {
	namespace: String,
	state: Arc<Mutex<EngineState>>,
}

impl StaticEngine {
	pub fn new() -> (Self, EngineObserver) {
		let state = Arc::new(Mutex::new(EngineState::default()));
		let engine = Self {
			namespace: "default".to_string(),
			state: Arc::clone(&state),
		};
		(engine, EngineObserver { state })
	}

	fn find(&self, key: &str) -> Option<Value> {
		self.state
			.lock()
			.unwrap()
			.flags
			.iter()
			.find(|f| f["key"] == key)
			.cloned()
	}

	fn not_found(&self, key: &str) -> String {
		format!("failed to get flag information {}/{}", self.namespace, key)
	}

	fn boolean(&self, request: &EvaluationRequest) -> std::result::Result<Value, String> {
		let flag = self.find(&request.flag_key).ok_or_else(|| self.not_found(&request.flag_key))?;
		if flag["type"] != "BOOLEAN_FLAG_TYPE" {
			return Err(format!("flag {} is not a boolean flag", request.flag_key));
		}
		Ok(json!({
			"enabled": flag["enabled"],
			"flag_key": request.flag_key,
			"reason": "MATCH_EVALUATION_REASON",
			"request_duration_millis": 0.042,
			"timestamp": "2024-09-13T19:37:18Z"
		}))
	}

	fn variant(&self, request: &EvaluationRequest) -> std::result::Result<Value, String> {
		let flag = self.find(&request.flag_key).ok_or_else(|| self.not_found(&request.flag_key))?;
		if flag["type"] != "VARIANT_FLAG_TYPE" {
			return Err(format!("flag {} is not a variant flag", request.flag_key));
		}
		Ok(json!({
			"match": true,
			"segment_keys": ["everyone"],
			"reason": "MATCH_EVALUATION_REASON",
			"flag_key": request.flag_key,
			"variant_key": flag["variant"],
			"variant_attachment": null,
			"request_duration_millis": 0.042,
			"timestamp": "2024-09-13T19:37:18Z"
		}))
	}
}

fn envelope(result: std::result::Result<Value, String>) -> Option<String> {
	Some(
		match result {
			Ok(result) => json!({ "status": "success", "result": result, "error_message": null }),
			Err(message) => json!({ "status": "failure", "result": null, "error_message": message }),
		}
		.to_string(),
	)
}

impl Engine for StaticEngine {
	fn snapshot(&mut self, data: &Value) -> std::result::Result<(), EngineError> {
		if data["reject"] == true {
			return Err(EngineError::new("invalid snapshot document"));
		}
		let mut state = self.state.lock().unwrap();
		state.flags = data["flags"].as_array().cloned().unwrap_or_default();
		state.snapshots += 1;
		Ok(())
	}

	fn evaluate_boolean(&self, request: &str) -> Option<String> {
		let request: EvaluationRequest = serde_json::from_str(request).ok()?;
		envelope(self.boolean(&request))
	}

	fn evaluate_variant(&self, request: &str) -> Option<String> {
		let request: EvaluationRequest = serde_json::from_str(request).ok()?;
		envelope(self.variant(&request))
	}

	fn evaluate_batch(&self, requests: &str) -> Option<String> {
		let requests: Vec<EvaluationRequest> = serde_json::from_str(requests).ok()?;
		let responses: Vec<Value> = requests
			.iter()
			.map(|request| match self.find(&request.flag_key) {
				Some(flag) if flag["type"] == "VARIANT_FLAG_TYPE" => json!({
					"type": "VARIANT_EVALUATION_RESPONSE_TYPE",
					"variant_evaluation_response": self.variant(request).ok()
				}),
				Some(_) => json!({
					"type": "BOOLEAN_EVALUATION_RESPONSE_TYPE",
					"boolean_evaluation_response": self.boolean(request).ok()
				}),
				None => json!({
					"type": "ERROR_EVALUATION_RESPONSE_TYPE",
					"error_evaluation_response": {
						"flag_key": request.flag_key,
						"namespace_key": self.namespace,
						"reason": "NOT_FOUND_ERROR_EVALUATION_REASON"
					}
				}),
			})
			.collect();
		envelope(Ok(json!({ "responses": responses, "request_duration_millis": 0.1 })))
	}

	fn list_flags(&self) -> Option<String> {
		let flags: Vec<Value> = self
			.state
			.lock()
			.unwrap()
			.flags
			.iter()
			.map(|f| json!({ "key": f["key"], "enabled": f["enabled"], "type": f["type"] }))
			.collect();
		envelope(Ok(Value::Array(flags)))
	}
}

impl Drop for StaticEngine {
	fn drop(&mut self) {
		self.state.lock().unwrap().drops += 1;
	}
}

/// Engine that returns the same canned output from every evaluation export.
pub struct ScriptedEngine {
	output: Option<String>,
}

impl ScriptedEngine {
	pub fn returning(output: Option<&str>) -> Self {
		Self {
			output: output.map(str::to_string),
		}
	}
}

impl Engine for ScriptedEngine {
	fn snapshot(&mut self, _data: &Value) -> std::result::Result<(), EngineError> {
		Ok(())
	}

	fn evaluate_boolean(&self, _request: &str) -> Option<String> {
		self.output.clone()
	}

	fn evaluate_variant(&self, _request: &str) -> Option<String> {
		self.output.clone()
	}

	fn evaluate_batch(&self, _requests: &str) -> Option<String> {
		self.output.clone()
	}

	fn list_flags(&self) -> Option<String> {
		self.output.clone()
	}
}

/// Fetcher that replays a fixed sequence of responses, repeating the last one.
pub struct ScriptedFetcher {
	responses: Vec<FetchResponse>,
	calls: Arc<AtomicUsize>,
	etags: Arc<Mutex<Vec<Option<String>>>>,
}

impl ScriptedFetcher {
	pub fn new(responses: Vec<FetchResponse>) -> Self {
		Self {
			responses,
			calls: Arc::new(AtomicUsize::new(0)),
			etags: Arc::new(Mutex::new(Vec::new())),
		}
	}

	/// Always answers 200 with [`snapshot`].
	pub fn snapshot() -> Self {
		Self::new(vec![FetchResponse::ok(snapshot().to_string())])
	}

	pub fn calls(&self) -> Arc<AtomicUsize> {
		Arc::clone(&self.calls)
	}

	/// The `If-None-Match` value passed on each call.
	pub fn etags(&self) -> Arc<Mutex<Vec<Option<String>>>> {
		Arc::clone(&self.etags)
	}
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
	async fn fetch(&self, etag: Option<&str>) -> Result<FetchResponse> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);
		self.etags.lock().unwrap().push(etag.map(str::to_string));
		let index = call.min(self.responses.len().saturating_sub(1));
		Ok(self.responses[index].clone())
	}
}
