// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Evaluation client.
//!
//! [`FliptClient`] loads a namespace snapshot into its engine when it is
//! built and evaluates flags locally from then on. Snapshots are refreshed
//! with conditional GETs: the last `ETag` is sent as `If-None-Match` and a
//! 304 leaves the engine untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use flipt_client_core::{
	Authentication, BatchEvaluationResponse, BooleanEvaluationResponse, ClientOptions, ErrorStrategy,
	EvaluationRequest, EvaluationResponse, FetchMode, Flag, VariantEvaluationResponse, DEFAULT_NAMESPACE,
	TlsConfig, secs_rounded_up,
};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::binding::{self, Operation};
use crate::engine::{Engine, EngineHandle};
use crate::error::{ClientError, Result};
use crate::fetcher::{Fetcher, HttpFetcher, SharedFetcher};
use crate::hook::{AfterHookData, BeforeHookData, EvaluationHook, SharedEvaluationHook};
use crate::poller::Poller;

/// Builder for constructing a [`FliptClient`].
pub struct FliptClientBuilder {
	namespace: String,
	options: ClientOptions,
	fetcher: Option<SharedFetcher>,
	engine: Option<Box<dyn Engine>>,
	hooks: Vec<SharedEvaluationHook>,
}

impl FliptClientBuilder {
	/// Creates a new builder for the default namespace with default options.
	pub fn new() -> Self {
		Self {
			namespace: DEFAULT_NAMESPACE.to_string(),
			options: ClientOptions::default(),
			fetcher: None,
			engine: None,
			hooks: Vec::new(),
		}
	}

	/// Sets the namespace to evaluate flags in.
	pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = namespace.into();
		self
	}

	/// Replaces all options at once.
	pub fn options(mut self, options: ClientOptions) -> Self {
		self.options = options;
		self
	}

	/// Sets the base URL of the upstream Flipt instance.
	///
	/// Example: `http://localhost:8080`
	pub fn url(mut self, url: impl Into<String>) -> Self {
		self.options.url = url.into();
		self
	}

	pub fn authentication(mut self, authentication: Authentication) -> Self {
		self.options.authentication = Some(authentication);
		self
	}

	/// Sets the reference to fetch flag state for.
	pub fn reference(mut self, reference: impl Into<String>) -> Self {
		self.options.reference = Some(reference.into());
		self
	}

	/// Sets the environment, sent as `x-flipt-environment`.
	pub fn environment(mut self, environment: impl Into<String>) -> Self {
		self.options.environment = Some(environment.into());
		self
	}

	/// Sets the HTTP request timeout, rounded up to whole seconds.
	///
	/// A zero duration disables the timeout.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.options.request_timeout = secs_rounded_up(timeout);
		self
	}

	/// Sets the interval used by [`FliptClient::start_polling`], rounded up to
	/// whole seconds.
	pub fn update_interval(mut self, interval: Duration) -> Self {
		self.options.update_interval = secs_rounded_up(interval);
		self
	}

	pub fn fetch_mode(mut self, fetch_mode: FetchMode) -> Self {
		self.options.fetch_mode = fetch_mode;
		self
	}

	pub fn error_strategy(mut self, error_strategy: ErrorStrategy) -> Self {
		self.options.error_strategy = error_strategy;
		self
	}

	/// Sets TLS options for the snapshot connection.
	pub fn tls_config(mut self, tls_config: TlsConfig) -> Self {
		self.options.tls_config = Some(tls_config);
		self
	}

	/// Uses a custom fetcher instead of the default HTTP fetcher.
	pub fn fetcher(mut self, fetcher: impl Fetcher) -> Self {
		self.fetcher = Some(Arc::new(fetcher));
		self
	}

	/// Uses `engine` for evaluation.
	///
	/// Without one, the native engine is used when the `ffi` feature is
	/// enabled; otherwise [`FliptClientBuilder::build`] fails.
	pub fn engine(mut self, engine: impl Engine + 'static) -> Self {
		self.engine = Some(Box::new(engine));
		self
	}

	/// Adds an evaluation hook. Hooks run in the order they were added.
	pub fn hook(mut self, hook: impl EvaluationHook) -> Self {
		self.hooks.push(Arc::new(hook));
		self
	}

	/// Builds the client and loads the initial snapshot.
	///
	/// Construction is all-or-nothing: any fetch, decode or snapshot error is
	/// returned regardless of the error strategy.
	pub async fn build(self) -> Result<FliptClient> {
		let namespace = self.namespace.trim().to_string();
		if namespace.is_empty() {
			return Err(ClientError::InvalidOptions("namespace cannot be empty".to_string()));
		}
		if self.options.url.trim().is_empty() {
			return Err(ClientError::InvalidOptions("url cannot be empty".to_string()));
		}

		let engine = match self.engine {
			Some(engine) => engine,
			None => default_engine(&namespace, &self.options)?,
		};

		let fetcher: SharedFetcher = match self.fetcher {
			Some(fetcher) => fetcher,
			None => Arc::new(HttpFetcher::new(&namespace, &self.options)?),
		};

		let inner = Arc::new(FliptClientInner {
			engine: EngineHandle::new(namespace.clone(), engine),
			namespace,
			options: self.options,
			fetcher,
			etag: tokio::sync::Mutex::new(None),
			hooks: self.hooks,
			poller: Mutex::new(None),
		});

		inner.sync(true).await?;

		info!(
			namespace = %inner.namespace,
			url = %inner.options.base_url(),
			fetch_mode = %inner.options.fetch_mode,
			sdk_name = crate::http::SDK_NAME,
			sdk_version = crate::http::SDK_VERSION,
			"Flipt client initialized"
		);

		Ok(FliptClient { inner })
	}
}

impl Default for FliptClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(feature = "ffi")]
fn default_engine(namespace: &str, options: &ClientOptions) -> Result<Box<dyn Engine>> {
	Ok(Box::new(crate::ffi::NativeEngine::initialize(namespace, options)?))
}

#[cfg(not(feature = "ffi"))]
fn default_engine(_namespace: &str, _options: &ClientOptions) -> Result<Box<dyn Engine>> {
	Err(ClientError::MissingEngine)
}

/// Internal client state.
struct FliptClientInner {
	namespace: String,
	options: ClientOptions,
	fetcher: SharedFetcher,
	engine: EngineHandle,
	/// Last known ETag. The lock also serializes snapshot fetches.
	etag: tokio::sync::Mutex<Option<String>>,
	hooks: Vec<SharedEvaluationHook>,
	poller: Mutex<Option<Poller>>,
}

impl FliptClientInner {
	/// Fetches the snapshot and loads it into the engine.
	///
	/// Returns `true` when a new snapshot was loaded, `false` on 304.
	async fn sync(&self, initial: bool) -> Result<bool> {
		let mut etag = self.etag.lock().await;

		let response = self.fetcher.fetch(etag.as_deref()).await?;

		if response.is_not_modified() {
			if initial {
				warn!(namespace = %self.namespace, "Initial snapshot fetch returned 304, no snapshot loaded");
			} else {
				debug!(namespace = %self.namespace, "Snapshot not modified");
			}
			if let Some(fresh) = response.etag {
				*etag = Some(fresh);
			}
			return Ok(false);
		}

		if !response.is_success() {
			return Err(ClientError::FetchFailed {
				status: response.status,
				status_text: response.status_text,
			});
		}

		let data: Value = serde_json::from_slice(&response.body)?;
		self.engine.snapshot(&data)?;

		if let Some(fresh) = response.etag {
			*etag = Some(fresh);
		}

		info!(namespace = %self.namespace, etag = ?*etag, "Snapshot loaded");
		Ok(true)
	}

	/// One background refresh. Returns `false` once the client is closed.
	async fn poll(&self) -> bool {
		if self.engine.is_closed() {
			return false;
		}
		match self.sync(false).await {
			Ok(_) => true,
			Err(ClientError::ClientClosed) => false,
			Err(e) => {
				error!(namespace = %self.namespace, error = %e, "Background snapshot refresh failed");
				true
			}
		}
	}

	fn before(&self, flag_key: &str) {
		if self.hooks.is_empty() {
			return;
		}
		let data = BeforeHookData {
			flag_key: flag_key.to_string(),
		};
		for hook in &self.hooks {
			hook.before(&data);
		}
	}

	fn after(&self, data: impl FnOnce() -> AfterHookData) {
		if self.hooks.is_empty() {
			return;
		}
		let data = data();
		for hook in &self.hooks {
			hook.after(&data);
		}
	}

	fn take_poller(&self) -> Option<Poller> {
		match self.poller.lock() {
			Ok(mut guard) => guard.take(),
			Err(poisoned) => poisoned.into_inner().take(),
		}
	}
}

/// Client for local feature flag evaluation.
///
/// Cloning is cheap; clones share the same engine and snapshot state.
///
/// # Example
///
/// ```ignore
/// use std::collections::HashMap;
/// use flipt_client::{Authentication, FliptClient};
///
/// let client = FliptClient::builder()
///     .namespace("production")
///     .url("https://flipt.example.com")
///     .authentication(Authentication::client_token("secret"))
///     .build()
///     .await?;
///
/// let result = client.evaluate_boolean("new-ui", "user-1", HashMap::new())?;
/// if result.enabled {
///     // ...
/// }
///
/// // Pick up flag changes.
/// client.refresh().await?;
/// ```
#[derive(Clone)]
pub struct FliptClient {
	inner: Arc<FliptClientInner>,
}

impl FliptClient {
	/// Creates a new builder for constructing a FliptClient.
	pub fn builder() -> FliptClientBuilder {
		FliptClientBuilder::new()
	}

	pub fn namespace(&self) -> &str {
		&self.inner.namespace
	}

	pub fn options(&self) -> &ClientOptions {
		&self.inner.options
	}

	/// The ETag of the last loaded snapshot, if the server sent one.
	pub async fn etag(&self) -> Option<String> {
		self.inner.etag.lock().await.clone()
	}

	/// Fetches the snapshot again, conditionally on the stored ETag.
	///
	/// Returns `true` when a new snapshot replaced the engine state and
	/// `false` when the server answered 304. With
	/// [`ErrorStrategy::Fallback`] failures are logged and reported as
	/// `false`; the engine keeps its last good snapshot.
	pub async fn refresh(&self) -> Result<bool> {
		self.check_closed()?;

		match self.inner.sync(false).await {
			Ok(updated) => Ok(updated),
			Err(ClientError::ClientClosed) => Err(ClientError::ClientClosed),
			Err(e) if self.inner.options.error_strategy == ErrorStrategy::Fallback => {
				warn!(
					namespace = %self.inner.namespace,
					error = %e,
					"Snapshot refresh failed, keeping last snapshot"
				);
				Ok(false)
			}
			Err(e) => Err(e),
		}
	}

	/// Evaluates a variant flag.
	pub fn evaluate_variant(
		&self,
		flag_key: &str,
		entity_id: &str,
		context: HashMap<String, String>,
	) -> Result<VariantEvaluationResponse> {
		let request = validated_request(flag_key, entity_id, context)?;
		self.inner.before(flag_key);

		let raw = self.inner.engine.evaluate_variant(&binding::encode(&request)?)?;
		let response: VariantEvaluationResponse = binding::decode(Operation::Variant, raw)?;

		debug!(
			flag_key = %response.flag_key,
			variant_key = %response.variant_key,
			reason = %response.reason,
			"Variant flag evaluated"
		);
		self.inner.after(|| AfterHookData::from(&response));
		Ok(response)
	}

	/// Evaluates a boolean flag.
	pub fn evaluate_boolean(
		&self,
		flag_key: &str,
		entity_id: &str,
		context: HashMap<String, String>,
	) -> Result<BooleanEvaluationResponse> {
		let request = validated_request(flag_key, entity_id, context)?;
		self.inner.before(flag_key);

		let raw = self.inner.engine.evaluate_boolean(&binding::encode(&request)?)?;
		let response: BooleanEvaluationResponse = binding::decode(Operation::Boolean, raw)?;

		debug!(
			flag_key = %response.flag_key,
			enabled = response.enabled,
			reason = %response.reason,
			"Boolean flag evaluated"
		);
		self.inner.after(|| AfterHookData::from(&response));
		Ok(response)
	}

	/// Evaluates several flags in one engine call.
	///
	/// Responses keep the engine's order. Responses of unknown type are
	/// dropped, so the result may be shorter than `requests`.
	pub fn evaluate_batch(&self, requests: &[EvaluationRequest]) -> Result<BatchEvaluationResponse> {
		for request in requests {
			self.inner.before(&request.flag_key);
		}

		let raw = self.inner.engine.evaluate_batch(&binding::encode(requests)?)?;
		let batch: BatchEvaluationResponse = binding::decode(Operation::Batch, raw)?;

		debug!(
			requested = requests.len(),
			returned = batch.responses.len(),
			"Batch evaluated"
		);

		for response in &batch.responses {
			match response {
				EvaluationResponse::Boolean(r) => self.inner.after(|| AfterHookData::from(r)),
				EvaluationResponse::Variant(r) => self.inner.after(|| AfterHookData::from(r)),
				EvaluationResponse::Error(_) => {}
			}
		}
		Ok(batch)
	}

	/// Lists the flags in the loaded snapshot.
	pub fn list_flags(&self) -> Result<Vec<Flag>> {
		let raw = self.inner.engine.list_flags()?;
		binding::decode(Operation::ListFlags, raw)
	}

	/// Starts refreshing the snapshot every `update_interval` in the background.
	///
	/// Refresh failures are logged and polling continues. The task stops on
	/// [`FliptClient::stop_polling`], [`FliptClient::close`], or when the last
	/// client handle is dropped. Calling this while polling is a no-op.
	pub fn start_polling(&self) -> Result<()> {
		self.check_closed()?;
		let runtime = Handle::try_current().map_err(|_| ClientError::RuntimeUnavailable)?;

		let mut guard = self.inner.poller.lock().map_err(|_| ClientError::LockError)?;
		if guard.as_ref().is_some_and(Poller::is_running) {
			return Ok(());
		}

		let weak: Weak<FliptClientInner> = Arc::downgrade(&self.inner);
		let poller = Poller::start(&runtime, self.inner.options.update_interval(), move || {
			let weak = weak.clone();
			async move {
				match weak.upgrade() {
					Some(inner) => inner.poll().await,
					None => false,
				}
			}
		});
		*guard = Some(poller);
		Ok(())
	}

	/// Stops background polling, if running.
	pub async fn stop_polling(&self) {
		if let Some(poller) = self.inner.take_poller() {
			poller.stop().await;
		}
	}

	/// Returns true while background polling is active.
	pub fn is_polling(&self) -> bool {
		match self.inner.poller.lock() {
			Ok(guard) => guard.as_ref().is_some_and(Poller::is_running),
			Err(_) => false,
		}
	}

	/// Stops polling and releases the engine.
	///
	/// Safe to call more than once. Every later evaluation or refresh fails
	/// with [`ClientError::ClientClosed`].
	pub fn close(&self) {
		drop(self.inner.take_poller());
		if self.inner.engine.close() {
			info!(namespace = %self.inner.namespace, "Flipt client closed");
		}
	}

	/// Returns true if the client has been closed.
	pub fn is_closed(&self) -> bool {
		self.inner.engine.is_closed()
	}

	fn check_closed(&self) -> Result<()> {
		if self.inner.engine.is_closed() {
			return Err(ClientError::ClientClosed);
		}
		Ok(())
	}
}

impl std::fmt::Debug for FliptClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FliptClient")
			.field("namespace", &self.inner.namespace)
			.field("options", &self.inner.options)
			.field("engine", &self.inner.engine)
			.finish()
	}
}

fn validated_request(
	flag_key: &str,
	entity_id: &str,
	context: HashMap<String, String>,
) -> Result<EvaluationRequest> {
	if flag_key.trim().is_empty() {
		return Err(ClientError::InvalidRequest("flag_key cannot be empty".to_string()));
	}
	if entity_id.trim().is_empty() {
		return Err(ClientError::InvalidRequest("entity_id cannot be empty".to_string()));
	}
	Ok(EvaluationRequest::new(flag_key, entity_id, context))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::EngineError;
	use crate::fetcher::FetchResponse;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct EchoEngine;

	impl Engine for EchoEngine {
		fn snapshot(&mut self, _data: &Value) -> std::result::Result<(), EngineError> {
			Ok(())
		}

		fn evaluate_boolean(&self, request: &str) -> Option<String> {
			let request: EvaluationRequest = serde_json::from_str(request).ok()?;
			Some(
				serde_json::json!({
					"status": "success",
					"result": {
						"enabled": true,
						"flag_key": request.flag_key,
						"reason": "DEFAULT_EVALUATION_REASON",
						"request_duration_millis": 0.0,
						"timestamp": ""
					}
				})
				.to_string(),
			)
		}

		fn evaluate_variant(&self, _request: &str) -> Option<String> {
			None
		}

		fn evaluate_batch(&self, _requests: &str) -> Option<String> {
			None
		}

		fn list_flags(&self) -> Option<String> {
			Some(r#"{"status":"success","result":[]}"#.to_string())
		}
	}

	struct CountingFetcher {
		calls: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl Fetcher for CountingFetcher {
		async fn fetch(&self, _etag: Option<&str>) -> Result<FetchResponse> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Ok(FetchResponse::ok("{}"))
		}
	}

	async fn client() -> (FliptClient, Arc<AtomicUsize>) {
		let calls = Arc::new(AtomicUsize::new(0));
		let client = FliptClient::builder()
			.engine(EchoEngine)
			.fetcher(CountingFetcher {
				calls: Arc::clone(&calls),
			})
			.build()
			.await
			.unwrap();
		(client, calls)
	}

	#[test]
	fn empty_keys_are_rejected() {
		let err = validated_request("", "user-1", HashMap::new()).unwrap_err();
		assert_eq!(err.to_string(), "flag_key cannot be empty");
		let err = validated_request("flag", "  ", HashMap::new()).unwrap_err();
		assert_eq!(err.to_string(), "entity_id cannot be empty");
	}

	#[test]
	fn sub_second_timeout_keeps_a_bound() {
		let builder = FliptClientBuilder::new().request_timeout(Duration::from_millis(500));
		assert_eq!(builder.options.request_timeout(), Some(Duration::from_secs(1)));

		let builder = FliptClientBuilder::new().request_timeout(Duration::ZERO);
		assert_eq!(builder.options.request_timeout(), None);
	}

	#[test]
	fn fractional_update_interval_rounds_up() {
		let builder = FliptClientBuilder::new().update_interval(Duration::from_millis(1500));
		assert_eq!(builder.options.update_interval(), Duration::from_secs(2));

		let builder = FliptClientBuilder::new().update_interval(Duration::from_millis(200));
		assert_eq!(builder.options.update_interval(), Duration::from_secs(1));
	}

	#[tokio::test]
	async fn empty_namespace_is_rejected() {
		let err = FliptClient::builder()
			.namespace(" ")
			.engine(EchoEngine)
			.build()
			.await
			.unwrap_err();
		assert!(matches!(err, ClientError::InvalidOptions(ref m) if m == "namespace cannot be empty"));
	}

	#[tokio::test]
	async fn empty_url_is_rejected() {
		let err = FliptClient::builder().url("").engine(EchoEngine).build().await.unwrap_err();
		assert!(matches!(err, ClientError::InvalidOptions(ref m) if m == "url cannot be empty"));
	}

	#[cfg(not(feature = "ffi"))]
	#[tokio::test]
	async fn build_without_engine_fails() {
		let err = FliptClient::builder().build().await.unwrap_err();
		assert!(matches!(err, ClientError::MissingEngine));
	}

	#[tokio::test]
	async fn build_fetches_once() {
		let (client, calls) = client().await;
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(client.namespace(), "default");
		assert!(client.etag().await.is_none());
	}

	#[tokio::test]
	async fn clones_share_state() {
		let (client, _) = client().await;
		let other = client.clone();
		client.close();
		assert!(other.is_closed());
		assert!(matches!(
			other.evaluate_boolean("f", "e", HashMap::new()),
			Err(ClientError::ClientClosed)
		));
	}

	#[tokio::test]
	async fn start_polling_is_idempotent() {
		let (client, _) = client().await;
		client.start_polling().unwrap();
		client.start_polling().unwrap();
		assert!(client.is_polling());
		client.stop_polling().await;
		assert!(!client.is_polling());
	}

	#[test]
	fn start_polling_requires_runtime() {
		let (client, _) = tokio_test::block_on(client());
		assert!(matches!(client.start_polling(), Err(ClientError::RuntimeUnavailable)));
	}

	#[tokio::test]
	async fn close_stops_polling() {
		let (client, _) = client().await;
		client.start_polling().unwrap();
		client.close();
		assert!(!client.is_polling());
		assert!(matches!(client.start_polling(), Err(ClientError::ClientClosed)));
		assert!(matches!(client.refresh().await, Err(ClientError::ClientClosed)));
	}
}
