// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Snapshot transport.
//!
//! A [`Fetcher`] performs one GET of a namespace snapshot. The client passes
//! the last known ETag and interprets the returned [`FetchResponse`]; the
//! fetcher itself keeps no state between calls. [`HttpFetcher`] is the
//! default implementation.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use flipt_client_core::options::headers as flipt_headers;
use flipt_client_core::{ClientOptions, ACCEPT_SERVER_VERSION};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, ETAG, IF_NONE_MATCH};
use reqwest::{Client, StatusCode};
use tracing::{debug, error};

use crate::error::{ClientError, Result};

/// Raw outcome of a snapshot fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
	/// HTTP status code.
	pub status: u16,
	/// HTTP reason phrase, used in error messages.
	pub status_text: String,
	/// `ETag` response header, if any.
	pub etag: Option<String>,
	/// Response body. Empty for 304.
	pub body: Bytes,
}

impl FetchResponse {
	/// A `200 OK` carrying `body`.
	pub fn ok(body: impl Into<Bytes>) -> Self {
		Self {
			status: StatusCode::OK.as_u16(),
			status_text: "OK".to_string(),
			etag: None,
			body: body.into(),
		}
	}

	/// A `304 Not Modified` with no body.
	pub fn not_modified() -> Self {
		Self {
			status: StatusCode::NOT_MODIFIED.as_u16(),
			status_text: "Not Modified".to_string(),
			etag: None,
			body: Bytes::new(),
		}
	}

	pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
		self.etag = Some(etag.into());
		self
	}

	pub fn is_not_modified(&self) -> bool {
		self.status == StatusCode::NOT_MODIFIED.as_u16()
	}

	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Fetches namespace snapshots.
///
/// Implementations should return 304 responses as values rather than errors.
/// Any other non-2xx response that is returned instead of failing is rejected
/// by the client with `Failed to fetch data: {status_text}`.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
	/// Fetches the snapshot, sending `etag` as `If-None-Match` when present.
	async fn fetch(&self, etag: Option<&str>) -> Result<FetchResponse>;
}

/// Type alias for a shared fetcher.
pub type SharedFetcher = Arc<dyn Fetcher>;

/// Default fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
	client: Client,
	url: String,
	headers: HeaderMap,
}

impl HttpFetcher {
	/// Creates a fetcher for `namespace` using the URL, authentication,
	/// reference, environment and timeout in `options`.
	pub fn new(namespace: &str, options: &ClientOptions) -> Result<Self> {
		let client = crate::http::client(options.request_timeout(), options.tls_config.as_ref())?;
		Ok(Self {
			client,
			url: options.snapshot_url(namespace),
			headers: snapshot_headers(options)?,
		})
	}

	/// The snapshot URL this fetcher requests.
	pub fn url(&self) -> &str {
		&self.url
	}
}

#[async_trait]
impl Fetcher for HttpFetcher {
	async fn fetch(&self, etag: Option<&str>) -> Result<FetchResponse> {
		let mut request = self.client.get(&self.url).headers(self.headers.clone());
		if let Some(etag) = etag {
			request = request.header(IF_NONE_MATCH, etag);
		}

		debug!(url = %self.url, etag = ?etag, "Fetching snapshot");

		let response = request.send().await?;
		let status = response.status();
		let etag = response
			.headers()
			.get(ETAG)
			.and_then(|v| v.to_str().ok())
			.map(str::to_string);

		if status == StatusCode::NOT_MODIFIED {
			debug!(url = %self.url, "Snapshot not modified");
			return Ok(FetchResponse {
				etag,
				..FetchResponse::not_modified()
			});
		}

		let status_text = status
			.canonical_reason()
			.map(str::to_string)
			.unwrap_or_else(|| status.as_str().to_string());

		if !status.is_success() {
			error!(status = status.as_u16(), url = %self.url, "Failed to fetch snapshot");
			return Err(ClientError::FetchFailed {
				status: status.as_u16(),
				status_text,
			});
		}

		let body = response.bytes().await?;
		Ok(FetchResponse {
			status: status.as_u16(),
			status_text,
			etag,
			body,
		})
	}
}

/// Headers sent with every snapshot request.
///
/// `Accept`, `x-flipt-accept-server-version`, plus `Authorization` and
/// `x-flipt-environment` when configured.
pub fn snapshot_headers(options: &ClientOptions) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();
	headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
	headers.insert(
		HeaderName::from_static(flipt_headers::ACCEPT_SERVER_VERSION),
		HeaderValue::from_static(ACCEPT_SERVER_VERSION),
	);

	if let Some(auth) = &options.authentication {
		let mut value = HeaderValue::from_str(&auth.authorization_header())
			.map_err(|_| ClientError::InvalidOptions("authentication token is not a valid header value".to_string()))?;
		value.set_sensitive(true);
		headers.insert(AUTHORIZATION, value);
	}

	if let Some(environment) = options.environment.as_deref().filter(|e| !e.is_empty()) {
		let value = HeaderValue::from_str(environment)
			.map_err(|_| ClientError::InvalidOptions(format!("invalid environment '{environment}'")))?;
		headers.insert(HeaderName::from_static(flipt_headers::ENVIRONMENT), value);
	}

	Ok(headers)
}
