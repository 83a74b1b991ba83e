// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client options and authentication.
//!
//! [`ClientOptions`] is created once when a client is constructed and never
//! changes afterwards. It serializes to the snake_case JSON document native
//! engines accept at initialization.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::ConfigError;

/// Default upstream Flipt URL.
pub const DEFAULT_URL: &str = "http://localhost:8080";

/// Default namespace.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default snapshot refresh interval in seconds.
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 120;

/// Server version advertised in `x-flipt-accept-server-version`.
pub const ACCEPT_SERVER_VERSION: &str = "1.47.0";

/// Path of the namespace snapshot endpoint, relative to the base URL.
pub const SNAPSHOT_PATH: &str = "/internal/v1/evaluation/snapshot/namespace";

/// HTTP header names used by the snapshot protocol.
pub mod headers {
	pub const ACCEPT_SERVER_VERSION: &str = "x-flipt-accept-server-version";
	pub const ENVIRONMENT: &str = "x-flipt-environment";
}

/// Authentication strategy used against the upstream Flipt instance.
///
/// Encoded as a single-key object: `{"client_token": "..."}` or
/// `{"jwt_token": "..."}`. The token is wiped from memory on drop and never
/// shown by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authentication {
	/// Static client token, sent as `Authorization: Bearer {token}`.
	ClientToken(String),
	/// JSON Web Token, sent as `Authorization: JWT {token}`.
	JwtToken(String),
}

impl Authentication {
	pub fn client_token(token: impl Into<String>) -> Self {
		Self::ClientToken(token.into())
	}

	pub fn jwt_token(token: impl Into<String>) -> Self {
		Self::JwtToken(token.into())
	}

	/// Value of the `Authorization` header for this strategy.
	pub fn authorization_header(&self) -> String {
		match self {
			Self::ClientToken(token) => format!("Bearer {token}"),
			Self::JwtToken(token) => format!("JWT {token}"),
		}
	}
}

impl fmt::Debug for Authentication {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ClientToken(_) => f.write_str("ClientToken([REDACTED])"),
			Self::JwtToken(_) => f.write_str("JwtToken([REDACTED])"),
		}
	}
}

impl Drop for Authentication {
	fn drop(&mut self) {
		match self {
			Self::ClientToken(token) | Self::JwtToken(token) => token.zeroize(),
		}
	}
}

/// How flag state is delivered by the upstream instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
	#[default]
	Polling,
	Streaming,
}

impl fmt::Display for FetchMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Polling => f.write_str("polling"),
			Self::Streaming => f.write_str("streaming"),
		}
	}
}

impl FromStr for FetchMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"polling" => Ok(Self::Polling),
			"streaming" => Ok(Self::Streaming),
			other => Err(format!("unknown fetch mode '{other}'")),
		}
	}
}

/// What a refresh does when fetching or loading a snapshot fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStrategy {
	/// Propagate the error to the caller.
	#[default]
	Fail,
	/// Keep evaluating against the last good snapshot.
	Fallback,
}

impl fmt::Display for ErrorStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Fail => f.write_str("fail"),
			Self::Fallback => f.write_str("fallback"),
		}
	}
}

impl FromStr for ErrorStrategy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"fail" => Ok(Self::Fail),
			"fallback" => Ok(Self::Fallback),
			other => Err(format!("unknown error strategy '{other}'")),
		}
	}
}

/// TLS settings for the snapshot connection.
///
/// PEM data given inline takes precedence over the matching file path. A
/// client certificate is only used when its key is present too.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
	/// Path to a CA certificate (PEM).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ca_cert_file: Option<String>,
	/// CA certificate (PEM).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ca_cert_data: Option<String>,
	/// Accept any server certificate. Development only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub insecure_skip_verify: Option<bool>,
	/// Accept certificates for other hostnames. Development only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub insecure_skip_hostname_verify: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub client_cert_file: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub client_key_file: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub client_cert_data: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub client_key_data: Option<String>,
}

impl TlsConfig {
	/// Skips all certificate verification.
	pub fn insecure() -> Self {
		Self {
			insecure_skip_verify: Some(true),
			..Default::default()
		}
	}

	/// Skips hostname verification but still validates the certificate chain.
	pub fn skip_hostname_verify() -> Self {
		Self {
			insecure_skip_hostname_verify: Some(true),
			..Default::default()
		}
	}

	pub fn skips_verify(&self) -> bool {
		self.insecure_skip_verify.unwrap_or(false)
	}

	pub fn skips_hostname_verify(&self) -> bool {
		self.insecure_skip_hostname_verify.unwrap_or(false)
	}
}

impl fmt::Debug for TlsConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TlsConfig")
			.field("ca_cert_file", &self.ca_cert_file)
			.field("ca_cert_data", &self.ca_cert_data.as_ref().map(|_| "[PEM]"))
			.field("insecure_skip_verify", &self.insecure_skip_verify)
			.field("insecure_skip_hostname_verify", &self.insecure_skip_hostname_verify)
			.field("client_cert_file", &self.client_cert_file)
			.field("client_key_file", &self.client_key_file)
			.field("client_cert_data", &self.client_cert_data.as_ref().map(|_| "[PEM]"))
			.field("client_key_data", &self.client_key_data.as_ref().map(|_| "[REDACTED]"))
			.finish()
	}
}

/// Whole seconds for `duration`, rounding any fractional part up.
///
/// Options carry seconds on the wire, so a 500ms timeout becomes 1s rather
/// than 0 (no timeout).
pub fn secs_rounded_up(duration: Duration) -> u64 {
	duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

/// Options for one evaluation client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
	/// Environment to evaluate against (Flipt v2). Sent as `x-flipt-environment` when set.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub environment: Option<String>,
	/// Base URL of the upstream Flipt instance.
	pub url: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub authentication: Option<Authentication>,
	/// Reference (e.g. git ref) to fetch flag state for.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reference: Option<String>,
	/// Request timeout in seconds. Zero means no timeout.
	pub request_timeout: u64,
	/// Refresh interval in seconds.
	pub update_interval: u64,
	pub fetch_mode: FetchMode,
	pub error_strategy: ErrorStrategy,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tls_config: Option<TlsConfig>,
}

impl Default for ClientOptions {
	fn default() -> Self {
		Self {
			environment: None,
			url: DEFAULT_URL.to_string(),
			authentication: None,
			reference: None,
			request_timeout: 0,
			update_interval: DEFAULT_UPDATE_INTERVAL_SECS,
			fetch_mode: FetchMode::Polling,
			error_strategy: ErrorStrategy::Fail,
			tls_config: None,
		}
	}
}

impl ClientOptions {
	/// Base URL without trailing slashes.
	pub fn base_url(&self) -> &str {
		self.url.trim_end_matches('/')
	}

	/// Builds the snapshot URL for `namespace`:
	/// `{url}/internal/v1/evaluation/snapshot/namespace/{namespace}[?reference={reference}]`.
	pub fn snapshot_url(&self, namespace: &str) -> String {
		let mut url = format!("{}{}/{}", self.base_url(), SNAPSHOT_PATH, namespace);
		if let Some(reference) = self.reference.as_deref().filter(|r| !r.is_empty()) {
			url.push_str("?reference=");
			url.push_str(reference);
		}
		url
	}

	pub fn request_timeout(&self) -> Option<Duration> {
		(self.request_timeout > 0).then(|| Duration::from_secs(self.request_timeout))
	}

	pub fn update_interval(&self) -> Duration {
		Duration::from_secs(self.update_interval)
	}

	/// Encodes the options as the JSON document handed to a native engine.
	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}

	/// Reads options from `FLIPT_*` environment variables.
	///
	/// Missing variables keep their defaults; malformed values are an error.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Like [`ClientOptions::from_env`], reading variables through `lookup`.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
		let mut options = Self::default();

		if let Some(url) = var("FLIPT_URL") {
			options.url = url;
		}
		options.environment = var("FLIPT_ENVIRONMENT");
		options.reference = var("FLIPT_REFERENCE");

		options.authentication = match (var("FLIPT_CLIENT_TOKEN"), var("FLIPT_JWT_TOKEN")) {
			(Some(token), _) => Some(Authentication::ClientToken(token)),
			(None, Some(token)) => Some(Authentication::JwtToken(token)),
			(None, None) => None,
		};

		if let Some(raw) = var("FLIPT_UPDATE_INTERVAL") {
			options.update_interval = parse_env("FLIPT_UPDATE_INTERVAL", &raw)?;
		}
		if let Some(raw) = var("FLIPT_REQUEST_TIMEOUT") {
			options.request_timeout = parse_env("FLIPT_REQUEST_TIMEOUT", &raw)?;
		}
		if let Some(raw) = var("FLIPT_FETCH_MODE") {
			options.fetch_mode = parse_env("FLIPT_FETCH_MODE", &raw)?;
		}
		if let Some(raw) = var("FLIPT_ERROR_STRATEGY") {
			options.error_strategy = parse_env("FLIPT_ERROR_STRATEGY", &raw)?;
		}

		Ok(options)
	}
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
	T: FromStr,
	T::Err: fmt::Display,
{
	raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
		name: name.to_string(),
		message: e.to_string(),
	})
}
