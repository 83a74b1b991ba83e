// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client construction with the SDK User-Agent.

use std::time::Duration;

use flipt_client_core::TlsConfig;
use reqwest::{Certificate, Client, ClientBuilder, Identity};
use tracing::warn;

use crate::error::{ClientError, Result};

/// SDK name for identification.
pub const SDK_NAME: &str = "flipt-client-rust";
/// SDK version for identification.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the User-Agent sent with every snapshot request.
///
/// Format: `flipt-client-rust/{version}`
pub fn user_agent() -> String {
	format!("{SDK_NAME}/{SDK_VERSION}")
}

/// Creates a new HTTP client builder with the SDK User-Agent header.
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Builds a client with the SDK User-Agent, an optional request timeout and
/// optional TLS settings.
pub fn client(timeout: Option<Duration>, tls: Option<&TlsConfig>) -> Result<Client> {
	let mut builder = builder();
	if let Some(timeout) = timeout {
		builder = builder.timeout(timeout);
	}
	if let Some(tls) = tls {
		builder = configure_tls(builder, tls)?;
	}
	Ok(builder.build()?)
}

/// Applies `tls` to `builder`.
///
/// `insecure_skip_verify` wins over every other setting.
pub fn configure_tls(mut builder: ClientBuilder, tls: &TlsConfig) -> Result<ClientBuilder> {
	builder = builder.use_rustls_tls();

	if tls.skips_verify() {
		warn!("TLS certificate verification is disabled");
		return Ok(builder.danger_accept_invalid_certs(true));
	}

	if let Some(pem) = pem(tls.ca_cert_data.as_deref(), tls.ca_cert_file.as_deref(), "CA cert")? {
		let cert = Certificate::from_pem(&pem)
			.map_err(|e| ClientError::InvalidOptions(format!("failed to parse CA certificate: {e}")))?;
		builder = builder.add_root_certificate(cert);
	}

	if tls.skips_hostname_verify() {
		warn!("TLS hostname verification is disabled");
		builder = builder.danger_accept_invalid_hostnames(true);
	}

	if let Some(identity) = client_identity(tls)? {
		builder = builder.identity(identity);
	}

	Ok(builder)
}

fn client_identity(tls: &TlsConfig) -> Result<Option<Identity>> {
	let pair = if let (Some(cert), Some(key)) = (&tls.client_cert_data, &tls.client_key_data) {
		Some((cert.as_bytes().to_vec(), key.as_bytes().to_vec()))
	} else if let (Some(cert), Some(key)) = (&tls.client_cert_file, &tls.client_key_file) {
		Some((read_pem(cert, "client cert")?, read_pem(key, "client key")?))
	} else {
		None
	};

	let Some((mut pem, key)) = pair else {
		return Ok(None);
	};
	pem.extend_from_slice(&key);
	let identity = Identity::from_pem(&pem).map_err(|e| {
		ClientError::InvalidOptions(format!("failed to create identity from client cert/key: {e}"))
	})?;
	Ok(Some(identity))
}

fn pem(data: Option<&str>, file: Option<&str>, what: &str) -> Result<Option<Vec<u8>>> {
	match (data, file) {
		(Some(data), _) => Ok(Some(data.as_bytes().to_vec())),
		(None, Some(file)) => read_pem(file, what).map(Some),
		(None, None) => Ok(None),
	}
}

fn read_pem(path: &str, what: &str) -> Result<Vec<u8>> {
	std::fs::read(path).map_err(|e| {
		warn!(path, error = %e, "Failed to read {what} file");
		ClientError::InvalidOptions(format!("failed to read {what} file {path}: {e}"))
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 2);
		assert_eq!(parts[0], "flipt-client-rust");
		assert_eq!(parts[1], env!("CARGO_PKG_VERSION"));
	}

	#[test]
	fn client_builds_with_and_without_timeout() {
		assert!(client(None, None).is_ok());
		assert!(client(Some(Duration::from_secs(5)), None).is_ok());
	}

	#[test]
	fn client_builds_with_tls_presets() {
		assert!(client(None, Some(&TlsConfig::default())).is_ok());
		assert!(client(None, Some(&TlsConfig::insecure())).is_ok());
		assert!(client(None, Some(&TlsConfig::skip_hostname_verify())).is_ok());
	}

	#[test]
	fn missing_ca_file_is_an_options_error() {
		let tls = TlsConfig {
			ca_cert_file: Some("/nonexistent/flipt-ca.pem".to_string()),
			..Default::default()
		};
		let err = client(None, Some(&tls)).unwrap_err();
		assert!(matches!(err, ClientError::InvalidOptions(ref m) if m.starts_with("failed to read CA cert file")));
	}

	#[test]
	fn insecure_skips_ca_loading() {
		let tls = TlsConfig {
			ca_cert_file: Some("/nonexistent/flipt-ca.pem".to_string()),
			insecure_skip_verify: Some(true),
			..Default::default()
		};
		assert!(client(None, Some(&tls)).is_ok());
	}

	#[test]
	fn missing_client_key_file_is_an_options_error() {
		let tls = TlsConfig {
			client_cert_file: Some("/nonexistent/client.pem".to_string()),
			client_key_file: Some("/nonexistent/client.key".to_string()),
			..Default::default()
		};
		let err = client(None, Some(&tls)).unwrap_err();
		assert!(matches!(err, ClientError::InvalidOptions(ref m) if m.starts_with("failed to read client cert file")));
	}

	#[test]
	fn client_cert_without_key_is_ignored() {
		let tls = TlsConfig {
			client_cert_file: Some("/nonexistent/client.pem".to_string()),
			..Default::default()
		};
		assert!(client(None, Some(&tls)).is_ok());
	}
}
