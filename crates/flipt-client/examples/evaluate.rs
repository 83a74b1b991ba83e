// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: Evaluate flags against a running Flipt server with the native engine.
//!
//! Run with:
//!   FLIPT_URL=http://localhost:8080 cargo run --example evaluate -p flipt-client --features ffi -- new-ui user-1

use std::collections::HashMap;

use flipt_client::{ClientOptions, FliptClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let mut args = std::env::args().skip(1);
	let flag_key = args.next().unwrap_or_else(|| "new-ui".to_string());
	let entity_id = args.next().unwrap_or_else(|| "user-1".to_string());
	let namespace = std::env::var("FLIPT_NAMESPACE").unwrap_or_else(|_| "default".to_string());

	let options = ClientOptions::from_env()?;
	println!("Connecting to {} (namespace {})", options.base_url(), namespace);

	let client = FliptClient::builder()
		.namespace(namespace)
		.options(options)
		.build()
		.await?;

	for flag in client.list_flags()? {
		println!("  {} [{}] enabled={}", flag.key, flag.flag_type, flag.enabled);
	}

	match client.evaluate_boolean(&flag_key, &entity_id, HashMap::new()) {
		Ok(result) => println!("{} -> enabled={} ({})", result.flag_key, result.enabled, result.reason),
		Err(_) => {
			let result = client.evaluate_variant(&flag_key, &entity_id, HashMap::new())?;
			println!("{} -> variant={} ({})", result.flag_key, result.variant_key, result.reason);
		}
	}

	println!("Refreshed: {}", client.refresh().await?);
	client.close();
	Ok(())
}
