//! Marketplace fee broker: OAuth token lifecycle for a single seller account plus per-offer
//! commission calculation that correlates billing entries with order line items.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod fee;
pub mod flows;
pub mod http;
pub mod marketplace;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod service;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ClientIdentity, TokenSecret},
		flows::{BrokerOptions, TokenBroker},
		http::ReqwestHttpClient,
		marketplace::MarketplaceClient,
		provider::MarketplaceDescriptor,
		store::{MemoryStore, TokenStore},
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = TokenBroker<ReqwestHttpClient>;

	/// Client identity shared by the integration test fixtures.
	pub const TEST_CLIENT_ID: &str = "client-it";
	/// Client secret shared by the integration test fixtures.
	pub const TEST_CLIENT_SECRET: &str = "secret-it";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a descriptor whose endpoints all point at the provided mock server base URL.
	pub fn test_descriptor(base: &str) -> MarketplaceDescriptor {
		let base = base.trim_end_matches('/');
		let parse = |path: &str| {
			Url::parse(&format!("{base}{path}")).expect("Failed to parse mock endpoint URL.")
		};

		MarketplaceDescriptor::builder()
			.authorization_endpoint(parse("/auth/oauth/authorize"))
			.token_endpoint(parse("/auth/oauth/token"))
			.api_base(parse("/"))
			.redirect_uri(
				Url::parse("http://localhost:8000").expect("Failed to parse redirect URI."),
			)
			.build()
			.expect("Failed to build test descriptor.")
	}

	/// Constructs a [`TokenBroker`] backed by an in-memory store and the reqwest transport used
	/// across integration tests.
	pub fn build_reqwest_test_broker(
		descriptor: MarketplaceDescriptor,
		options: BrokerOptions,
	) -> (Arc<ReqwestTestBroker>, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let client = ClientIdentity::new(TEST_CLIENT_ID).expect("Client identity should be valid.");
		let broker = TokenBroker::with_http_client(
			store,
			descriptor,
			client,
			TokenSecret::new(TEST_CLIENT_SECRET),
			test_reqwest_http_client(),
		)
		.with_options(options);

		(Arc::new(broker), store_backend)
	}

	/// Wraps a test broker in a [`MarketplaceClient`] sharing the same transport.
	pub fn build_reqwest_test_client(
		broker: Arc<ReqwestTestBroker>,
	) -> MarketplaceClient<ReqwestHttpClient> {
		MarketplaceClient::new(broker)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use rust_decimal::Decimal;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use rust_decimal;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tracing_subscriber as _};
