//! Remote OAuth 2.0 token introspection for resource servers: ask the authorization server
//! whether a bearer token is valid and turn its answer into a typed authentication.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod descriptor;
pub mod error;
pub mod freshness;
pub mod http;
pub mod introspect;
pub mod obs;
pub mod secured;
pub mod services;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		http::ReqwestHttpClient, introspect::IntrospectionConfig, services::RemoteTokenServices,
	};

	/// Token services type alias used by reqwest-backed integration tests.
	pub type ReqwestTestServices = RemoteTokenServices<ReqwestHttpClient>;

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

	/// Constructs [`RemoteTokenServices`] over the insecure reqwest transport used across
	/// integration tests.
	pub fn build_reqwest_test_services(config: IntrospectionConfig) -> ReqwestTestServices {
		RemoteTokenServices::with_http_client(config, test_reqwest_http_client())
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeSet, HashMap},
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
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use oauth2;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
