//! Transport primitives for introspection calls.
//!
//! [`IntrospectionHttpClient`] is the crate's only dependency on an HTTP stack. It speaks the
//! `http` request/response types re-exported by `oauth2`, so a transport can be decorated
//! (see [`crate::secured`] and [`crate::cache`]) or replaced by a fake in tests without
//! touching the validation pipeline. Retries, timeouts, and connection pooling all belong to
//! the implementation; the pipeline issues exactly one request per validation.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use crate::_prelude::*;

/// Boxed future returned by [`IntrospectionHttpClient::execute`].
pub type HttpFuture<'a, E> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError<E>>> + 'a + Send>>;

/// Abstraction over HTTP transports able to execute introspection requests.
///
/// Implementations must be `Send + Sync + 'static` so a single transport (and its connection
/// pool) can serve concurrent validations. Non-success statuses are returned as responses, not
/// errors; the caller decides how to classify them.
pub trait IntrospectionHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request` and resolves with the full response.
	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError>;
}
impl<C> IntrospectionHttpClient for Arc<C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	type TransportError = C::TransportError;

	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		self.as_ref().execute(request)
	}
}

/// Borrowing adapter that lets the `oauth2` crate drive token exchanges over any
/// [`IntrospectionHttpClient`].
pub(crate) struct OAuth2Handle<'h, C>(pub(crate) &'h C)
where
	C: ?Sized + IntrospectionHttpClient;
impl<'c, C> AsyncHttpClient<'c> for OAuth2Handle<'_, C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	type Error = HttpClientError<C::TransportError>;
	type Future = HttpFuture<'c, C::TransportError>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		self.0.execute(request)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Introspection endpoints answer directly; configure any custom [`ReqwestClient`] to disable
/// redirect following.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl IntrospectionHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let request: reqwest::Request = request.try_into().map_err(Box::new)?;
			let response = client.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
