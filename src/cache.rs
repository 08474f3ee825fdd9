//! Shared response cache for introspection transports.
//!
//! [`CachingHttpClient`] answers repeated introspection requests from a [`ResponseCache`]
//! instead of the authorization server. Every hit carries an `Age` header with the whole
//! seconds elapsed since the entry was stored (added to any `Age` the origin already reported),
//! so the freshness check can reject answers that outlived the token they describe.

pub mod memory;

pub use memory::MemoryResponseCache;

// crates.io
use oauth2::{
	HttpRequest, HttpResponse,
	http::{HeaderMap, HeaderValue, StatusCode, header::AGE},
};
// self
use crate::{
	_prelude::*,
	auth::token,
	freshness,
	http::{HttpFuture, IntrospectionHttpClient},
	obs::{self, OperationKind, OperationOutcome},
};

/// Future returned by [`ResponseCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Storage contract for cached introspection responses.
pub trait ResponseCache
where
	Self: Send + Sync,
{
	/// Fetches the entry stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<CachedResponse>>;

	/// Stores or replaces the entry under `key`.
	fn put(&self, key: CacheKey, response: CachedResponse) -> CacheFuture<'_, ()>;

	/// Drops the entry under `key`.
	fn remove<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, ()>;

	/// Drops every entry stored at or before `cutoff` and returns how many were removed.
	fn purge_stored_before(&self, cutoff: OffsetDateTime) -> CacheFuture<'_, usize>;
}

/// Error type produced by [`ResponseCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CacheError {
	/// Backend-level failure for the storage engine.
	#[error("Cache backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Cache key derived from the request; never contains the token in clear.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);
impl CacheKey {
	/// SHA-256 fingerprint of the request method, URI, and body.
	pub fn for_request(request: &HttpRequest) -> Self {
		let uri = request.uri().to_string();
		let method = request.method().as_str();
		let mut material = Vec::with_capacity(method.len() + uri.len() + request.body().len() + 2);

		material.extend_from_slice(method.as_bytes());
		material.push(b'\n');
		material.extend_from_slice(uri.as_bytes());
		material.push(b'\n');
		material.extend_from_slice(request.body());

		Self(token::fingerprint(&material))
	}

	/// Returns the fingerprint.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

/// A stored 2xx response.
#[derive(Clone, Debug)]
pub struct CachedResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers as received from the origin.
	pub headers: HeaderMap,
	/// Response body.
	pub body: Vec<u8>,
	/// Instant the entry was stored.
	pub stored_at: OffsetDateTime,
}
impl CachedResponse {
	/// Captures `response` as stored at `stored_at`.
	pub fn new(response: &HttpResponse, stored_at: OffsetDateTime) -> Self {
		Self {
			status: response.status(),
			headers: response.headers().clone(),
			body: response.body().clone(),
			stored_at,
		}
	}

	/// Whole seconds elapsed between storing and `now`; clock skew counts as zero.
	pub fn age_at(&self, now: OffsetDateTime) -> u64 {
		u64::try_from((now - self.stored_at).whole_seconds()).unwrap_or(0)
	}

	/// Rebuilds the response with an `Age` header valid at `now`.
	///
	/// Time spent in this cache is added to the `Age` the origin reported. A malformed origin
	/// `Age` is replayed untouched so validation still rejects it.
	pub fn to_response(&self, now: OffsetDateTime) -> HttpResponse {
		let mut response = HttpResponse::new(self.body.clone());

		*response.status_mut() = self.status;
		*response.headers_mut() = self.headers.clone();

		if let Ok(upstream) = freshness::response_age(&self.headers) {
			let age = upstream.unwrap_or(0).saturating_add(self.age_at(now));

			response.headers_mut().insert(AGE, HeaderValue::from(age));
		}

		response
	}
}

/// Transport decorator that serves repeated requests from a [`ResponseCache`].
///
/// Only 2xx responses are stored. Entries older than the TTL are evicted when looked up, and
/// every store first purges all expired entries so tokens seen once do not accumulate.
/// Concurrent misses for the same request wait for a single origin call.
pub struct CachingHttpClient<C, S = MemoryResponseCache>
where
	C: ?Sized + IntrospectionHttpClient,
	S: ?Sized + ResponseCache,
{
	inner: Arc<C>,
	cache: Arc<S>,
	ttl: Duration,
	fill_guards: Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>,
}
impl<C> CachingHttpClient<C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	/// Wraps `inner` with a fresh in-memory cache.
	pub fn new(inner: impl Into<Arc<C>>) -> Self {
		Self::with_cache(inner, MemoryResponseCache::default())
	}
}
impl<C, S> CachingHttpClient<C, S>
where
	C: ?Sized + IntrospectionHttpClient,
	S: ?Sized + ResponseCache,
{
	/// Default entry lifetime.
	pub const DEFAULT_TTL: Duration = Duration::seconds(300);

	/// Wraps `inner` with the provided cache backend.
	pub fn with_cache(inner: impl Into<Arc<C>>, cache: impl Into<Arc<S>>) -> Self {
		Self {
			inner: inner.into(),
			cache: cache.into(),
			ttl: Self::DEFAULT_TTL,
			fill_guards: Default::default(),
		}
	}

	/// Overrides the entry lifetime; negative values are clamped to zero.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = if ttl.is_negative() { Duration::ZERO } else { ttl };

		self
	}

	/// Wrapped transport.
	pub fn inner(&self) -> &Arc<C> {
		&self.inner
	}

	/// Cache backend.
	pub fn cache(&self) -> &Arc<S> {
		&self.cache
	}

	/// Entry lifetime.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	async fn lookup(&self, key: &CacheKey) -> Option<HttpResponse> {
		let now = OffsetDateTime::now_utc();

		match self.cache.get(key).await {
			Ok(Some(entry)) if now - entry.stored_at < self.ttl => Some(entry.to_response(now)),
			Ok(Some(_)) => {
				if let Err(e) = self.cache.remove(key).await {
					obs::record_failure(OperationKind::CacheLookup, &e);
				}

				None
			},
			Ok(None) => None,
			Err(e) => {
				obs::record_failure(OperationKind::CacheLookup, &e);

				None
			},
		}
	}

	async fn fill(
		&self,
		key: CacheKey,
		request: HttpRequest,
	) -> Result<HttpResponse, oauth2::HttpClientError<C::TransportError>> {
		let response = self.inner.execute(request).await?;

		if response.status().is_success() {
			let now = OffsetDateTime::now_utc();

			if let Err(e) = self.cache.purge_stored_before(now - self.ttl).await {
				obs::record_failure(OperationKind::CacheLookup, &e);
			}

			let entry = CachedResponse::new(&response, now);

			if let Err(e) = self.cache.put(key, entry).await {
				obs::record_failure(OperationKind::CacheLookup, &e);
			}
		}

		Ok(response)
	}

	fn fill_guard(&self, key: &CacheKey) -> Arc<AsyncMutex<()>> {
		let mut guards = self.fill_guards.lock();

		guards.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	fn release_fill_guard(&self, key: &CacheKey, guard: &Arc<AsyncMutex<()>>) {
		let mut guards = self.fill_guards.lock();

		if guards.get(key).is_some_and(|current| Arc::ptr_eq(current, guard)) {
			guards.remove(key);
		}
	}
}
impl<C, S> IntrospectionHttpClient for CachingHttpClient<C, S>
where
	C: ?Sized + IntrospectionHttpClient,
	S: 'static + ?Sized + ResponseCache,
{
	type TransportError = C::TransportError;

	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		const KIND: OperationKind = OperationKind::CacheLookup;

		Box::pin(async move {
			let key = CacheKey::for_request(&request);

			if let Some(hit) = self.lookup(&key).await {
				obs::record_outcome(KIND, OperationOutcome::Success);

				return Ok(hit);
			}

			let guard = self.fill_guard(&key);
			let result = {
				let _singleflight = guard.lock().await;

				match self.lookup(&key).await {
					Some(hit) => {
						obs::record_outcome(KIND, OperationOutcome::Success);

						Ok(hit)
					},
					None => {
						obs::record_outcome(KIND, OperationOutcome::Miss);

						self.fill(key.clone(), request).await
					},
				}
			};

			self.release_fill_guard(&key, &guard);

			result
		})
	}
}
impl<C, S> Debug for CachingHttpClient<C, S>
where
	C: ?Sized + IntrospectionHttpClient,
	S: ?Sized + ResponseCache,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachingHttpClient").field("ttl", &self.ttl).finish()
	}
}
