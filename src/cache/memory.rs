//! Thread-safe in-memory [`ResponseCache`] implementation.

// self
use crate::{
	_prelude::*,
	cache::{CacheFuture, CacheKey, CachedResponse, ResponseCache},
};

type CacheMap = Arc<RwLock<HashMap<CacheKey, CachedResponse>>>;

/// In-process response cache; clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct MemoryResponseCache(CacheMap);
impl MemoryResponseCache {
	/// Number of stored entries, expired ones included until their next lookup.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Drops every entry.
	pub fn clear(&self) {
		self.0.write().clear();
	}
}
impl ResponseCache for MemoryResponseCache {
	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<CachedResponse>> {
		let entry = self.0.read().get(key).cloned();

		Box::pin(async move { Ok(entry) })
	}

	fn put(&self, key: CacheKey, response: CachedResponse) -> CacheFuture<'_, ()> {
		self.0.write().insert(key, response);

		Box::pin(async { Ok(()) })
	}

	fn remove<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, ()> {
		self.0.write().remove(key);

		Box::pin(async { Ok(()) })
	}

	fn purge_stored_before(&self, cutoff: OffsetDateTime) -> CacheFuture<'_, usize> {
		let mut entries = self.0.write();
		let before = entries.len();

		entries.retain(|_, entry| entry.stored_at > cutoff);

		let purged = before - entries.len();

		Box::pin(async move { Ok(purged) })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::{HttpResponse, http::Request};
	// self
	use super::*;

	fn key(token: &str) -> CacheKey {
		CacheKey::for_request(
			&Request::builder()
				.uri("https://auth.example.com/check-token")
				.body(format!("token={token}").into_bytes())
				.expect("Request fixture should build."),
		)
	}

	#[tokio::test]
	async fn entries_are_shared_between_clones() {
		let cache = MemoryResponseCache::default();
		let view = cache.clone();
		let entry =
			CachedResponse::new(&HttpResponse::new(b"{}".to_vec()), OffsetDateTime::now_utc());

		cache.put(key("a"), entry).await.expect("Memory cache never fails.");

		assert_eq!(view.len(), 1);
		assert!(view.get(&key("a")).await.expect("Memory cache never fails.").is_some());
		assert!(view.get(&key("b")).await.expect("Memory cache never fails.").is_none());

		view.remove(&key("a")).await.expect("Memory cache never fails.");

		assert!(cache.is_empty());
	}

	#[tokio::test]
	async fn clear_drops_everything() {
		let cache = MemoryResponseCache::default();

		for token in ["a", "b", "c"] {
			let entry =
				CachedResponse::new(&HttpResponse::new(Vec::new()), OffsetDateTime::now_utc());

			cache.put(key(token), entry).await.expect("Memory cache never fails.");
		}

		assert_eq!(cache.len(), 3);

		cache.clear();

		assert!(cache.is_empty());
	}

	#[tokio::test]
	async fn purge_drops_entries_stored_at_or_before_the_cutoff() {
		let cache = MemoryResponseCache::default();
		let cutoff = OffsetDateTime::now_utc();

		for (token, stored_at) in [
			("old", cutoff - Duration::seconds(1)),
			("edge", cutoff),
			("new", cutoff + Duration::seconds(1)),
		] {
			let entry = CachedResponse::new(&HttpResponse::new(Vec::new()), stored_at);

			cache.put(key(token), entry).await.expect("Memory cache never fails.");
		}

		assert_eq!(cache.purge_stored_before(cutoff).await.expect("Memory cache never fails."), 2);
		assert_eq!(cache.len(), 1);
		assert!(cache.get(&key("new")).await.expect("Memory cache never fails.").is_some());
	}
}
