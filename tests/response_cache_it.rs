// crates.io
use httpmock::prelude::*;
// self
use oauth2_introspection::{
	_preludet::*,
	cache::{CachingHttpClient, MemoryResponseCache},
	http::ReqwestHttpClient,
	introspect::{EndpointProfile, IntrospectionConfig},
	services::RemoteTokenServices,
};

type CachedServices = RemoteTokenServices<CachingHttpClient<ReqwestHttpClient>>;

fn build_cached_services(server: &MockServer, cache: MemoryResponseCache) -> CachedServices {
	let config = IntrospectionConfig::builder(EndpointProfile::CheckToken)
		.endpoint(server.url("/check-token"))
		.build()
		.expect("Introspection config should build for the mock server.");
	let transport = <CachingHttpClient<ReqwestHttpClient>>::with_cache(
		test_reqwest_http_client(),
		cache,
	);

	RemoteTokenServices::with_http_client(config, transport)
}

#[tokio::test]
async fn repeated_validation_is_served_from_cache() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/check-token").body("access_token=abc123");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"client_id\":\"c1\",\"user_id\":\"u42\",\"expires_in\":3600}");
		})
		.await;
	let cache = MemoryResponseCache::default();
	let services = build_cached_services(&server, cache.clone());
	let first =
		services.load_authentication("abc123").await.expect("Origin answer should validate.");
	let second =
		services.load_authentication("abc123").await.expect("Cached answer should validate.");

	assert_eq!(first, second);
	assert_eq!(cache.len(), 1);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn cached_answer_for_an_expiring_token_is_rejected() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/check-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"client_id\":\"c1\",\"expires_in\":0}");
		})
		.await;
	let services = build_cached_services(&server, MemoryResponseCache::default());

	services.load_authentication("abc123").await.expect("Origin answers carry no age.");

	let err = services
		.load_authentication("abc123")
		.await
		.expect_err("A cached answer for a token without lifetime left must be rejected.");

	assert!(matches!(err, Error::TokenExpired { expires_in: 0, .. }));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn rejected_tokens_are_asked_again() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/check-token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_token\"}");
		})
		.await;
	let cache = MemoryResponseCache::default();
	let services = build_cached_services(&server, cache.clone());

	for _ in 0..2 {
		services.load_authentication("abc123").await.expect_err("Invalid tokens must be rejected.");
	}

	assert!(cache.is_empty());

	mock.assert_calls_async(2).await;
}
