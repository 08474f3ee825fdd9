//! Remote token services: the validation entry point resource servers call per request.
//!
//! [`RemoteTokenServices::load_authentication`] sends the presented token to the introspection
//! endpoint, rejects cached answers that outlived the token, parses the answer into a
//! [`TokenDescriptor`], and derives the [`Authentication`]. Each call is independent; the only
//! shared state is the transport (and whatever it caches).

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Authentication},
	descriptor::{TokenDescriptor, wire::TokenInfo},
	freshness,
	http::IntrospectionHttpClient,
	introspect::{IntrospectionClient, IntrospectionConfig},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};
#[cfg(feature = "reqwest")]
use crate::{
	http::ReqwestHttpClient,
	secured::{ClientCredentialsConfig, SecuredHttpClient},
};

/// Boxed future returned by [`ResourceTokenServices`] operations.
pub type ServicesFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

#[cfg(feature = "reqwest")]
/// Token services over the crate's default reqwest transport.
pub type ReqwestTokenServices = RemoteTokenServices<ReqwestHttpClient>;
#[cfg(feature = "reqwest")]
/// Token services whose introspection calls carry a client-credentials bearer.
pub type SecuredReqwestTokenServices = RemoteTokenServices<SecuredHttpClient<ReqwestHttpClient>>;

/// Object-safe seam for request filters that authenticate bearer tokens.
pub trait ResourceTokenServices
where
	Self: Send + Sync,
{
	/// Validates `access_token` and returns the authentication it grants.
	fn load_authentication<'a>(
		&'a self,
		access_token: &'a str,
	) -> ServicesFuture<'a, Authentication>;

	/// Reconstructs token metadata by value; remote services never support this.
	fn read_access_token(&self, access_token: &str) -> Result<AccessToken>;
}

/// Validates bearer tokens by asking the remote authorization server about them.
pub struct RemoteTokenServices<C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	client: IntrospectionClient<C>,
}
impl<C> RemoteTokenServices<C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	/// Creates services that reuse the caller-provided transport.
	pub fn with_http_client(config: IntrospectionConfig, http_client: impl Into<Arc<C>>) -> Self {
		Self { client: IntrospectionClient::new(config, http_client) }
	}

	/// Configuration the services were built with.
	pub fn config(&self) -> &IntrospectionConfig {
		self.client.config()
	}

	/// Underlying introspection client.
	pub fn introspection_client(&self) -> &IntrospectionClient<C> {
		&self.client
	}

	/// Validates `access_token` against the introspection endpoint.
	///
	/// Every failure other than [`Error::Config`] means the token must be rejected; see
	/// [`Error::is_authentication_failure`].
	pub async fn load_authentication(
		&self,
		access_token: impl Into<AccessToken>,
	) -> Result<Authentication> {
		const KIND: OperationKind = OperationKind::LoadAuthentication;

		let access_token = access_token.into();
		let span = OperationSpan::new(KIND, "load_authentication", &access_token.fingerprint());

		obs::record_outcome(KIND, OperationOutcome::Attempt);

		let result = span.instrument(self.validate(&access_token)).await;

		match &result {
			Ok(_) => obs::record_outcome(KIND, OperationOutcome::Success),
			Err(e) => {
				obs::record_failure(KIND, e);
				obs::record_outcome(KIND, OperationOutcome::Failure);
			},
		}

		result
	}

	/// Always fails with [`Error::NotSupported`]; the authorization server alone knows the
	/// token's metadata.
	pub fn read_access_token(&self, _access_token: &str) -> Result<AccessToken> {
		Err(Error::NotSupported { operation: "read access token" })
	}

	async fn validate(&self, access_token: &AccessToken) -> Result<Authentication> {
		let response = self.client.fetch(access_token).await?;
		let age = freshness::response_age(&response.headers)?;
		let info = TokenInfo::from_json(response.status, &response.body)?;

		freshness::check(age, info.expires_in)?;

		let descriptor = TokenDescriptor::try_from(info)?;

		Ok(Authentication::from_descriptor(&descriptor))
	}
}
#[cfg(feature = "reqwest")]
impl RemoteTokenServices<ReqwestHttpClient> {
	/// Creates services backed by a default reqwest transport.
	pub fn new(config: IntrospectionConfig) -> Self {
		Self::with_http_client(config, ReqwestHttpClient::default())
	}
}
#[cfg(feature = "reqwest")]
impl RemoteTokenServices<SecuredHttpClient<ReqwestHttpClient>> {
	/// Creates services whose introspection endpoint requires a client-credentials bearer.
	pub fn secured(config: IntrospectionConfig, credentials: ClientCredentialsConfig) -> Self {
		let transport =
			SecuredHttpClient::<ReqwestHttpClient>::new(credentials, ReqwestHttpClient::default());

		Self::with_http_client(config, transport)
	}
}
impl<C> ResourceTokenServices for RemoteTokenServices<C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	fn load_authentication<'a>(
		&'a self,
		access_token: &'a str,
	) -> ServicesFuture<'a, Authentication> {
		Box::pin(RemoteTokenServices::load_authentication(self, access_token))
	}

	fn read_access_token(&self, access_token: &str) -> Result<AccessToken> {
		RemoteTokenServices::read_access_token(self, access_token)
	}
}
impl<C> Debug for RemoteTokenServices<C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RemoteTokenServices").field("client", &self.client).finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::{
		HttpRequest, HttpResponse,
		http::{Response, StatusCode, header::AGE},
	};
	// self
	use super::*;
	use crate::{
		auth::{Authority, AuthoritySet, DEFAULT_USER_AUTHORITY},
		error::{IntrospectionError, ProtocolError},
		http::HttpFuture,
		introspect::EndpointProfile,
	};

	#[derive(Debug, ThisError)]
	#[error("Unreachable.")]
	struct Unreachable;

	struct Canned {
		status: StatusCode,
		age: Option<&'static str>,
		body: String,
		requests: Mutex<Vec<HttpRequest>>,
	}
	impl Canned {
		fn ok(body: impl Into<String>) -> Arc<Self> {
			Self::new(StatusCode::OK, None, body)
		}

		fn aged(age: &'static str, body: &'static str) -> Arc<Self> {
			Self::new(StatusCode::OK, Some(age), body)
		}

		fn new(
			status: StatusCode,
			age: Option<&'static str>,
			body: impl Into<String>,
		) -> Arc<Self> {
			Arc::new(Self { status, age, body: body.into(), requests: Mutex::new(Vec::new()) })
		}
	}
	impl IntrospectionHttpClient for Canned {
		type TransportError = Unreachable;

		fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
			self.requests.lock().push(request);

			let mut response = Response::builder().status(self.status);

			if let Some(age) = self.age {
				response = response.header(AGE, age);
			}

			let response: HttpResponse = response
				.body(self.body.clone().into_bytes())
				.expect("Response fixture should build.");

			Box::pin(async move { Ok(response) })
		}
	}

	fn services(transport: &Arc<Canned>) -> RemoteTokenServices<Canned> {
		let config = IntrospectionConfig::builder(EndpointProfile::CheckToken)
			.endpoint("https://auth.example.com/check-token")
			.build()
			.expect("Config fixture should build.");

		RemoteTokenServices::with_http_client(config, transport.clone())
	}

	#[tokio::test]
	async fn user_token_without_authorities_gets_default_role() {
		let transport = Canned::ok(
			r#"{"client_id":"c1","scope":"read write","user_id":"u42","user_authorities":[]}"#,
		);
		let authentication = services(&transport)
			.load_authentication("abc123")
			.await
			.expect("User-bound token should validate.");
		let user = authentication.user.as_ref().expect("User-bound tokens carry a user.");

		assert_eq!(authentication.client_id().as_ref(), "c1");
		assert_eq!(authentication.client.scope.normalized(), "read write");
		assert_eq!(user.principal.as_ref(), "u42");
		assert_eq!(user.authorities, AuthoritySet::from([DEFAULT_USER_AUTHORITY]));

		let requests = transport.requests.lock();

		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].body().as_slice(), b"access_token=abc123");
	}

	#[tokio::test]
	async fn client_only_token_carries_approved_resource_details() {
		let transport = Canned::ok(
			r#"{"client_id":"c1","audience":["r1"],"client_authorities":["ROLE_TRUSTED"]}"#,
		);
		let authentication = services(&transport)
			.load_authentication("abc123")
			.await
			.expect("Client-only token should validate.");
		let details = authentication
			.client
			.resource_details
			.as_ref()
			.expect("Audience implies resource details.");

		assert!(authentication.is_client_only());
		assert!(authentication.client.approved);
		assert_eq!(details.resource_ids, BTreeSet::from(["r1".to_owned()]));
		assert_eq!(details.authorities, AuthoritySet::from([Authority::from("ROLE_TRUSTED")]));
	}

	#[tokio::test]
	async fn cached_answers_expire_at_their_lifetime() {
		let body = r#"{"client_id":"c1","expires_in":60}"#;
		let expired = services(&Canned::aged("60", body))
			.load_authentication("abc123")
			.await
			.expect_err("An answer as old as its lifetime is expired.");

		assert!(matches!(expired, Error::TokenExpired { age: 60, expires_in: 60 }));
		assert!(
			services(&Canned::aged("59", body)).load_authentication("abc123").await.is_ok()
		);
		assert!(services(&Canned::ok(body)).load_authentication("abc123").await.is_ok());
	}

	#[tokio::test]
	async fn freshness_is_checked_before_the_client_id() {
		let err = services(&Canned::aged("120", r#"{"expires_in":60}"#))
			.load_authentication("abc123")
			.await
			.expect_err("Stale answers must be rejected.");

		assert!(matches!(err, Error::TokenExpired { .. }));
	}

	#[tokio::test]
	async fn protocol_violations_never_yield_an_authentication() {
		for body in [r#"{"scope":"read"}"#, "<html>", r#"{"client_id":"c1","user_id":""}"#] {
			let err = services(&Canned::ok(body))
				.load_authentication("abc123")
				.await
				.expect_err("Invalid answers must be rejected.");

			assert!(
				matches!(err, Error::ProtocolViolation(_)),
				"Unexpected error for {body}: {err:?}"
			);
			assert!(err.is_authentication_failure());
		}

		let err = services(&Canned::aged("soon", r#"{"client_id":"c1"}"#))
			.load_authentication("abc123")
			.await
			.expect_err("Malformed Age headers must be rejected.");

		assert!(matches!(err, Error::ProtocolViolation(ProtocolError::MalformedAgeHeader { .. })));
	}

	#[tokio::test]
	async fn lenient_wire_values_still_validate() {
		let delimited = services(&Canned::ok(r#"{"client_id":"c1","scope":["read write"]}"#))
			.load_authentication("abc123")
			.await
			.expect("Delimited scope array entries should validate.");

		assert_eq!(delimited.client.scope.normalized(), "read write");

		let user_id = "u".repeat(600);
		let body = format!(r#"{{"client_id":"c1","user_id":"{user_id}"}}"#);
		let long_user = services(&Canned::ok(body))
			.load_authentication("abc123")
			.await
			.expect("Long user ids should validate.");

		assert_eq!(long_user.name(), user_id);
	}

	#[tokio::test]
	async fn non_success_statuses_are_introspection_failures() {
		let transport =
			Canned::new(StatusCode::UNAUTHORIZED, None, r#"{"error":"invalid_token"}"#);
		let err = services(&transport)
			.load_authentication("abc123")
			.await
			.expect_err("401 answers must be rejected.");

		assert!(matches!(
			err,
			Error::IntrospectionFailure(IntrospectionError::Rejected { status: 401, .. })
		));
	}

	#[tokio::test]
	async fn trait_objects_expose_the_same_pipeline() {
		let filter_services: Box<dyn ResourceTokenServices> =
			Box::new(services(&Canned::ok(r#"{"client_id":"c1"}"#)));
		let authentication =
			filter_services.load_authentication("abc123").await.expect("Token should validate.");

		assert_eq!(authentication.name(), "c1");
		assert!(matches!(
			filter_services.read_access_token("abc123"),
			Err(Error::NotSupported { operation: "read access token" })
		));
		assert!(matches!(filter_services.read_access_token(""), Err(Error::NotSupported { .. })));
	}
}
