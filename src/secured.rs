//! OAuth 2.0–secured transport for introspection endpoints that demand their own bearer token.
//!
//! [`SecuredHttpClient`] decorates any [`IntrospectionHttpClient`]: before each introspection
//! request it obtains a bearer token through the client-credentials grant, caches it until
//! shortly before it expires, and attaches it as `Authorization: Bearer`. Concurrent callers
//! share one in-flight exchange. A `401` from the introspection endpoint drops the cached
//! bearer so the next call exchanges again; the rejected request itself is returned as-is.

// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, HttpRequest, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
	http::{HeaderValue, StatusCode, header::AUTHORIZATION},
};
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	error::ConfigError,
	http::{HttpFuture, IntrospectionHttpClient, OAuth2Handle},
	introspect::config,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

type CredentialsClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type SecuredHttpError<E> = HttpClientError<SecuredTransportError<E>>;

/// Scope requested for introspection access when none is configured.
pub const DEFAULT_CHECK_TOKEN_SCOPE: &str = "urn:zuul:oaas:check-token";

/// How the client authenticates against the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// HTTP Basic authentication header.
	#[default]
	ClientSecretBasic,
	/// Credentials sent in the form body.
	ClientSecretPost,
}

/// Validated client-credentials settings for a secured introspection endpoint.
#[derive(Clone)]
pub struct ClientCredentialsConfig {
	token_endpoint: Url,
	client_id: String,
	client_secret: ClientSecret,
	scope: ScopeSet,
	auth_method: ClientAuthMethod,
}
impl ClientCredentialsConfig {
	/// Creates a new builder with the default scope and `client_secret_basic`.
	pub fn builder() -> ClientCredentialsConfigBuilder {
		ClientCredentialsConfigBuilder::default()
	}

	/// Token endpoint used for the client-credentials grant.
	pub fn token_endpoint(&self) -> &Url {
		&self.token_endpoint
	}

	/// Client identifier presented to the token endpoint.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Scopes requested for the bearer token.
	pub fn scope(&self) -> &ScopeSet {
		&self.scope
	}

	/// Client authentication method.
	pub fn auth_method(&self) -> ClientAuthMethod {
		self.auth_method
	}
}
impl Debug for ClientCredentialsConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsConfig")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &"[redacted]")
			.field("scope", &self.scope)
			.field("auth_method", &self.auth_method)
			.finish()
	}
}

/// Builder for [`ClientCredentialsConfig`].
#[derive(Clone, Default)]
pub struct ClientCredentialsConfigBuilder {
	token_endpoint: Option<String>,
	client_id: Option<String>,
	client_secret: Option<String>,
	scopes: Option<Vec<String>>,
	auth_method: ClientAuthMethod,
}
impl ClientCredentialsConfigBuilder {
	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: impl Into<String>) -> Self {
		self.token_endpoint = Some(url.into());

		self
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
		self.client_secret = Some(client_secret.into());

		self
	}

	/// Replaces the requested scopes (defaults to [`DEFAULT_CHECK_TOKEN_SCOPE`]).
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = Some(scopes.into_iter().map(Into::into).collect());

		self
	}

	/// Overrides the client authentication method.
	pub fn auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.auth_method = method;

		self
	}

	/// Validates the settings.
	pub fn build(self) -> Result<ClientCredentialsConfig, ConfigError> {
		let token_endpoint = config::parse_endpoint("token", self.token_endpoint.as_deref())?;
		let client_id = required("client id", self.client_id)?;
		let client_secret = required("client secret", self.client_secret)?;
		let scope = match self.scopes {
			Some(scopes) => ScopeSet::new(scopes)?,
			None => ScopeSet::new([DEFAULT_CHECK_TOKEN_SCOPE])?,
		};

		Ok(ClientCredentialsConfig {
			token_endpoint,
			client_id,
			client_secret: ClientSecret::new(client_secret),
			scope,
			auth_method: self.auth_method,
		})
	}
}
impl Debug for ClientCredentialsConfigBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsConfigBuilder")
			.field("token_endpoint", &self.token_endpoint)
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret.as_ref().map(|_| "[redacted]"))
			.field("scopes", &self.scopes)
			.field("auth_method", &self.auth_method)
			.finish()
	}
}

/// Errors surfaced by [`SecuredHttpClient`] on top of the wrapped transport's own.
#[derive(Debug, ThisError)]
pub enum SecuredTransportError<E>
where
	E: 'static + Send + Sync + StdError,
{
	/// The wrapped transport failed.
	#[error(transparent)]
	Transport(E),
	/// The token endpoint did not hand out a usable bearer token.
	#[error("Token endpoint did not issue a bearer token: {message}.")]
	Credentials {
		/// Failure detail.
		message: String,
	},
}

#[derive(Clone)]
struct CachedBearer {
	header: HeaderValue,
	refresh_at: Option<OffsetDateTime>,
}
impl CachedBearer {
	fn is_usable_at(&self, now: OffsetDateTime) -> bool {
		self.refresh_at.is_none_or(|refresh_at| now < refresh_at)
	}
}

/// Transport that authenticates every introspection request with a client-credentials bearer.
pub struct SecuredHttpClient<C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	inner: Arc<C>,
	oauth_client: CredentialsClient,
	client_id: String,
	scope: ScopeSet,
	bearer: Mutex<Option<CachedBearer>>,
	exchange_guard: AsyncMutex<()>,
}
impl<C> SecuredHttpClient<C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	/// Bearer tokens are replaced this long before they expire.
	pub const REFRESH_MARGIN: Duration = Duration::seconds(30);

	/// Wraps `inner`, using it for both token exchanges and introspection calls.
	pub fn new(config: ClientCredentialsConfig, inner: impl Into<Arc<C>>) -> Self {
		let mut oauth_client = BasicClient::new(OAuthClientId::new(config.client_id.clone()))
			.set_client_secret(config.client_secret)
			.set_token_uri(TokenUrl::from_url(config.token_endpoint));

		if matches!(config.auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Self {
			inner: inner.into(),
			oauth_client,
			client_id: config.client_id,
			scope: config.scope,
			bearer: Mutex::new(None),
			exchange_guard: AsyncMutex::new(()),
		}
	}

	/// Wrapped transport.
	pub fn inner(&self) -> &Arc<C> {
		&self.inner
	}

	/// Drops the cached bearer token so the next request exchanges a fresh one.
	pub fn invalidate(&self) {
		self.bearer.lock().take();
	}

	fn cached_bearer(&self, now: OffsetDateTime) -> Option<HeaderValue> {
		self.bearer
			.lock()
			.as_ref()
			.filter(|bearer| bearer.is_usable_at(now))
			.map(|bearer| bearer.header.clone())
	}

	async fn bearer(&self) -> Result<HeaderValue, SecuredHttpError<C::TransportError>> {
		if let Some(header) = self.cached_bearer(OffsetDateTime::now_utc()) {
			return Ok(header);
		}

		let _singleflight = self.exchange_guard.lock().await;

		// Another caller may have finished the exchange while we waited.
		if let Some(header) = self.cached_bearer(OffsetDateTime::now_utc()) {
			return Ok(header);
		}

		const KIND: OperationKind = OperationKind::ClientCredentials;

		let span = OperationSpan::new(KIND, "bearer", &self.client_id);

		obs::record_outcome(KIND, OperationOutcome::Attempt);

		let result = span.instrument(self.exchange()).await;

		match &result {
			Ok(_) => obs::record_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	async fn exchange(&self) -> Result<HeaderValue, SecuredHttpError<C::TransportError>> {
		let handle = OAuth2Handle(self.inner.as_ref());
		let mut request = self.oauth_client.exchange_client_credentials();

		for scope in self.scope.iter() {
			request = request.add_scope(Scope::new(scope.to_owned()));
		}

		let issued_at = OffsetDateTime::now_utc();
		let response = request.request_async(&handle).await.map_err(map_token_error)?;
		let header = HeaderValue::try_from(format!("Bearer {}", response.access_token().secret()))
			.map_err(|_| credentials_error("access token is not a valid header value".into()))?;
		let refresh_at = response
			.expires_in()
			.and_then(|lifetime| Duration::try_from(lifetime).ok())
			.and_then(|lifetime| issued_at.checked_add(lifetime - Self::REFRESH_MARGIN));

		*self.bearer.lock() = Some(CachedBearer { header: header.clone(), refresh_at });

		Ok(header)
	}
}
impl<C> IntrospectionHttpClient for SecuredHttpClient<C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	type TransportError = SecuredTransportError<C::TransportError>;

	fn execute(&self, mut request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		Box::pin(async move {
			let header = self.bearer().await?;

			request.headers_mut().insert(AUTHORIZATION, header);

			let response = self.inner.execute(request).await.map_err(lift_transport_error)?;

			if response.status() == StatusCode::UNAUTHORIZED {
				self.invalidate();
			}

			Ok(response)
		})
	}
}
impl<C> Debug for SecuredHttpClient<C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SecuredHttpClient")
			.field("client_id", &self.client_id)
			.field("scope", &self.scope)
			.field("bearer_cached", &self.bearer.lock().is_some())
			.finish()
	}
}

fn credentials_error<E>(message: String) -> SecuredHttpError<E>
where
	E: 'static + Send + Sync + StdError,
{
	HttpClientError::Reqwest(Box::new(SecuredTransportError::Credentials { message }))
}

fn lift_transport_error<E>(err: HttpClientError<E>) -> SecuredHttpError<E>
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) =>
			HttpClientError::Reqwest(Box::new(SecuredTransportError::Transport(*inner))),
		HttpClientError::Http(inner) => HttpClientError::Http(inner),
		HttpClientError::Io(inner) => HttpClientError::Io(inner),
		HttpClientError::Other(message) => HttpClientError::Other(message),
		other => HttpClientError::Other(other.to_string()),
	}
}

fn map_token_error<E>(err: BasicRequestTokenError<HttpClientError<E>>) -> SecuredHttpError<E>
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		RequestTokenError::ServerResponse(response) => {
			let message = match response.error_description() {
				Some(description) => format!("{}: {description}", response.error().as_ref()),
				None => response.error().as_ref().to_owned(),
			};

			credentials_error(message)
		},
		RequestTokenError::Request(error) => lift_transport_error(error),
		RequestTokenError::Parse(error, _body) =>
			credentials_error(format!("token response could not be parsed: {error}")),
		RequestTokenError::Other(message) => credentials_error(message),
	}
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
	value
		.filter(|value| !value.trim().is_empty())
		.ok_or(ConfigError::MissingCredential { field })
}
