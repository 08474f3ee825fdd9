//! Introspection client: one request per token against the configured endpoint.

pub mod config;

pub use config::*;

// crates.io
use oauth2::{
	HttpClientError, HttpRequest,
	http::{
		HeaderMap, HeaderValue, Method, Request, StatusCode,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	error::IntrospectionError,
	http::IntrospectionHttpClient,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const BODY_PREVIEW_LIMIT: usize = 256;

/// Successful (2xx) response from the introspection endpoint.
#[derive(Clone, Debug)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers; an `Age` header marks a cached answer.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}

/// Sends tokens to the introspection endpoint and returns the raw answers.
pub struct IntrospectionClient<C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	config: IntrospectionConfig,
	http_client: Arc<C>,
}
impl<C> IntrospectionClient<C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	/// Creates a client over the provided transport.
	pub fn new(config: IntrospectionConfig, http_client: impl Into<Arc<C>>) -> Self {
		Self { config, http_client: http_client.into() }
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &IntrospectionConfig {
		&self.config
	}

	/// Transport shared by every request.
	pub fn http_client(&self) -> &Arc<C> {
		&self.http_client
	}

	/// Sends `token` to the endpoint.
	///
	/// Non-2xx answers, transport failures, and unreachable hosts all surface as
	/// [`Error::IntrospectionFailure`]; nothing is retried here.
	pub async fn fetch(&self, token: &AccessToken) -> Result<RawResponse> {
		let request = self.build_request(token)?;
		let response = self.http_client.execute(request).await.map_err(map_transport_error)?;
		let (parts, body) = response.into_parts();

		if !parts.status.is_success() {
			return Err(self.status_error(parts.status, &body).into());
		}

		Ok(RawResponse { status: parts.status.as_u16(), headers: parts.headers, body })
	}

	/// Builds the GET or POST request carrying `token`.
	pub fn build_request(&self, token: &AccessToken) -> Result<HttpRequest> {
		let name = self.config.token_parameter_name.as_str();
		let builder =
			Request::builder().header(ACCEPT, HeaderValue::from_static("application/json"));
		let request = match self.config.method {
			RequestMethod::Get => {
				let mut url = self.config.endpoint.clone();

				url.query_pairs_mut().append_pair(name, token.expose());

				builder.method(Method::GET).uri(url.as_str()).body(Vec::new())
			},
			RequestMethod::Post => {
				let form = url::form_urlencoded::Serializer::new(String::new())
					.append_pair(name, token.expose())
					.finish();

				builder
					.method(Method::POST)
					.uri(self.config.endpoint.as_str())
					.header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
					.body(form.into_bytes())
			},
		};

		request.map_err(|e| IntrospectionError::from(e).into())
	}

	fn status_error(&self, status: StatusCode, body: &[u8]) -> IntrospectionError {
		if !self.config.decorate_errors {
			return IntrospectionError::UnexpectedStatus {
				status: status.as_u16(),
				body_preview: body_preview(body),
			};
		}

		let oauth = serde_json::from_slice::<OAuthErrorBody>(body).ok();
		let (error, description) = match oauth {
			Some(OAuthErrorBody { error: Some(error), error_description }) =>
				(error, error_description),
			_ => (status.canonical_reason().unwrap_or("unknown_error").to_owned(), None),
		};

		IntrospectionError::Rejected { status: status.as_u16(), error, description }
	}
}
impl<C> Debug for IntrospectionClient<C>
where
	C: ?Sized + IntrospectionHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IntrospectionClient").field("config", &self.config).finish()
	}
}

#[derive(Deserialize)]
struct OAuthErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

/// Maps transport failures into [`IntrospectionError`] values.
pub fn map_transport_error<E>(err: HttpClientError<E>) -> IntrospectionError
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => IntrospectionError::network(*inner),
		HttpClientError::Http(inner) => IntrospectionError::Request(inner),
		HttpClientError::Io(inner) => IntrospectionError::Io(inner),
		HttpClientError::Other(message) => IntrospectionError::Other { message },
		other => IntrospectionError::Other { message: other.to_string() },
	}
}

fn body_preview(body: &[u8]) -> Option<String> {
	if body.is_empty() {
		return None;
	}

	let text = String::from_utf8_lossy(body);

	Some(text.chars().take(BODY_PREVIEW_LIMIT).collect())
}
