//! Error taxonomy surfaced by the token validation pipeline.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Every variant except [`Error::NotSupported`] and [`Error::Config`] means the presented
/// token must be rejected; callers should not try to distinguish an expired token from an
/// invalid one when answering the request.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem detected while constructing the services.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The authorization server answered with something that breaks the introspection contract.
	#[error(transparent)]
	ProtocolViolation(#[from] ProtocolError),
	/// The authorization server could not be reached or refused the request.
	#[error(transparent)]
	IntrospectionFailure(#[from] IntrospectionError),

	/// A cached introspection response outlived the token lifetime it describes.
	#[error("Access token has expired: cached response is {age}s old, token lifetime is {expires_in}s.")]
	TokenExpired {
		/// Seconds elapsed since the origin produced the response.
		age: u64,
		/// Token lifetime reported by the authorization server, in seconds.
		expires_in: i64,
	},
	/// The requested operation is not offered by remote token services.
	#[error("Not supported: {operation}.")]
	NotSupported {
		/// Human-readable operation label.
		operation: &'static str,
	},
}
impl Error {
	/// Returns `true` when the error means the token must be treated as unauthenticated.
	///
	/// [`Error::NotSupported`] and [`Error::Config`] signal programming errors instead.
	pub fn is_authentication_failure(&self) -> bool {
		matches!(
			self,
			Self::ProtocolViolation(_) | Self::IntrospectionFailure(_) | Self::TokenExpired { .. }
		)
	}
}

/// Configuration and validation failures raised at construction time.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A required endpoint was left blank.
	#[error("The {endpoint} endpoint must not be blank.")]
	BlankEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
	},
	/// An endpoint could not be parsed as an absolute URL.
	#[error("The {endpoint} endpoint is not a valid URL.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Token parameter names may only contain alphanumerics, dash, and underscore.
	#[error("Parameter name should contain only alphanumeric chars, dash and underscore: {name:?}.")]
	InvalidParameterName {
		/// Rejected parameter name.
		name: String,
	},
	/// Client credentials for a secured introspection endpoint are incomplete.
	#[error("A {field} must be supplied for the secured introspection endpoint.")]
	MissingCredential {
		/// Missing field label.
		field: &'static str,
	},
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Violations of the introspection response contract.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
	/// The response did not carry a client identifier.
	#[error("Authorization server did not return a client id.")]
	MissingClientId,
	/// An identifier in the response failed validation.
	#[error("Authorization server returned an invalid identifier.")]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// The response body could not be parsed.
	#[error("Introspection endpoint returned malformed JSON.")]
	MalformedBody {
		/// Structured parsing failure including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// The `Age` header is not a non-negative integer.
	#[error("Introspection response carries a malformed Age header: {value:?}.")]
	MalformedAgeHeader {
		/// Raw header value (lossy UTF-8).
		value: String,
	},
}

/// Failures while contacting the remote authorization server.
#[derive(Debug, ThisError)]
pub enum IntrospectionError {
	/// The authorization server rejected the request with an OAuth error.
	#[error("Introspection endpoint rejected the token ({status}): {error}.")]
	Rejected {
		/// HTTP status code returned by the endpoint.
		status: u16,
		/// OAuth `error` code, or a status-derived label when the body carried none.
		error: String,
		/// OAuth `error_description`, when supplied.
		description: Option<String>,
	},
	/// The endpoint answered with a non-success status and no error decoration applied.
	#[error("Introspection endpoint returned unexpected status {status}.")]
	UnexpectedStatus {
		/// HTTP status code returned by the endpoint.
		status: u16,
		/// Preview of the response body.
		body_preview: Option<String>,
	},
	/// HTTP request construction failed.
	#[error("Introspection request could not be constructed.")]
	Request(#[from] oauth2::http::Error),
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the introspection endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the introspection endpoint.")]
	Io(#[from] std::io::Error),
	/// Transport failed without a structured error.
	#[error("HTTP client error occurred while calling the introspection endpoint: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
	},
}
impl IntrospectionError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for IntrospectionError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn taxonomy_separates_rejections_from_programming_errors() {
		let expired = Error::TokenExpired { age: 60, expires_in: 60 };
		let missing: Error = ProtocolError::MissingClientId.into();
		let unsupported = Error::NotSupported { operation: "read access token" };
		let config: Error = ConfigError::BlankEndpoint { endpoint: "introspection" }.into();

		assert!(expired.is_authentication_failure());
		assert!(missing.is_authentication_failure());
		assert!(!unsupported.is_authentication_failure());
		assert!(!config.is_authentication_failure());
		assert_eq!(missing.to_string(), "Authorization server did not return a client id.");
		assert_eq!(unsupported.to_string(), "Not supported: read access token.");
	}

	#[test]
	fn rejected_message_names_oauth_error() {
		let rejected = IntrospectionError::Rejected {
			status: 400,
			error: "invalid_token".into(),
			description: Some("Token was not recognised".into()),
		};

		assert_eq!(
			rejected.to_string(),
			"Introspection endpoint rejected the token (400): invalid_token."
		);
	}
}
