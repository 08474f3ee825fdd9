//! Validated configuration for the introspection endpoint.

// self
use crate::{_prelude::*, error::ConfigError};

/// Deployment profile deciding the default name of the token parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointProfile {
	/// Check-token style endpoints expecting `access_token`.
	#[default]
	CheckToken,
	/// Token-info style endpoints expecting `token`.
	TokenInfo,
}
impl EndpointProfile {
	/// Default token parameter name for the profile.
	pub const fn default_parameter_name(self) -> &'static str {
		match self {
			Self::CheckToken => "access_token",
			Self::TokenInfo => "token",
		}
	}
}

/// HTTP method used to reach the introspection endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
	/// Token sent as a query parameter.
	Get,
	/// Token sent as a form-encoded body field.
	#[default]
	Post,
}
impl RequestMethod {
	/// Returns the method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
		}
	}
}
impl Display for RequestMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Immutable introspection endpoint configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntrospectionConfig {
	/// Introspection endpoint URL.
	pub endpoint: Url,
	/// HTTP method used for every request.
	pub method: RequestMethod,
	/// Query parameter (GET) or form field (POST) carrying the token.
	pub token_parameter_name: String,
	/// Whether non-2xx answers are decoded as OAuth error responses.
	pub decorate_errors: bool,
}
impl IntrospectionConfig {
	/// Creates a new builder for the provided deployment profile.
	pub fn builder(profile: EndpointProfile) -> IntrospectionConfigBuilder {
		IntrospectionConfigBuilder::new(profile)
	}
}

/// Builder for [`IntrospectionConfig`] values.
#[derive(Clone, Debug)]
pub struct IntrospectionConfigBuilder {
	/// Raw endpoint string; parsed and validated by [`build`](Self::build).
	pub endpoint: Option<String>,
	/// HTTP method; defaults to POST.
	pub method: RequestMethod,
	/// Token parameter name; defaults to the profile's name.
	pub token_parameter_name: String,
	/// Error decoration toggle; defaults to on.
	pub decorate_errors: bool,
}
impl IntrospectionConfigBuilder {
	/// Creates a new builder seeded with the profile defaults.
	pub fn new(profile: EndpointProfile) -> Self {
		Self {
			endpoint: None,
			method: RequestMethod::default(),
			token_parameter_name: profile.default_parameter_name().to_owned(),
			decorate_errors: true,
		}
	}

	/// Sets the introspection endpoint.
	pub fn endpoint(mut self, url: impl Into<String>) -> Self {
		self.endpoint = Some(url.into());

		self
	}

	/// Overrides the HTTP method.
	pub fn method(mut self, method: RequestMethod) -> Self {
		self.method = method;

		self
	}

	/// Overrides the token parameter name.
	pub fn token_parameter_name(mut self, name: impl Into<String>) -> Self {
		self.token_parameter_name = name.into();

		self
	}

	/// Enables or disables OAuth error decoding for non-2xx answers.
	pub fn decorate_errors(mut self, enabled: bool) -> Self {
		self.decorate_errors = enabled;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<IntrospectionConfig, ConfigError> {
		let endpoint = parse_endpoint("introspection", self.endpoint.as_deref())?;

		validate_parameter_name(&self.token_parameter_name)?;

		Ok(IntrospectionConfig {
			endpoint,
			method: self.method,
			token_parameter_name: self.token_parameter_name,
			decorate_errors: self.decorate_errors,
		})
	}
}

/// Parses a required, non-blank endpoint URL.
pub(crate) fn parse_endpoint(
	endpoint: &'static str,
	raw: Option<&str>,
) -> Result<Url, ConfigError> {
	let raw = raw.map(str::trim).filter(|value| !value.is_empty());
	let raw = raw.ok_or(ConfigError::BlankEndpoint { endpoint })?;

	Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
}

fn validate_parameter_name(name: &str) -> Result<(), ConfigError> {
	let valid = !name.is_empty()
		&& name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

	if valid { Ok(()) } else { Err(ConfigError::InvalidParameterName { name: name.to_owned() }) }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn profiles_pick_default_parameter_names() {
		let check = IntrospectionConfig::builder(EndpointProfile::CheckToken)
			.endpoint("https://auth.example.com/check-token")
			.build()
			.expect("Check-token config should build.");
		let info = IntrospectionConfig::builder(EndpointProfile::TokenInfo)
			.endpoint("https://auth.example.com/tokeninfo")
			.method(RequestMethod::Get)
			.build()
			.expect("Token-info config should build.");

		assert_eq!(check.token_parameter_name, "access_token");
		assert_eq!(check.method, RequestMethod::Post);
		assert!(check.decorate_errors);
		assert_eq!(info.token_parameter_name, "token");
		assert_eq!(info.method, RequestMethod::Get);
	}

	#[test]
	fn blank_or_invalid_endpoints_fail_fast() {
		let missing = IntrospectionConfig::builder(EndpointProfile::default())
			.build()
			.expect_err("A missing endpoint must be rejected.");
		let blank = IntrospectionConfig::builder(EndpointProfile::default())
			.endpoint("   ")
			.build()
			.expect_err("A blank endpoint must be rejected.");
		let relative = IntrospectionConfig::builder(EndpointProfile::default())
			.endpoint("/check-token")
			.build()
			.expect_err("Relative endpoints must be rejected.");

		assert!(matches!(missing, ConfigError::BlankEndpoint { endpoint: "introspection" }));
		assert!(matches!(blank, ConfigError::BlankEndpoint { .. }));
		assert!(matches!(relative, ConfigError::InvalidEndpoint { .. }));
	}

	#[test]
	fn parameter_names_are_restricted() {
		for name in ["access_token", "token", "X-Token-2"] {
			IntrospectionConfig::builder(EndpointProfile::default())
				.endpoint("https://auth.example.com/check-token")
				.token_parameter_name(name)
				.build()
				.expect("Alphanumeric, dash, and underscore names should be accepted.");
		}
		for name in ["", "access token", "token=", "tök"] {
			let err = IntrospectionConfig::builder(EndpointProfile::default())
				.endpoint("https://auth.example.com/check-token")
				.token_parameter_name(name)
				.build()
				.expect_err("Names outside [A-Za-z0-9_-] must be rejected.");

			assert!(matches!(err, ConfigError::InvalidParameterName { .. }));
		}
	}

	#[test]
	fn request_method_serializes_uppercase() {
		assert_eq!(
			serde_json::to_string(&RequestMethod::Get).expect("Method should serialize."),
			"\"GET\""
		);
		assert_eq!(RequestMethod::Post.to_string(), "POST");
	}
}
