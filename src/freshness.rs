//! Freshness policy for introspection responses that may have been served from a cache.
//!
//! A shared cache sitting between this crate and the authorization server reports the age
//! of a stored answer through the `Age` response header. When the header is present, the
//! answer is only trusted while its age stays below the `expires_in` lifetime it carries;
//! an answer exactly as old as its lifetime is already expired. A response without the
//! header came straight from the origin and is trusted as-is.

// crates.io
use oauth2::http::{HeaderMap, header::AGE};
// self
use crate::{_prelude::*, error::ProtocolError};

/// Reads the first `Age` header, in whole seconds.
///
/// Returns `Ok(None)` when the header is absent.
pub fn response_age(headers: &HeaderMap) -> Result<Option<u64>> {
	let Some(value) = headers.get(AGE) else {
		return Ok(None);
	};

	value
		.to_str()
		.ok()
		.and_then(|raw| raw.trim().parse::<u64>().ok())
		.map(Some)
		.ok_or_else(|| {
			ProtocolError::MalformedAgeHeader {
				value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
			}
			.into()
		})
}

/// Returns `true` when a response `age` seconds old no longer vouches for a token living
/// `expires_in` seconds.
pub fn is_stale(age: u64, expires_in: i64) -> bool {
	i64::try_from(age).map_or(true, |age| age >= expires_in)
}

/// Fails with [`Error::TokenExpired`] when a cached answer outlived the token it describes.
///
/// No age means the response is fresh; no `expires_in` leaves nothing to compare against.
pub fn check(age: Option<u64>, expires_in: Option<i64>) -> Result<()> {
	match (age, expires_in) {
		(Some(age), Some(expires_in)) if is_stale(age, expires_in) =>
			Err(Error::TokenExpired { age, expires_in }),
		_ => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::HeaderValue;
	// self
	use super::*;

	#[test]
	fn boundary_age_is_expired() {
		assert!(matches!(
			check(Some(60), Some(60)),
			Err(Error::TokenExpired { age: 60, expires_in: 60 })
		));
		assert!(check(Some(59), Some(60)).is_ok());
		assert!(check(Some(61), Some(60)).is_err());
	}

	#[test]
	fn missing_age_or_lifetime_skips_check() {
		assert!(check(None, Some(0)).is_ok());
		assert!(check(None, Some(-5)).is_ok());
		assert!(check(Some(10_000), None).is_ok());
	}

	#[test]
	fn negative_lifetime_is_always_stale() {
		assert!(is_stale(0, -1));
		assert!(is_stale(u64::MAX, i64::MAX));
	}

	#[test]
	fn age_header_parsing() {
		let mut headers = HeaderMap::new();

		assert_eq!(response_age(&headers).expect("Absent header is not an error."), None);

		headers.insert(AGE, HeaderValue::from_static("42"));

		assert_eq!(response_age(&headers).expect("Numeric age should parse."), Some(42));

		headers.insert(AGE, HeaderValue::from_static("-3"));

		assert!(matches!(
			response_age(&headers),
			Err(Error::ProtocolViolation(ProtocolError::MalformedAgeHeader { .. }))
		));
	}
}
