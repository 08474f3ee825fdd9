//! Optional observability helpers for token validation.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_introspection.op` with the `op`
//!   (operation) and `stage` (call site) fields.
//! - Enable `metrics` to increment the `oauth2_introspection_total` counter for every
//!   attempt/success/failure (and cache miss), labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Validating a caller's token against the introspection endpoint.
	LoadAuthentication,
	/// Obtaining the bearer token for a secured introspection endpoint.
	ClientCredentials,
	/// Serving an introspection answer from the response cache.
	CacheLookup,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::LoadAuthentication => "load_authentication",
			OperationKind::ClientCredentials => "client_credentials",
			OperationKind::CacheLookup => "cache_lookup",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion (or cache hit).
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Cache lookup that fell through to the origin.
	Miss,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
			OperationOutcome::Miss => "miss",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn cache_misses_have_their_own_outcome_label() {
		assert_eq!(OperationOutcome::Miss.to_string(), "miss");
		assert_ne!(OperationOutcome::Miss.as_str(), OperationOutcome::Failure.as_str());
		assert_eq!(OperationKind::CacheLookup.to_string(), "cache_lookup");
	}
}
