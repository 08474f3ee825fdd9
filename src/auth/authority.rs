//! Authority labels and the mapping between raw label sets and typed authorities.

// std
use std::borrow::Cow;
// self
use crate::_prelude::*;

/// Authority granted to every user-bound token whose remote answer lists none.
///
/// An empty authority set on an authenticated user is easily mistaken for an anonymous
/// caller by downstream authorization checks, so it is never left empty.
pub const DEFAULT_USER_AUTHORITY: Authority = Authority(Cow::Borrowed("ROLE_USER"));

/// Set of authorities, deduplicated and ordered by label.
pub type AuthoritySet = BTreeSet<Authority>;

/// Opaque capability label granted to a client or user.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authority(Cow<'static, str>);
impl Authority {
	/// Wraps a label as an authority.
	pub fn new(label: impl Into<String>) -> Self {
		Self(Cow::Owned(label.into()))
	}

	/// Returns the label backing this authority.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Authority {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl From<&str> for Authority {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for Authority {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
impl Debug for Authority {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Authority({})", self.0)
	}
}
impl Display for Authority {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Maps raw labels to authorities; duplicate labels collapse into one authority.
pub fn to_authority_set<I, S>(labels: I) -> AuthoritySet
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	labels.into_iter().map(Authority::new).collect()
}

/// Maps authorities back to their raw labels.
pub fn to_labels<'a, I>(authorities: I) -> BTreeSet<String>
where
	I: IntoIterator<Item = &'a Authority>,
{
	authorities.into_iter().map(|authority| authority.as_str().to_owned()).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn duplicate_labels_collapse() {
		let set = to_authority_set(["A", "A", "B"]);

		assert_eq!(set, AuthoritySet::from([Authority::from("A"), Authority::from("B")]));
		assert_eq!(to_authority_set(["B", "A"]), set);
	}

	#[test]
	fn empty_input_maps_to_empty_set() {
		assert!(to_authority_set(Vec::<String>::new()).is_empty());
	}

	#[test]
	fn labels_round_trip_through_authorities() {
		let labels = BTreeSet::from(["ROLE_ADMIN".to_owned(), "ROLE_TRUSTED".to_owned()]);
		let set = to_authority_set(labels.clone());

		assert_eq!(to_labels(&set), labels);
	}

	#[test]
	fn default_authority_equals_owned_label() {
		assert_eq!(DEFAULT_USER_AUTHORITY, Authority::new("ROLE_USER"));
		assert_eq!(DEFAULT_USER_AUTHORITY.to_string(), "ROLE_USER");
		assert_eq!(
			serde_json::to_string(&DEFAULT_USER_AUTHORITY)
				.expect("Authorities should serialize as plain strings."),
			"\"ROLE_USER\""
		);
	}
}
