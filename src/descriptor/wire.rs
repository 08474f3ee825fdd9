//! Wire shape of the introspection response and its set-normalizing field parsers.

// crates.io
use serde::{Deserializer, de::Error as DeError};
// self
use crate::{_prelude::*, auth::ScopeSet, error::ProtocolError};

/// Raw introspection response; unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct TokenInfo {
	/// Client identifier; absence is rejected during conversion.
	#[serde(default)]
	pub client_id: Option<String>,
	/// Granted scopes.
	#[serde(default, deserialize_with = "scope_set")]
	pub scope: ScopeSet,
	/// Resource identifiers the token is valid for.
	#[serde(default, deserialize_with = "label_set")]
	pub audience: BTreeSet<String>,
	/// Alias of `audience` used by some providers.
	#[serde(default, deserialize_with = "label_set")]
	pub resource_ids: BTreeSet<String>,
	/// Client authority labels.
	#[serde(default, deserialize_with = "label_set")]
	pub client_authorities: BTreeSet<String>,
	/// Remaining lifetime in seconds.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Resource owner identifier.
	#[serde(default)]
	pub user_id: Option<String>,
	/// Resource owner e-mail.
	#[serde(default)]
	pub user_email: Option<String>,
	/// Resource owner authority labels.
	#[serde(default, deserialize_with = "label_set")]
	pub user_authorities: BTreeSet<String>,
}

impl TokenInfo {
	/// Parses a JSON introspection response body.
	///
	/// `status` is only used to annotate parse failures.
	pub fn from_json(status: u16, body: &[u8]) -> Result<Self, ProtocolError> {
		let mut deserializer = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ProtocolError::MalformedBody { source, status })
	}
}

/// A set-valued field as it may appear on the wire.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LabelList {
	/// Single string holding whitespace- or comma-delimited labels.
	Delimited(String),
	/// Array of labels.
	Items(Vec<String>),
}
impl LabelList {
	/// Normalizes the field into a set, dropping empty entries.
	pub fn into_labels(self) -> BTreeSet<String> {
		match self {
			Self::Delimited(raw) => split_labels(&raw),
			Self::Items(items) => items.into_iter().filter(|item| !item.is_empty()).collect(),
		}
	}
}

/// Splits a delimited label string on whitespace and commas.
pub fn split_labels(raw: &str) -> BTreeSet<String> {
	raw.split(|c: char| c == ',' || c.is_whitespace())
		.filter(|label| !label.is_empty())
		.map(str::to_owned)
		.collect()
}

fn label_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(<Option<LabelList>>::deserialize(deserializer)?
		.map(LabelList::into_labels)
		.unwrap_or_default())
}

// Array entries may themselves hold several delimited scopes.
fn scope_set<'de, D>(deserializer: D) -> Result<ScopeSet, D::Error>
where
	D: Deserializer<'de>,
{
	let scopes = label_set(deserializer)?
		.iter()
		.flat_map(|entry| split_labels(entry))
		.collect::<Vec<_>>();

	ScopeSet::new(scopes).map_err(DeError::custom)
}
