//! Normalized view of one introspection response.
//!
//! The authorization server answers with a JSON object whose set-valued fields may arrive
//! either as a single delimited string or as an array; [`wire`] folds both shapes into
//! ordered string sets before a [`TokenDescriptor`] is built, so nothing past this module
//! needs to know about the wire format.

pub mod wire;

// self
use crate::{
	_prelude::*,
	auth::{self, AuthoritySet, ClientId, ScopeSet, UserId},
	error::ProtocolError,
};

/// Immutable, validated token information returned by the authorization server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenDescriptor {
	/// Client the token was issued to.
	pub client_id: ClientId,
	/// Scopes granted to the token.
	pub scope: ScopeSet,
	/// Resource identifiers the token is valid for (a.k.a. resource ids).
	pub audience: BTreeSet<String>,
	/// Authority labels granted to the client.
	pub client_authorities: BTreeSet<String>,
	/// Remaining token lifetime in seconds, when reported.
	pub expires_in: Option<i64>,
	/// Resource owner the token is bound to; absent for client-only tokens.
	pub user_id: Option<UserId>,
	/// Resource owner's e-mail address; informational only.
	pub user_email: Option<String>,
	/// Authority labels granted to the resource owner.
	pub user_authorities: BTreeSet<String>,
}
impl TokenDescriptor {
	/// Creates a client-only descriptor with every optional field left empty.
	pub fn new(client_id: ClientId) -> Self {
		Self {
			client_id,
			scope: ScopeSet::default(),
			audience: BTreeSet::new(),
			client_authorities: BTreeSet::new(),
			expires_in: None,
			user_id: None,
			user_email: None,
			user_authorities: BTreeSet::new(),
		}
	}

	/// Parses a JSON introspection response body.
	///
	/// `status` is only used to annotate parse failures.
	pub fn from_json(status: u16, body: &[u8]) -> Result<Self> {
		Ok(Self::try_from(wire::TokenInfo::from_json(status, body)?)?)
	}

	/// Returns `true` when the token is not bound to a resource owner.
	pub fn is_client_only(&self) -> bool {
		self.user_id.is_none()
	}

	/// Client authority labels mapped to typed authorities.
	pub fn client_authorities(&self) -> AuthoritySet {
		auth::to_authority_set(self.client_authorities.iter().cloned())
	}

	/// User authority labels mapped to typed authorities; may be empty.
	pub fn user_authorities(&self) -> AuthoritySet {
		auth::to_authority_set(self.user_authorities.iter().cloned())
	}
}
impl TryFrom<wire::TokenInfo> for TokenDescriptor {
	type Error = ProtocolError;

	fn try_from(raw: wire::TokenInfo) -> Result<Self, Self::Error> {
		let client_id = match raw.client_id {
			Some(value) if !value.is_empty() => ClientId::new(value)?,
			_ => return Err(ProtocolError::MissingClientId),
		};
		let user_id = raw.user_id.map(UserId::new).transpose()?;
		let mut audience = raw.audience;

		audience.extend(raw.resource_ids);

		Ok(Self {
			client_id,
			scope: raw.scope,
			audience,
			client_authorities: raw.client_authorities,
			expires_in: raw.expires_in,
			user_id,
			user_email: raw.user_email,
			user_authorities: raw.user_authorities,
		})
	}
}
