//! Authentication results derived from validated token descriptors.

// self
use crate::{
	_prelude::*,
	auth::{AuthoritySet, ClientId, DEFAULT_USER_AUTHORITY, ScopeSet, UserId},
	descriptor::TokenDescriptor,
};

/// Resource grant details attached when the authorization server vouches for the client's
/// audience or authorities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceDetails {
	/// Resource identifiers the token is valid for.
	pub resource_ids: BTreeSet<String>,
	/// Authorities granted to the client.
	pub authorities: AuthoritySet,
}

/// Client half of an [`Authentication`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientAuthentication {
	/// Client the token was issued to.
	pub client_id: ClientId,
	/// Scopes granted to the token.
	pub scope: ScopeSet,
	/// Resource details; present only when audience or client authorities were returned.
	pub resource_details: Option<ResourceDetails>,
	/// Whether the grant is pre-approved; set exactly when resource details are present.
	pub approved: bool,
}
impl ClientAuthentication {
	/// Builds the client authentication for `descriptor`.
	pub fn from_descriptor(descriptor: &TokenDescriptor) -> Self {
		let resource_details = if descriptor.audience.is_empty()
			&& descriptor.client_authorities.is_empty()
		{
			None
		} else {
			Some(ResourceDetails {
				resource_ids: descriptor.audience.clone(),
				authorities: descriptor.client_authorities(),
			})
		};

		Self {
			client_id: descriptor.client_id.clone(),
			scope: descriptor.scope.clone(),
			approved: resource_details.is_some(),
			resource_details,
		}
	}

	/// Authorities granted to the client; empty without resource details.
	pub fn authorities(&self) -> AuthoritySet {
		self.resource_details
			.as_ref()
			.map(|details| details.authorities.clone())
			.unwrap_or_default()
	}
}

/// User half of an [`Authentication`]; carries no credential material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserAuthentication {
	/// Resource owner the token is bound to.
	pub principal: UserId,
	/// Authorities granted to the resource owner; never empty.
	pub authorities: AuthoritySet,
}
impl UserAuthentication {
	/// Builds the user authentication for `descriptor`, or `None` for client-only tokens.
	///
	/// A user without authorities receives [`DEFAULT_USER_AUTHORITY`].
	pub fn from_descriptor(descriptor: &TokenDescriptor) -> Option<Self> {
		let principal = descriptor.user_id.clone()?;
		let mut authorities = descriptor.user_authorities();

		if authorities.is_empty() {
			authorities.insert(DEFAULT_USER_AUTHORITY);
		}

		Some(Self { principal, authorities })
	}
}

/// Result of validating an access token against the authorization server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authentication {
	/// Client authentication; always present.
	pub client: ClientAuthentication,
	/// User authentication; absent for client-only tokens.
	pub user: Option<UserAuthentication>,
}
impl Authentication {
	/// Composes the client and user authentication for `descriptor`.
	pub fn from_descriptor(descriptor: &TokenDescriptor) -> Self {
		Self {
			client: ClientAuthentication::from_descriptor(descriptor),
			user: UserAuthentication::from_descriptor(descriptor),
		}
	}

	/// Returns `true` when no resource owner is involved.
	pub fn is_client_only(&self) -> bool {
		self.user.is_none()
	}

	/// Client the token was issued to.
	pub fn client_id(&self) -> &ClientId {
		&self.client.client_id
	}

	/// Principal name: the user id, or the client id for client-only tokens.
	pub fn name(&self) -> &str {
		match &self.user {
			Some(user) => user.principal.as_ref(),
			None => self.client.client_id.as_ref(),
		}
	}

	/// Effective authorities: the user's when present, otherwise the client's.
	pub fn authorities(&self) -> AuthoritySet {
		match &self.user {
			Some(user) => user.authorities.clone(),
			None => self.client.authorities(),
		}
	}
}
