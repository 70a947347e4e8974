//! Authenticated principals and the pending state that links a login start to its callback.

// self
use crate::{
	_prelude::*,
	auth::{EnvironmentId, SessionId, TokenSecret},
};

/// Authenticated user for the lifetime of a session.
///
/// Only the provider-issued tokens, the instance URL, and the originating environment are kept;
/// provider profile payloads are fetched per request and never cached here.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
	/// Provider-issued access token.
	pub access_token: TokenSecret,
	/// Provider-issued refresh token, when the connected app grants one.
	pub refresh_token: Option<TokenSecret>,
	/// Base URL for follow-up API calls against the user's org.
	pub instance_url: Url,
	/// Environment whose token endpoint produced this principal.
	pub environment_id: EnvironmentId,
}
impl Debug for Principal {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Principal")
			.field("access_token", &self.access_token)
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("instance_url", &self.instance_url.as_str())
			.field("environment_id", &self.environment_id)
			.finish()
	}
}

/// In-flight login attempt persisted between the redirect to the provider and the callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthState {
	/// Session that started the login.
	pub session_id: SessionId,
	/// Environment chosen when the login started; authoritative for the callback.
	pub environment_id: EnvironmentId,
	/// Anti-forgery token echoed back by the provider.
	pub state: String,
	/// Creation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl PendingAuthState {
	/// Creates a pending record stamped with the current instant.
	pub fn new(session_id: SessionId, environment_id: EnvironmentId, state: String) -> Self {
		Self { session_id, environment_id, state, created_at: OffsetDateTime::now_utc() }
	}

	/// Validates the `state` returned on the callback.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.state { Ok(()) } else { Err(Error::StateMismatch) }
	}

	/// Returns true once the record is older than `ttl`.
	pub fn is_expired_at(&self, ttl: Duration, now: OffsetDateTime) -> bool {
		now - self.created_at >= ttl
	}
}
