//! Typed access to server-side session records.
//!
//! [`Sessions`] owns the key layout (`{prefix}pending:{sid}`, `{prefix}principal:{sid}`), the
//! TTLs, and the codecs; stores only ever see opaque strings.

pub mod codec;

pub use codec::PrincipalCodec;

// self
use crate::{
	_prelude::*,
	auth::{PendingAuthState, Principal, SessionId},
	store::{SessionStore, StoreError},
};

/// Default key prefix shared with other deployments of the service.
pub const DEFAULT_KEY_PREFIX: &str = "sf-oauth:";

/// Key layout and lifetimes for session records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSettings {
	/// Prefix prepended to every store key.
	pub key_prefix: String,
	/// Lifetime of an authenticated session.
	pub session_ttl: Duration,
	/// Lifetime of an in-flight login attempt.
	pub pending_ttl: Duration,
}
impl Default for SessionSettings {
	fn default() -> Self {
		Self {
			key_prefix: DEFAULT_KEY_PREFIX.into(),
			session_ttl: Duration::hours(24),
			pending_ttl: Duration::minutes(5),
		}
	}
}

/// Session record access over an arbitrary [`SessionStore`].
#[derive(Clone)]
pub struct Sessions {
	store: Arc<dyn SessionStore>,
	codec: PrincipalCodec,
	settings: SessionSettings,
}
impl Sessions {
	/// Wraps `store` with the given codec and settings.
	pub fn new(
		store: Arc<dyn SessionStore>,
		codec: PrincipalCodec,
		settings: SessionSettings,
	) -> Self {
		Self { store, codec, settings }
	}

	/// Persists `pending`, replacing any earlier attempt on the same session.
	pub async fn put_pending(&self, pending: &PendingAuthState) -> Result<()> {
		let value = serde_json::to_string(pending)
			.map_err(|err| StoreError::Serialization { message: err.to_string() })?;

		self.store
			.set(&self.pending_key(&pending.session_id), value, self.settings.pending_ttl)
			.await?;

		Ok(())
	}

	/// Loads the live pending attempt for `session_id`.
	///
	/// Unreadable or expired records are reported as absent.
	pub async fn pending(&self, session_id: &SessionId) -> Result<Option<PendingAuthState>> {
		let Some(raw) = self.store.get(&self.pending_key(session_id)).await? else {
			return Ok(None);
		};
		let pending = match serde_json::from_str::<PendingAuthState>(&raw) {
			Ok(pending) => pending,
			Err(err) => {
				tracing::warn!(%session_id, error = %err, "Discarding unreadable pending login.");

				return Ok(None);
			},
		};

		if pending.session_id != *session_id
			|| pending.is_expired_at(self.settings.pending_ttl, OffsetDateTime::now_utc())
		{
			return Ok(None);
		}

		Ok(Some(pending))
	}

	/// Deletes the pending attempt for `session_id`.
	pub async fn clear_pending(&self, session_id: &SessionId) -> Result<()> {
		Ok(self.store.delete(&self.pending_key(session_id)).await?)
	}

	/// Persists `principal` for `session_id` with the session TTL.
	pub async fn put_principal(&self, session_id: &SessionId, principal: &Principal) -> Result<()> {
		let value = self.codec.encode(principal)?;

		self.store.set(&self.principal_key(session_id), value, self.settings.session_ttl).await?;

		Ok(())
	}

	/// Loads the principal for `session_id`; a tampered record yields [`Error::CorruptSession`].
	pub async fn principal(&self, session_id: &SessionId) -> Result<Option<Principal>> {
		match self.store.get(&self.principal_key(session_id)).await? {
			Some(raw) => self.codec.decode(&raw).map(Some),
			None => Ok(None),
		}
	}

	/// Deletes the principal for `session_id`.
	pub async fn clear_principal(&self, session_id: &SessionId) -> Result<()> {
		Ok(self.store.delete(&self.principal_key(session_id)).await?)
	}

	/// Deletes every record of `session_id`.
	pub async fn destroy(&self, session_id: &SessionId) -> Result<()> {
		self.clear_pending(session_id).await?;
		self.clear_principal(session_id).await
	}

	fn pending_key(&self, session_id: &SessionId) -> String {
		format!("{}pending:{session_id}", self.settings.key_prefix)
	}

	fn principal_key(&self, session_id: &SessionId) -> String {
		format!("{}principal:{session_id}", self.settings.key_prefix)
	}
}
impl Debug for Sessions {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Sessions").field("settings", &self.settings).finish_non_exhaustive()
	}
}
