//! Login start, callback completion, and session establishment.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::{PendingAuthState, Principal, SessionId},
	flows::AuthFlow,
	http::ProviderHttpClient,
	oauth::{self, TokenGrant, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

const STATE_LEN: usize = 32;

impl<C, M> AuthFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Starts a login against `requested_env` (or the default environment) for `session_id`.
	///
	/// The pending record is written and the write awaited before the authorize URL is built, so
	/// a store failure never yields a redirect. No provider call is made.
	pub async fn begin_login(
		&self,
		requested_env: Option<&str>,
		session_id: &SessionId,
	) -> Result<Url> {
		const KIND: FlowKind = FlowKind::BeginLogin;

		let span = FlowSpan::new(KIND, "begin_login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let environment = self.registry.resolve_or_default(requested_env)?;
				let state = random_state();
				let pending =
					PendingAuthState::new(session_id.clone(), environment.id.clone(), state);

				self.sessions.put_pending(&pending).await?;

				tracing::info!(
					%session_id,
					environment = %environment.id,
					"Redirecting to the provider's authorize endpoint."
				);

				Ok(oauth::authorize_url(environment, &pending.state))
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Completes the callback for `session_id`, exchanging `code` against the environment bound
	/// at login start.
	///
	/// The returned principal is not persisted; use [`AuthFlow::establish_session`] on success and
	/// [`AuthFlow::abandon_login`] on failure.
	pub async fn complete_login(
		&self,
		session_id: &SessionId,
		code: &str,
		returned_state: &str,
	) -> Result<Principal> {
		const KIND: FlowKind = FlowKind::CompleteLogin;

		let span = FlowSpan::new(KIND, "complete_login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<Principal> = span
			.instrument(async move {
				let pending =
					self.sessions.pending(session_id).await?.ok_or(Error::MissingPendingState)?;

				pending.validate_state(returned_state)?;

				let environment = self.registry.resolve(&pending.environment_id)?;
				let grant = self.facade().exchange_code(environment, code).await?;
				let instance_url = instance_url(&grant)?;

				tracing::info!(
					%session_id,
					environment = %environment.id,
					instance = %instance_url,
					"Authorization code exchanged."
				);

				Ok(Principal {
					access_token: grant.access_token,
					refresh_token: grant.refresh_token,
					instance_url,
					environment_id: pending.environment_id,
				})
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(err) => {
				tracing::warn!(%session_id, code = err.code(), error = %err, "Login failed.");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	/// Stores `principal` under a fresh session id and drops every record of the old one.
	///
	/// Returns the new session id, which the caller must hand back to the browser.
	pub async fn establish_session(
		&self,
		pending_session_id: &SessionId,
		principal: &Principal,
	) -> Result<SessionId> {
		let session_id = SessionId::generate();

		self.sessions.put_principal(&session_id, principal).await?;
		self.sessions.destroy(pending_session_id).await?;

		tracing::debug!(
			environment = %principal.environment_id,
			"Session rotated after login."
		);

		Ok(session_id)
	}

	/// Drops the pending login for `session_id`.
	pub async fn abandon_login(&self, session_id: &SessionId) -> Result<()> {
		self.sessions.clear_pending(session_id).await
	}
}

fn instance_url(grant: &TokenGrant) -> Result<Url> {
	let raw = grant
		.instance_url
		.as_deref()
		.map(str::trim)
		.filter(|raw| !raw.is_empty())
		.ok_or(Error::MissingInstanceUrl)?;

	Url::parse(raw).map_err(|err| {
		tracing::warn!(error = %err, "Token response carries an unparsable instance_url.");

		Error::MissingInstanceUrl
	})
}

fn random_state() -> String {
	rand::rng().sample_iter(Alphanumeric).take(STATE_LEN).map(char::from).collect()
}
