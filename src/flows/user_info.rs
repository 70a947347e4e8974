//! Principal lookups: current principal, provider profile, and session status.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{EnvironmentId, Principal, SessionId},
	flows::AuthFlow,
	http::ProviderHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Field added to the userinfo payload so the browser can call org APIs directly.
pub const ACCESS_TOKEN_FIELD: &str = "accessToken";

/// Token-free view of a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
	/// True when the session holds a principal.
	pub is_authenticated: bool,
	/// Environment of the principal, when authenticated.
	pub environment: Option<EnvironmentId>,
	/// Instance URL of the principal, when authenticated.
	pub instance_url: Option<String>,
	/// Environment of an in-flight login, when one exists.
	pub pending_environment: Option<EnvironmentId>,
}

impl<C, M> AuthFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Loads the principal of `session_id`; [`Error::CorruptSession`] propagates.
	pub async fn current_principal(&self, session_id: &SessionId) -> Result<Option<Principal>> {
		self.sessions.principal(session_id).await
	}

	/// Fetches the provider profile for `principal` from its own environment.
	///
	/// The JSON object is returned with the access token merged in under `accessToken`.
	pub async fn user_info(&self, principal: &Principal) -> Result<Value> {
		const KIND: FlowKind = FlowKind::UserInfo;

		let span = FlowSpan::new(KIND, "user_info");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let environment = self.registry.resolve(&principal.environment_id)?;
				let profile =
					self.facade().user_info(environment, &principal.access_token).await?;
				let Value::Object(mut profile) = profile else {
					return Err(Error::UserInfoFailed {
						status: 200,
						body: "Userinfo response is not a JSON object".into(),
					});
				};

				profile.insert(
					ACCESS_TOKEN_FIELD.into(),
					Value::String(principal.access_token.expose().to_owned()),
				);

				Ok(Value::Object(profile))
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(err) => {
				tracing::warn!(
					environment = %principal.environment_id,
					error = %err,
					"Userinfo lookup failed."
				);
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	/// Summarizes `session_id` without exposing tokens.
	pub async fn session_status(&self, session_id: &SessionId) -> Result<SessionStatus> {
		let principal = match self.sessions.principal(session_id).await {
			Ok(principal) => principal,
			Err(Error::CorruptSession { reason }) => {
				tracing::warn!(%session_id, %reason, "Reporting corrupt session as anonymous.");

				None
			},
			Err(err) => return Err(err),
		};
		let pending = self.sessions.pending(session_id).await?;

		Ok(SessionStatus {
			is_authenticated: principal.is_some(),
			environment: principal.as_ref().map(|p| p.environment_id.clone()),
			instance_url: principal.as_ref().map(|p| p.instance_url.to_string()),
			pending_environment: pending.map(|p| p.environment_id),
		})
	}
}
