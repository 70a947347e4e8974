//! Session teardown and best-effort provider-side revocation.
//!
//! Local state is always cleared first. Provider calls (token revocation, then the SSO logout
//! page) never fail the logout: their errors and timeouts are logged at `warn` and reported in
//! [`LogoutReport`].

// self
use crate::{
	_prelude::*,
	auth::{Principal, SessionId},
	flows::AuthFlow,
	http::ProviderHttpClient,
	oauth::{TransportErrorMapper, oauth2::http::StatusCode},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Result of one best-effort provider call made during logout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderCallOutcome {
	/// Provider answered with a success status.
	Completed {
		/// HTTP status code.
		status: u16,
	},
	/// Provider answered with a non-success status.
	Rejected {
		/// HTTP status code.
		status: u16,
	},
	/// Call failed before a response arrived (timeout, network, invalid request).
	Failed {
		/// Failure summary.
		reason: String,
	},
	/// Call was not attempted.
	Skipped,
}
impl ProviderCallOutcome {
	fn from_result(endpoint: &'static str, result: Result<StatusCode>) -> Self {
		match result {
			Ok(status) if status.is_success() => Self::Completed { status: status.as_u16() },
			// The logout page answers with redirects on success.
			Ok(status) if status.is_redirection() && endpoint == "logout" =>
				Self::Completed { status: status.as_u16() },
			Ok(status) => {
				tracing::warn!(
					endpoint,
					status = status.as_u16(),
					"Provider rejected logout call."
				);

				Self::Rejected { status: status.as_u16() }
			},
			Err(err) => {
				tracing::warn!(endpoint, error = %err, "Provider logout call failed.");

				Self::Failed { reason: err.to_string() }
			},
		}
	}
}

/// Summary of the provider-side part of a logout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogoutReport {
	/// Token revocation outcome.
	pub revoke: ProviderCallOutcome,
	/// SSO logout page outcome.
	pub provider_logout: ProviderCallOutcome,
}
impl LogoutReport {
	/// Report for a logout without an authenticated principal.
	pub fn skipped() -> Self {
		Self { revoke: ProviderCallOutcome::Skipped, provider_logout: ProviderCallOutcome::Skipped }
	}
}

impl<C, M> AuthFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Clears every record of `session_id` and returns the principal it held.
	///
	/// A corrupt principal record counts as absent; both records are deleted even when the
	/// read fails.
	pub async fn end_session(&self, session_id: &SessionId) -> Result<Option<Principal>> {
		let principal = match self.sessions.principal(session_id).await {
			Ok(principal) => Ok(principal),
			Err(Error::CorruptSession { reason }) => {
				tracing::warn!(%session_id, %reason, "Dropping corrupt session on logout.");

				Ok(None)
			},
			Err(err) => Err(err),
		};

		self.sessions.destroy(session_id).await?;

		principal
	}

	/// Revokes the principal's access token and calls the provider logout page.
	///
	/// Both calls target the principal's own environment and are bounded by the transport
	/// timeout. This never fails.
	pub async fn revoke(&self, principal: &Principal) -> LogoutReport {
		let span = FlowSpan::new(FlowKind::Logout, "revoke");

		span.instrument(async move {
			let environment = match self.registry.resolve(&principal.environment_id) {
				Ok(environment) => environment,
				Err(err) => {
					tracing::warn!(error = %err, "Skipping provider logout.");

					return LogoutReport::skipped();
				},
			};
			let facade = self.facade();
			let revoke = ProviderCallOutcome::from_result(
				"revoke",
				facade.revoke(environment, &principal.access_token).await,
			);
			let provider_logout = ProviderCallOutcome::from_result(
				"logout",
				facade.provider_logout(environment).await,
			);

			LogoutReport { revoke, provider_logout }
		})
		.await
	}

	/// Ends the session and then performs provider-side revocation inline.
	///
	/// Routes that must answer before the provider responds call [`AuthFlow::end_session`] and
	/// run [`AuthFlow::revoke`] in the background instead.
	pub async fn logout(&self, session_id: &SessionId) -> Result<LogoutReport> {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				match self.end_session(session_id).await? {
					Some(principal) => Ok(self.revoke(&principal).await),
					None => Ok(LogoutReport::skipped()),
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::TransportError;

	#[test]
	fn outcomes_follow_status_and_errors() {
		assert_eq!(
			ProviderCallOutcome::from_result("revoke", Ok(StatusCode::OK)),
			ProviderCallOutcome::Completed { status: 200 }
		);
		assert_eq!(
			ProviderCallOutcome::from_result("revoke", Ok(StatusCode::BAD_REQUEST)),
			ProviderCallOutcome::Rejected { status: 400 }
		);
		assert_eq!(
			ProviderCallOutcome::from_result("logout", Ok(StatusCode::FOUND)),
			ProviderCallOutcome::Completed { status: 302 }
		);
		assert_eq!(
			ProviderCallOutcome::from_result("revoke", Ok(StatusCode::FOUND)),
			ProviderCallOutcome::Rejected { status: 302 }
		);
		assert!(matches!(
			ProviderCallOutcome::from_result(
				"revoke",
				Err(TransportError::Timeout { endpoint: "revoke" }.into())
			),
			ProviderCallOutcome::Failed { .. }
		));
	}
}
