//! Login flow orchestration over the environment registry, session records, and provider
//! calls.
//!
//! [`AuthFlow`] drives the per-session state machine
//! `Anonymous → PendingAuth(env) → Authenticated(principal) → Anonymous`. The environment chosen
//! at login start is persisted with the pending record and is the only input used to pick the
//! provider at the callback.

pub mod login;
pub mod logout;
pub mod user_info;

pub use logout::*;
pub use user_info::*;

// self
use crate::{
	_prelude::*,
	http::{ProviderHttpClient, ReqwestHttpClient},
	oauth::{ProviderFacade, ReqwestTransportErrorMapper, TransportErrorMapper},
	provider::{EnvironmentRegistry, ProviderStrategy, SalesforceStrategy},
	session::Sessions,
};

/// Flow controller specialized for the crate's default reqwest transport stack.
pub type ReqwestAuthFlow = AuthFlow<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Coordinates login, logout, and profile lookups across every registered environment.
///
/// The controller never mutates shared configuration per request; each provider call receives
/// the resolved environment explicitly.
pub struct AuthFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Environments known to the service.
	pub registry: Arc<EnvironmentRegistry>,
	/// Typed session record access.
	pub sessions: Sessions,
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Classifier for token-endpoint failures.
	pub strategy: Arc<dyn ProviderStrategy>,
}
impl<C, M> AuthFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a controller that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		registry: impl Into<Arc<EnvironmentRegistry>>,
		sessions: Sessions,
		strategy: Arc<dyn ProviderStrategy>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			registry: registry.into(),
			sessions,
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			strategy,
		}
	}

	pub(crate) fn facade(&self) -> ProviderFacade<C, M> {
		ProviderFacade::new(
			self.http_client.clone(),
			self.transport_mapper.clone(),
			self.strategy.clone(),
		)
	}
}
impl AuthFlow<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a controller with its own reqwest transport and the Salesforce strategy.
	pub fn new(
		registry: impl Into<Arc<EnvironmentRegistry>>,
		sessions: Sessions,
		http_client: ReqwestHttpClient,
	) -> Self {
		Self::with_http_client(
			registry,
			sessions,
			Arc::new(SalesforceStrategy),
			http_client,
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> Clone for AuthFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			registry: self.registry.clone(),
			sessions: self.sessions.clone(),
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			strategy: self.strategy.clone(),
		}
	}
}
impl<C, M> Debug for AuthFlow<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthFlow")
			.field("environments", &self.registry.len())
			.field("default_environment", self.registry.default_id())
			.field("sessions", &self.sessions)
			.finish()
	}
}
