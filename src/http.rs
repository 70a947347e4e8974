//! Transport primitives for provider calls (token exchange, revocation, userinfo, logout page).
//!
//! The module exposes [`ProviderHttpClient`] so tests and downstream crates can swap the HTTP
//! stack without touching the flows. Every handle speaks `oauth2`'s [`AsyncHttpClient`]
//! contract, which keeps request/response types shared with the `oauth2` crate.

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::ConfigError};

/// Upper bound applied to every provider call unless configured otherwise.
pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Abstraction over HTTP transports used to reach identity providers.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by every
/// request handler. The handles they return must own whatever state is required so their
/// request futures remain `Send` for the lifetime of the in-flight call.
pub trait ProviderHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for a single provider call.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle for one provider call.
	fn handle(&self) -> Self::Handle;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Provider endpoints answer directly, so redirects are never followed; a redirect from the
/// token endpoint surfaces as a non-success status instead of being chased to another host.
/// Every call is bounded by the client's timeout.
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Builds a client with the default ten-second timeout.
	pub fn new() -> Result<Self, ConfigError> {
		Self::with_timeout(DEFAULT_TIMEOUT)
	}

	/// Builds a client whose connect and total request time are bounded by `timeout`.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.connect_timeout(timeout)
			.redirect(Policy::none())
			.build()?;

		Ok(Self(client))
	}
}
impl ProviderHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		ReqwestHandle(self.0.clone())
	}
}

/// Handle returned by [`ReqwestHttpClient`] that satisfies [`ProviderHttpClient`].
#[derive(Clone, Debug)]
pub struct ReqwestHandle(ReqwestClient);
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Sends `request` through a fresh handle of `client`.
pub(crate) async fn send<C>(
	client: &C,
	request: HttpRequest,
) -> Result<HttpResponse, HttpClientError<C::TransportError>>
where
	C: ?Sized + ProviderHttpClient,
{
	let handle = client.handle();

	handle.call(request).await
}
