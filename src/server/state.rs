//! Shared state for route handlers.

// crates.io
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::{CookieSettings, RedirectSettings},
	flows::ReqwestAuthFlow,
};

/// Provider segment accepted in `/auth/{provider}` paths.
pub const PROVIDER_NAME: &str = "salesforce";

const COOKIE_KEY_CONTEXT: &[u8] = b"sf-oauth/session-cookie/v1";

/// HTTP-facing settings.
#[derive(Clone, Debug)]
pub struct ServerSettings {
	/// Provider segment accepted in auth paths.
	pub provider: String,
	/// Session cookie attributes.
	pub cookie: CookieSettings,
	/// Redirect targets.
	pub redirects: RedirectSettings,
}

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
	/// Flow controller.
	pub flow: Arc<ReqwestAuthFlow>,
	/// HTTP-facing settings.
	pub settings: Arc<ServerSettings>,
	cookie_key: Key,
}
impl AppState {
	/// Builds the state; the cookie signing key is derived from `session_secret`.
	pub fn new(
		flow: ReqwestAuthFlow,
		cookie: CookieSettings,
		redirects: RedirectSettings,
		session_secret: &TokenSecret,
	) -> Self {
		let digest = Sha512::new()
			.chain_update(COOKIE_KEY_CONTEXT)
			.chain_update(session_secret.expose().as_bytes())
			.finalize();

		Self {
			flow: Arc::new(flow),
			settings: Arc::new(ServerSettings {
				provider: PROVIDER_NAME.into(),
				cookie,
				redirects,
			}),
			cookie_key: Key::from(digest.as_slice()),
		}
	}
}
impl Debug for AppState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppState")
			.field("flow", &self.flow)
			.field("settings", &self.settings)
			.finish_non_exhaustive()
	}
}

// SignedCookieJar extracts the key from state.
impl FromRef<AppState> for Key {
	fn from_ref(state: &AppState) -> Self {
		state.cookie_key.clone()
	}
}
