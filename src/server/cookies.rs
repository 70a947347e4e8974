//! Session cookie construction and parsing.

// crates.io
use axum_extra::extract::{
	SignedCookieJar,
	cookie::{Cookie, SameSite},
};
// self
use crate::{auth::SessionId, cli::CookieSameSite, config::CookieSettings};

/// Name of the signed session cookie.
pub const SESSION_COOKIE: &str = "sf.sid";

/// Builds the session cookie for `session_id`.
pub(crate) fn session_cookie(session_id: &SessionId, settings: &CookieSettings) -> Cookie<'static> {
	let same_site = match settings.same_site {
		CookieSameSite::Lax => SameSite::Lax,
		CookieSameSite::None => SameSite::None,
	};

	Cookie::build((SESSION_COOKIE, session_id.to_string()))
		.http_only(true)
		// Browsers drop `SameSite=None` cookies without `Secure`.
		.secure(settings.secure || same_site == SameSite::None)
		.same_site(same_site)
		.path("/")
		.max_age(settings.max_age)
		.build()
}

/// Cookie used to remove the session cookie.
pub(crate) fn clear_session_cookie() -> Cookie<'static> {
	Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// Reads the session id from a verified cookie; unsigned or malformed values are ignored.
pub(crate) fn session_id(jar: &SignedCookieJar) -> Option<SessionId> {
	jar.get(SESSION_COOKIE).and_then(|cookie| SessionId::new(cookie.value()).ok())
}
