//! `/auth` route handlers.
//!
//! Every flow failure ends here as a redirect or a JSON body; handlers never panic.

// crates.io
use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::{StatusCode, header::LOCATION},
	response::{IntoResponse, Response},
	routing::get,
};
use axum_extra::extract::SignedCookieJar;
use serde_json::json;
use url::form_urlencoded::byte_serialize;
// self
use crate::{
	_prelude::*,
	auth::SessionId,
	flows::SessionStatus,
	server::{cookies, state::AppState},
};

const LOGIN_FAILED: &str = "auth_failed";
const MISSING_CODE: &str = "missing_code";

/// Builds the `/auth` router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/auth/environments", get(environments))
		.route("/auth/logout", get(logout))
		.route("/auth/user-info", get(user_info))
		.route("/auth/session-status", get(session_status))
		.route("/auth/{provider}", get(login))
		.route("/auth/{provider}/callback", get(callback))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
struct LoginParams {
	env: Option<String>,
}

async fn login(
	State(state): State<AppState>,
	Path(provider): Path<String>,
	Query(params): Query<LoginParams>,
	jar: SignedCookieJar,
) -> Response {
	if provider != state.settings.provider {
		return StatusCode::NOT_FOUND.into_response();
	}

	let session_id = cookies::session_id(&jar).unwrap_or_else(SessionId::generate);

	// An empty `env` selects the default environment.
	let requested_env = params.env.as_deref().filter(|env| !env.is_empty());

	match state.flow.begin_login(requested_env, &session_id).await {
		Ok(url) => {
			let jar = jar.add(cookies::session_cookie(&session_id, &state.settings.cookie));

			(jar, found(url.as_str())).into_response()
		},
		Err(err) => {
			tracing::warn!(
				env = ?params.env,
				code = err.code(),
				error = %err,
				"Login start failed."
			);

			found(&error_location(&state, LOGIN_FAILED))
		},
	}
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
	code: Option<String>,
	state: Option<String>,
	error: Option<String>,
	error_description: Option<String>,
}

async fn callback(
	State(state): State<AppState>,
	Path(provider): Path<String>,
	Query(params): Query<CallbackParams>,
	jar: SignedCookieJar,
) -> Response {
	if provider != state.settings.provider {
		return StatusCode::NOT_FOUND.into_response();
	}

	let Some(session_id) = cookies::session_id(&jar) else {
		tracing::warn!("Callback arrived without a session cookie.");

		return found(&error_location(&state, Error::MissingPendingState.code()));
	};

	if let Some(provider_error) = params.error.as_deref() {
		tracing::warn!(
			%session_id,
			error = provider_error,
			description = params.error_description.as_deref().unwrap_or_default(),
			"Provider returned an authorization error."
		);
		abandon(&state, &session_id).await;

		return found(&error_location(&state, provider_error));
	}

	let Some(code) = params.code.as_deref().filter(|code| !code.is_empty()) else {
		abandon(&state, &session_id).await;

		return found(&error_location(&state, MISSING_CODE));
	};
	let returned_state = params.state.as_deref().unwrap_or_default();
	let flow = &state.flow;
	let result = match flow.complete_login(&session_id, code, returned_state).await {
		Ok(principal) => flow.establish_session(&session_id, &principal).await,
		Err(err) => Err(err),
	};

	match result {
		Ok(new_session_id) => {
			let jar = jar.add(cookies::session_cookie(&new_session_id, &state.settings.cookie));

			(jar, found(&state.settings.redirects.dashboard)).into_response()
		},
		Err(err) => {
			abandon(&state, &session_id).await;

			found(&error_location(&state, err.code()))
		},
	}
}

async fn logout(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
	if let Some(session_id) = cookies::session_id(&jar) {
		match state.flow.end_session(&session_id).await {
			Ok(Some(principal)) => {
				let flow = state.flow.clone();

				tokio::spawn(async move {
					let report = flow.revoke(&principal).await;

					tracing::debug!(?report, "Provider logout finished.");
				});
			},
			Ok(None) => {},
			Err(err) => tracing::warn!(%session_id, error = %err, "Session teardown failed."),
		}
	}

	let jar = jar.remove(cookies::clear_session_cookie());

	(jar, found(&state.settings.redirects.error)).into_response()
}

async fn user_info(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
	let Some(session_id) = cookies::session_id(&jar) else {
		return not_authenticated();
	};
	let principal = match state.flow.current_principal(&session_id).await {
		Ok(Some(principal)) => principal,
		Ok(None) => return not_authenticated(),
		Err(Error::CorruptSession { reason }) => {
			tracing::warn!(%session_id, %reason, "Forcing logout of a corrupt session.");

			if let Err(err) = state.flow.end_session(&session_id).await {
				tracing::warn!(%session_id, error = %err, "Session teardown failed.");
			}

			return (jar.remove(cookies::clear_session_cookie()), not_authenticated())
				.into_response();
		},
		Err(err) => return user_info_failed(&err),
	};

	match state.flow.user_info(&principal).await {
		Ok(profile) => Json(profile).into_response(),
		Err(err) => user_info_failed(&err),
	}
}

async fn session_status(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
	let Some(session_id) = cookies::session_id(&jar) else {
		return Json(SessionStatus::default()).into_response();
	};

	match state.flow.session_status(&session_id).await {
		Ok(status) => Json(status).into_response(),
		Err(err) => (
			StatusCode::INTERNAL_SERVER_ERROR,
			Json(json!({ "error": "Failed to read session", "details": err.to_string() })),
		)
			.into_response(),
	}
}

#[derive(Debug, Serialize)]
struct EnvironmentSummary {
	id: String,
	name: String,
	default: bool,
}

async fn environments(State(state): State<AppState>) -> Json<Vec<EnvironmentSummary>> {
	let registry = &state.flow.registry;

	Json(
		registry
			.iter()
			.map(|env| EnvironmentSummary {
				id: env.id.to_string(),
				name: env.display_name.clone(),
				default: &env.id == registry.default_id(),
			})
			.collect(),
	)
}

async fn abandon(state: &AppState, session_id: &SessionId) {
	if let Err(err) = state.flow.abandon_login(session_id).await {
		tracing::warn!(%session_id, error = %err, "Failed to clear pending login.");
	}
}

fn found(location: &str) -> Response {
	(StatusCode::FOUND, [(LOCATION, location.to_owned())]).into_response()
}

fn error_location(state: &AppState, code: &str) -> String {
	let base = &state.settings.redirects.error;
	let separator = if base.contains('?') { '&' } else { '?' };
	let code: String = byte_serialize(code.as_bytes()).collect();

	format!("{base}{separator}error={code}")
}

fn not_authenticated() -> Response {
	(StatusCode::UNAUTHORIZED, Json(json!({ "error": "Not authenticated" }))).into_response()
}

fn user_info_failed(err: &Error) -> Response {
	(
		StatusCode::INTERNAL_SERVER_ERROR,
		Json(json!({ "error": "Failed to fetch user information", "details": err.to_string() })),
	)
		.into_response()
}
