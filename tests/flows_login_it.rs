mod common;

// std
use std::{collections::HashMap, sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::{Duration, OffsetDateTime};
// self
use common::*;
use sf_oauth::{
	auth::{EnvironmentId, PendingAuthState, SessionId},
	error::Error,
	flows::ReqwestAuthFlow,
	http::ReqwestHttpClient,
	provider::ProviderErrorKind,
	store::{MemoryStore, SessionStore},
};

#[tokio::test]
async fn redirect_targets_the_chosen_environment() {
	let fx = fixture().await;
	let cases = [
		(Some("sfoa"), &fx.sfoa, SFOA_CLIENT_ID),
		(Some("salesforce"), &fx.salesforce, SF_CLIENT_ID),
		(None, &fx.salesforce, SF_CLIENT_ID),
	];

	for (requested, server, client_id) in cases {
		let sid = SessionId::generate();
		let url = fx.flow.begin_login(requested, &sid).await.expect("Login should start.");
		let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();
		let expected = url::Url::parse(&server.base_url()).expect("Base URL should parse.");

		assert_eq!(url.port(), expected.port(), "{requested:?} should target its own provider.");
		assert_eq!(url.path(), "/services/oauth2/authorize");
		assert_eq!(pairs.get("client_id").map(String::as_str), Some(client_id));
		assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(pairs.get("redirect_uri").map(String::as_str), Some(CALLBACK_URL));
		assert_eq!(pairs.get("state").map(String::len), Some(32));

		let pending = fx
			.flow
			.sessions
			.pending(&sid)
			.await
			.expect("Pending read should succeed.")
			.expect("Pending login should be stored before redirecting.");

		assert_eq!(pending.state, pairs["state"]);
	}
}

#[tokio::test]
async fn unknown_environment_fails_without_writing() {
	let fx = fixture().await;
	let err = fx
		.flow
		.begin_login(Some("sandbox"), &session_id("s1"))
		.await
		.expect_err("Unknown environment should fail.");

	assert!(matches!(err, Error::UnknownEnvironment { ref id } if id == "sandbox"));
	assert_eq!(fx.store.live_len(), 0);
}

#[tokio::test]
async fn store_failure_aborts_login_start() {
	let flow = ReqwestAuthFlow::new(
		offline_registry(),
		sessions(Arc::new(FailingStore)),
		ReqwestHttpClient::new().expect("HTTP client should build."),
	);
	let err = flow
		.begin_login(Some("sfoa"), &session_id("s1"))
		.await
		.expect_err("Store failure should abort the login.");

	assert!(matches!(err, Error::Storage(_)));
}

#[tokio::test]
async fn sfoa_login_completes_against_sfoa_only() {
	let fx = fixture().await;
	let sid = session_id("sess1");
	let url = fx.flow.begin_login(Some("sfoa"), &sid).await.expect("Login should start.");
	let state = state_of(&url);
	let sfoa_token = fx
		.sfoa
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("content-type", "application/x-www-form-urlencoded")
				.body_includes("grant_type=authorization_code")
				.body_includes("code=good-code")
				.body_includes("client_id=sfoa-client")
				.body_includes("client_secret=sfoa-client-secret");
			then.status(200).json_body(json!({
				"access_token": "t1",
				"refresh_token": "r1",
				"instance_url": "https://x.my.sfcrmproducts.cn"
			}));
		})
		.await;
	let salesforce_token = fx
		.salesforce
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(500);
		})
		.await;
	let principal = fx
		.flow
		.complete_login(&sid, "good-code", &state)
		.await
		.expect("Callback should complete.");

	sfoa_token.assert_calls_async(1).await;
	salesforce_token.assert_calls_async(0).await;

	assert_eq!(principal.access_token.expose(), "t1");
	assert_eq!(principal.refresh_token.as_ref().map(|token| token.expose()), Some("r1"));
	assert_eq!(principal.instance_url.as_str(), "https://x.my.sfcrmproducts.cn/");
	assert_eq!(principal.environment_id.as_ref(), "sfoa");

	let new_sid = fx
		.flow
		.establish_session(&sid, &principal)
		.await
		.expect("Session should be established.");

	assert_ne!(new_sid, sid);
	assert_eq!(
		fx.flow.current_principal(&new_sid).await.expect("Principal should decode."),
		Some(principal)
	);
	assert_eq!(fx.flow.current_principal(&sid).await.expect("Read should succeed."), None);
	assert_eq!(fx.flow.sessions.pending(&sid).await.expect("Read should succeed."), None);
}

#[tokio::test]
async fn callback_without_login_start_is_missing_pending_state() {
	let fx = fixture().await;
	let token = fx
		.salesforce
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).json_body(token_body(Some("https://x.my.salesforce.com")));
		})
		.await;
	let err = fx
		.flow
		.complete_login(&session_id("fresh"), "abc", "xyz")
		.await
		.expect_err("Callback without a pending login should fail.");

	assert!(matches!(err, Error::MissingPendingState));
	token.assert_calls_async(0).await;
	assert_eq!(fx.store.live_len(), 0);
}

#[tokio::test]
async fn forged_state_is_rejected_before_any_exchange() {
	let fx = fixture().await;
	let sid = session_id("sess1");

	fx.flow.begin_login(Some("sfoa"), &sid).await.expect("Login should start.");

	let token = fx
		.sfoa
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).json_body(token_body(Some("https://x.my.sfcrmproducts.cn")));
		})
		.await;
	let err = fx
		.flow
		.complete_login(&sid, "abc", "never-issued")
		.await
		.expect_err("Forged state should fail.");

	assert!(matches!(err, Error::StateMismatch));
	token.assert_calls_async(0).await;
	assert_eq!(fx.flow.current_principal(&sid).await.expect("Read should succeed."), None);
}

#[tokio::test]
async fn missing_instance_url_leaves_the_session_anonymous() {
	let fx = fixture().await;
	let sid = session_id("sess1");
	let url = fx.flow.begin_login(None, &sid).await.expect("Login should start.");
	let token = fx
		.salesforce
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).json_body(token_body(None));
		})
		.await;
	let err = fx
		.flow
		.complete_login(&sid, "abc", &state_of(&url))
		.await
		.expect_err("Token response without instance_url should fail.");

	token.assert_async().await;
	assert!(matches!(err, Error::MissingInstanceUrl));

	fx.flow.abandon_login(&sid).await.expect("Abandon should succeed.");

	assert_eq!(fx.flow.current_principal(&sid).await.expect("Read should succeed."), None);
	assert_eq!(fx.store.live_len(), 0);
}

#[tokio::test]
async fn token_errors_are_classified() {
	let fx = fixture().await;
	let sid = session_id("sess1");
	let url = fx.flow.begin_login(Some("sfoa"), &sid).await.expect("Login should start.");
	let token = fx
		.sfoa
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"expired authorization code\"}");
		})
		.await;
	let err = fx
		.flow
		.complete_login(&sid, "stale", &state_of(&url))
		.await
		.expect_err("Rejected code should fail.");

	token.assert_async().await;

	match err {
		Error::TokenExchangeFailed { kind, status, body } => {
			assert_eq!(kind, ProviderErrorKind::InvalidGrant);
			assert_eq!(status, Some(400));
			assert!(body.contains("expired authorization code"));
		},
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn malformed_token_response_is_an_exchange_failure() {
	let fx = fixture().await;
	let sid = session_id("sess1");
	let url = fx.flow.begin_login(None, &sid).await.expect("Login should start.");

	fx.salesforce
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).body("<html>maintenance</html>");
		})
		.await;

	let err = fx
		.flow
		.complete_login(&sid, "abc", &state_of(&url))
		.await
		.expect_err("Unparsable body should fail.");

	assert!(matches!(err, Error::TokenExchangeFailed { status: Some(200), .. }));
}

#[tokio::test]
async fn token_timeout_is_a_transient_exchange_failure() {
	let fx = fixture_with_timeout(StdDuration::from_millis(200)).await;
	let sid = session_id("sess1");
	let url = fx.flow.begin_login(None, &sid).await.expect("Login should start.");

	fx.salesforce
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.json_body(token_body(Some("https://x.my.salesforce.com")))
				.delay(StdDuration::from_secs(2));
		})
		.await;

	let err = fx
		.flow
		.complete_login(&sid, "abc", &state_of(&url))
		.await
		.expect_err("Timed out exchange should fail.");

	assert!(matches!(
		err,
		Error::TokenExchangeFailed { kind: ProviderErrorKind::Transient, status: None, .. }
	));
}

#[tokio::test]
async fn unreachable_provider_is_a_transient_exchange_failure() {
	let store = MemoryStore::default();
	let flow = unreachable_flow(store.clone());
	let sid = session_id("sess1");
	let url = flow.begin_login(Some("sfoa"), &sid).await.expect("Login should start.");
	let err = flow
		.complete_login(&sid, "abc", &state_of(&url))
		.await
		.expect_err("Unreachable provider should fail.");

	assert!(matches!(
		err,
		Error::TokenExchangeFailed { kind: ProviderErrorKind::Transient, status: None, .. }
	));
	assert_eq!(err.code(), "token_exchange_failed");
}

#[tokio::test]
async fn second_login_start_overwrites_the_first() {
	let fx = fixture().await;
	let sid = session_id("sess1");
	let first = fx.flow.begin_login(Some("salesforce"), &sid).await.expect("Login should start.");
	let second = fx.flow.begin_login(Some("sfoa"), &sid).await.expect("Login should start.");
	let pending = fx
		.flow
		.sessions
		.pending(&sid)
		.await
		.expect("Read should succeed.")
		.expect("Pending login should exist.");

	assert_eq!(pending.environment_id.as_ref(), "sfoa");
	assert_eq!(pending.state, state_of(&second));
	assert!(
		fx.store.get("sf-oauth:pending:sess1").await.expect("Get should succeed.").is_some()
	);

	let err = fx
		.flow
		.complete_login(&sid, "abc", &state_of(&first))
		.await
		.expect_err("State of the overwritten attempt should no longer be accepted.");

	assert!(matches!(err, Error::StateMismatch));
}

#[tokio::test]
async fn stale_pending_login_is_treated_as_missing() {
	let fx = fixture().await;
	let sid = session_id("sess1");
	let mut pending = PendingAuthState::new(
		sid.clone(),
		EnvironmentId::new("sfoa").expect("Environment should be valid."),
		"issued-state".into(),
	);

	// Older than the pending TTL while the store entry itself is still live.
	pending.created_at = OffsetDateTime::now_utc() - Duration::minutes(10);

	fx.flow.sessions.put_pending(&pending).await.expect("Write should succeed.");

	let token = fx
		.sfoa
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).json_body(token_body(Some("https://x.my.sfcrmproducts.cn")));
		})
		.await;

	assert_eq!(fx.store.live_len(), 1);
	assert!(matches!(
		fx.flow.complete_login(&sid, "abc", "issued-state").await,
		Err(Error::MissingPendingState)
	));

	token.assert_calls_async(0).await;
}
