mod common;

// std
use std::time::{Duration as StdDuration, Instant};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::Duration;
// self
use common::*;
use sf_oauth::{
	auth::{EnvironmentId, Principal, TokenSecret},
	error::Error,
	flows::{LogoutReport, ProviderCallOutcome},
	store::{MemoryStore, SessionStore},
	url::Url,
};

fn principal(environment: &str) -> Principal {
	Principal {
		access_token: TokenSecret::new("t1"),
		refresh_token: Some(TokenSecret::new("r1")),
		instance_url: Url::parse("https://x.my.sfcrmproducts.cn").expect("URL should parse."),
		environment_id: EnvironmentId::new(environment).expect("Environment should be valid."),
	}
}

#[tokio::test]
async fn logout_revokes_against_the_principal_environment() {
	let fx = fixture().await;
	let sid = session_id("sess1");

	fx.flow.sessions.put_principal(&sid, &principal("sfoa")).await.expect("Write should succeed.");

	let revoke = fx
		.sfoa
		.mock_async(|when, then| {
			when.method(POST).path(REVOKE_PATH).query_param("token", "t1");
			then.status(200);
		})
		.await;
	let logout_page = fx
		.sfoa
		.mock_async(|when, then| {
			when.method(GET).path(LOGOUT_PATH);
			then.status(302).header("location", "/");
		})
		.await;
	let salesforce_revoke = fx
		.salesforce
		.mock_async(|when, then| {
			when.method(POST).path(REVOKE_PATH);
			then.status(200);
		})
		.await;
	let report = fx.flow.logout(&sid).await.expect("Logout should succeed.");

	revoke.assert_async().await;
	logout_page.assert_async().await;
	salesforce_revoke.assert_calls_async(0).await;

	assert_eq!(report.revoke, ProviderCallOutcome::Completed { status: 200 });
	assert_eq!(report.provider_logout, ProviderCallOutcome::Completed { status: 302 });
	assert_eq!(fx.flow.current_principal(&sid).await.expect("Read should succeed."), None);
	assert_eq!(fx.store.live_len(), 0);
}

#[tokio::test]
async fn revoke_timeout_still_ends_the_session() {
	let fx = fixture_with_timeout(StdDuration::from_millis(300)).await;
	let sid = session_id("sess1");

	fx.flow.sessions.put_principal(&sid, &principal("sfoa")).await.expect("Write should succeed.");
	fx.sfoa
		.mock_async(|when, then| {
			when.method(POST).path(REVOKE_PATH);
			then.status(200).delay(StdDuration::from_secs(5));
		})
		.await;
	fx.sfoa
		.mock_async(|when, then| {
			when.method(GET).path(LOGOUT_PATH);
			then.status(200);
		})
		.await;

	let started = Instant::now();
	let report = fx.flow.logout(&sid).await.expect("Logout should never fail on revoke.");

	assert!(started.elapsed() < StdDuration::from_secs(3), "Revoke must be bounded by the timeout.");
	assert!(matches!(report.revoke, ProviderCallOutcome::Failed { .. }));
	assert_eq!(report.provider_logout, ProviderCallOutcome::Completed { status: 200 });
	assert_eq!(fx.flow.current_principal(&sid).await.expect("Read should succeed."), None);
}

#[tokio::test]
async fn rejected_revocation_is_reported_not_raised() {
	let fx = fixture().await;
	let sid = session_id("sess1");

	fx.flow
		.sessions
		.put_principal(&sid, &principal("salesforce"))
		.await
		.expect("Write should succeed.");
	fx.salesforce
		.mock_async(|when, then| {
			when.method(POST).path(REVOKE_PATH);
			then.status(400).body("unsupported_token_type");
		})
		.await;
	fx.salesforce
		.mock_async(|when, then| {
			when.method(GET).path(LOGOUT_PATH);
			then.status(503);
		})
		.await;

	let report = fx.flow.logout(&sid).await.expect("Logout should succeed.");

	assert_eq!(report.revoke, ProviderCallOutcome::Rejected { status: 400 });
	assert_eq!(report.provider_logout, ProviderCallOutcome::Rejected { status: 503 });
}

#[tokio::test]
async fn unreachable_provider_does_not_block_logout() {
	let store = MemoryStore::default();
	let flow = unreachable_flow(store.clone());
	let sid = session_id("sess1");

	flow.sessions.put_principal(&sid, &principal("sfoa")).await.expect("Write should succeed.");

	let report = flow.logout(&sid).await.expect("Logout should succeed.");

	assert!(matches!(report.revoke, ProviderCallOutcome::Failed { .. }));
	assert!(matches!(report.provider_logout, ProviderCallOutcome::Failed { .. }));
	assert_eq!(store.live_len(), 0);
}

#[tokio::test]
async fn anonymous_and_corrupt_sessions_log_out_locally() {
	let fx = fixture().await;
	let sid = session_id("sess1");

	assert_eq!(fx.flow.logout(&sid).await.expect("Logout should succeed."), LogoutReport::skipped());

	fx.store
		.set("sf-oauth:principal:sess1", "tampered.record".into(), Duration::minutes(5))
		.await
		.expect("Set should succeed.");

	assert!(matches!(
		fx.flow.current_principal(&sid).await,
		Err(Error::CorruptSession { .. })
	));
	assert_eq!(fx.flow.end_session(&sid).await.expect("End should succeed."), None);
	assert_eq!(fx.store.live_len(), 0);
}

#[tokio::test]
async fn user_info_merges_the_access_token() {
	let fx = fixture().await;
	let userinfo = fx
		.sfoa
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO_PATH).header("authorization", "Bearer t1");
			then.status(200).json_body(json!({
				"sub": "https://login.sfcrmproducts.cn/id/00D/005",
				"name": "Ada",
				"email": "ada@example.com"
			}));
		})
		.await;
	let profile = fx.flow.user_info(&principal("sfoa")).await.expect("Userinfo should succeed.");

	userinfo.assert_async().await;

	assert_eq!(profile["name"], "Ada");
	assert_eq!(profile["accessToken"], "t1");
}

#[tokio::test]
async fn user_info_failures_carry_status_and_body() {
	let fx = fixture().await;

	fx.salesforce
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO_PATH);
			then.status(403).body("Bad_OAuth_Token");
		})
		.await;

	let err = fx
		.flow
		.user_info(&principal("salesforce"))
		.await
		.expect_err("Rejected userinfo should fail.");

	match err {
		Error::UserInfoFailed { status, body } => {
			assert_eq!(status, 403);
			assert_eq!(body, "Bad_OAuth_Token");
		},
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn session_status_never_exposes_tokens() {
	let fx = fixture().await;
	let sid = session_id("sess1");

	fx.flow.sessions.put_principal(&sid, &principal("sfoa")).await.expect("Write should succeed.");

	let status = fx.flow.session_status(&sid).await.expect("Status should succeed.");
	let rendered = serde_json::to_string(&status).expect("Status should serialize.");

	assert!(status.is_authenticated);
	assert_eq!(status.environment.as_deref(), Some("sfoa"));
	assert!(!rendered.contains("t1"));
	assert!(!rendered.contains("r1"));
}
