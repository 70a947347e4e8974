//! Shared fixtures for integration tests: mock providers, registries, sessions, and fake
//! transports.

#![allow(dead_code)]

// std
use std::{
	io::{Error as IoError, ErrorKind},
	pin::Pin,
	sync::Arc,
	time::Duration as StdDuration,
};
// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
use time::Duration;
// self
use sf_oauth::{
	auth::{EnvironmentId, SessionId},
	error::TransportError,
	flows::{AuthFlow, ReqwestAuthFlow},
	http::{ProviderHttpClient, ReqwestHttpClient},
	oauth::{
		TransportErrorMapper,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	},
	provider::{EnvironmentConfig, EnvironmentRegistry, SalesforceStrategy},
	session::{PrincipalCodec, SessionSettings, Sessions},
	store::{MemoryStore, SessionStore, StoreError, StoreFuture},
	url::Url,
};

pub const SF_CLIENT_ID: &str = "sf-client";
pub const SFOA_CLIENT_ID: &str = "sfoa-client";
pub const CALLBACK_URL: &str = "http://localhost:3000/auth/salesforce/callback";
pub const TOKEN_PATH: &str = "/services/oauth2/token";
pub const REVOKE_PATH: &str = "/services/oauth2/revoke";
pub const USERINFO_PATH: &str = "/services/oauth2/userinfo";
pub const LOGOUT_PATH: &str = "/secur/logout.jsp";

/// Two mock providers wired into a reqwest-backed flow over a memory store.
pub struct Fixture {
	pub flow: ReqwestAuthFlow,
	pub store: MemoryStore,
	pub salesforce: MockServer,
	pub sfoa: MockServer,
}

pub async fn fixture() -> Fixture {
	fixture_with_timeout(StdDuration::from_secs(5)).await
}

pub async fn fixture_with_timeout(timeout: StdDuration) -> Fixture {
	let salesforce = MockServer::start_async().await;
	let sfoa = MockServer::start_async().await;
	let store = MemoryStore::default();
	let http_client =
		ReqwestHttpClient::with_timeout(timeout).expect("Test HTTP client should build.");
	let flow = ReqwestAuthFlow::new(
		registry(&salesforce, &sfoa),
		sessions(Arc::new(store.clone())),
		http_client,
	);

	Fixture { flow, store, salesforce, sfoa }
}

pub fn environment(id: &str, server: &MockServer, client_id: &str) -> EnvironmentConfig {
	EnvironmentConfig::builder(EnvironmentId::new(id).expect("Environment id should be valid."))
		.login_url(Url::parse(&server.base_url()).expect("Mock base URL should parse."))
		.credentials(client_id, format!("{client_id}-secret"))
		.callback_url(Url::parse(CALLBACK_URL).expect("Callback URL should parse."))
		.build()
		.expect("Mock environment should build.")
}

pub fn registry(salesforce: &MockServer, sfoa: &MockServer) -> EnvironmentRegistry {
	EnvironmentRegistry::builder()
		.register_default(environment("salesforce", salesforce, SF_CLIENT_ID))
		.register(environment("sfoa", sfoa, SFOA_CLIENT_ID))
		.build()
		.expect("Mock registry should build.")
}

pub fn sessions(store: Arc<dyn SessionStore>) -> Sessions {
	Sessions::new(
		store,
		PrincipalCodec::new(b"integration-secret").expect("Codec should build."),
		SessionSettings::default(),
	)
}

pub fn session_id(value: &str) -> SessionId {
	SessionId::new(value).expect("Session fixture should be valid.")
}

/// Extracts the `state` query parameter from an authorize URL.
pub fn state_of(url: &Url) -> String {
	url.query_pairs()
		.find(|(key, _)| key == "state")
		.map(|(_, value)| value.into_owned())
		.expect("Authorize URL should carry a state.")
}

pub fn token_body(instance_url: Option<&str>) -> Value {
	let mut body = json!({
		"access_token": "00D-access",
		"refresh_token": "5Aep-refresh",
		"id": "https://login.example/id/00D/005",
		"token_type": "Bearer",
		"issued_at": "1700000000000",
		"signature": "sig"
	});

	if let Some(instance_url) = instance_url {
		body["instance_url"] = json!(instance_url);
	}

	body
}

/// Store whose every call fails.
#[derive(Debug, Default)]
pub struct FailingStore;
impl SessionStore for FailingStore {
	fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async { Err(unavailable()) })
	}

	fn set<'a>(&'a self, _key: &'a str, _value: String, _ttl: Duration) -> StoreFuture<'a, ()> {
		Box::pin(async { Err(unavailable()) })
	}

	fn delete<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async { Err(unavailable()) })
	}
}

fn unavailable() -> StoreError {
	StoreError::Backend { message: "store unavailable".into() }
}

/// Transport that fails every request before reaching the network.
#[derive(Clone, Debug, Default)]
pub struct UnreachableHttpClient;
impl ProviderHttpClient for UnreachableHttpClient {
	type Handle = UnreachableHandle;
	type TransportError = IoError;

	fn handle(&self) -> Self::Handle {
		UnreachableHandle
	}
}

#[derive(Clone, Debug)]
pub struct UnreachableHandle;
impl<'c> AsyncHttpClient<'c> for UnreachableHandle {
	type Error = HttpClientError<IoError>;
	type Future = Pin<
		Box<dyn std::future::Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>,
	>;

	fn call(&'c self, _request: HttpRequest) -> Self::Future {
		Box::pin(async {
			Err(HttpClientError::Io(IoError::new(ErrorKind::ConnectionRefused, "connection refused")))
		})
	}
}

#[derive(Clone, Debug, Default)]
pub struct IoErrorMapper;
impl TransportErrorMapper<IoError> for IoErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: &'static str,
		error: HttpClientError<IoError>,
	) -> TransportError {
		match error {
			HttpClientError::Io(inner) if inner.kind() == ErrorKind::TimedOut =>
				TransportError::Timeout { endpoint },
			HttpClientError::Io(inner) => TransportError::network(endpoint, inner),
			other => TransportError::Request { endpoint, message: other.to_string() },
		}
	}
}

pub type UnreachableFlow = AuthFlow<UnreachableHttpClient, IoErrorMapper>;

/// Registry pointing at the real provider hosts; flows built on it must never reach them.
pub fn offline_registry() -> EnvironmentRegistry {
	let env = |id: &str, login: &str, client_id: &str| {
		EnvironmentConfig::builder(EnvironmentId::new(id).expect("Id should be valid."))
			.login_url(Url::parse(login).expect("Login URL should parse."))
			.credentials(client_id, "secret")
			.callback_url(Url::parse(CALLBACK_URL).expect("Callback URL should parse."))
			.build()
			.expect("Environment should build.")
	};

	EnvironmentRegistry::builder()
		.register_default(env("salesforce", "https://login.salesforce.com", SF_CLIENT_ID))
		.register(env("sfoa", "https://login.sfcrmproducts.cn", SFOA_CLIENT_ID))
		.build()
		.expect("Registry should build.")
}

/// Flow whose provider calls all fail at the transport layer.
pub fn unreachable_flow(store: MemoryStore) -> UnreachableFlow {
	AuthFlow::with_http_client(
		offline_registry(),
		sessions(Arc::new(store)),
		Arc::new(SalesforceStrategy),
		UnreachableHttpClient,
		IoErrorMapper,
	)
}
