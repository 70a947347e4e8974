//! Provider facade: authorize URLs, code exchange, revocation, userinfo, and logout page calls.
//!
//! Every call takes the resolved [`EnvironmentConfig`] as an explicit argument. Nothing here
//! caches per-environment clients or mutates endpoint fields between requests.

pub use oauth2;

// crates.io
use oauth2::{
	AuthUrl, ClientId, CsrfToken, HttpClientError, HttpRequest, HttpResponse, RedirectUrl,
	basic::BasicClient,
	http::{
		HeaderValue, Method, Request, StatusCode,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use url::form_urlencoded::Serializer as FormSerializer;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, TransportError},
	http::{self, ProviderHttpClient},
	provider::{EnvironmentConfig, ProviderErrorContext, ProviderStrategy},
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";
const ERROR_BODY_LIMIT: usize = 2_048;

/// Maps HTTP transport failures into [`TransportError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted while calling `endpoint`.
	fn map_transport_error(&self, endpoint: &'static str, error: HttpClientError<E>)
	-> TransportError;
}

/// Default mapper for reqwest-backed transports.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: &'static str,
		err: HttpClientError<ReqwestError>,
	) -> TransportError {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_timeout() =>
				TransportError::Timeout { endpoint },
			HttpClientError::Reqwest(inner) => TransportError::network(endpoint, *inner),
			HttpClientError::Http(inner) =>
				TransportError::Request { endpoint, message: inner.to_string() },
			HttpClientError::Io(inner) => TransportError::Io(inner),
			HttpClientError::Other(message) => TransportError::Request { endpoint, message },
			_ => TransportError::Request { endpoint, message: "unknown transport failure".into() },
		}
	}
}

/// Tokens returned by a successful authorization-code exchange.
#[derive(Clone)]
pub struct TokenGrant {
	/// Access token.
	pub access_token: TokenSecret,
	/// Refresh token, when the connected app issues one.
	pub refresh_token: Option<TokenSecret>,
	/// Raw `instance_url` field; validated by the flow.
	pub instance_url: Option<String>,
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &self.access_token)
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("instance_url", &self.instance_url)
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenResponseBody {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	instance_url: Option<String>,
}

#[derive(Deserialize)]
struct OAuthErrorBody {
	error: Option<String>,
	error_description: Option<String>,
}

/// Builds the provider-specific authorization redirect for `state`.
///
/// The URL carries `response_type=code`, `client_id`, `redirect_uri`, and `state` for the given
/// environment only.
pub fn authorize_url(environment: &EnvironmentConfig, state: &str) -> Url {
	let client = BasicClient::new(ClientId::new(environment.client_id.clone()))
		.set_auth_uri(AuthUrl::from_url(environment.endpoints.authorize.clone()))
		.set_redirect_uri(RedirectUrl::from_url(environment.callback_url.clone()));
	let (url, _) = client.authorize_url(|| CsrfToken::new(state.to_owned())).url();

	url
}

pub(crate) struct ProviderFacade<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	strategy: Arc<dyn ProviderStrategy>,
}
impl<C, M> ProviderFacade<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(
		http_client: Arc<C>,
		error_mapper: Arc<M>,
		strategy: Arc<dyn ProviderStrategy>,
	) -> Self {
		Self { http_client, error_mapper, strategy }
	}

	/// `POST {token}` with the authorization-code grant; never retried.
	pub(crate) async fn exchange_code(
		&self,
		environment: &EnvironmentConfig,
		code: &str,
	) -> Result<TokenGrant> {
		let body = FormSerializer::new(String::new())
			.append_pair("grant_type", "authorization_code")
			.append_pair("code", code)
			.append_pair("client_id", &environment.client_id)
			.append_pair("client_secret", environment.client_secret.expose())
			.append_pair("redirect_uri", environment.callback_url.as_str())
			.finish();
		let request = Request::builder()
			.method(Method::POST)
			.uri(environment.endpoints.token.as_str())
			.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
			.header(ACCEPT, JSON_CONTENT_TYPE)
			.body(body.into_bytes())
			.map_err(ConfigError::from)?;
		let response = match self.send("token", request).await {
			Ok(response) => response,
			Err(err) => {
				let kind =
					self.strategy.classify_token_error(&ProviderErrorContext::network_failure());

				return Err(Error::TokenExchangeFailed {
					kind,
					status: None,
					body: err.to_string(),
				});
			},
		};
		let status = response.status();

		if !status.is_success() {
			return Err(self.token_error(status, response.body()));
		}

		let mut de = serde_json::Deserializer::from_slice(response.body());
		let parsed: TokenResponseBody = serde_path_to_error::deserialize(&mut de).map_err(|err| {
			let ctx = ProviderErrorContext::default()
				.with_http_status(status.as_u16())
				.with_body_preview(lossy(response.body()));

			Error::TokenExchangeFailed {
				kind: self.strategy.classify_token_error(&ctx),
				status: Some(status.as_u16()),
				body: format!("Malformed token response at `{}`: {}", err.path(), err.inner()),
			}
		})?;

		Ok(TokenGrant {
			access_token: TokenSecret::new(parsed.access_token),
			refresh_token: parsed.refresh_token.map(TokenSecret::new),
			instance_url: parsed.instance_url,
		})
	}

	/// `POST {revoke}?token=...`; returns the provider's status code.
	pub(crate) async fn revoke(
		&self,
		environment: &EnvironmentConfig,
		token: &TokenSecret,
	) -> Result<StatusCode> {
		let mut url = environment.endpoints.revoke.clone();

		url.query_pairs_mut().append_pair("token", token.expose());

		let request = Request::builder()
			.method(Method::POST)
			.uri(url.as_str())
			.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
			.body(Vec::new())
			.map_err(ConfigError::from)?;

		Ok(self.send("revoke", request).await?.status())
	}

	/// `GET {logout}` for provider-side SSO cleanup; returns the provider's status code.
	pub(crate) async fn provider_logout(
		&self,
		environment: &EnvironmentConfig,
	) -> Result<StatusCode> {
		let request = Request::builder()
			.method(Method::GET)
			.uri(environment.endpoints.logout.as_str())
			.body(Vec::new())
			.map_err(ConfigError::from)?;

		Ok(self.send("logout", request).await?.status())
	}

	/// `GET {userinfo}` with the bearer token; returns the decoded JSON profile.
	pub(crate) async fn user_info(
		&self,
		environment: &EnvironmentConfig,
		token: &TokenSecret,
	) -> Result<serde_json::Value> {
		let bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose())).map_err(|_| {
			Error::UserInfoFailed {
				status: StatusCode::UNAUTHORIZED.as_u16(),
				body: "Access token contains characters that cannot be sent in a header".into(),
			}
		})?;
		let request = Request::builder()
			.method(Method::GET)
			.uri(environment.endpoints.userinfo.as_str())
			.header(AUTHORIZATION, bearer)
			.header(ACCEPT, JSON_CONTENT_TYPE)
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let response = self.send("userinfo", request).await?;
		let status = response.status();

		if !status.is_success() {
			return Err(Error::UserInfoFailed {
				status: status.as_u16(),
				body: truncate(lossy(response.body())),
			});
		}

		serde_json::from_slice(response.body()).map_err(|err| Error::UserInfoFailed {
			status: status.as_u16(),
			body: format!("Userinfo response is not JSON: {err}"),
		})
	}

	async fn send(
		&self,
		endpoint: &'static str,
		request: HttpRequest,
	) -> Result<HttpResponse, TransportError> {
		http::send(self.http_client.as_ref(), request)
			.await
			.map_err(|err| self.error_mapper.map_transport_error(endpoint, err))
	}

	fn token_error(&self, status: StatusCode, body: &[u8]) -> Error {
		let text = lossy(body);
		let mut ctx = ProviderErrorContext::default().with_http_status(status.as_u16());

		match serde_json::from_slice::<OAuthErrorBody>(body) {
			Ok(OAuthErrorBody { error, error_description }) => {
				if let Some(error) = error {
					ctx = ctx.with_oauth_error(error);
				}
				if let Some(description) = error_description {
					ctx = ctx.with_error_description(description);
				}
			},
			Err(_) => ctx = ctx.with_body_preview(text.clone()),
		}

		Error::TokenExchangeFailed {
			kind: self.strategy.classify_token_error(&ctx),
			status: Some(status.as_u16()),
			body: truncate(text),
		}
	}
}

fn lossy(body: &[u8]) -> String {
	String::from_utf8_lossy(body).into_owned()
}

fn truncate(mut text: String) -> String {
	if text.len() > ERROR_BODY_LIMIT {
		let mut cut = ERROR_BODY_LIMIT;

		while !text.is_char_boundary(cut) {
			cut -= 1;
		}

		text.truncate(cut);
	}

	text
}
