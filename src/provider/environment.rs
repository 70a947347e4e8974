//! Identity-provider environment definitions and their builder.

// self
use crate::{
	_prelude::*,
	auth::{EnvironmentId, TokenSecret},
};

const AUTHORIZE_PATH: &str = "/services/oauth2/authorize";
const TOKEN_PATH: &str = "/services/oauth2/token";
const REVOKE_PATH: &str = "/services/oauth2/revoke";
const USERINFO_PATH: &str = "/services/oauth2/userinfo";
const LOGOUT_PATH: &str = "/secur/logout.jsp";

/// Errors raised while constructing or validating an environment.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum EnvironmentConfigError {
	/// Neither a login URL nor the named endpoint was supplied.
	#[error("Environment `{environment}` has no {endpoint} endpoint; set a login URL.")]
	MissingEndpoint {
		/// Environment identifier.
		environment: String,
		/// Endpoint label.
		endpoint: &'static str,
	},
	/// Client identifier is empty.
	#[error("Environment `{environment}` is missing a client id.")]
	MissingClientId {
		/// Environment identifier.
		environment: String,
	},
	/// Client secret is empty.
	#[error("Environment `{environment}` is missing a client secret.")]
	MissingClientSecret {
		/// Environment identifier.
		environment: String,
	},
	/// Callback URL was not supplied.
	#[error("Environment `{environment}` is missing a callback URL.")]
	MissingCallbackUrl {
		/// Environment identifier.
		environment: String,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Base URL cannot carry a path (e.g. `mailto:` URLs).
	#[error("Login URL `{url}` cannot be used as a base URL.")]
	InvalidLoginUrl {
		/// Offending URL.
		url: String,
	},
}

/// Provider endpoints used across the login flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEndpoints {
	/// Authorization endpoint the browser is redirected to.
	pub authorize: Url,
	/// Token endpoint for the code exchange.
	pub token: Url,
	/// Token revocation endpoint.
	pub revoke: Url,
	/// OpenID userinfo endpoint.
	pub userinfo: Url,
	/// Provider logout page for SSO cleanup.
	pub logout: Url,
}

/// Immutable, process-wide identity-provider environment.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
	/// Environment identifier (`salesforce`, `sfoa`).
	pub id: EnvironmentId,
	/// Human-readable name shown by the environment selector.
	pub display_name: String,
	/// Base login URL the endpoints were derived from.
	pub login_url: Url,
	/// Provider endpoints.
	pub endpoints: EnvironmentEndpoints,
	/// Connected-app client identifier.
	pub client_id: String,
	/// Connected-app client secret.
	pub client_secret: TokenSecret,
	/// Redirect URI registered with the connected app.
	pub callback_url: Url,
}
impl EnvironmentConfig {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: EnvironmentId) -> EnvironmentConfigBuilder {
		EnvironmentConfigBuilder::new(id)
	}

	/// Host of the authorization endpoint.
	pub fn authorize_host(&self) -> Option<&str> {
		self.endpoints.authorize.host_str()
	}
}
impl Debug for EnvironmentConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EnvironmentConfig")
			.field("id", &self.id)
			.field("display_name", &self.display_name)
			.field("login_url", &self.login_url.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("callback_url", &self.callback_url.as_str())
			.finish()
	}
}

/// Builder for [`EnvironmentConfig`] values.
///
/// Endpoints default to the Salesforce paths under the login URL; any of them may be
/// overridden individually.
#[derive(Debug)]
pub struct EnvironmentConfigBuilder {
	id: EnvironmentId,
	display_name: Option<String>,
	login_url: Option<Url>,
	authorize: Option<Url>,
	token: Option<Url>,
	revoke: Option<Url>,
	userinfo: Option<Url>,
	logout: Option<Url>,
	client_id: String,
	client_secret: String,
	callback_url: Option<Url>,
}
impl EnvironmentConfigBuilder {
	/// Creates a new builder seeded with the provided identifier.
	pub fn new(id: EnvironmentId) -> Self {
		Self {
			id,
			display_name: None,
			login_url: None,
			authorize: None,
			token: None,
			revoke: None,
			userinfo: None,
			logout: None,
			client_id: String::new(),
			client_secret: String::new(),
			callback_url: None,
		}
	}

	/// Sets the display name (defaults to the identifier).
	pub fn display_name(mut self, name: impl Into<String>) -> Self {
		self.display_name = Some(name.into());

		self
	}

	/// Sets the base login URL (`https://login.salesforce.com`).
	pub fn login_url(mut self, url: Url) -> Self {
		self.login_url = Some(url);

		self
	}

	/// Overrides the authorization endpoint.
	pub fn authorize_endpoint(mut self, url: Url) -> Self {
		self.authorize = Some(url);

		self
	}

	/// Overrides the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token = Some(url);

		self
	}

	/// Overrides the revocation endpoint.
	pub fn revoke_endpoint(mut self, url: Url) -> Self {
		self.revoke = Some(url);

		self
	}

	/// Overrides the userinfo endpoint.
	pub fn userinfo_endpoint(mut self, url: Url) -> Self {
		self.userinfo = Some(url);

		self
	}

	/// Overrides the provider logout page.
	pub fn logout_endpoint(mut self, url: Url) -> Self {
		self.logout = Some(url);

		self
	}

	/// Sets the connected-app credentials.
	pub fn credentials(
		mut self,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		self.client_id = client_id.into();
		self.client_secret = client_secret.into();

		self
	}

	/// Sets the callback URL registered with the connected app.
	pub fn callback_url(mut self, url: Url) -> Self {
		self.callback_url = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting environment.
	pub fn build(self) -> Result<EnvironmentConfig, EnvironmentConfigError> {
		let environment = self.id.to_string();

		if self.client_id.trim().is_empty() {
			return Err(EnvironmentConfigError::MissingClientId { environment });
		}
		if self.client_secret.is_empty() {
			return Err(EnvironmentConfigError::MissingClientSecret { environment });
		}

		let callback_url = self.callback_url.ok_or_else(|| {
			EnvironmentConfigError::MissingCallbackUrl { environment: environment.clone() }
		})?;
		let login_url = match (self.login_url, &self.authorize) {
			(Some(url), _) => url,
			(None, Some(authorize)) => origin_of(authorize),
			(None, None) =>
				return Err(EnvironmentConfigError::MissingEndpoint {
					environment,
					endpoint: "authorization",
				}),
		};

		if login_url.cannot_be_a_base() {
			return Err(EnvironmentConfigError::InvalidLoginUrl { url: login_url.to_string() });
		}

		let endpoints = EnvironmentEndpoints {
			authorize: pick(self.authorize, &login_url, AUTHORIZE_PATH),
			token: pick(self.token, &login_url, TOKEN_PATH),
			revoke: pick(self.revoke, &login_url, REVOKE_PATH),
			userinfo: pick(self.userinfo, &login_url, USERINFO_PATH),
			logout: pick(self.logout, &login_url, LOGOUT_PATH),
		};
		let config = EnvironmentConfig {
			display_name: self.display_name.unwrap_or_else(|| environment.clone()),
			id: self.id,
			login_url,
			endpoints,
			client_id: self.client_id,
			client_secret: TokenSecret::new(self.client_secret),
			callback_url,
		};

		config.validate()?;

		Ok(config)
	}
}

impl EnvironmentConfig {
	fn validate(&self) -> Result<(), EnvironmentConfigError> {
		validate_endpoint("authorization", &self.endpoints.authorize)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("revocation", &self.endpoints.revoke)?;
		validate_endpoint("userinfo", &self.endpoints.userinfo)?;
		validate_endpoint("logout", &self.endpoints.logout)?;

		Ok(())
	}
}

/// Joins `path` onto the base URL, keeping any path prefix the base already carries.
fn pick(explicit: Option<Url>, base: &Url, path: &str) -> Url {
	explicit.unwrap_or_else(|| {
		let mut url = base.clone();
		let prefix = base.path().trim_end_matches('/');

		url.set_path(&format!("{prefix}{path}"));
		url.set_query(None);
		url.set_fragment(None);

		url
	})
}

fn origin_of(url: &Url) -> Url {
	let mut origin = url.clone();

	origin.set_path("/");
	origin.set_query(None);
	origin.set_fragment(None);

	origin
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), EnvironmentConfigError> {
	let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));

	if url.scheme() == "https" || (url.scheme() == "http" && loopback) {
		Ok(())
	} else {
		Err(EnvironmentConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("URL fixture should parse.")
	}

	fn builder(id: &str) -> EnvironmentConfigBuilder {
		EnvironmentConfig::builder(EnvironmentId::new(id).expect("Environment id should be valid."))
			.credentials("client", "secret")
			.callback_url(url("http://localhost:3000/auth/salesforce/callback"))
	}

	#[test]
	fn endpoints_default_from_login_url() {
		let env = builder("sfoa")
			.display_name("Salesforce on Alibaba Cloud")
			.login_url(url("https://login.sfcrmproducts.cn"))
			.build()
			.expect("Environment should build.");

		assert_eq!(
			env.endpoints.authorize.as_str(),
			"https://login.sfcrmproducts.cn/services/oauth2/authorize"
		);
		assert_eq!(
			env.endpoints.token.as_str(),
			"https://login.sfcrmproducts.cn/services/oauth2/token"
		);
		assert_eq!(
			env.endpoints.revoke.as_str(),
			"https://login.sfcrmproducts.cn/services/oauth2/revoke"
		);
		assert_eq!(
			env.endpoints.logout.as_str(),
			"https://login.sfcrmproducts.cn/secur/logout.jsp"
		);
		assert_eq!(env.authorize_host(), Some("login.sfcrmproducts.cn"));
		assert_eq!(env.display_name, "Salesforce on Alibaba Cloud");
	}

	#[test]
	fn login_url_path_prefix_is_kept() {
		let env = builder("community")
			.login_url(url("https://acme.my.site.com/partners/"))
			.build()
			.expect("Environment should build.");

		assert_eq!(
			env.endpoints.token.as_str(),
			"https://acme.my.site.com/partners/services/oauth2/token"
		);
	}

	#[test]
	fn explicit_endpoints_override_defaults() {
		let env = builder("custom")
			.authorize_endpoint(url("https://idp.example.com/authorize"))
			.token_endpoint(url("https://idp.example.com/token"))
			.build()
			.expect("Environment should build.");

		assert_eq!(env.login_url.as_str(), "https://idp.example.com/");
		assert_eq!(env.endpoints.token.as_str(), "https://idp.example.com/token");
		assert_eq!(
			env.endpoints.userinfo.as_str(),
			"https://idp.example.com/services/oauth2/userinfo"
		);
	}

	#[test]
	fn insecure_and_incomplete_environments_are_rejected() {
		let err = builder("plain")
			.login_url(url("http://login.example.com"))
			.build()
			.expect_err("Plain HTTP endpoints should be rejected.");

		assert!(matches!(
			err,
			EnvironmentConfigError::InsecureEndpoint { endpoint: "authorization", .. }
		));

		builder("local")
			.login_url(url("http://127.0.0.1:8080"))
			.build()
			.expect("Loopback endpoints may use HTTP.");

		let err = EnvironmentConfig::builder(EnvironmentId::new("x").expect("Id should be valid."))
			.login_url(url("https://login.salesforce.com"))
			.callback_url(url("https://app.example.com/cb"))
			.build()
			.expect_err("Missing credentials should be rejected.");

		assert!(matches!(err, EnvironmentConfigError::MissingClientId { .. }));

		let err = builder("nobase").build().expect_err("A login URL is required.");

		assert!(matches!(err, EnvironmentConfigError::MissingEndpoint { .. }));
	}

	#[test]
	fn debug_redacts_client_secret() {
		let env = builder("salesforce")
			.login_url(url("https://login.salesforce.com"))
			.build()
			.expect("Environment should build.");

		assert!(!format!("{env:?}").contains("\"secret\""));
	}
}
