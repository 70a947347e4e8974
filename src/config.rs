//! Typed runtime settings validated from the [`Cli`](crate::cli::Cli) surface.

// std
use std::{path::PathBuf, time::Duration as StdDuration};
// crates.io
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
// self
use crate::{
	_prelude::*,
	auth::{EnvironmentId, TokenSecret},
	cli::{Cli, CookieSameSite, SessionBackend},
	error::ConfigError,
	provider::{EnvironmentConfig, EnvironmentRegistry},
	session::SessionSettings,
};

/// Identifier of the standard Salesforce environment.
pub const SALESFORCE_ENV: &str = "salesforce";
/// Identifier of the Salesforce on Alibaba Cloud environment.
pub const SFOA_ENV: &str = "sfoa";

const DEV_SESSION_SECRET: &str = "sf-oauth-development-secret-do-not-use-in-production";

/// Session cookie attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieSettings {
	/// SameSite policy.
	pub same_site: CookieSameSite,
	/// Whether the cookie carries the `Secure` attribute.
	pub secure: bool,
	/// Cookie lifetime; mirrors the session TTL.
	pub max_age: Duration,
}

/// Redirect targets used by the HTTP layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectSettings {
	/// Target after a successful login.
	pub dashboard: String,
	/// Target for failed logins (with `?error=`) and after logout.
	pub error: String,
}

/// Fully validated service configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
	/// `host:port` to bind.
	pub bind_addr: String,
	/// Production mode toggle.
	pub production: bool,
	/// Registered environments.
	pub registry: EnvironmentRegistry,
	/// Secret for cookie signing and principal records.
	pub session_secret: TokenSecret,
	/// Chosen session backend.
	pub session_backend: SessionBackend,
	/// Redis connection URL (used by the `redis` backend).
	pub redis_url: String,
	/// Session key layout and lifetimes.
	pub sessions: SessionSettings,
	/// Upper bound for every provider call.
	pub http_timeout: StdDuration,
	/// Session cookie attributes.
	pub cookie: CookieSettings,
	/// Redirect targets.
	pub redirects: RedirectSettings,
}
impl AppConfig {
	/// Validates raw CLI/environment values into typed settings.
	pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
		let production = cli.app_env.eq_ignore_ascii_case("production");
		let session_secret = match cli.session_secret.as_deref().map(str::trim) {
			Some(secret) if !secret.is_empty() => secret.to_owned(),
			_ if production => return Err(ConfigError::Missing { name: "SESSION_SECRET" }),
			_ => {
				tracing::warn!("SESSION_SECRET is not set; using the development secret.");

				DEV_SESSION_SECRET.to_owned()
			},
		};
		let session_backend = match (cli.session_backend, production) {
			(Some(SessionBackend::Memory), true) => {
				tracing::warn!(
					"In-memory sessions are enabled in production; sessions are lost on restart \
					 and not shared between instances."
				);

				SessionBackend::Memory
			},
			(Some(backend), _) => backend,
			(None, true) => SessionBackend::Redis,
			(None, false) => SessionBackend::Memory,
		};

		if session_backend == SessionBackend::Redis && !cfg!(feature = "redis") {
			return Err(ConfigError::Invalid {
				name: "SESSION_BACKEND",
				reason: "this build has no Redis support".into(),
			});
		}
		if cli.session_key_prefix.chars().any(char::is_whitespace) {
			return Err(ConfigError::Invalid {
				name: "SESSION_KEY_PREFIX",
				reason: "whitespace is not allowed".into(),
			});
		}

		let session_ttl = positive_seconds("SESSION_TTL_SECS", cli.session_ttl_secs)?;
		let pending_ttl = positive_seconds("PENDING_TTL_SECS", cli.pending_ttl_secs)?;

		if cli.http_timeout_secs == 0 {
			return Err(ConfigError::Invalid {
				name: "HTTP_TIMEOUT_SECS",
				reason: "must be greater than zero".into(),
			});
		}

		Ok(Self {
			bind_addr: format!("{}:{}", cli.host, cli.port),
			production,
			registry: build_registry(cli)?,
			session_secret: TokenSecret::new(session_secret),
			session_backend,
			redis_url: cli.redis_url.clone(),
			sessions: SessionSettings {
				key_prefix: cli.session_key_prefix.clone(),
				session_ttl,
				pending_ttl,
			},
			http_timeout: StdDuration::from_secs(cli.http_timeout_secs),
			cookie: CookieSettings {
				same_site: cli.cookie_same_site,
				secure: production || cli.cookie_same_site == CookieSameSite::None,
				max_age: session_ttl,
			},
			redirects: RedirectSettings {
				dashboard: redirect_target("DASHBOARD_REDIRECT", &cli.dashboard_redirect)?,
				error: redirect_target("ERROR_REDIRECT", &cli.error_redirect)?,
			},
		})
	}
}

/// Loads `.env` from the working directory (or a parent), returning the file used.
pub fn load_dotenv() -> Option<PathBuf> {
	dotenvy::dotenv().ok()
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `level`; `format` selects `json` or plain text output.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<(), ConfigError> {
	let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level)).map_err(
		|err| ConfigError::Invalid { name: "LOG_LEVEL", reason: err.to_string() },
	)?;
	let subscriber = tracing_subscriber::registry().with(filter);
	let installed = match format {
		Some("json") => subscriber.with(fmt::layer().json()).try_init(),
		None | Some("text") => subscriber.with(fmt::layer()).try_init(),
		Some(other) =>
			return Err(ConfigError::Invalid {
				name: "LOG_FORMAT",
				reason: format!("`{other}` is not one of text, json"),
			}),
	};

	installed.map_err(|err| ConfigError::Invalid { name: "LOG_FORMAT", reason: err.to_string() })
}

fn build_registry(cli: &Cli) -> Result<EnvironmentRegistry, ConfigError> {
	let salesforce = EnvironmentConfig::builder(EnvironmentId::new(SALESFORCE_ENV)?)
		.display_name("Salesforce")
		.login_url(parse_url("SF_LOGIN_URL", &cli.sf_login_url)?)
		.credentials(
			cli.sf_client_id.clone().unwrap_or_default(),
			cli.sf_client_secret.clone().unwrap_or_default(),
		)
		.callback_url(parse_url("SF_CALLBACK_URL", &cli.sf_callback_url)?)
		.build()?;
	let mut builder = EnvironmentRegistry::builder().register(salesforce);

	match (&cli.sfoa_client_id, &cli.sfoa_client_secret) {
		(Some(client_id), Some(client_secret))
			if !client_id.trim().is_empty() && !client_secret.is_empty() =>
		{
			let callback = cli.sfoa_callback_url.as_deref().unwrap_or(&cli.sf_callback_url);
			let sfoa = EnvironmentConfig::builder(EnvironmentId::new(SFOA_ENV)?)
				.display_name("Salesforce on Alibaba Cloud")
				.login_url(parse_url("SFOA_LOGIN_URL", &cli.sfoa_login_url)?)
				.credentials(client_id.clone(), client_secret.clone())
				.callback_url(parse_url("SFOA_CALLBACK_URL", callback)?)
				.build()?;

			builder = builder.register(sfoa);
		},
		_ => tracing::info!("SFOA credentials are not set; the sfoa environment is disabled."),
	}

	Ok(builder.default_environment(EnvironmentId::new(&cli.default_env)?).build()?)
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
	Url::parse(value).map_err(|err| ConfigError::invalid_url(name, err))
}

fn positive_seconds(name: &'static str, secs: u64) -> Result<Duration, ConfigError> {
	match i64::try_from(secs) {
		Ok(secs) if secs > 0 => Ok(Duration::seconds(secs)),
		_ => Err(ConfigError::Invalid {
			name,
			reason: "must be a positive number of seconds".into(),
		}),
	}
}

fn redirect_target(name: &'static str, value: &str) -> Result<String, ConfigError> {
	let value = value.trim();

	if value.starts_with('/') || Url::parse(value).is_ok() {
		Ok(value.to_owned())
	} else {
		Err(ConfigError::Invalid { name, reason: "expected a path or an absolute URL".into() })
	}
}
