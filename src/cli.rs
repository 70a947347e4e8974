//! Command-line interface; every flag can also be set through the environment (or `.env`).

// crates.io
use clap::{Parser, ValueEnum};

/// Multi-environment Salesforce OAuth login service.
#[derive(Debug, Parser)]
#[command(name = "sf-oauth", version, about, long_about = None)]
pub struct Cli {
	/// Host to bind to.
	#[arg(long, env = "HOST", default_value = "0.0.0.0")]
	pub host: String,

	/// Port to listen on.
	#[arg(short, long, env = "PORT", default_value_t = 3000)]
	pub port: u16,

	/// Deployment mode (`production` enables secure cookies and strict session rules).
	#[arg(long, env = "APP_ENV", default_value = "development")]
	pub app_env: String,

	/// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence.
	#[arg(long, env = "LOG_LEVEL", default_value = "info")]
	pub log_level: String,

	/// Log format (text, json).
	#[arg(long, env = "LOG_FORMAT")]
	pub log_format: Option<String>,

	/// Salesforce login base URL.
	#[arg(long, env = "SF_LOGIN_URL", default_value = "https://login.salesforce.com")]
	pub sf_login_url: String,

	/// Salesforce connected-app client id.
	#[arg(long, env = "SF_CLIENT_ID")]
	pub sf_client_id: Option<String>,

	/// Salesforce connected-app client secret.
	#[arg(long, env = "SF_CLIENT_SECRET", hide_env_values = true)]
	pub sf_client_secret: Option<String>,

	/// Salesforce callback URL.
	#[arg(
		long,
		env = "SF_CALLBACK_URL",
		default_value = "http://localhost:3000/auth/salesforce/callback"
	)]
	pub sf_callback_url: String,

	/// Salesforce on Alibaba Cloud login base URL.
	#[arg(long, env = "SFOA_LOGIN_URL", default_value = "https://login.sfcrmproducts.cn")]
	pub sfoa_login_url: String,

	/// Salesforce on Alibaba Cloud client id; the environment is disabled without it.
	#[arg(long, env = "SFOA_CLIENT_ID")]
	pub sfoa_client_id: Option<String>,

	/// Salesforce on Alibaba Cloud client secret; the environment is disabled without it.
	#[arg(long, env = "SFOA_CLIENT_SECRET", hide_env_values = true)]
	pub sfoa_client_secret: Option<String>,

	/// Salesforce on Alibaba Cloud callback URL (defaults to the Salesforce callback URL).
	#[arg(long, env = "SFOA_CALLBACK_URL")]
	pub sfoa_callback_url: Option<String>,

	/// Environment used when a login request names none.
	#[arg(long, env = "DEFAULT_ENV", default_value = "salesforce")]
	pub default_env: String,

	/// Secret used to sign session cookies and principal records.
	#[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
	pub session_secret: Option<String>,

	/// Session backend; defaults to `redis` in production and `memory` otherwise.
	#[arg(long, env = "SESSION_BACKEND", value_enum)]
	pub session_backend: Option<SessionBackend>,

	/// Redis connection URL for the `redis` backend.
	#[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
	pub redis_url: String,

	/// Prefix for session store keys.
	#[arg(long, env = "SESSION_KEY_PREFIX", default_value = "sf-oauth:")]
	pub session_key_prefix: String,

	/// Authenticated session lifetime in seconds.
	#[arg(long, env = "SESSION_TTL_SECS", default_value_t = 86_400)]
	pub session_ttl_secs: u64,

	/// Pending login lifetime in seconds.
	#[arg(long, env = "PENDING_TTL_SECS", default_value_t = 300)]
	pub pending_ttl_secs: u64,

	/// Upper bound for every provider call in seconds.
	#[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 10)]
	pub http_timeout_secs: u64,

	/// SameSite policy of the session cookie.
	#[arg(long, env = "COOKIE_SAME_SITE", value_enum, default_value_t = CookieSameSite::Lax)]
	pub cookie_same_site: CookieSameSite,

	/// Redirect target after a successful login.
	#[arg(long, env = "DASHBOARD_REDIRECT", default_value = "/dashboard")]
	pub dashboard_redirect: String,

	/// Redirect target for failed logins and after logout.
	#[arg(long, env = "ERROR_REDIRECT", default_value = "/")]
	pub error_redirect: String,
}

/// Session storage backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SessionBackend {
	/// Process-local map; sessions vanish on restart.
	Memory,
	/// Shared Redis server.
	Redis,
}

/// SameSite policies supported for the session cookie.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CookieSameSite {
	/// Sent on top-level navigations, which covers the provider callback.
	Lax,
	/// Sent cross-site; always paired with `Secure`.
	None,
}
