//! Service-level error types shared across flows, providers, sessions, and stores.

// self
use crate::{_prelude::*, provider::ProviderErrorKind};

/// Service-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by the login flow.
///
/// Every variant is recoverable at the HTTP boundary: handlers turn it into an error-bearing
/// redirect or a JSON body via [`Error::code`].
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Requested environment is not registered.
	#[error("Environment `{id}` is not registered.")]
	UnknownEnvironment {
		/// Identifier supplied by the caller.
		id: String,
	},
	/// Callback arrived without a live pending login for the session.
	#[error("No pending login exists for this session.")]
	MissingPendingState,
	/// Returned `state` does not match the token bound at login start.
	#[error("Authorization state mismatch.")]
	StateMismatch,
	/// Token endpoint rejected the exchange or could not be reached.
	#[error("Token exchange failed: {body}.")]
	TokenExchangeFailed {
		/// Provider strategy classification of the failure.
		kind: ProviderErrorKind,
		/// HTTP status code, when a response was received.
		status: Option<u16>,
		/// Provider error body, or the transport failure message.
		body: String,
	},
	/// Token response lacks the `instance_url` needed for follow-up API calls.
	#[error("Token endpoint response is missing instance_url.")]
	MissingInstanceUrl,
	/// Stored session record could not be decoded.
	#[error("Session record is corrupt: {reason}.")]
	CorruptSession {
		/// Decoder failure summary.
		reason: String,
	},
	/// Userinfo endpoint answered with a non-success status.
	#[error("Userinfo endpoint returned HTTP {status}: {body}.")]
	UserInfoFailed {
		/// HTTP status code.
		status: u16,
		/// Response body as text.
		body: String,
	},
}
impl Error {
	/// Stable snake_case code used in `?error=` redirects and JSON bodies.
	pub fn code(&self) -> &'static str {
		match self {
			Error::Storage(_) => "session_unavailable",
			Error::Config(_) => "configuration_error",
			Error::Transport(_) => "provider_unreachable",
			Error::UnknownEnvironment { .. } => "unknown_environment",
			Error::MissingPendingState => "missing_pending_state",
			Error::StateMismatch => "state_mismatch",
			Error::TokenExchangeFailed { .. } => "token_exchange_failed",
			Error::MissingInstanceUrl => "missing_instance_url",
			Error::CorruptSession { .. } => "corrupt_session",
			Error::UserInfoFailed { .. } => "userinfo_failed",
		}
	}
}

/// Configuration and validation failures raised at startup or while building requests.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// An endpoint or redirect URL cannot be parsed.
	#[error("`{name}` is not a valid URL.")]
	InvalidUrl {
		/// Setting or endpoint name.
		name: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Environment definition failed validation.
	#[error(transparent)]
	Environment(#[from] crate::provider::EnvironmentConfigError),
	/// Environment registry failed validation.
	#[error(transparent)]
	Registry(#[from] crate::provider::RegistryError),
	/// Identifier validation failed.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// A required setting is absent.
	#[error("`{name}` is required.")]
	Missing {
		/// Setting name (usually the environment variable).
		name: &'static str,
	},
	/// A setting holds an unsupported value.
	#[error("`{name}` is invalid: {reason}.")]
	Invalid {
		/// Setting name (usually the environment variable).
		name: &'static str,
		/// Human-readable reason.
		reason: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a URL parsing failure for the named setting.
	pub fn invalid_url(name: impl Into<String>, source: url::ParseError) -> Self {
		Self::InvalidUrl { name: name.into(), source }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Request exceeded the configured timeout.
	#[error("Request to {endpoint} timed out.")]
	Timeout {
		/// Endpoint label (`token`, `revoke`, `logout`, `userinfo`).
		endpoint: &'static str,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint label (`token`, `revoke`, `logout`, `userinfo`).
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling a provider endpoint.")]
	Io(#[from] std::io::Error),
	/// Transport rejected the request before sending it.
	#[error("HTTP client error occurred while calling the {endpoint} endpoint: {message}.")]
	Request {
		/// Endpoint label (`token`, `revoke`, `logout`, `userinfo`).
		endpoint: &'static str,
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		endpoint: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}
