//! Provider strategy hooks that classify token-endpoint failures.
//!
//! Strategies only see crate-owned data (status code, OAuth error fields, body preview) so they
//! stay independent of the HTTP client in use.

// self
use crate::_prelude::*;

/// Strategy hook that maps provider errors into the service taxonomy.
pub trait ProviderStrategy: Send + Sync {
	/// Classifies a failed token-endpoint call.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;
}

/// Canonical provider error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
	/// Provider rejected the authorization code (expired, reused, wrong redirect URI).
	InvalidGrant,
	/// Client authentication failed or the connected app is misconfigured.
	InvalidClient,
	/// User or org is not allowed to use the connected app.
	InsufficientScope,
	/// Failure is temporary (network, rate limit, provider outage).
	Transient,
}
impl ProviderErrorKind {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProviderErrorKind::InvalidGrant => "invalid_grant",
			ProviderErrorKind::InvalidClient => "invalid_client",
			ProviderErrorKind::InsufficientScope => "insufficient_scope",
			ProviderErrorKind::Transient => "transient",
		}
	}
}
impl Display for ProviderErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Context passed to provider strategies when classifying token errors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
	/// Indicates whether the failure originated from the network/transport layer.
	pub network_error: bool,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Convenience constructor for transport-level/network failures.
	pub fn network_failure() -> Self {
		Self { network_error: true, ..Default::default() }
	}

	/// Adds an HTTP status code (e.g., 400, 401, 500).
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth error code string returned by the provider.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview for providers that return non-JSON payloads.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}
}

/// Strategy tuned for Salesforce and Salesforce on Alibaba Cloud token endpoints.
///
/// Structured OAuth fields win, including Salesforce's own codes (`invalid_client_id`,
/// `inactive_user`, `rate_limit_exceeded`, ...); body hints come next and the HTTP status last.
/// Network failures are always transient.
#[derive(Debug, Default)]
pub struct SalesforceStrategy;
impl Display for SalesforceStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("salesforce-strategy")
	}
}
impl ProviderStrategy for SalesforceStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if ctx.network_error {
			return ProviderErrorKind::Transient;
		}

		if let Some(kind) =
			classify_oauth_error(ctx.oauth_error.as_deref(), ctx.error_description.as_deref())
		{
			return kind;
		}
		if let Some(kind) = classify_body(ctx.body_preview.as_deref()) {
			return kind;
		}

		classify_status(ctx.http_status)
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= ProviderErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf: String = body.chars().take(ProviderErrorContext::BODY_PREVIEW_LIMIT).collect();

	buf.push('…');

	buf
}

fn classify_oauth_error(
	oauth_error: Option<&str>,
	error_description: Option<&str>,
) -> Option<ProviderErrorKind> {
	oauth_error
		.and_then(match_exact_value)
		.or_else(|| error_description.and_then(match_exact_value))
		.or_else(|| classify_body(error_description))
}

fn match_exact_value(value: &str) -> Option<ProviderErrorKind> {
	const INVALID_GRANT: &[&str] =
		&["invalid_grant", "access_denied", "redirect_uri_mismatch", "invalid_request"];
	const INVALID_CLIENT: &[&str] = &[
		"invalid_client",
		"invalid_client_id",
		"invalid_client_credentials",
		"unauthorized_client",
		"unsupported_grant_type",
	];
	const INSUFFICIENT_SCOPE: &[&str] =
		&["invalid_scope", "insufficient_scope", "inactive_user", "inactive_org"];
	const TRANSIENT: &[&str] = &["temporarily_unavailable", "server_error", "rate_limit_exceeded"];

	let hit = |set: &[&str]| set.iter().any(|code| value.eq_ignore_ascii_case(code));

	if hit(INVALID_GRANT) {
		Some(ProviderErrorKind::InvalidGrant)
	} else if hit(INVALID_CLIENT) {
		Some(ProviderErrorKind::InvalidClient)
	} else if hit(INSUFFICIENT_SCOPE) {
		Some(ProviderErrorKind::InsufficientScope)
	} else if hit(TRANSIENT) {
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_body(body: Option<&str>) -> Option<ProviderErrorKind> {
	let body = body?;
	let lowered = body.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("invalid_grant") || text.contains("expired authorization code") =>
			Some(ProviderErrorKind::InvalidGrant),
		text if text.contains("invalid_client") => Some(ProviderErrorKind::InvalidClient),
		text if text.contains("insufficient_scope") || text.contains("inactive_") =>
			Some(ProviderErrorKind::InsufficientScope),
		text if text.contains("temporarily_unavailable") || text.contains("rate_limit") =>
			Some(ProviderErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Transient,
	}
}
