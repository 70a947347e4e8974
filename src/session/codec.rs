//! Signed, compact encoding of [`Principal`] records.
//!
//! Layout: `base64url(json) "." base64url(hmac_sha256(key, base64url(json)))`. Only the four
//! principal fields are stored; provider profile payloads never reach the session.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{EnvironmentId, Principal, TokenSecret},
	error::ConfigError,
};

type HmacSha256 = Hmac<Sha256>;

const KEY_CONTEXT: &[u8] = b"sf-oauth/principal-codec/v1";

#[derive(Serialize)]
struct RecordRef<'a> {
	access_token: &'a str,
	refresh_token: Option<&'a str>,
	instance_url: &'a str,
	environment_id: &'a str,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Record {
	access_token: TokenSecret,
	refresh_token: Option<TokenSecret>,
	instance_url: String,
	environment_id: EnvironmentId,
}

/// Encodes principals into tamper-evident strings and back.
#[derive(Clone)]
pub struct PrincipalCodec {
	mac: HmacSha256,
}
impl PrincipalCodec {
	/// Derives the signing key from the session secret.
	pub fn new(session_secret: &[u8]) -> Result<Self, ConfigError> {
		if session_secret.is_empty() {
			return Err(ConfigError::Invalid {
				name: "SESSION_SECRET",
				reason: "the session secret cannot be empty".into(),
			});
		}

		let key = Sha256::new().chain_update(KEY_CONTEXT).chain_update(session_secret).finalize();
		let mac = HmacSha256::new_from_slice(&key).map_err(|err| ConfigError::Invalid {
			name: "SESSION_SECRET",
			reason: err.to_string(),
		})?;

		Ok(Self { mac })
	}

	/// Serializes and signs `principal`.
	pub fn encode(&self, principal: &Principal) -> Result<String> {
		let record = RecordRef {
			access_token: principal.access_token.expose(),
			refresh_token: principal.refresh_token.as_ref().map(TokenSecret::expose),
			instance_url: principal.instance_url.as_str(),
			environment_id: principal.environment_id.as_ref(),
		};
		let json = serde_json::to_vec(&record).map_err(|err| {
			crate::store::StoreError::Serialization { message: err.to_string() }
		})?;
		let payload = URL_SAFE_NO_PAD.encode(json);
		let mut mac = self.mac.clone();

		mac.update(payload.as_bytes());

		let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

		Ok(format!("{payload}.{tag}"))
	}

	/// Verifies and parses an encoded principal.
	///
	/// Every failure (bad framing, bad tag, bad JSON, invalid identifier or URL) maps to
	/// [`Error::CorruptSession`].
	pub fn decode(&self, encoded: &str) -> Result<Principal> {
		let (payload, tag) = encoded.split_once('.').ok_or_else(|| corrupt("missing separator"))?;
		let tag = URL_SAFE_NO_PAD.decode(tag).map_err(|_| corrupt("invalid tag encoding"))?;
		let mut mac = self.mac.clone();

		mac.update(payload.as_bytes());
		mac.verify_slice(&tag).map_err(|_| corrupt("signature mismatch"))?;

		let json =
			URL_SAFE_NO_PAD.decode(payload).map_err(|_| corrupt("invalid payload encoding"))?;
		let mut de = serde_json::Deserializer::from_slice(&json);
		let record: Record = serde_path_to_error::deserialize(&mut de)
			.map_err(|err| corrupt(format!("invalid field `{}`: {}", err.path(), err.inner())))?;
		let instance_url =
			Url::parse(&record.instance_url).map_err(|_| corrupt("invalid instance_url"))?;

		Ok(Principal {
			access_token: record.access_token,
			refresh_token: record.refresh_token,
			instance_url,
			environment_id: record.environment_id,
		})
	}
}
impl Debug for PrincipalCodec {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PrincipalCodec").finish_non_exhaustive()
	}
}

fn corrupt(reason: impl Into<String>) -> Error {
	Error::CorruptSession { reason: reason.into() }
}
