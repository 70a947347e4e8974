//! Multi-environment Salesforce OAuth 2.0 login service.
//!
//! The identity provider is picked per request, carried through the redirect round trip in a
//! server-side pending record, and the resulting principal lives in a server-side session.

#![deny(clippy::all, missing_docs)]
#![warn(unused_crate_dependencies)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod server;
pub mod session;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tower as _};
// Linked by the binary target only.
use color_eyre as _;
