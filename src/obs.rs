//! Observability helpers for login flows.
//!
//! Every flow operation runs inside a span named `sf_oauth.flow` carrying the `flow` and `stage`
//! fields. With the `metrics` feature the `sf_oauth_flow_total` counter is incremented for every
//! attempt/success/failure, labeled by `flow` + `outcome`.

mod counter;
mod span;

pub use counter::*;
pub use span::*;

// self
use crate::_prelude::*;

/// Flow operations observed by the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Redirect to the provider's authorize endpoint.
	BeginLogin,
	/// Callback handling and code exchange.
	CompleteLogin,
	/// Local session teardown plus provider revocation.
	Logout,
	/// Userinfo lookup for the current principal.
	UserInfo,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::BeginLogin => "begin_login",
			FlowKind::CompleteLogin => "complete_login",
			FlowKind::Logout => "logout",
			FlowKind::UserInfo => "user_info",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
