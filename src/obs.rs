//! Optional observability helpers for filter stages.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_gatekeeper.stage` with the `stage`
//!   (dispatch target) and `endpoint` fields, plus the diagnostic log lines emitted on lenient
//!   failure paths.
//! - Enable `metrics` to increment the `oauth2_gatekeeper_stage_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Request stages dispatched by the filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
	/// Authorization-redirect initiation.
	Login,
	/// Provider callback processing.
	Callback,
	/// Session termination.
	Logout,
	/// Protected-resource traversal.
	Protected,
}
impl StageKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageKind::Login => "login",
			StageKind::Callback => "callback",
			StageKind::Logout => "logout",
			StageKind::Protected => "protected",
		}
	}
}
impl Display for StageKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each dispatched request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Entry to a stage.
	Attempt,
	/// Response produced without entering the failure path.
	Success,
	/// Request collapsed into the failure handler.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
