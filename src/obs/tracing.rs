// self
use crate::{_prelude::*, obs::StageKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedStage<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStage<F> = F;

/// A span builder used by the filter's dispatch path.
#[derive(Clone, Debug)]
pub struct StageSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl StageSpan {
	/// Creates a new span tagged with the dispatched stage and client endpoint.
	pub fn new(kind: StageKind, endpoint: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("oauth2_gatekeeper.stage", stage = kind.as_str(), endpoint);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, endpoint);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStage<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug-severity diagnostic line (when tracing is enabled).
pub fn log_debug(args: std::fmt::Arguments) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!("{args}");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = args;
	}
}

/// Emits a warning-severity diagnostic line (when tracing is enabled).
pub fn log_warn(args: std::fmt::Arguments) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!("{args}");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = args;
	}
}
