//! Handler dispatch seam shared by every injected collaborator.
//!
//! Login choosers, failure pages, discovery chains, and the downstream
//! protected application all satisfy the same single-capability contract.

// crates.io
use oauth2::http::StatusCode;
// self
use crate::{
	_prelude::*,
	exchange::{self, Exchange, Response},
};

/// Boxed future returned by [`Handler::handle`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Response> + 'a + Send>>;

/// Capability to process a request and produce a response.
///
/// Handlers never fail at the type level; transport or application failures
/// are expressed as error responses.
pub trait Handler
where
	Self: Send + Sync,
{
	/// Handles the exchange and produces a response.
	fn handle<'a>(&'a self, exchange: &'a mut Exchange) -> HandlerFuture<'a>;
}

/// Handler that replies with a fixed status and empty body.
#[derive(Clone, Copy, Debug)]
pub struct StatusHandler(pub StatusCode);
impl Handler for StatusHandler {
	fn handle<'a>(&'a self, _: &'a mut Exchange) -> HandlerFuture<'a> {
		let status = self.0;

		Box::pin(async move { exchange::empty(status) })
	}
}
