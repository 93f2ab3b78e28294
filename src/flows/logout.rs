//! Logout stage: unconditional session removal.

// self
use crate::{
	_prelude::*,
	exchange::{Exchange, Response},
	flows::{OAuth2ClientFilter, common},
};

pub(super) async fn handle(
	filter: &OAuth2ClientFilter,
	exchange: &mut Exchange,
	endpoint: &str,
) -> Result<Response> {
	let mut response = common::goto_response(
		exchange,
		exchange.query_param("goto"),
		filter.default_logout_goto.as_ref(),
	)?;

	filter.store.remove(exchange, &mut response, endpoint).await?;

	Ok(response)
}
