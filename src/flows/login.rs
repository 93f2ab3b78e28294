//! Login stage: discovery delegation or the direct authorization redirect.

// self
use crate::{
	_prelude::*,
	error::ProtocolError,
	exchange::{Exchange, Response},
	flows::{OAuth2ClientFilter, common},
	session::Session,
};

pub(super) async fn handle(
	filter: &OAuth2ClientFilter,
	exchange: &mut Exchange,
	session: &Session,
	endpoint: &str,
) -> Result<Response> {
	// User-initiated discovery bypasses the filter entirely; the sub-chain's
	// response is returned unchanged, success or not.
	if exchange.query_param("discovery").is_some() {
		let Some(discovery_handler) = &filter.discovery_handler else {
			return Err(
				ProtocolError::invalid_request("discovery is not configured for this endpoint")
					.into(),
			);
		};

		return Ok(discovery_handler.handle(exchange).await);
	}

	let Some(name) =
		exchange.query_param("clientRegistration").or_else(|| filter.client_registration_name.clone())
	else {
		return Err(ProtocolError::invalid_request(
			"no client registration is specified for login",
		)
		.into());
	};
	let registration = common::find_registration(filter, &name).ok_or_else(|| {
		ProtocolError::invalid_request(format!("unknown client registration `{name}`"))
	})?;

	common::authorization_redirect(filter, exchange, session, endpoint, &registration).await
}
