//! Callback stage: validates the provider redirect and completes authorization.

// crates.io
use oauth2::http::Method;
// self
use crate::{
	_prelude::*,
	error::ProtocolError,
	exchange::{Exchange, Response},
	flows::{OAuth2ClientFilter, common},
	nonce::StateParameter,
	session::Session,
};

pub(super) async fn handle(
	filter: &OAuth2ClientFilter,
	exchange: &mut Exchange,
	session: &Session,
	endpoint: &str,
) -> Result<Response> {
	if exchange.method() != Method::GET {
		return Err(ProtocolError::invalid_request("callback request must be a GET").into());
	}

	let Some(raw_state) = exchange.query_param("state") else {
		return Err(ProtocolError::invalid_request(
			"callback request is missing the state parameter",
		)
		.into());
	};

	if !session.is_authorizing() {
		return Err(ProtocolError::invalid_request(
			"no authorization is in progress for this session",
		)
		.into());
	}

	let state = StateParameter::decode(&raw_state);
	let Some(nonce) = session.authorization_request_nonce() else {
		return Err(ProtocolError::invalid_request(
			"session carries no authorization request nonce",
		)
		.into());
	};

	// An exact hash comparison; mismatch means a forged or replayed callback.
	if !state.matches(nonce) {
		return Err(ProtocolError::invalid_request(
			"state parameter does not match this session",
		)
		.into());
	}

	let Some(code) = exchange.query_param("code") else {
		return Err(ProtocolError::from_callback_params(
			exchange.query_param("error"),
			exchange.query_param("error_description"),
			exchange.query_param("error_uri"),
		)
		.into());
	};
	let Some(name) = session.client_registration_name() else {
		return Err(
			ProtocolError::invalid_request("session names no client registration").into()
		);
	};
	let registration = common::find_registration(filter, name).ok_or_else(|| {
		ProtocolError::invalid_request(format!("unknown client registration `{name}`"))
	})?;
	let callback_uri = common::stage_uri(exchange, endpoint, "/callback");
	let token_response = registration.exchange_code(&code, &callback_uri).await?;
	let authorized = session.complete_authorization(token_response)?;
	// The store may attach data to the response, so the response is built
	// before the session is persisted.
	let mut response =
		common::goto_response(exchange, state.goto_uri, filter.default_login_goto.as_ref())?;

	filter.store.save(exchange, &mut response, &authorized, endpoint).await?;

	Ok(response)
}
