//! Protected-resource stage: claims injection and refresh-on-401.

// crates.io
use oauth2::http::StatusCode;
// self
use crate::{
	_prelude::*,
	claims::{self, ClaimsMap, LazyUserInfo},
	error::ProtocolError,
	exchange::{Exchange, Response},
	flows::{OAuth2ClientFilter, common},
	handler::Handler,
	session::Session,
};

pub(super) async fn handle(
	filter: &OAuth2ClientFilter,
	exchange: &mut Exchange,
	session: &Session,
	endpoint: &str,
	next: &dyn Handler,
) -> Result<Response> {
	let authorized = session.is_authorized();

	if !authorized && filter.require_login {
		return send_login(filter, exchange, session, endpoint).await;
	}
	if authorized {
		install_claims(filter, exchange, session);
	}

	let response = next.handle(exchange).await;

	if response.status() != StatusCode::UNAUTHORIZED {
		// Nothing changed; the loaded session is not re-persisted.
		return Ok(response);
	}

	// Downstream rejected the credentials. An unauthorized session (or one
	// without refresh credentials) gets a fresh authorization redirect in
	// place of the downstream response; an authorized one gets exactly one
	// refresh attempt.
	if !authorized {
		return send_login(filter, exchange, session, endpoint).await;
	}

	let Some(refresh_token) = session.refresh_token() else {
		return send_login(filter, exchange, session, endpoint).await;
	};
	let Some(name) = session.client_registration_name() else {
		return Err(
			ProtocolError::invalid_request("session names no client registration").into()
		);
	};
	let registration = common::find_registration(filter, name).ok_or_else(|| {
		ProtocolError::invalid_request(format!("unknown client registration `{name}`"))
	})?;
	let token_response = registration.refresh(refresh_token).await?;
	let refreshed = session.refresh(token_response)?;

	// The response already issued downstream stands; the refreshed claims and
	// session only benefit subsequent requests.
	install_claims(filter, exchange, &refreshed);

	let mut response = response;

	filter.store.save(exchange, &mut response, &refreshed, endpoint).await?;

	Ok(response)
}

/// Drives an unauthorized end-user to authorization: the configured
/// registration when one is named, otherwise the login chooser.
async fn send_login(
	filter: &OAuth2ClientFilter,
	exchange: &mut Exchange,
	session: &Session,
	endpoint: &str,
) -> Result<Response> {
	if let Some(name) = &filter.client_registration_name
		&& let Some(registration) = common::find_registration(filter, name)
	{
		return common::authorization_redirect(filter, exchange, session, endpoint, &registration)
			.await;
	}
	if let Some(login_handler) = &filter.login_handler {
		return Ok(login_handler.handle(exchange).await);
	}

	Err(ProtocolError::invalid_request(
		"no client registration or login handler is configured",
	)
	.into())
}

/// Writes the session's claims map to the configured attribute target.
///
/// The deferred `user_info` handle is attached only when the registration
/// exposes a user-info endpoint, `openid` is among the granted scopes, and an
/// access token is present.
fn install_claims(filter: &OAuth2ClientFilter, exchange: &mut Exchange, session: &Session) {
	let mut claims_map =
		ClaimsMap::from_values(claims::session_claims(session, filter.id_token_parser.as_ref()));

	if let Some(name) = session.client_registration_name()
		&& let Some(registration) = filter.registrations.find(name)
		&& registration.has_user_info_endpoint()
		&& session.scopes().contains("openid")
		&& let Some(access_token) = session.access_token()
	{
		claims_map = claims_map.with_user_info(LazyUserInfo::new(
			registration,
			filter.user_info_cache.clone(),
			access_token,
		));
	}

	exchange.set_attribute(filter.target.clone(), claims_map);
}
