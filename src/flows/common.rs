//! Helpers shared by the stage handlers.

// self
use crate::{
	_prelude::*,
	exchange::{self, Exchange, Response},
	expr::Expression,
	flows::OAuth2ClientFilter,
	nonce::{self, StateParameter},
	obs,
	registration::ClientRegistration,
	session::Session,
};

/// Path component of a client endpoint that may be absolute or path-only.
pub(super) fn endpoint_path(endpoint: &str) -> String {
	match Url::parse(endpoint) {
		Ok(uri) if matches!(uri.scheme(), "http" | "https") => uri.path().to_owned(),
		_ => endpoint.to_owned(),
	}
}

/// Builds the absolute URI of a stage sub-path under the client endpoint.
///
/// An absolute endpoint fixes scheme and authority itself; a path-only
/// endpoint inherits them from the inbound request URI.
pub(super) fn stage_uri(exchange: &Exchange, endpoint: &str, suffix: &str) -> Url {
	let mut uri = match Url::parse(endpoint) {
		Ok(base) if matches!(base.scheme(), "http" | "https") => base,
		_ => exchange.uri().clone(),
	};
	let path = format!("{}{suffix}", endpoint_path(endpoint).trim_end_matches('/'));

	uri.set_path(&path);
	uri.set_query(None);
	uri.set_fragment(None);

	uri
}

/// Evaluates an optional configured expression against the request.
pub(super) fn eval_optional(
	expression: Option<&Arc<dyn Expression>>,
	exchange: &Exchange,
) -> Result<Option<String>> {
	Ok(expression.map(|expression| expression.eval(exchange)).transpose()?)
}

/// Builds the post-flow response: redirect to the goto URI, the configured
/// default, or a bare 200 when neither is set.
pub(super) fn goto_response(
	exchange: &Exchange,
	goto_uri: Option<String>,
	default: Option<&Arc<dyn Expression>>,
) -> Result<Response> {
	let target = match goto_uri.filter(|uri| !uri.is_empty()) {
		Some(uri) => Some(uri),
		None => eval_optional(default, exchange)?.filter(|uri| !uri.is_empty()),
	};

	match target {
		Some(uri) => exchange::redirect(&uri),
		None => Ok(exchange::ok()),
	}
}

/// Resolves a registration by name, logging failures as "absent".
pub(super) fn find_registration(
	filter: &OAuth2ClientFilter,
	name: &str,
) -> Option<Arc<dyn ClientRegistration>> {
	let registration = filter.registrations.find(name);

	if registration.is_none() {
		obs::log_debug(format_args!("Client registration `{name}` could not be resolved."));
	}

	registration
}

/// Issues the provider authorization redirect and persists the Authorizing
/// session onto it.
pub(super) async fn authorization_redirect(
	filter: &OAuth2ClientFilter,
	exchange: &Exchange,
	session: &Session,
	endpoint: &str,
	registration: &Arc<dyn ClientRegistration>,
) -> Result<Response> {
	let callback_uri = stage_uri(exchange, endpoint, "/callback");
	let goto_uri = match exchange.query_param("goto") {
		Some(goto_uri) => Some(goto_uri),
		None => eval_optional(filter.default_login_goto.as_ref(), exchange)?,
	};
	let nonce = nonce::generate_nonce();
	let state = StateParameter::new(&nonce, goto_uri).encode();
	let authorization_uri = registration.authorization_request_uri(&callback_uri, &state)?;
	let mut response = exchange::redirect(authorization_uri.as_str())?;
	let authorizing = session.start_authorizing(nonce, registration.name());

	filter.store.save(exchange, &mut response, &authorizing, endpoint).await?;

	Ok(response)
}
