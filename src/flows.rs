//! The delegated-authorization filter and its per-stage request handling.
//!
//! [`OAuth2ClientFilter::filter`] is the single entry point: it resolves the
//! client endpoint for the request, classifies the request into one of the
//! four stages, runs the matching stage handler, and collapses any stage
//! error into the configured failure handler exactly once.

mod common;

mod callback;
mod login;
mod logout;
mod protected;

// self
use crate::{
	_prelude::*,
	cache::{self, UserInfoCache},
	claims::{self, ClaimsMap, IdTokenParser, UnverifiedIdTokenParser},
	error::ProtocolError,
	exchange::{self, Exchange, Response},
	expr::Expression,
	handler::Handler,
	obs::{self, StageKind, StageOutcome, StageSpan},
	registration::RegistrationLookup,
	session::Session,
	store::SessionStore,
};

/// Default attribute target the claims map is written to.
pub const DEFAULT_TARGET: &str = "openid";

/// Reverse-proxy filter driving the OAuth 2.0 authorization-code flow.
///
/// The filter is a value shared across requests; per-request state lives on
/// the [`Exchange`] and in the persisted [`Session`].
pub struct OAuth2ClientFilter {
	client_endpoint: Arc<dyn Expression>,
	target: String,
	registrations: Arc<dyn RegistrationLookup>,
	client_registration_name: Option<String>,
	login_handler: Option<Arc<dyn Handler>>,
	failure_handler: Arc<dyn Handler>,
	discovery_handler: Option<Arc<dyn Handler>>,
	default_login_goto: Option<Arc<dyn Expression>>,
	default_logout_goto: Option<Arc<dyn Expression>>,
	require_https: bool,
	require_login: bool,
	store: Arc<dyn SessionStore>,
	user_info_cache: Arc<UserInfoCache>,
	id_token_parser: Arc<dyn IdTokenParser>,
}
impl OAuth2ClientFilter {
	/// Creates a filter from its required collaborators.
	///
	/// Everything else starts from the documented defaults: target `"openid"`,
	/// HTTPS and login required, a 20-second user-info cache, unverified
	/// ID-token parsing.
	pub fn new(
		client_endpoint: impl Expression + 'static,
		registrations: impl RegistrationLookup + 'static,
		store: impl SessionStore + 'static,
		failure_handler: impl Handler + 'static,
	) -> Self {
		Self {
			client_endpoint: Arc::new(client_endpoint),
			target: DEFAULT_TARGET.into(),
			registrations: Arc::new(registrations),
			client_registration_name: None,
			login_handler: None,
			failure_handler: Arc::new(failure_handler),
			discovery_handler: None,
			default_login_goto: None,
			default_logout_goto: None,
			require_https: true,
			require_login: true,
			store: Arc::new(store),
			user_info_cache: Arc::new(UserInfoCache::new(cache::DEFAULT_EXPIRATION)),
			id_token_parser: Arc::new(UnverifiedIdTokenParser),
		}
	}

	/// Overrides the attribute target the claims map is written to.
	pub fn with_target(mut self, target: impl Into<String>) -> Self {
		self.target = target.into();

		self
	}

	/// Names the registration used when requests do not select one themselves.
	pub fn with_client_registration_name(mut self, name: impl Into<String>) -> Self {
		self.client_registration_name = Some(name.into());

		self
	}

	/// Sets the login chooser invoked when no registration can be selected.
	pub fn with_login_handler(mut self, handler: impl Handler + 'static) -> Self {
		self.login_handler = Some(Arc::new(handler));

		self
	}

	/// Sets the discovery/dynamic-registration sub-chain.
	pub fn with_discovery_handler(mut self, handler: impl Handler + 'static) -> Self {
		self.discovery_handler = Some(Arc::new(handler));

		self
	}

	/// Sets the post-login redirect target used when the request has no `goto`.
	pub fn with_default_login_goto(mut self, goto_uri: impl Expression + 'static) -> Self {
		self.default_login_goto = Some(Arc::new(goto_uri));

		self
	}

	/// Sets the post-logout redirect target used when the request has no `goto`.
	pub fn with_default_logout_goto(mut self, goto_uri: impl Expression + 'static) -> Self {
		self.default_logout_goto = Some(Arc::new(goto_uri));

		self
	}

	/// Controls whether login and callback requests must arrive over TLS.
	pub fn with_require_https(mut self, require_https: bool) -> Self {
		self.require_https = require_https;

		self
	}

	/// Controls whether unauthorized protected requests are driven to login.
	pub fn with_require_login(mut self, require_login: bool) -> Self {
		self.require_login = require_login;

		self
	}

	/// Replaces the user-info cache lifetime; zero disables caching.
	pub fn with_cache_expiration(mut self, expiration: Duration) -> Self {
		self.user_info_cache = Arc::new(UserInfoCache::new(expiration));

		self
	}

	/// Replaces the ID-token parser.
	pub fn with_id_token_parser(mut self, parser: impl IdTokenParser + 'static) -> Self {
		self.id_token_parser = Arc::new(parser);

		self
	}

	/// The user-info cache backing the lazily resolved claims.
	pub fn user_info_cache(&self) -> &Arc<UserInfoCache> {
		&self.user_info_cache
	}

	/// Processes one request, delegating protected traffic to `next`.
	pub async fn filter(&self, exchange: &mut Exchange, next: &dyn Handler) -> Response {
		let endpoint = match self.client_endpoint.eval(exchange) {
			Ok(endpoint) => endpoint,
			Err(err) => return self.fail(exchange, None, err.into()).await,
		};
		let stage = Stage::classify(exchange.path(), &endpoint);
		let span = StageSpan::new(stage.kind(), &endpoint);

		obs::record_stage_outcome(stage.kind(), StageOutcome::Attempt);

		let session = span.instrument(self.load_session(exchange, &endpoint)).await;
		let result =
			span.instrument(self.dispatch(stage, exchange, &session, &endpoint, next)).await;

		match result {
			Ok(response) => {
				obs::record_stage_outcome(stage.kind(), StageOutcome::Success);

				response
			},
			Err(err) => {
				obs::record_stage_outcome(stage.kind(), StageOutcome::Failure);

				span.instrument(self.fail(exchange, Some(&session), err)).await
			},
		}
	}

	async fn dispatch(
		&self,
		stage: Stage,
		exchange: &mut Exchange,
		session: &Session,
		endpoint: &str,
		next: &dyn Handler,
	) -> Result<Response> {
		if matches!(stage, Stage::Login | Stage::Callback)
			&& self.require_https
			&& !exchange.is_secure()
		{
			return Err(ProtocolError::invalid_request(
				"authorization requests must use a secure transport",
			)
			.into());
		}

		match stage {
			Stage::Login => login::handle(self, exchange, session, endpoint).await,
			Stage::Callback => callback::handle(self, exchange, session, endpoint).await,
			Stage::Logout => logout::handle(self, exchange, endpoint).await,
			Stage::Protected => protected::handle(self, exchange, session, endpoint, next).await,
		}
	}

	/// Loads the persisted session, falling back to a fresh one.
	///
	/// Store failures are lenient by design: an unreadable session is
	/// indistinguishable from an absent one and restarts the flow.
	async fn load_session(&self, exchange: &Exchange, endpoint: &str) -> Session {
		match self.store.load(exchange, endpoint).await {
			Ok(Some(session)) => session,
			Ok(None) => Session::empty(endpoint),
			Err(err) => {
				obs::log_warn(format_args!("Discarding unloadable session state: {err}."));

				Session::empty(endpoint)
			},
		}
	}

	/// Collapses a stage error into the failure-handler invocation.
	async fn fail(&self, exchange: &mut Exchange, session: Option<&Session>, err: Error) -> Response {
		let Error::Protocol(protocol_error) = err else {
			obs::log_warn(format_args!("Stage failed outside the protocol taxonomy: {err}."));

			return exchange::server_error();
		};

		if protocol_error.is_benign() {
			obs::log_debug(format_args!("Authorization failed: {protocol_error}."));
		} else {
			obs::log_warn(format_args!("Authorization failed: {protocol_error}."));
		}

		let claims =
			claims::error_claims(&protocol_error, session, self.id_token_parser.as_ref());

		exchange.set_attribute(self.target.clone(), ClaimsMap::from_values(claims));

		self.failure_handler.handle(exchange).await
	}
}
impl Debug for OAuth2ClientFilter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2ClientFilter")
			.field("target", &self.target)
			.field("client_registration_name", &self.client_registration_name)
			.field("require_https", &self.require_https)
			.field("require_login", &self.require_login)
			.field("user_info_cache", &self.user_info_cache)
			.finish_non_exhaustive()
	}
}

/// Flow stage a request dispatches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
	Login,
	Callback,
	Logout,
	Protected,
}
impl Stage {
	/// Classifies a request path relative to the resolved client endpoint.
	///
	/// Exactly one stage matches; anything that is not one of the three named
	/// sub-paths is protected traffic.
	fn classify(path: &str, endpoint: &str) -> Self {
		let base = common::endpoint_path(endpoint);
		let base = base.trim_end_matches('/');

		match path.strip_prefix(base) {
			Some("/login") => Stage::Login,
			Some("/callback") => Stage::Callback,
			Some("/logout") => Stage::Logout,
			_ => Stage::Protected,
		}
	}

	fn kind(self) -> StageKind {
		match self {
			Stage::Login => StageKind::Login,
			Stage::Callback => StageKind::Callback,
			Stage::Logout => StageKind::Logout,
			Stage::Protected => StageKind::Protected,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn stage_classification_is_path_relative() {
		assert_eq!(Stage::classify("/openid/login", "/openid"), Stage::Login);
		assert_eq!(Stage::classify("/openid/callback", "/openid"), Stage::Callback);
		assert_eq!(Stage::classify("/openid/logout", "/openid"), Stage::Logout);
		assert_eq!(Stage::classify("/openid", "/openid"), Stage::Protected);
		assert_eq!(Stage::classify("/app/resource", "/openid"), Stage::Protected);
		assert_eq!(Stage::classify("/openid/login/extra", "/openid"), Stage::Protected);
	}

	#[test]
	fn stage_classification_accepts_absolute_endpoints() {
		assert_eq!(Stage::classify("/openid/login", "https://rp.example/openid"), Stage::Login);
		assert_eq!(
			Stage::classify("/openid/logout", "https://rp.example/openid/"),
			Stage::Logout
		);
	}
}
