//! Claims assembly for downstream consumption.
//!
//! Authorized requests carry a [`ClaimsMap`] in the exchange attributes: the
//! eager token-derived values plus, when the registration exposes a user-info
//! endpoint, a [`LazyUserInfo`] handle. User-info is only fetched when a
//! downstream consumer actually resolves the handle, and resolved values are
//! shared through the [`UserInfoCache`].

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	cache::UserInfoCache,
	error::ProtocolError,
	obs,
	registration::ClientRegistration,
	session::Session,
};

/// Claims exposed to downstream consumers through an exchange attribute.
#[derive(Clone, Debug, Default)]
pub struct ClaimsMap {
	values: JsonObject,
	user_info: Option<LazyUserInfo>,
}
impl ClaimsMap {
	/// Wraps the eager claim values.
	pub fn from_values(values: JsonObject) -> Self {
		Self { values, user_info: None }
	}

	/// Attaches a deferred user-info handle.
	pub fn with_user_info(mut self, user_info: LazyUserInfo) -> Self {
		self.user_info = Some(user_info);

		self
	}

	/// Eagerly available claim values.
	pub fn values(&self) -> &JsonObject {
		&self.values
	}

	/// Single eager claim value by key.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.values.get(key)
	}

	/// Resolves the user-info claims, fetching them on first access.
	///
	/// Returns `None` when no user-info handle is attached. Fetch failures
	/// degrade to an empty map instead of propagating, so a flaky user-info
	/// endpoint never breaks an otherwise authorized request.
	pub async fn user_info(&self) -> Option<JsonObject> {
		let user_info = self.user_info.as_ref()?;

		match user_info.resolve().await {
			Ok(claims) => Some(claims),
			Err(err) => {
				obs::log_warn(format_args!("User-info lookup failed: {err}."));

				Some(JsonObject::new())
			},
		}
	}
}

/// Deferred user-info lookup bound to one access token.
#[derive(Clone)]
pub struct LazyUserInfo {
	registration: Arc<dyn ClientRegistration>,
	cache: Arc<UserInfoCache>,
	access_token: String,
}
impl LazyUserInfo {
	/// Binds the lookup to a registration, cache, and access token.
	pub fn new(
		registration: Arc<dyn ClientRegistration>,
		cache: Arc<UserInfoCache>,
		access_token: impl Into<String>,
	) -> Self {
		Self { registration, cache, access_token: access_token.into() }
	}

	/// Fetches the user-info claims through the cache.
	pub async fn resolve(&self) -> Result<JsonObject> {
		self.cache
			.get(&self.access_token, || self.registration.user_info(&self.access_token))
			.await
	}
}
impl Debug for LazyUserInfo {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LazyUserInfo")
			.field("registration", &self.registration.name())
			.field("access_token", &"<redacted>")
			.finish()
	}
}

/// Extracts claims from a compact serialized ID token.
pub trait IdTokenParser
where
	Self: Send + Sync,
{
	/// Parses the compact form into its claim set.
	fn parse(&self, compact: &str) -> Result<JsonObject>;
}

/// Decodes the ID-token payload without verifying its signature.
///
/// The token was obtained directly from the token endpoint over TLS, so this
/// deployment trusts transport integrity instead of validating the JWS.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnverifiedIdTokenParser;
impl IdTokenParser for UnverifiedIdTokenParser {
	fn parse(&self, compact: &str) -> Result<JsonObject> {
		let mut segments = compact.split('.');
		let payload = segments
			.nth(1)
			.filter(|segment| !segment.is_empty())
			.ok_or_else(|| ProtocolError::invalid_request("ID token is not in compact form"))?;
		let json = URL_SAFE_NO_PAD.decode(payload).map_err(|_| {
			Error::from(ProtocolError::invalid_request("ID token payload is not valid base64url"))
		})?;

		serde_json::from_slice(&json).map_err(|err| {
			ProtocolError::invalid_request(format!("ID token claims could not be parsed: {err}"))
				.into()
		})
	}
}

/// Builds the eager claims exposed for an authorized session.
///
/// The map mirrors the raw token response and overlays the normalized fields
/// (`client_registration`, `client_endpoint`, an array-form `scope`, decoded
/// `id_token_claims`).
pub fn session_claims(session: &Session, parser: &dyn IdTokenParser) -> JsonObject {
	let mut claims = session.access_token_response().clone();

	if let Some(registration_name) = session.client_registration_name() {
		claims.insert("client_registration".into(), Value::String(registration_name.into()));
	}

	claims.insert("client_endpoint".into(), Value::String(session.client_endpoint().into()));

	let scopes = session.scopes();

	if !scopes.is_empty() {
		claims.insert(
			"scope".into(),
			Value::Array(scopes.into_iter().map(Value::String).collect()),
		);
	}

	if let Some(id_token) = session.id_token() {
		claims.insert("id_token".into(), Value::String(id_token.into()));

		match parser.parse(id_token) {
			Ok(id_token_claims) =>
				drop(claims.insert("id_token_claims".into(), Value::Object(id_token_claims))),
			Err(err) =>
				obs::log_warn(format_args!("Discarding unparsable ID token claims: {err}.")),
		}
	}

	claims
}

/// Builds the claims handed to the failure handler.
///
/// The error fields land next to whatever session state was reached, so a
/// failure page can still tell a half-authorized user from an anonymous one.
pub fn error_claims(
	error: &ProtocolError,
	session: Option<&Session>,
	parser: &dyn IdTokenParser,
) -> JsonObject {
	let mut claims = session.map(|session| session_claims(session, parser)).unwrap_or_default();

	claims.extend(error.to_claims());

	claims
}
