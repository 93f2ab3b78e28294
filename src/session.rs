//! Immutable authorization-session model and its permitted transitions.
//!
//! A [`Session`] is a value: the three transitions ([`Session::start_authorizing`],
//! [`Session::complete_authorization`], [`Session::refresh`]) each yield a new
//! instance and the caller decides whether to persist it. Requests sharing a
//! persisted session therefore never race on session data itself; last writer
//! wins at the store.

// self
use crate::_prelude::*;

/// JSON object shape used for provider responses and claims throughout the filter.
pub type JsonObject = serde_json::Map<String, Value>;

/// Errors raised by illegal [`Session`] transitions.
///
/// Transition misuse is a programming error on the caller's side, surfaced as a
/// typed error rather than a silent no-op.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SessionTransitionError {
	/// `complete_authorization` was called while no authorization was in progress.
	#[error("No authorization is in progress for this session.")]
	NotAuthorizing,
	/// `refresh` was called on a session that holds no tokens.
	#[error("Session is not authorized and cannot be refreshed.")]
	NotAuthorized,
	/// The provider response did not contain an `access_token`.
	#[error("Provider response is missing an access_token.")]
	MissingAccessToken,
}

/// Authorization state of a [`Session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
	/// No authorization has been performed or the state was reset.
	Unauthenticated,
	/// A redirect to the provider was issued and the callback is pending.
	Authorizing,
	/// Tokens were obtained and the end-user is authorized.
	Authorized,
}

/// Immutable value describing the client's authorization state.
///
/// The full provider token response is retained verbatim so it can be echoed
/// downstream; the token accessors derive their values from it on demand.
#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
	client_registration_name: Option<String>,
	state: SessionState,
	authorization_request_nonce: Option<String>,
	client_endpoint: String,
	access_token_response: JsonObject,
}
impl Session {
	/// Creates a fresh unauthenticated session scoped to the provided endpoint.
	pub fn empty(client_endpoint: impl Into<String>) -> Self {
		Self {
			client_registration_name: None,
			state: SessionState::Unauthenticated,
			authorization_request_nonce: None,
			client_endpoint: client_endpoint.into(),
			access_token_response: JsonObject::new(),
		}
	}

	/// Begins an authorization round-trip against the named registration.
	///
	/// The nonce stays attached until the callback completes or the session is
	/// reset; any previously held tokens are discarded.
	pub fn start_authorizing(
		&self,
		nonce: impl Into<String>,
		registration_name: impl Into<String>,
	) -> Self {
		Self {
			client_registration_name: Some(registration_name.into()),
			state: SessionState::Authorizing,
			authorization_request_nonce: Some(nonce.into()),
			client_endpoint: self.client_endpoint.clone(),
			access_token_response: JsonObject::new(),
		}
	}

	/// Completes the round-trip with the provider's token response.
	///
	/// Token fields are populated atomically from the single response, and the
	/// nonce is cleared. Only valid while [`SessionState::Authorizing`].
	pub fn complete_authorization(
		&self,
		access_token_response: JsonObject,
	) -> Result<Self, SessionTransitionError> {
		if !self.is_authorizing() {
			return Err(SessionTransitionError::NotAuthorizing);
		}
		if !has_access_token(&access_token_response) {
			return Err(SessionTransitionError::MissingAccessToken);
		}

		Ok(Self {
			client_registration_name: self.client_registration_name.clone(),
			state: SessionState::Authorized,
			authorization_request_nonce: None,
			client_endpoint: self.client_endpoint.clone(),
			access_token_response,
		})
	}

	/// Replaces the token state with a refreshed provider response.
	///
	/// Providers may omit `refresh_token` when rotating access tokens; the
	/// previously issued refresh token is carried over in that case. Only valid
	/// while [`SessionState::Authorized`].
	pub fn refresh(
		&self,
		access_token_response: JsonObject,
	) -> Result<Self, SessionTransitionError> {
		if !self.is_authorized() {
			return Err(SessionTransitionError::NotAuthorized);
		}
		if !has_access_token(&access_token_response) {
			return Err(SessionTransitionError::MissingAccessToken);
		}

		let mut merged = access_token_response;

		if !merged.contains_key("refresh_token")
			&& let Some(refresh_token) = self.access_token_response.get("refresh_token")
		{
			merged.insert("refresh_token".into(), refresh_token.clone());
		}

		Ok(Self {
			client_registration_name: self.client_registration_name.clone(),
			state: SessionState::Authorized,
			authorization_request_nonce: None,
			client_endpoint: self.client_endpoint.clone(),
			access_token_response: merged,
		})
	}

	/// Current authorization state.
	pub fn state(&self) -> SessionState {
		self.state
	}

	/// Returns `true` while a callback is pending.
	pub fn is_authorizing(&self) -> bool {
		matches!(self.state, SessionState::Authorizing)
	}

	/// Returns `true` once tokens were obtained.
	pub fn is_authorized(&self) -> bool {
		matches!(self.state, SessionState::Authorized)
	}

	/// Name of the registration this session authorizes against, if any.
	pub fn client_registration_name(&self) -> Option<&str> {
		self.client_registration_name.as_deref()
	}

	/// Nonce attached to the in-flight authorization request, if any.
	pub fn authorization_request_nonce(&self) -> Option<&str> {
		self.authorization_request_nonce.as_deref()
	}

	/// Base URI this session is scoped to.
	pub fn client_endpoint(&self) -> &str {
		&self.client_endpoint
	}

	/// The raw provider token response echoed downstream.
	pub fn access_token_response(&self) -> &JsonObject {
		&self.access_token_response
	}

	/// Access token issued by the provider; present iff the session is authorized.
	pub fn access_token(&self) -> Option<&str> {
		self.response_str("access_token")
	}

	/// Refresh token issued by the provider, if any.
	pub fn refresh_token(&self) -> Option<&str> {
		self.response_str("refresh_token")
	}

	/// Compact serialized ID token, if the provider issued one.
	pub fn id_token(&self) -> Option<&str> {
		self.response_str("id_token")
	}

	/// Token type reported by the provider (typically `Bearer`).
	pub fn token_type(&self) -> Option<&str> {
		self.response_str("token_type")
	}

	/// Remaining token lifetime in seconds, as reported at issuance.
	pub fn expires_in(&self) -> Option<i64> {
		self.access_token_response.get("expires_in").and_then(Value::as_i64)
	}

	/// Scopes granted by the provider.
	///
	/// Accepts both the space-delimited wire form and the array form some
	/// providers return.
	pub fn scopes(&self) -> BTreeSet<String> {
		match self.access_token_response.get("scope") {
			Some(Value::String(raw)) => raw.split_whitespace().map(str::to_owned).collect(),
			Some(Value::Array(values)) =>
				values.iter().filter_map(Value::as_str).map(str::to_owned).collect(),
			_ => BTreeSet::new(),
		}
	}

	fn response_str(&self, key: &str) -> Option<&str> {
		self.access_token_response.get(key).and_then(Value::as_str)
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("client_registration_name", &self.client_registration_name)
			.field("state", &self.state)
			.field("client_endpoint", &self.client_endpoint)
			.field("access_token", &self.access_token().map(|_| "<redacted>"))
			.field("refresh_token", &self.refresh_token().map(|_| "<redacted>"))
			.field("scopes", &self.scopes())
			.finish()
	}
}

fn has_access_token(response: &JsonObject) -> bool {
	response.get("access_token").and_then(Value::as_str).is_some_and(|token| !token.is_empty())
}
