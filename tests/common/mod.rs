//! Shared fixtures for the filter integration suites.

#![allow(dead_code)]

// std
use std::sync::{
	Arc, Mutex,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use serde_json::{Value, json};
// self
use oauth2_gatekeeper::{
	claims::ClaimsMap,
	error::{ProtocolError, Result},
	exchange::{self, Exchange},
	handler::{Handler, HandlerFuture},
	http::{Method, StatusCode},
	registration::{ClientRegistration, RegistrationFuture},
	session::{JsonObject, Session},
	store::{MemoryStore, SessionStore, StoreFuture},
	url::Url,
};

/// Builds an exchange for the provided request line.
pub fn request(method: Method, raw_uri: &str) -> Exchange {
	Exchange::new(method, Url::parse(raw_uri).expect("Test URI should parse."))
}

/// Unwraps a `json!` literal into the map form the filter works with.
pub fn json_object(value: Value) -> JsonObject {
	match value {
		Value::Object(map) => map,
		_ => panic!("Fixture must be a JSON object."),
	}
}

/// Canned provider token response.
pub fn token_response(access_token: &str, refresh_token: Option<&str>) -> JsonObject {
	let mut response = json_object(json!({
		"access_token": access_token,
		"token_type": "Bearer",
		"expires_in": 3599,
		"scope": "openid profile",
	}));

	if let Some(refresh_token) = refresh_token {
		response.insert("refresh_token".into(), Value::String(refresh_token.into()));
	}

	response
}

/// Builds an authorized session fixture scoped to `endpoint`.
pub fn authorized_session(endpoint: &str, registration: &str, refresh: Option<&str>) -> Session {
	Session::empty(endpoint)
		.start_authorizing("nonce-seed", registration)
		.complete_authorization(token_response("at-1", refresh))
		.expect("Session fixture should authorize.")
}

/// Registration double serving canned provider responses and counting calls.
pub struct ScriptedRegistration {
	name: String,
	scopes: Vec<String>,
	user_info_endpoint: bool,
	token_response: JsonObject,
	refresh_response: Option<JsonObject>,
	user_info_claims: JsonObject,
	exchange_calls: AtomicUsize,
	refresh_calls: AtomicUsize,
	user_info_calls: AtomicUsize,
}
impl ScriptedRegistration {
	pub fn new(name: &str) -> Self {
		Self {
			name: name.into(),
			scopes: vec!["openid".into(), "profile".into()],
			user_info_endpoint: true,
			token_response: token_response("at-1", Some("rt-1")),
			refresh_response: Some(token_response("at-2", None)),
			user_info_claims: json_object(json!({ "sub": "alice", "name": "Alice" })),
			exchange_calls: AtomicUsize::new(0),
			refresh_calls: AtomicUsize::new(0),
			user_info_calls: AtomicUsize::new(0),
		}
	}

	pub fn without_user_info(mut self) -> Self {
		self.user_info_endpoint = false;

		self
	}

	pub fn with_token_response(mut self, response: JsonObject) -> Self {
		self.token_response = response;

		self
	}

	pub fn with_failing_refresh(mut self) -> Self {
		self.refresh_response = None;

		self
	}

	pub fn exchange_count(&self) -> usize {
		self.exchange_calls.load(Ordering::SeqCst)
	}

	pub fn refresh_count(&self) -> usize {
		self.refresh_calls.load(Ordering::SeqCst)
	}

	pub fn user_info_count(&self) -> usize {
		self.user_info_calls.load(Ordering::SeqCst)
	}
}
impl ClientRegistration for ScriptedRegistration {
	fn name(&self) -> &str {
		&self.name
	}

	fn scopes(&self) -> &[String] {
		&self.scopes
	}

	fn has_user_info_endpoint(&self) -> bool {
		self.user_info_endpoint
	}

	fn authorization_request_uri(&self, callback_uri: &Url, state: &str) -> Result<Url> {
		let mut uri = Url::parse("https://provider.example/oauth2/authorize")
			.expect("Authorization endpoint fixture should parse.");

		uri.query_pairs_mut()
			.append_pair("response_type", "code")
			.append_pair("client_id", "client-1")
			.append_pair("redirect_uri", callback_uri.as_str())
			.append_pair("scope", &self.scopes.join(" "))
			.append_pair("state", state);

		Ok(uri)
	}

	fn exchange_code<'a>(&'a self, _: &'a str, _: &'a Url) -> RegistrationFuture<'a, JsonObject> {
		Box::pin(async move {
			self.exchange_calls.fetch_add(1, Ordering::SeqCst);

			Ok(self.token_response.clone())
		})
	}

	fn refresh<'a>(&'a self, _: &'a str) -> RegistrationFuture<'a, JsonObject> {
		Box::pin(async move {
			self.refresh_calls.fetch_add(1, Ordering::SeqCst);

			match &self.refresh_response {
				Some(response) => Ok(response.clone()),
				None => Err(ProtocolError::provider("invalid_grant")
					.with_description("refresh token revoked")
					.into()),
			}
		})
	}

	fn user_info<'a>(&'a self, _: &'a str) -> RegistrationFuture<'a, JsonObject> {
		Box::pin(async move {
			self.user_info_calls.fetch_add(1, Ordering::SeqCst);

			Ok(self.user_info_claims.clone())
		})
	}
}

/// Handler double that records invocations and the claims it was handed.
#[derive(Clone)]
pub struct RecordingHandler {
	status: StatusCode,
	target: String,
	calls: Arc<AtomicUsize>,
	captured: Arc<Mutex<Option<ClaimsMap>>>,
}
impl RecordingHandler {
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			target: "openid".into(),
			calls: Arc::new(AtomicUsize::new(0)),
			captured: Arc::new(Mutex::new(None)),
		}
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn captured(&self) -> Option<ClaimsMap> {
		self.captured.lock().expect("Captured claims lock should not be poisoned.").clone()
	}
}
impl Handler for RecordingHandler {
	fn handle<'a>(&'a self, exchange: &'a mut Exchange) -> HandlerFuture<'a> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			*self.captured.lock().expect("Captured claims lock should not be poisoned.") =
				exchange.attribute(&self.target).cloned();

			exchange::empty(self.status)
		})
	}
}

/// Session store wrapper counting write-path invocations.
#[derive(Clone, Default)]
pub struct CountingStore {
	inner: MemoryStore,
	saves: Arc<AtomicUsize>,
	removes: Arc<AtomicUsize>,
}
impl CountingStore {
	pub fn seed(&self, endpoint: &str, session: Session) {
		self.inner.seed(endpoint, session);
	}

	pub fn peek(&self, endpoint: &str) -> Option<Session> {
		self.inner.peek(endpoint)
	}

	pub fn saves(&self) -> usize {
		self.saves.load(Ordering::SeqCst)
	}

	pub fn removes(&self) -> usize {
		self.removes.load(Ordering::SeqCst)
	}
}
impl SessionStore for CountingStore {
	fn load<'a>(
		&'a self,
		exchange: &'a Exchange,
		endpoint: &'a str,
	) -> StoreFuture<'a, Option<Session>> {
		self.inner.load(exchange, endpoint)
	}

	fn save<'a>(
		&'a self,
		exchange: &'a Exchange,
		response: &'a mut exchange::Response,
		session: &'a Session,
		endpoint: &'a str,
	) -> StoreFuture<'a, ()> {
		self.saves.fetch_add(1, Ordering::SeqCst);

		self.inner.save(exchange, response, session, endpoint)
	}

	fn remove<'a>(
		&'a self,
		exchange: &'a Exchange,
		response: &'a mut exchange::Response,
		endpoint: &'a str,
	) -> StoreFuture<'a, ()> {
		self.removes.fetch_add(1, Ordering::SeqCst);

		self.inner.remove(exchange, response, endpoint)
	}
}
