mod common;

// std
use std::sync::Arc;
// crates.io
use serde_json::Value;
// self
use common::{CountingStore, RecordingHandler, ScriptedRegistration, request};
use oauth2_gatekeeper::{
	expr::Literal,
	flows::OAuth2ClientFilter,
	http::{Method, StatusCode, header::LOCATION},
	nonce,
	registration::StaticRegistrations,
	session::Session,
};

const NONCE: &str = "nonce-under-test";

fn build_filter(
	registration: Arc<ScriptedRegistration>,
	store: CountingStore,
	failure_handler: RecordingHandler,
) -> OAuth2ClientFilter {
	OAuth2ClientFilter::new(
		Literal::new("/openid"),
		StaticRegistrations::default().with(registration),
		store,
		failure_handler,
	)
}

fn seed_authorizing(store: &CountingStore) {
	store.seed("/openid", Session::empty("/openid").start_authorizing(NONCE, "google"));
}

#[tokio::test]
async fn matching_callback_completes_authorization_and_redirects_to_goto() {
	let registration = Arc::new(ScriptedRegistration::new("google"));
	let store = CountingStore::default();
	let failure_handler = RecordingHandler::new(StatusCode::IM_A_TEAPOT);
	let downstream = RecordingHandler::new(StatusCode::OK);
	let filter = build_filter(registration.clone(), store.clone(), failure_handler.clone());

	seed_authorizing(&store);

	let state = format!("{}:/home", nonce::nonce_hash(NONCE));
	let mut exchange = request(
		Method::GET,
		&format!("https://rp.example/openid/callback?code=abc&state={state}"),
	);
	let response = filter.filter(&mut exchange, &downstream).await;

	assert_eq!(response.status(), StatusCode::FOUND);
	assert_eq!(
		response.headers().get(LOCATION).and_then(|value| value.to_str().ok()),
		Some("/home")
	);
	assert_eq!(registration.exchange_count(), 1);

	let session = store.peek("/openid").expect("Authorized session should be persisted.");

	assert!(session.is_authorized());
	assert!(session.authorization_request_nonce().is_none());
	assert_eq!(session.access_token(), Some("at-1"));
	assert_eq!(failure_handler.calls(), 0);
}

#[tokio::test]
async fn callback_without_goto_falls_back_to_the_configured_default() {
	let registration = Arc::new(ScriptedRegistration::new("google"));
	let store = CountingStore::default();
	let failure_handler = RecordingHandler::new(StatusCode::IM_A_TEAPOT);
	let downstream = RecordingHandler::new(StatusCode::OK);
	let filter = build_filter(registration, store.clone(), failure_handler.clone())
		.with_default_login_goto(Literal::new("/welcome"));

	seed_authorizing(&store);

	let mut exchange = request(
		Method::GET,
		&format!("https://rp.example/openid/callback?code=abc&state={}", nonce::nonce_hash(NONCE)),
	);
	let response = filter.filter(&mut exchange, &downstream).await;

	assert_eq!(response.status(), StatusCode::FOUND);
	assert_eq!(
		response.headers().get(LOCATION).and_then(|value| value.to_str().ok()),
		Some("/welcome")
	);
}

#[tokio::test]
async fn mismatched_state_fails_before_any_token_exchange() {
	let registration = Arc::new(ScriptedRegistration::new("google"));
	let store = CountingStore::default();
	let failure_handler = RecordingHandler::new(StatusCode::IM_A_TEAPOT);
	let downstream = RecordingHandler::new(StatusCode::OK);
	let filter = build_filter(registration.clone(), store.clone(), failure_handler.clone());

	seed_authorizing(&store);

	let mut exchange = request(
		Method::GET,
		&format!(
			"https://rp.example/openid/callback?code=abc&state={}",
			nonce::nonce_hash("a-different-nonce")
		),
	);
	let response = filter.filter(&mut exchange, &downstream).await;

	assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
	assert_eq!(registration.exchange_count(), 0, "No token exchange may be attempted.");

	let claims = failure_handler.captured().expect("Failure handler should receive claims.");

	assert_eq!(claims.get("error"), Some(&Value::String("invalid_request".into())));
}

#[tokio::test]
async fn callback_without_a_pending_authorization_fails() {
	let registration = Arc::new(ScriptedRegistration::new("google"));
	let store = CountingStore::default();
	let failure_handler = RecordingHandler::new(StatusCode::IM_A_TEAPOT);
	let downstream = RecordingHandler::new(StatusCode::OK);
	let filter = build_filter(registration, store.clone(), failure_handler.clone());
	let mut exchange = request(
		Method::GET,
		&format!("https://rp.example/openid/callback?code=abc&state={}", nonce::nonce_hash(NONCE)),
	);
	let response = filter.filter(&mut exchange, &downstream).await;

	assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
	assert_eq!(failure_handler.calls(), 1);
}

#[tokio::test]
async fn provider_error_parameters_surface_as_the_provider_error() {
	let registration = Arc::new(ScriptedRegistration::new("google"));
	let store = CountingStore::default();
	let failure_handler = RecordingHandler::new(StatusCode::IM_A_TEAPOT);
	let downstream = RecordingHandler::new(StatusCode::OK);
	let filter = build_filter(registration.clone(), store.clone(), failure_handler.clone());

	seed_authorizing(&store);

	let mut exchange = request(
		Method::GET,
		&format!(
			"https://rp.example/openid/callback?state={}&error=access_denied&error_description=user+cancelled",
			nonce::nonce_hash(NONCE)
		),
	);
	let response = filter.filter(&mut exchange, &downstream).await;

	assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
	assert_eq!(registration.exchange_count(), 0);

	let claims = failure_handler.captured().expect("Failure handler should receive claims.");

	assert_eq!(claims.get("error"), Some(&Value::String("access_denied".into())));
	assert_eq!(claims.get("error_description"), Some(&Value::String("user cancelled".into())));
}

#[tokio::test]
async fn non_get_callbacks_are_rejected() {
	let registration = Arc::new(ScriptedRegistration::new("google"));
	let store = CountingStore::default();
	let failure_handler = RecordingHandler::new(StatusCode::IM_A_TEAPOT);
	let downstream = RecordingHandler::new(StatusCode::OK);
	let filter = build_filter(registration, store.clone(), failure_handler.clone());

	seed_authorizing(&store);

	let mut exchange = request(
		Method::POST,
		&format!("https://rp.example/openid/callback?code=abc&state={}", nonce::nonce_hash(NONCE)),
	);
	let response = filter.filter(&mut exchange, &downstream).await;

	assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
	assert!(
		store.peek("/openid").is_some_and(|session| session.is_authorizing()),
		"A rejected callback leaves the session untouched."
	);
}
