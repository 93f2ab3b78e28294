#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use oauth2_gatekeeper::{
	error::{Error, ErrorCode},
	registration::{ClientRegistration, OAuth2Registration},
	url::Url,
};

fn build_registration(server: &MockServer) -> OAuth2Registration {
	OAuth2Registration::new(
		"mock",
		"client-1",
		Some("secret-1"),
		Url::parse(&server.url("/authorize")).expect("Mock authorize endpoint should parse."),
		Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."),
	)
	.with_scopes(["openid", "profile"])
	.with_user_info_endpoint(
		Url::parse(&server.url("/userinfo")).expect("Mock user-info endpoint should parse."),
	)
}

fn callback_uri() -> Url {
	Url::parse("https://rp.example/openid/callback").expect("Callback URI fixture should parse.")
}

#[tokio::test]
async fn code_exchange_returns_the_raw_token_response() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"access_token": "at-1",
				"token_type": "Bearer",
				"expires_in": 3599,
				"refresh_token": "rt-1",
				"id_token": "header.payload.signature"
			}));
		})
		.await;
	let registration = build_registration(&server);
	let response = registration
		.exchange_code("abc", &callback_uri())
		.await
		.expect("Code exchange should succeed.");

	token.assert_async().await;

	assert_eq!(response["access_token"], Value::String("at-1".into()));
	assert_eq!(response["refresh_token"], Value::String("rt-1".into()));
	assert_eq!(response["expires_in"], Value::from(3599));
	assert_eq!(
		response["id_token"],
		Value::String("header.payload.signature".into()),
		"Non-standard fields must survive the exchange."
	);
}

#[tokio::test]
async fn refresh_returns_the_rotated_response() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"access_token": "at-2",
				"token_type": "Bearer",
				"expires_in": 3599
			}));
		})
		.await;
	let registration = build_registration(&server);
	let response =
		registration.refresh("rt-1").await.expect("Refresh should succeed.");

	token.assert_async().await;

	assert_eq!(response["access_token"], Value::String("at-2".into()));
	assert!(!response.contains_key("refresh_token"));
}

#[tokio::test]
async fn provider_token_errors_surface_as_protocol_errors() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400).header("content-type", "application/json").json_body(json!({
				"error": "invalid_grant",
				"error_description": "authorization code expired"
			}));
		})
		.await;

	let registration = build_registration(&server);
	let err = registration
		.exchange_code("expired", &callback_uri())
		.await
		.expect_err("An error response must fail the exchange.");

	let Error::Protocol(protocol_error) = err else {
		panic!("Provider errors should map into the protocol taxonomy.");
	};

	assert_eq!(protocol_error.code, ErrorCode::Provider("invalid_grant".into()));
	assert_eq!(protocol_error.description.as_deref(), Some("authorization code expired"));
}

#[tokio::test]
async fn user_info_sends_the_bearer_token() {
	let server = MockServer::start_async().await;
	let user_info = server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo").header("authorization", "Bearer at-1");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "sub": "alice", "email": "alice@provider.example" }));
		})
		.await;
	let registration = build_registration(&server);
	let claims =
		registration.user_info("at-1").await.expect("User-info lookup should succeed.");

	user_info.assert_async().await;

	assert_eq!(claims["sub"], Value::String("alice".into()));
	assert_eq!(claims["email"], Value::String("alice@provider.example".into()));
}

#[tokio::test]
async fn rejected_user_info_tokens_map_to_invalid_token() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo");
			then.status(401);
		})
		.await;

	let registration = build_registration(&server);
	let err = registration
		.user_info("expired")
		.await
		.expect_err("A 401 must fail the user-info lookup.");

	let Error::Protocol(protocol_error) = err else {
		panic!("Rejected tokens should map into the protocol taxonomy.");
	};

	assert_eq!(protocol_error.code, ErrorCode::InvalidToken);
}
