//! Provider-backed [`ClientRegistration`] built on the `oauth2` client facade.

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AsyncHttpClient, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken,
	EndpointNotSet, EndpointSet, ExtraTokenFields, HttpClientError, HttpRequest, HttpResponse,
	RedirectUrl, RefreshToken, RequestTokenError, Scope, StandardRevocableToken,
	StandardTokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
		BasicTokenType,
	},
};
use reqwest::{
	StatusCode,
	header::{ACCEPT, AUTHORIZATION},
};
// self
use crate::{
	_prelude::*,
	error::ProtocolError,
	registration::{ClientRegistration, RegistrationFuture},
};

type RawClient = Client<
	BasicErrorResponse,
	RawTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type RawTokenResponse = StandardTokenResponse<RawExtraFields, BasicTokenType>;
type RawRequestError = RequestTokenError<HttpClientError<ReqwestError>, BasicErrorResponse>;

/// Captures every non-standard token-response field so the raw response
/// survives the typed facade intact.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(transparent)]
struct RawExtraFields(JsonObject);
impl ExtraTokenFields for RawExtraFields {}

/// [`ClientRegistration`] talking OAuth 2.0 to a real authorization server.
///
/// Token-endpoint traffic goes through the `oauth2` crate; the user-info
/// endpoint is a plain bearer-authenticated GET. The wrapped HTTP client
/// should not follow redirects, because token endpoints return results
/// directly instead of delegating to another URI.
pub struct OAuth2Registration {
	name: String,
	oauth_client: RawClient,
	http: Connector,
	scopes: Vec<String>,
	user_info_endpoint: Option<Url>,
}
impl OAuth2Registration {
	/// Creates a registration for the provider endpoints.
	pub fn new(
		name: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: Option<&str>,
		authorization_endpoint: Url,
		token_endpoint: Url,
	) -> Self {
		let mut oauth_client = Client::new(ClientId::new(client_id.into()))
			.set_auth_uri(AuthUrl::from_url(authorization_endpoint))
			.set_token_uri(TokenUrl::from_url(token_endpoint));

		if let Some(secret) = client_secret {
			oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.to_owned()));
		}

		Self {
			name: name.into(),
			oauth_client,
			http: Connector::default(),
			scopes: Vec::new(),
			user_info_endpoint: None,
		}
	}

	/// Sets the scopes requested during authorization.
	pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Sets the user-info endpoint queried on behalf of authorized sessions.
	pub fn with_user_info_endpoint(mut self, endpoint: Url) -> Self {
		self.user_info_endpoint = Some(endpoint);

		self
	}

	/// Replaces the HTTP client used for provider traffic.
	pub fn with_http_client(mut self, client: ReqwestClient) -> Self {
		self.http = Connector(client);

		self
	}
}
impl Debug for OAuth2Registration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Registration")
			.field("name", &self.name)
			.field("scopes", &self.scopes)
			.field("user_info_endpoint", &self.user_info_endpoint.as_ref().map(Url::as_str))
			.finish_non_exhaustive()
	}
}
impl ClientRegistration for OAuth2Registration {
	fn name(&self) -> &str {
		&self.name
	}

	fn scopes(&self) -> &[String] {
		&self.scopes
	}

	fn has_user_info_endpoint(&self) -> bool {
		self.user_info_endpoint.is_some()
	}

	fn authorization_request_uri(&self, callback_uri: &Url, state: &str) -> Result<Url> {
		let state = state.to_owned();
		let mut request = self.oauth_client.authorize_url(move || CsrfToken::new(state));

		for scope in &self.scopes {
			request = request.add_scope(Scope::new(scope.clone()));
		}

		let (uri, _) =
			request.set_redirect_uri(Cow::Owned(RedirectUrl::from_url(callback_uri.clone()))).url();

		Ok(uri)
	}

	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		callback_uri: &'a Url,
	) -> RegistrationFuture<'a, JsonObject> {
		Box::pin(async move {
			let response = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_redirect_uri(Cow::Owned(RedirectUrl::from_url(callback_uri.clone())))
				.request_async(&self.http)
				.await
				.map_err(map_token_error)?;

			raw_token_map(&response)
		})
	}

	fn refresh<'a>(&'a self, refresh_token: &'a str) -> RegistrationFuture<'a, JsonObject> {
		Box::pin(async move {
			let secret = RefreshToken::new(refresh_token.to_owned());
			let response = self
				.oauth_client
				.exchange_refresh_token(&secret)
				.request_async(&self.http)
				.await
				.map_err(map_token_error)?;

			raw_token_map(&response)
		})
	}

	fn user_info<'a>(&'a self, access_token: &'a str) -> RegistrationFuture<'a, JsonObject> {
		Box::pin(async move {
			let endpoint = self.user_info_endpoint.clone().ok_or_else(|| Error::Uri {
				message: format!("registration `{}` has no user-info endpoint", self.name),
			})?;
			let response = self
				.http
				.0
				.get(endpoint)
				.header(AUTHORIZATION, format!("Bearer {access_token}"))
				.header(ACCEPT, "application/json")
				.send()
				.await
				.map_err(|err| Error::Upstream { message: err.to_string() })?;
			let status = response.status();

			if status == StatusCode::UNAUTHORIZED {
				return Err(ProtocolError::invalid_token(
					"user-info endpoint rejected the access token",
				)
				.into());
			}
			if !status.is_success() {
				return Err(Error::Upstream {
					message: format!("user-info endpoint returned {status}"),
				});
			}

			let body = response
				.bytes()
				.await
				.map_err(|err| Error::Upstream { message: err.to_string() })?;
			let mut deserializer = serde_json::Deserializer::from_slice(&body);

			serde_path_to_error::deserialize(&mut deserializer).map_err(|err| Error::Upstream {
				message: format!("user-info response could not be parsed: {err}"),
			})
		})
	}
}

/// Reqwest-backed [`AsyncHttpClient`] adapter for the `oauth2` facade.
#[derive(Clone, Debug, Default)]
struct Connector(ReqwestClient);
impl<'c> AsyncHttpClient<'c> for Connector {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut converted = HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

/// Serializes the typed token response back into the provider's raw JSON shape.
fn raw_token_map(response: &RawTokenResponse) -> Result<JsonObject> {
	match serde_json::to_value(response) {
		Ok(Value::Object(map)) => Ok(map),
		Ok(_) => Err(Error::Upstream { message: "token response was not a JSON object".into() }),
		Err(err) => Err(Error::Upstream {
			message: format!("token response could not be re-serialized: {err}"),
		}),
	}
}

fn map_token_error(err: RawRequestError) -> Error {
	match err {
		RequestTokenError::ServerResponse(response) => {
			let mut protocol_error = ProtocolError::provider(response.error().as_ref());

			if let Some(description) = response.error_description() {
				protocol_error = protocol_error.with_description(description.clone());
			}
			if let Some(uri) = response.error_uri() {
				protocol_error = protocol_error.with_uri(uri.clone());
			}

			protocol_error.into()
		},
		RequestTokenError::Request(error) => Error::Upstream { message: error.to_string() },
		RequestTokenError::Parse(error, _body) => Error::Upstream {
			message: format!("token response could not be parsed: {error}"),
		},
		RequestTokenError::Other(message) => Error::Upstream { message },
	}
}
