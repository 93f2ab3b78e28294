//! Cookie-backed [`SessionStore`] scoping the session blob to the endpoint path.

// crates.io
use oauth2::http::header::{COOKIE, HeaderValue, SET_COOKIE};
// self
use crate::{
	_prelude::*,
	exchange::{Exchange, Response},
	session::Session,
	store::{self, SessionStore, StoreError, StoreFuture},
};

const DEFAULT_COOKIE_NAME: &str = "GATEKEEPER_SESSION";

/// Persists the encoded session blob in a path-scoped cookie.
///
/// The blob is opaque but unsigned here; deployments wrap the store when the
/// edge requires signed or encrypted session state.
#[derive(Clone, Debug)]
pub struct CookieStore {
	name: String,
}
impl CookieStore {
	/// Creates a store using the default cookie name.
	pub fn new() -> Self {
		Self { name: DEFAULT_COOKIE_NAME.into() }
	}

	/// Overrides the cookie name.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();

		self
	}

	fn read_blob(&self, exchange: &Exchange) -> Option<String> {
		let prefix = format!("{}=", self.name);

		exchange
			.headers()
			.get_all(COOKIE)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.flat_map(|value| value.split(';'))
			.map(str::trim)
			.find_map(|pair| pair.strip_prefix(&prefix))
			.map(str::to_owned)
	}

	fn write_cookie(
		&self,
		exchange: &Exchange,
		response: &mut Response,
		endpoint: &str,
		blob: &str,
		expire: bool,
	) -> Result<(), StoreError> {
		let mut cookie =
			format!("{}={blob}; Path={}; HttpOnly", self.name, endpoint_path(endpoint));

		if expire {
			cookie.push_str("; Max-Age=0");
		}
		if exchange.is_secure() {
			cookie.push_str("; Secure");
		}

		let value = HeaderValue::from_str(&cookie)
			.map_err(|err| StoreError::Backend { message: err.to_string() })?;

		response.headers_mut().append(SET_COOKIE, value);

		Ok(())
	}
}
impl Default for CookieStore {
	fn default() -> Self {
		Self::new()
	}
}
impl SessionStore for CookieStore {
	fn load<'a>(
		&'a self,
		exchange: &'a Exchange,
		_: &'a str,
	) -> StoreFuture<'a, Option<Session>> {
		Box::pin(async move {
			Ok(self.read_blob(exchange).as_deref().and_then(store::decode_session))
		})
	}

	fn save<'a>(
		&'a self,
		exchange: &'a Exchange,
		response: &'a mut Response,
		session: &'a Session,
		endpoint: &'a str,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let blob = store::encode_session(session)?;

			self.write_cookie(exchange, response, endpoint, &blob, false)
		})
	}

	fn remove<'a>(
		&'a self,
		exchange: &'a Exchange,
		response: &'a mut Response,
		endpoint: &'a str,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.write_cookie(exchange, response, endpoint, "", true) })
	}
}

/// Extracts the path component when the endpoint resolves to an absolute URI.
fn endpoint_path(endpoint: &str) -> String {
	match Url::parse(endpoint) {
		Ok(url) if matches!(url.scheme(), "http" | "https") => url.path().to_owned(),
		_ => endpoint.to_owned(),
	}
}
