//! Per-request exchange context and response construction helpers.
//!
//! The surrounding pipeline hands the filter one [`Exchange`] per request. It
//! carries the inbound request line and headers plus a mutable attributes map,
//! which is where the filter writes the claims for downstream consumption.

// crates.io
use oauth2::http::{
	HeaderMap, Method, Response as HttpResponse, StatusCode,
	header::{self, HeaderName, HeaderValue},
};
// self
use crate::{_prelude::*, claims::ClaimsMap};

/// HTTP response produced by the filter and its collaborating handlers.
pub type Response = HttpResponse<Vec<u8>>;

/// Request-processing context threaded through the filter and handlers.
pub struct Exchange {
	method: Method,
	uri: Url,
	headers: HeaderMap,
	attributes: HashMap<String, ClaimsMap>,
}
impl Exchange {
	/// Creates an exchange for the provided request line.
	///
	/// The URI must be the original absolute request URI; its scheme decides
	/// whether the request counts as having arrived over a secure transport.
	pub fn new(method: Method, uri: Url) -> Self {
		Self { method, uri, headers: HeaderMap::new(), attributes: HashMap::new() }
	}

	/// Attaches a request header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.append(name, value);

		self
	}

	/// Inbound request method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Original absolute request URI.
	pub fn uri(&self) -> &Url {
		&self.uri
	}

	/// Path component of the request URI.
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Returns `true` when the request arrived over TLS.
	pub fn is_secure(&self) -> bool {
		self.uri.scheme().eq_ignore_ascii_case("https")
	}

	/// First value of the named query parameter, if present.
	pub fn query_param(&self, name: &str) -> Option<String> {
		self.uri.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
	}

	/// Inbound request headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Writes the claims map into the named attribute target.
	pub fn set_attribute(&mut self, target: impl Into<String>, claims: ClaimsMap) {
		self.attributes.insert(target.into(), claims);
	}

	/// Claims previously written to the named attribute target.
	pub fn attribute(&self, target: &str) -> Option<&ClaimsMap> {
		self.attributes.get(target)
	}
}
impl Debug for Exchange {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Exchange")
			.field("method", &self.method)
			.field("uri", &self.uri.as_str())
			.field("attributes", &self.attributes.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Builds an empty response with the provided status.
pub fn empty(status: StatusCode) -> Response {
	let mut response = Response::new(Vec::new());

	*response.status_mut() = status;

	response
}

/// Builds a bare 200 response.
pub fn ok() -> Response {
	empty(StatusCode::OK)
}

/// Builds a bare 500 response for non-protocol internal failures.
pub fn server_error() -> Response {
	empty(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Builds a 302 redirect to the provided location.
pub fn redirect(location: &str) -> Result<Response> {
	let location = HeaderValue::from_str(location)
		.map_err(|err| Error::Response { message: format!("invalid redirect location: {err}") })?;
	let mut response = empty(StatusCode::FOUND);

	response.headers_mut().insert(header::LOCATION, location);

	Ok(response)
}
