//! Filter-level error types shared across stages, stores, and registrations.

// self
use crate::_prelude::*;

/// Filter-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical filter error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// OAuth 2.0 protocol violation or provider-reported error.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),
	/// Session-persistence failure.
	#[error("{0}")]
	Store(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Illegal session state transition.
	#[error(transparent)]
	Session(#[from] crate::session::SessionTransitionError),
	/// Template expression could not be evaluated.
	#[error(transparent)]
	Expression(#[from] crate::expr::ExpressionError),

	/// A flow-stage URI could not be resolved against the request.
	#[error("URI could not be resolved: {message}.")]
	Uri {
		/// Human-readable resolution failure.
		message: String,
	},
	/// An HTTP response could not be constructed.
	#[error("Response could not be constructed: {message}.")]
	Response {
		/// Human-readable construction failure.
		message: String,
	},
	/// Transport-level failure while calling a provider endpoint.
	#[error("Provider request failed: {message}.")]
	Upstream {
		/// Human-readable transport failure.
		message: String,
	},
}

/// Machine-readable OAuth 2.0 error codes recognized by the filter.
///
/// The closed set covers the violations this filter raises itself; any other
/// code returned verbatim by a provider is carried through [`ErrorCode::Provider`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
	/// The request is malformed or arrived in an unexpected flow state.
	InvalidRequest,
	/// The access token is expired, revoked, or otherwise unusable.
	InvalidToken,
	/// The end-user or provider denied the authorization request.
	AccessDenied,
	/// Error code reported verbatim by the provider.
	Provider(String),
}
impl ErrorCode {
	/// Parses a wire code, canonicalizing the values the filter recognizes.
	pub fn from_wire(code: impl Into<String>) -> Self {
		let code = code.into();

		match code.as_str() {
			"invalid_request" => ErrorCode::InvalidRequest,
			"invalid_token" => ErrorCode::InvalidToken,
			"access_denied" => ErrorCode::AccessDenied,
			_ => ErrorCode::Provider(code),
		}
	}

	/// Returns the RFC 6749 wire representation of the code.
	pub fn as_str(&self) -> &str {
		match self {
			ErrorCode::InvalidRequest => "invalid_request",
			ErrorCode::InvalidToken => "invalid_token",
			ErrorCode::AccessDenied => "access_denied",
			ErrorCode::Provider(code) => code,
		}
	}
}
impl Display for ErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Structured OAuth 2.0 protocol error carried through every stage handler.
///
/// Collapsed exactly once at the dispatcher boundary into the failure-handler
/// call, where [`ProtocolError::to_claims`] renders it into the same
/// claims-target shape used on success.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("OAuth 2.0 error: {code}{}", .description.as_deref().map(|reason| format!(" ({reason})")).unwrap_or_default())]
pub struct ProtocolError {
	/// Machine-readable error code.
	pub code: ErrorCode,
	/// Optional human-readable description.
	pub description: Option<String>,
	/// Optional protection realm.
	pub realm: Option<String>,
	/// Scopes required to access the protected resource, when known.
	pub scope: Vec<String>,
	/// Optional URI pointing at a human-readable error page.
	pub uri: Option<String>,
}
impl ProtocolError {
	/// Creates an `invalid_request` error with the provided description.
	pub fn invalid_request(description: impl Into<String>) -> Self {
		Self::new(ErrorCode::InvalidRequest).with_description(description)
	}

	/// Creates an `invalid_token` error with the provided description.
	pub fn invalid_token(description: impl Into<String>) -> Self {
		Self::new(ErrorCode::InvalidToken).with_description(description)
	}

	/// Creates an `access_denied` error with the provided description.
	pub fn access_denied(description: impl Into<String>) -> Self {
		Self::new(ErrorCode::AccessDenied).with_description(description)
	}

	/// Creates an error from a provider-supplied wire code.
	pub fn provider(code: impl Into<String>) -> Self {
		Self::new(ErrorCode::from_wire(code))
	}

	/// Creates a bare error for the provided code.
	pub fn new(code: ErrorCode) -> Self {
		Self { code, description: None, realm: None, scope: Vec::new(), uri: None }
	}

	/// Sets or replaces the human-readable description.
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());

		self
	}

	/// Sets or replaces the protection realm.
	pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
		self.realm = Some(realm.into());

		self
	}

	/// Sets or replaces the required scope list.
	pub fn with_scope(mut self, scope: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.scope = scope.into_iter().map(Into::into).collect();

		self
	}

	/// Sets or replaces the error URI.
	pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());

		self
	}

	/// Builds the error reported by a provider on the callback query string.
	///
	/// A callback without a `code` parameter carries the provider's own error
	/// fields instead; a callback missing both is a malformed request.
	pub fn from_callback_params(
		error: Option<String>,
		description: Option<String>,
		uri: Option<String>,
	) -> Self {
		let mut protocol_error = match error {
			Some(code) => Self::provider(code),
			None => Self::new(ErrorCode::InvalidRequest).with_description(
				"Authorization call-back failed because there was no code parameter",
			),
		};

		if let Some(description) = description {
			protocol_error = protocol_error.with_description(description);
		}
		if let Some(uri) = uri {
			protocol_error = protocol_error.with_uri(uri);
		}

		protocol_error
	}

	/// Returns `true` for expected/benign kinds that are logged at debug severity.
	pub fn is_benign(&self) -> bool {
		matches!(self.code, ErrorCode::AccessDenied | ErrorCode::InvalidToken)
	}

	/// Renders the error into the JSON shape written to the claims target.
	pub fn to_claims(&self) -> JsonObject {
		let mut claims = JsonObject::new();

		claims.insert("error".into(), Value::String(self.code.as_str().to_owned()));

		if let Some(description) = &self.description {
			claims.insert("error_description".into(), Value::String(description.clone()));
		}
		if let Some(realm) = &self.realm {
			claims.insert("realm".into(), Value::String(realm.clone()));
		}
		if !self.scope.is_empty() {
			claims.insert(
				"scope".into(),
				Value::Array(self.scope.iter().cloned().map(Value::String).collect()),
			);
		}
		if let Some(uri) = &self.uri {
			claims.insert("error_uri".into(), Value::String(uri.clone()));
		}

		claims
	}
}
