//! Session-persistence contracts and the encoded session blob codec.
//!
//! The adapter serializes the immutable [`Session`] into an opaque blob scoped
//! to the client endpoint path. Signing or encrypting the blob is the
//! surrounding deployment's concern; an absent or undecodable blob always
//! yields a fresh unauthenticated session at the call site.

pub mod cookie;
pub mod memory;

pub use cookie::CookieStore;
pub use memory::MemoryStore;

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	exchange::{Exchange, Response},
	obs,
	session::Session,
};

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for authorization sessions.
///
/// Saving and removing receive the in-flight response because the persistence
/// mechanism may need to attach data to it (cookies, headers); this is why the
/// callback stage persists only after the response is constructed.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Loads the session scoped to the endpoint, if a decodable one is persisted.
	fn load<'a>(
		&'a self,
		exchange: &'a Exchange,
		endpoint: &'a str,
	) -> StoreFuture<'a, Option<Session>>;

	/// Persists the session scoped to the endpoint, attaching state to the response.
	fn save<'a>(
		&'a self,
		exchange: &'a Exchange,
		response: &'a mut Response,
		session: &'a Session,
		endpoint: &'a str,
	) -> StoreFuture<'a, ()>;

	/// Removes any persisted session scoped to the endpoint.
	fn remove<'a>(
		&'a self,
		exchange: &'a Exchange,
		response: &'a mut Response,
		endpoint: &'a str,
	) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Session serialization failure surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the persistence mechanism.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Encodes a session into the opaque persisted blob form.
pub fn encode_session(session: &Session) -> Result<String, StoreError> {
	let json = serde_json::to_vec(session)
		.map_err(|err| StoreError::Serialization { message: err.to_string() })?;

	Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decodes a persisted blob back into a session.
///
/// Decoding is lenient: any failure means the persisted state is unusable and
/// the caller starts over with a fresh session.
pub fn decode_session(blob: &str) -> Option<Session> {
	let json = URL_SAFE_NO_PAD.decode(blob).ok()?;
	let mut deserializer = serde_json::Deserializer::from_slice(&json);

	match serde_path_to_error::deserialize(&mut deserializer) {
		Ok(session) => Some(session),
		Err(err) => {
			obs::log_debug(format_args!("Discarding undecodable session blob: {err}."));

			None
		},
	}
}
