//! Thread-safe in-memory [`SessionStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	exchange::{Exchange, Response},
	session::Session,
	store::{SessionStore, StoreFuture},
};

type SessionMap = Arc<RwLock<HashMap<String, Session>>>;

/// Keeps sessions in-process, keyed by client endpoint.
///
/// Useful for tests and demos; production deployments persist sessions at the
/// edge (see [`CookieStore`](crate::store::CookieStore)).
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(SessionMap);
impl MemoryStore {
	/// Pre-populates a session for the provided endpoint.
	pub fn seed(&self, endpoint: impl Into<String>, session: Session) {
		self.0.write().insert(endpoint.into(), session);
	}

	/// Returns the currently persisted session for the endpoint, if any.
	pub fn peek(&self, endpoint: &str) -> Option<Session> {
		self.0.read().get(endpoint).cloned()
	}
}
impl SessionStore for MemoryStore {
	fn load<'a>(
		&'a self,
		_: &'a Exchange,
		endpoint: &'a str,
	) -> StoreFuture<'a, Option<Session>> {
		let map = self.0.clone();
		let endpoint = endpoint.to_owned();

		Box::pin(async move { Ok(map.read().get(&endpoint).cloned()) })
	}

	fn save<'a>(
		&'a self,
		_: &'a Exchange,
		_: &'a mut Response,
		session: &'a Session,
		endpoint: &'a str,
	) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let endpoint = endpoint.to_owned();
		let session = session.clone();

		Box::pin(async move {
			map.write().insert(endpoint, session);

			Ok(())
		})
	}

	fn remove<'a>(
		&'a self,
		_: &'a Exchange,
		_: &'a mut Response,
		endpoint: &'a str,
	) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let endpoint = endpoint.to_owned();

		Box::pin(async move {
			map.write().remove(&endpoint);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::Method;
	// self
	use super::*;
	use crate::exchange;

	fn fixture() -> (Exchange, Response) {
		let request = Exchange::new(
			Method::GET,
			Url::parse("https://rp.example/app").expect("Test URI should parse."),
		);

		(request, exchange::ok())
	}

	#[tokio::test]
	async fn save_load_remove_cycle() {
		let store = MemoryStore::default();
		let (exchange, mut response) = fixture();
		let session = Session::empty("/openid").start_authorizing("nonce", "google");

		store
			.save(&exchange, &mut response, &session, "/openid")
			.await
			.expect("Memory save cannot fail.");

		let loaded = store
			.load(&exchange, "/openid")
			.await
			.expect("Memory load cannot fail.")
			.expect("Saved session should be present.");

		assert!(loaded.is_authorizing());

		store
			.remove(&exchange, &mut response, "/openid")
			.await
			.expect("Memory remove cannot fail.");

		assert!(
			store.load(&exchange, "/openid").await.expect("Memory load cannot fail.").is_none()
		);
	}
}
