//! Client-registration contracts binding the filter to an authorization server.
//!
//! A registration owns everything specific to one provider relationship: the
//! client credentials, the endpoints, the requested scopes. Stages talk to it
//! exclusively through [`ClientRegistration`], so deployments can swap the
//! provider-backed implementation for anything that honors the contract.

#[cfg(feature = "reqwest")] pub mod oauth2;
#[cfg(feature = "reqwest")] pub use oauth2::OAuth2Registration;

// self
use crate::_prelude::*;

/// Boxed future returned by [`ClientRegistration`] operations.
pub type RegistrationFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// One configured relationship with an authorization server.
///
/// Token operations resolve to the raw JSON object returned by the provider's
/// token endpoint, because sessions persist that response verbatim.
pub trait ClientRegistration
where
	Self: Send + Sync,
{
	/// Stable name the filter dispatches on.
	fn name(&self) -> &str;

	/// Scopes requested during authorization.
	fn scopes(&self) -> &[String];

	/// Whether the provider exposes a user-info endpoint.
	fn has_user_info_endpoint(&self) -> bool;

	/// Builds the provider authorization-request URI carrying the opaque state.
	fn authorization_request_uri(&self, callback_uri: &Url, state: &str) -> Result<Url>;

	/// Exchanges an authorization code for the provider's raw token response.
	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		callback_uri: &'a Url,
	) -> RegistrationFuture<'a, JsonObject>;

	/// Exchanges a refresh token for a fresh raw token response.
	fn refresh<'a>(&'a self, refresh_token: &'a str) -> RegistrationFuture<'a, JsonObject>;

	/// Fetches the user-info claims for the access token.
	fn user_info<'a>(&'a self, access_token: &'a str) -> RegistrationFuture<'a, JsonObject>;
}

/// Resolves registration names to registrations at dispatch time.
pub trait RegistrationLookup
where
	Self: Send + Sync,
{
	/// Returns the registration for `name`, if one is configured.
	fn find(&self, name: &str) -> Option<Arc<dyn ClientRegistration>>;
}

/// Fixed registration set resolved by name.
#[derive(Clone, Default)]
pub struct StaticRegistrations(HashMap<String, Arc<dyn ClientRegistration>>);
impl StaticRegistrations {
	/// Adds a registration, keyed by its own name.
	pub fn with(mut self, registration: Arc<dyn ClientRegistration>) -> Self {
		self.0.insert(registration.name().to_owned(), registration);

		self
	}
}
impl Debug for StaticRegistrations {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("StaticRegistrations").field(&self.0.keys().collect::<Vec<_>>()).finish()
	}
}
impl RegistrationLookup for StaticRegistrations {
	fn find(&self, name: &str) -> Option<Arc<dyn ClientRegistration>> {
		self.0.get(name).cloned()
	}
}
