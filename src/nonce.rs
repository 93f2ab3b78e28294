//! Nonce generation and the `state` parameter codec guarding the redirect round-trip.
//!
//! The `state` value sent to the provider is `sha256_b64(nonce)` optionally
//! followed by `:` and a goto URL. The nonce itself never leaves the session,
//! so a forged or replayed callback cannot produce a matching hash.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 32;

/// Generates a fresh random nonce for one authorization round-trip.
pub fn generate_nonce() -> String {
	rand::rng().sample_iter(Alphanumeric).take(NONCE_LEN).map(char::from).collect()
}

/// Computes the URL-safe base64 SHA-256 digest embedded in the `state` parameter.
pub fn nonce_hash(nonce: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(nonce.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Decoded form of the provider redirect `state` parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateParameter {
	/// Claimed hash of the session's authorization-request nonce.
	pub nonce_hash: String,
	/// Optional caller-supplied post-flow redirect target.
	pub goto_uri: Option<String>,
}
impl StateParameter {
	/// Builds the parameter for a fresh nonce and optional goto URL.
	pub fn new(nonce: &str, goto_uri: Option<String>) -> Self {
		Self { nonce_hash: nonce_hash(nonce), goto_uri }
	}

	/// Parses a raw `state` value, splitting on the first `:`.
	pub fn decode(raw: &str) -> Self {
		match raw.split_once(':') {
			Some((hash, goto_uri)) =>
				Self { nonce_hash: hash.to_owned(), goto_uri: Some(goto_uri.to_owned()) },
			None => Self { nonce_hash: raw.to_owned(), goto_uri: None },
		}
	}

	/// Serializes into the wire form `hash[:goto]`.
	pub fn encode(&self) -> String {
		match &self.goto_uri {
			Some(goto_uri) => format!("{}:{goto_uri}", self.nonce_hash),
			None => self.nonce_hash.clone(),
		}
	}

	/// Verifies the claimed hash against the nonce held by the session.
	pub fn matches(&self, nonce: &str) -> bool {
		nonce_hash(nonce) == self.nonce_hash
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn generated_nonces_are_unique_and_sized() {
		let a = generate_nonce();
		let b = generate_nonce();

		assert_eq!(a.len(), NONCE_LEN);
		assert_ne!(a, b);
	}

	#[test]
	fn round_trip_verifies() {
		let nonce = generate_nonce();
		let state = StateParameter::new(&nonce, Some("/home".into()));
		let decoded = StateParameter::decode(&state.encode());

		assert!(decoded.matches(&nonce));
		assert_eq!(decoded.goto_uri.as_deref(), Some("/home"));
	}

	#[test]
	fn mutated_hash_fails_verification() {
		let nonce = generate_nonce();
		let mut encoded = StateParameter::new(&nonce, None).encode();

		encoded.replace_range(0..1, if encoded.starts_with('A') { "B" } else { "A" });

		assert!(!StateParameter::decode(&encoded).matches(&nonce));
	}

	#[test]
	fn goto_with_colons_survives_decoding() {
		let nonce = generate_nonce();
		let state = StateParameter::new(&nonce, Some("https://app.example/home".into()));
		let decoded = StateParameter::decode(&state.encode());

		assert_eq!(decoded.goto_uri.as_deref(), Some("https://app.example/home"));
		assert!(decoded.matches(&nonce));
	}

	#[test]
	fn bare_state_decodes_without_goto() {
		let decoded = StateParameter::decode("somehash");

		assert_eq!(decoded.nonce_hash, "somehash");
		assert!(decoded.goto_uri.is_none());
	}
}
