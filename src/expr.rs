//! Template-expression evaluation seam.
//!
//! Endpoint and goto URIs may be request-dependent, so the filter evaluates
//! them through this trait on every request. Expression syntax and evaluation
//! live outside the filter; [`Literal`] covers the common static case.

// self
use crate::{_prelude::*, exchange::Exchange};

/// Failure produced while evaluating a template expression.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Expression evaluation failed: {message}.")]
pub struct ExpressionError {
	/// Human-readable evaluation failure.
	pub message: String,
}
impl ExpressionError {
	/// Creates an evaluation failure with the provided message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// Capability to evaluate a configured template against the request context.
pub trait Expression
where
	Self: Send + Sync,
{
	/// Evaluates the template against the provided exchange.
	fn eval(&self, exchange: &Exchange) -> Result<String, ExpressionError>;
}

/// Expression that always yields the same configured string.
#[derive(Clone, Debug)]
pub struct Literal(String);
impl Literal {
	/// Wraps a static configuration value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}
}
impl Expression for Literal {
	fn eval(&self, _: &Exchange) -> Result<String, ExpressionError> {
		Ok(self.0.clone())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::Method;
	// self
	use super::*;

	#[test]
	fn literal_ignores_the_exchange() {
		let exchange = Exchange::new(
			Method::GET,
			Url::parse("https://rp.example/anything").expect("Test URI should parse."),
		);

		assert_eq!(
			Literal::new("/openid").eval(&exchange).expect("Literal evaluation cannot fail."),
			"/openid"
		);
	}
}
