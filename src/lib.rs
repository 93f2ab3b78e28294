//! Reverse-proxy OAuth 2.0 / OpenID Connect delegated-authorization filter—drive end-users
//! through the authorization-code flow, persist session state across requests, inject claims
//! downstream, and refresh expired tokens transparently.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod claims;
pub mod error;
pub mod exchange;
pub mod expr;
pub mod flows;
pub mod handler;
pub mod nonce;
pub mod obs;
pub mod registration;
pub mod session;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Condvar, Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::{
		error::{Error, Result},
		session::JsonObject,
	};
}

pub use oauth2::http;
pub use url;
#[cfg(test)] use {httpmock as _, tokio as _};
