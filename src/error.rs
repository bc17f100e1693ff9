//! Crate-level error types shared across flows, the marketplace client, and fee calculation.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Caller supplied an identifier that failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),

	/// Token endpoint rejected the request or answered with a non-success status.
	#[error("Failed to obtain a {grant} token. StatusCode={} Reason={reason}", display_status(.status))]
	UpstreamAuth {
		/// Grant label (`client_credentials`, `refresh_token`, `authorization_code`).
		grant: &'static str,
		/// HTTP status code, when one was received.
		status: Option<u16>,
		/// Reason phrase or OAuth error description.
		reason: String,
	},
	/// Requested resource does not exist upstream.
	#[error("{message}")]
	NotFound {
		/// Human-readable description of the missing resource.
		message: String,
	},
	/// Marketplace API answered with a non-success status other than 404.
	#[error("Marketplace API request failed. StatusCode={status} Reason={reason} Content={body}")]
	UpstreamApi {
		/// HTTP status code returned upstream.
		status: u16,
		/// Canonical reason phrase for the status.
		reason: String,
		/// Response body returned upstream.
		body: String,
	},
	/// Response body did not match the expected schema.
	#[error("Malformed {resource} response.")]
	MalformedResponse {
		/// Resource being decoded.
		resource: &'static str,
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Fee computation could not produce a finite result from the upstream data.
	#[error("{message}")]
	Calculation {
		/// Human-readable description of the failing input.
		message: String,
	},

	/// No usable user token exists; the seller must grant access at `authorize_url`.
	#[error("User authorization is required; visit {authorize_url} and complete the authorization.")]
	AuthorizationRequired {
		/// Authorization URL the seller must visit.
		authorize_url: Url,
	},
	/// Pending authorization timed out before it was completed.
	#[error("Pending authorization expired before completion.")]
	AuthorizationExpired,
	/// No authorization is pending (never started, cancelled, or already completed).
	#[error("No authorization is pending.")]
	AuthorizationNotPending,
	/// Returned `state` does not match the pending authorization.
	#[error("Authorization state mismatch.")]
	AuthorizationStateMismatch,
}
impl Error {
	/// Returns the HTTP status code a controller should answer with for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			Self::NotFound { .. } => 404,
			Self::Calculation { .. } => 422,
			Self::InvalidIdentifier(_) => 400,
			Self::UpstreamAuth { .. } | Self::Transport(_) => 502,
			Self::UpstreamApi { status, .. } => *status,
			Self::MalformedResponse { .. } | Self::Storage(_) | Self::Config(_) => 500,
			Self::AuthorizationRequired { .. } => 401,
			Self::AuthorizationExpired => 410,
			Self::AuthorizationNotPending | Self::AuthorizationStateMismatch => 409,
		}
	}

	pub(crate) fn not_found(message: impl Into<String>) -> Self {
		Self::NotFound { message: message.into() }
	}

	pub(crate) fn calculation(message: impl Into<String>) -> Self {
		Self::Calculation { message: message.into() }
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Descriptor validation failed.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::DescriptorError),
	/// API base URL cannot carry path segments.
	#[error("API base URL cannot be a base: {url}.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// Required setting was not provided.
	#[error("Missing required setting `{name}`.")]
	MissingSetting {
		/// Setting name.
		name: &'static str,
	},
	/// Setting was provided but could not be parsed.
	#[error("Setting `{name}` is invalid: {reason}.")]
	InvalidSetting {
		/// Setting name.
		name: &'static str,
		/// Parser message.
		reason: String,
	},
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::auth::StoredTokenBuilderError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the marketplace.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the marketplace.")]
	Io(#[from] std::io::Error),
	/// Transport reported a failure without a structured error.
	#[error("HTTP client error occurred while calling the marketplace: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

fn display_status(status: &Option<u16>) -> String {
	status.map_or_else(|| "none".into(), |code| code.to_string())
}
