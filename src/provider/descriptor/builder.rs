// self
use crate::{
	_prelude::*,
	provider::{MarketplaceDescriptor, MarketplaceEndpoints},
};

/// Redirect URI registered for the seller application when none is configured.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8000";

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum DescriptorError {
	/// Authorization endpoint is required for the PKCE bootstrap.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is mandatory for all flows.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// API base is mandatory for resource calls.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// Remote endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Redirect URI could not be parsed.
	#[error("Redirect URI is invalid: {reason}.")]
	InvalidRedirectUri {
		/// Parser message.
		reason: String,
	},
	/// API base cannot carry path segments (e.g. `mailto:` URLs).
	#[error("The API base URL cannot carry path segments: {url}.")]
	ApiBaseCannotBeABase {
		/// Offending URL.
		url: String,
	},
}

/// Builder for [`MarketplaceDescriptor`] values.
#[derive(Debug, Default)]
pub struct MarketplaceDescriptorBuilder {
	/// Authorization endpoint used by the PKCE bootstrap.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint used for every grant.
	pub token_endpoint: Option<Url>,
	/// REST API base URL.
	pub api_base: Option<Url>,
	/// Redirect URI; defaults to [`DEFAULT_REDIRECT_URI`].
	pub redirect_uri: Option<Url>,
}
impl MarketplaceDescriptorBuilder {
	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the REST API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Overrides the redirect URI.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<MarketplaceDescriptor, DescriptorError> {
		let authorization =
			self.authorization_endpoint.ok_or(DescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(DescriptorError::MissingTokenEndpoint)?;
		let api_base = self.api_base.ok_or(DescriptorError::MissingApiBase)?;
		let redirect_uri = match self.redirect_uri {
			Some(url) => url,
			None => Url::parse(DEFAULT_REDIRECT_URI)
				.map_err(|e| DescriptorError::InvalidRedirectUri { reason: e.to_string() })?,
		};
		let descriptor = MarketplaceDescriptor {
			endpoints: MarketplaceEndpoints { authorization, token, api_base },
			redirect_uri,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl MarketplaceDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), DescriptorError> {
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("api_base", &self.endpoints.api_base)?;

		if self.endpoints.api_base.cannot_be_a_base() {
			return Err(DescriptorError::ApiBaseCannotBeABase {
				url: self.endpoints.api_base.to_string(),
			});
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), DescriptorError> {
	if url.scheme() != "https" {
		Err(DescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}
