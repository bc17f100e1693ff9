//! Marketplace descriptor data structures shared by the token flows and the resource client.

/// Builder API for assembling marketplace descriptors.
pub mod builder;
/// Grant identifiers used by the token endpoint.
pub mod grant;

pub use builder::*;
pub use grant::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Endpoint set declared by a marketplace descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceEndpoints {
	/// Authorization endpoint the seller visits during the PKCE bootstrap.
	pub authorization: Url,
	/// Token endpoint used for every grant.
	pub token: Url,
	/// Base URL of the REST API (resource paths are appended to it).
	pub api_base: Url,
}

/// Immutable marketplace descriptor consumed by flows and the resource client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceDescriptor {
	/// Endpoint definitions exposed by the marketplace.
	pub endpoints: MarketplaceEndpoints,
	/// Redirect URI registered for the seller application.
	pub redirect_uri: Url,
}
impl MarketplaceDescriptor {
	/// Creates a new descriptor builder.
	pub fn builder() -> MarketplaceDescriptorBuilder {
		MarketplaceDescriptorBuilder::default()
	}

	/// Joins resource path segments onto the API base, percent-encoding each segment.
	pub fn resource_url<'a, I>(&self, segments: I) -> Result<Url, ConfigError>
	where
		I: IntoIterator<Item = &'a str>,
	{
		let mut url = self.endpoints.api_base.clone();

		{
			let mut path = url
				.path_segments_mut()
				.map_err(|_| ConfigError::CannotBeABase { url: self.endpoints.api_base.to_string() })?;

			path.pop_if_empty().extend(segments);
		}

		Ok(url)
	}
}
