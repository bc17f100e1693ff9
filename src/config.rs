//! Marketplace settings loaded from environment variables or any serde source.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARKETPLACE_CLIENT_ID` - OAuth client identifier of the seller application
//! - `MARKETPLACE_CLIENT_SECRET` - OAuth client secret of the seller application
//! - `MARKETPLACE_API_BASE_URL` - REST API base (e.g. `https://api.allegro.pl/`)
//! - `MARKETPLACE_AUTHORIZATION_ENDPOINT` - OAuth authorization endpoint
//! - `MARKETPLACE_TOKEN_URL` - OAuth token endpoint
//!
//! ## Optional
//! - `MARKETPLACE_REDIRECT_URI` - Registered redirect URI (default: `http://localhost:8000`)
//! - `MARKETPLACE_ORDER_FETCH_CONCURRENCY` - Parallel order fetches per fee computation (default: 4)
//! - `MARKETPLACE_AUTHORIZATION_TTL_SECS` - Lifetime of a pending PKCE authorization (default: 600)
//! - `MARKETPLACE_EXPIRY_MARGIN_SECS` - Seconds subtracted from token expiry (default: 0)

// std
use std::env;
// self
use crate::{
	_prelude::*,
	auth::{ClientIdentity, TokenSecret},
	error::ConfigError,
	fee::DEFAULT_ORDER_FETCH_CONCURRENCY,
	flows::BrokerOptions,
	provider::{DEFAULT_REDIRECT_URI, MarketplaceDescriptor},
};

const DEFAULT_AUTHORIZATION_TTL_SECS: u64 = 600;

/// Settings required to talk to one marketplace seller account.
#[derive(Clone, Deserialize)]
pub struct MarketplaceSettings {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// REST API base URL.
	pub api_base_url: Url,
	/// OAuth authorization endpoint.
	pub authorization_endpoint: Url,
	/// OAuth token endpoint.
	pub token_url: Url,
	/// Redirect URI registered for the application.
	#[serde(default = "default_redirect_uri")]
	pub redirect_uri: String,
	/// Maximum number of concurrent order fetches per fee computation.
	#[serde(default = "default_order_fetch_concurrency")]
	pub order_fetch_concurrency: usize,
	/// Lifetime of a pending authorization in seconds.
	#[serde(default = "default_authorization_ttl_secs")]
	pub authorization_ttl_secs: u64,
	/// Safety margin subtracted from token expiry in seconds; `0` keeps the strict check.
	#[serde(default)]
	pub expiry_margin_secs: u64,
}
impl MarketplaceSettings {
	/// Loads settings from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Loads settings through an arbitrary variable lookup.
	///
	/// Blank values are treated as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());
		let required = |name: &'static str| get(name).ok_or(ConfigError::MissingSetting { name });
		let settings = Self {
			client_id: required("MARKETPLACE_CLIENT_ID")?,
			client_secret: TokenSecret::new(required("MARKETPLACE_CLIENT_SECRET")?),
			api_base_url: parse_url("MARKETPLACE_API_BASE_URL", required("MARKETPLACE_API_BASE_URL")?)?,
			authorization_endpoint: parse_url(
				"MARKETPLACE_AUTHORIZATION_ENDPOINT",
				required("MARKETPLACE_AUTHORIZATION_ENDPOINT")?,
			)?,
			token_url: parse_url("MARKETPLACE_TOKEN_URL", required("MARKETPLACE_TOKEN_URL")?)?,
			redirect_uri: get("MARKETPLACE_REDIRECT_URI").unwrap_or_else(default_redirect_uri),
			order_fetch_concurrency: get("MARKETPLACE_ORDER_FETCH_CONCURRENCY")
				.map(|raw| parse_number("MARKETPLACE_ORDER_FETCH_CONCURRENCY", &raw))
				.transpose()?
				.unwrap_or(DEFAULT_ORDER_FETCH_CONCURRENCY),
			authorization_ttl_secs: get("MARKETPLACE_AUTHORIZATION_TTL_SECS")
				.map(|raw| parse_number("MARKETPLACE_AUTHORIZATION_TTL_SECS", &raw))
				.transpose()?
				.unwrap_or(DEFAULT_AUTHORIZATION_TTL_SECS),
			expiry_margin_secs: get("MARKETPLACE_EXPIRY_MARGIN_SECS")
				.map(|raw| parse_number("MARKETPLACE_EXPIRY_MARGIN_SECS", &raw))
				.transpose()?
				.unwrap_or_default(),
		};

		settings.validate()?;

		Ok(settings)
	}

	/// Validates values that serde alone cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.order_fetch_concurrency == 0 {
			return Err(ConfigError::InvalidSetting {
				name: "order_fetch_concurrency",
				reason: "must be at least 1".into(),
			});
		}
		if self.authorization_ttl_secs == 0 {
			return Err(ConfigError::InvalidSetting {
				name: "authorization_ttl_secs",
				reason: "must be at least 1".into(),
			});
		}

		Ok(())
	}

	/// Validated client identity.
	pub fn client_identity(&self) -> Result<ClientIdentity, ConfigError> {
		ClientIdentity::new(&self.client_id)
			.map_err(|e| ConfigError::InvalidSetting { name: "client_id", reason: e.to_string() })
	}

	/// Builds the validated marketplace descriptor.
	pub fn descriptor(&self) -> Result<MarketplaceDescriptor, ConfigError> {
		let redirect_uri = Url::parse(&self.redirect_uri)
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;

		Ok(MarketplaceDescriptor::builder()
			.authorization_endpoint(self.authorization_endpoint.clone())
			.token_endpoint(self.token_url.clone())
			.api_base(self.api_base_url.clone())
			.redirect_uri(redirect_uri)
			.build()?)
	}

	/// Broker tuning derived from these settings.
	pub fn broker_options(&self) -> Result<BrokerOptions, ConfigError> {
		Ok(BrokerOptions {
			authorization_ttl: seconds("authorization_ttl_secs", self.authorization_ttl_secs)?,
			expiry_margin: seconds("expiry_margin_secs", self.expiry_margin_secs)?,
		})
	}
}
impl Debug for MarketplaceSettings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MarketplaceSettings")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("api_base_url", &self.api_base_url.as_str())
			.field("authorization_endpoint", &self.authorization_endpoint.as_str())
			.field("token_url", &self.token_url.as_str())
			.field("redirect_uri", &self.redirect_uri)
			.field("order_fetch_concurrency", &self.order_fetch_concurrency)
			.field("authorization_ttl_secs", &self.authorization_ttl_secs)
			.field("expiry_margin_secs", &self.expiry_margin_secs)
			.finish()
	}
}

fn default_redirect_uri() -> String {
	DEFAULT_REDIRECT_URI.into()
}

fn default_order_fetch_concurrency() -> usize {
	DEFAULT_ORDER_FETCH_CONCURRENCY
}

fn default_authorization_ttl_secs() -> u64 {
	DEFAULT_AUTHORIZATION_TTL_SECS
}

fn parse_url(name: &'static str, raw: String) -> Result<Url, ConfigError> {
	Url::parse(&raw).map_err(|e| ConfigError::InvalidSetting { name, reason: e.to_string() })
}

fn parse_number<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
	T: FromStr,
	T::Err: Display,
{
	raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidSetting { name, reason: e.to_string() })
}

fn seconds(name: &'static str, value: u64) -> Result<Duration, ConfigError> {
	i64::try_from(value)
		.map(Duration::seconds)
		.map_err(|_| ConfigError::InvalidSetting { name, reason: "value is too large".into() })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn lookup(overrides: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let mut vars: HashMap<String, String> = [
			("MARKETPLACE_CLIENT_ID", "client-env"),
			("MARKETPLACE_CLIENT_SECRET", "secret-env"),
			("MARKETPLACE_API_BASE_URL", "https://api.allegro.pl/"),
			("MARKETPLACE_AUTHORIZATION_ENDPOINT", "https://allegro.pl/auth/oauth/authorize"),
			("MARKETPLACE_TOKEN_URL", "https://allegro.pl/auth/oauth/token"),
		]
		.into_iter()
		.map(|(k, v)| (k.to_owned(), v.to_owned()))
		.collect();

		for (k, v) in overrides {
			vars.insert((*k).to_owned(), (*v).to_owned());
		}

		move |name| vars.get(name).cloned()
	}

	#[test]
	fn defaults_apply_when_optional_values_are_absent() {
		let settings =
			MarketplaceSettings::from_lookup(lookup(&[])).expect("Required settings are present.");

		assert_eq!(settings.redirect_uri, "http://localhost:8000");
		assert_eq!(settings.order_fetch_concurrency, 4);
		assert_eq!(settings.authorization_ttl_secs, 600);
		assert_eq!(settings.expiry_margin_secs, 0);

		let options = settings.broker_options().expect("Default options should convert.");

		assert_eq!(options.authorization_ttl, Duration::minutes(10));
		assert_eq!(options.expiry_margin, Duration::ZERO);

		let descriptor = settings.descriptor().expect("Descriptor should build from settings.");

		assert_eq!(descriptor.endpoints.token.as_str(), "https://allegro.pl/auth/oauth/token");
		assert_eq!(descriptor.redirect_uri.as_str(), "http://localhost:8000/");
	}

	#[test]
	fn missing_and_invalid_values_are_reported() {
		let err = MarketplaceSettings::from_lookup(lookup(&[("MARKETPLACE_CLIENT_SECRET", " ")]))
			.expect_err("Blank secret must count as missing.");

		assert!(matches!(err, ConfigError::MissingSetting { name: "MARKETPLACE_CLIENT_SECRET" }));

		let err = MarketplaceSettings::from_lookup(lookup(&[(
			"MARKETPLACE_ORDER_FETCH_CONCURRENCY",
			"many",
		)]))
		.expect_err("Non-numeric concurrency must be rejected.");

		assert!(matches!(
			err,
			ConfigError::InvalidSetting { name: "MARKETPLACE_ORDER_FETCH_CONCURRENCY", .. }
		));

		let err = MarketplaceSettings::from_lookup(lookup(&[(
			"MARKETPLACE_ORDER_FETCH_CONCURRENCY",
			"0",
		)]))
		.expect_err("Zero concurrency must be rejected.");

		assert!(matches!(err, ConfigError::InvalidSetting { name: "order_fetch_concurrency", .. }));
	}

	#[test]
	fn descriptor_rejects_plain_http_endpoints() {
		let settings = MarketplaceSettings::from_lookup(lookup(&[(
			"MARKETPLACE_TOKEN_URL",
			"http://allegro.pl/auth/oauth/token",
		)]))
		.expect("Settings load does not check schemes.");

		assert!(matches!(settings.descriptor(), Err(ConfigError::Descriptor(_))));
	}

	#[test]
	fn debug_output_redacts_the_client_secret() {
		let settings =
			MarketplaceSettings::from_lookup(lookup(&[])).expect("Required settings are present.");

		assert!(!format!("{settings:?}").contains("secret-env"));
	}

	#[test]
	fn settings_deserialize_with_defaults() {
		let settings: MarketplaceSettings = serde_json::from_value(serde_json::json!({
			"client_id": "client-json",
			"client_secret": "secret-json",
			"api_base_url": "https://api.allegro.pl/",
			"authorization_endpoint": "https://allegro.pl/auth/oauth/authorize",
			"token_url": "https://allegro.pl/auth/oauth/token",
		}))
		.expect("Settings should deserialize from JSON.");

		assert_eq!(settings.order_fetch_concurrency, 4);
		assert_eq!(
			settings.client_identity().expect("Client id should be valid.").to_string(),
			"client-json"
		);
	}
}
