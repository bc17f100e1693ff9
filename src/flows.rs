//! Token lifecycle orchestration for one marketplace seller account.
//!
//! [`TokenBroker`] owns the token cache, the durable store handle, the marketplace
//! descriptor, and the client credentials. Application tokens come straight from the
//! client-credentials grant; user tokens resolve through cache, store, refresh, and
//! finally a two-phase PKCE bootstrap that the host application completes.

pub mod auth_code_pkce;
pub mod common;
pub mod refresh;

mod application;
mod user;

pub use auth_code_pkce::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{ClientIdentity, TokenSecret},
	cache::TokenCache,
	http::BrokerHttpClient,
	provider::MarketplaceDescriptor,
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport.
pub type ReqwestBroker = TokenBroker<ReqwestHttpClient>;

/// Tuning knobs for [`TokenBroker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrokerOptions {
	/// How long a pending PKCE authorization accepts its callback.
	pub authorization_ttl: Duration,
	/// Margin subtracted from `expires_at` before a token counts as usable.
	///
	/// Zero keeps the strict `now < expires_at` check.
	pub expiry_margin: Duration,
}
impl Default for BrokerOptions {
	fn default() -> Self {
		Self { authorization_ttl: Duration::minutes(10), expiry_margin: Duration::ZERO }
	}
}

/// Coordinates OAuth 2.0 flows for a single client identity against one marketplace.
///
/// Construct it once per process and share it behind an [`Arc`]; every piece of mutable
/// state (cache, pending authorization, single-flight guards) lives inside it.
#[derive(Clone)]
pub struct TokenBroker<C>
where
	C: ?Sized + BrokerHttpClient,
{
	/// HTTP client used for token exchanges and marketplace GETs.
	pub http_client: Arc<C>,
	/// Durable token store.
	pub store: Arc<dyn TokenStore>,
	/// Process-local cache in front of the store.
	pub cache: TokenCache,
	/// Marketplace endpoints and redirect URI.
	pub descriptor: MarketplaceDescriptor,
	/// Client identity the broker acts for.
	pub client: ClientIdentity,
	/// Broker tuning.
	pub options: BrokerOptions,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	client_secret: TokenSecret,
	flow_guards: Arc<Mutex<HashMap<ClientIdentity, Arc<AsyncMutex<()>>>>>,
	refresh_ledger: Arc<Mutex<RefreshLedger>>,
	pending: Arc<Mutex<Option<AuthorizationSession>>>,
}
impl<C> TokenBroker<C>
where
	C: ?Sized + BrokerHttpClient,
{
	/// Creates a broker that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		descriptor: MarketplaceDescriptor,
		client: ClientIdentity,
		client_secret: TokenSecret,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			cache: TokenCache::default(),
			descriptor,
			client,
			options: BrokerOptions::default(),
			refresh_metrics: Default::default(),
			client_secret,
			flow_guards: Default::default(),
			refresh_ledger: Default::default(),
			pending: Default::default(),
		}
	}

	/// Replaces the broker tuning.
	pub fn with_options(mut self, options: BrokerOptions) -> Self {
		self.options = options;

		self
	}

	/// Instant up to which a token must stay valid to be handed out.
	fn usable_horizon(&self, now: OffsetDateTime) -> OffsetDateTime {
		now + self.options.expiry_margin
	}
}
#[cfg(feature = "reqwest")]
impl TokenBroker<ReqwestHttpClient> {
	/// Creates a broker with its own reqwest transport (rustls, no redirects).
	pub fn new(
		store: Arc<dyn TokenStore>,
		descriptor: MarketplaceDescriptor,
		client: ClientIdentity,
		client_secret: TokenSecret,
	) -> Result<Self> {
		Ok(Self::with_http_client(
			store,
			descriptor,
			client,
			client_secret,
			ReqwestHttpClient::new()?,
		))
	}
}
impl<C> Debug for TokenBroker<C>
where
	C: ?Sized + BrokerHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBroker")
			.field("descriptor", &self.descriptor)
			.field("client", &self.client)
			.field("options", &self.options)
			.field("authorization_pending", &self.pending.lock().is_some())
			.finish()
	}
}
