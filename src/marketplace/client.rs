//! HTTP implementation of [`MarketplaceApi`].

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{
		Method, StatusCode,
		header::{ACCEPT, AUTHORIZATION},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, CategoryId, OfferId, OrderId},
	error::ConfigError,
	flows::TokenBroker,
	http::{self, BrokerHttpClient},
	marketplace::{ApiFuture, BillingEntries, BillingEntry, Category, MarketplaceApi, Order},
	obs::{self, FlowKind},
};

/// Versioned media type the marketplace REST API answers with.
pub const MARKETPLACE_MEDIA_TYPE: &str = "application/vnd.allegro.public.v1+json";

/// Authenticated marketplace client sharing the broker's transport.
///
/// Orders and billing entries use the user token; categories use the application token.
pub struct MarketplaceClient<C>
where
	C: ?Sized + BrokerHttpClient,
{
	broker: Arc<TokenBroker<C>>,
}
impl<C> MarketplaceClient<C>
where
	C: ?Sized + BrokerHttpClient,
{
	/// Wraps a shared broker.
	pub fn new(broker: Arc<TokenBroker<C>>) -> Self {
		Self { broker }
	}

	/// Broker backing this client.
	pub fn broker(&self) -> &Arc<TokenBroker<C>> {
		&self.broker
	}

	/// `GET order/checkout-forms/{id}`.
	pub async fn get_order(&self, id: &OrderId) -> Result<Order> {
		let url = self.broker.descriptor.resource_url(["order", "checkout-forms", id.as_ref()])?;
		let token = self.broker.get_user_token().await?;

		self.get_json(url, &token, "order", || format!("Order with ID {id} not found.")).await
	}

	/// `GET billing/billing-entries?offer.id={offer}`.
	pub async fn get_billing_entries(&self, offer: &OfferId) -> Result<Vec<BillingEntry>> {
		let mut url = self.broker.descriptor.resource_url(["billing", "billing-entries"])?;

		url.query_pairs_mut().append_pair("offer.id", offer);

		let token = self.broker.get_user_token().await?;
		let envelope: BillingEntries = self
			.get_json(url, &token, "billing entries", || {
				format!("Billing entries not found for the offer id {offer}.")
			})
			.await?;

		Ok(envelope.billing_entries)
	}

	/// `GET sale/categories/{id}`.
	pub async fn get_category(&self, id: &CategoryId) -> Result<Category> {
		let url = self.broker.descriptor.resource_url(["sale", "categories", id.as_ref()])?;
		let token = self.broker.get_application_token().await?;

		self.get_json(url, &token, "category", || format!("Category with ID {id} not found.")).await
	}

	async fn get_json<T, F>(
		&self,
		url: Url,
		token: &AccessToken,
		resource: &'static str,
		not_found: F,
	) -> Result<T>
	where
		T: DeserializeOwned,
		F: FnOnce() -> String,
	{
		obs::observe(FlowKind::MarketplaceRequest, resource, async move {
			let request: HttpRequest = oauth2::http::Request::builder()
				.method(Method::GET)
				.uri(url.as_str())
				.header(ACCEPT, MARKETPLACE_MEDIA_TYPE)
				.header(AUTHORIZATION, token.secret.bearer())
				.body(Vec::new())
				.map_err(ConfigError::from)?;
			let handle = self.broker.http_client.handle();
			let response = handle.call(request).await.map_err(http::map_http_client_error)?;
			let status = response.status();

			if status == StatusCode::NOT_FOUND {
				return Err(Error::not_found(not_found()));
			}
			if !status.is_success() {
				return Err(Error::UpstreamApi {
					status: status.as_u16(),
					reason: status.canonical_reason().unwrap_or("Unknown").to_owned(),
					body: String::from_utf8_lossy(response.body()).into_owned(),
				});
			}

			let mut deserializer = serde_json::Deserializer::from_slice(response.body());

			serde_path_to_error::deserialize(&mut deserializer)
				.map_err(|source| Error::MalformedResponse { resource, source })
		})
		.await
	}
}
impl<C> MarketplaceApi for MarketplaceClient<C>
where
	C: ?Sized + BrokerHttpClient,
{
	fn order<'a>(&'a self, id: &'a OrderId) -> ApiFuture<'a, Order> {
		Box::pin(self.get_order(id))
	}

	fn billing_entries<'a>(&'a self, offer: &'a OfferId) -> ApiFuture<'a, Vec<BillingEntry>> {
		Box::pin(self.get_billing_entries(offer))
	}

	fn category<'a>(&'a self, id: &'a CategoryId) -> ApiFuture<'a, Category> {
		Box::pin(self.get_category(id))
	}
}
impl<C> Debug for MarketplaceClient<C>
where
	C: ?Sized + BrokerHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MarketplaceClient").field("broker", &self.broker).finish()
	}
}
