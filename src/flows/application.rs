//! Application token via the client-credentials grant.
//!
//! Every call issues a fresh token request authenticated with HTTP Basic client
//! credentials; application tokens are neither cached nor persisted.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	flows::{TokenBroker, common},
	http::BrokerHttpClient,
	oauth::OAuth2Facade,
	obs::{self, FlowKind},
};

impl<C> TokenBroker<C>
where
	C: ?Sized + BrokerHttpClient,
{
	/// Obtains an application-scoped token through the `client_credentials` grant.
	pub async fn get_application_token(&self) -> Result<AccessToken> {
		obs::observe(FlowKind::ApplicationToken, "get_application_token", async move {
			let facade = common::facade(self)?;
			let record = facade.exchange_client_credentials(&self.client).await?;

			Ok(record.access())
		})
		.await
	}
}
